use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::ValidationError;
use super::item::RequestId;

/// Anthropic messages version string Bedrock expects.
pub const DEFAULT_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Default completion budget per request.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

fn default_anthropic_version() -> String {
    DEFAULT_ANTHROPIC_VERSION.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation turn. `content` is either a plain string or a list of
/// content blocks, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Value,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Value::String(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Value::String(text.into()),
        }
    }
}

/// A tool the model may call. Structured output is implemented as a tool
/// whose `input_schema` is the desired output shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceKind {
    Any,
    Tool,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolChoice {
    #[serde(rename = "type")]
    pub kind: ToolChoiceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ToolChoice {
    /// Forces the model to call the named tool.
    pub fn tool(name: impl Into<String>) -> Self {
        Self {
            kind: ToolChoiceKind::Tool,
            name: Some(name.into()),
        }
    }
}

/// # ModelInput
///
/// The `modelInput` body of one batch record, following the Bedrock
/// Anthropic messages format. Unset optional parameters are left out of the
/// serialized form so the service applies its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInput {
    pub messages: Vec<Message>,

    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl ModelInput {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            anthropic_version: default_anthropic_version(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: None,
            stop_sequences: None,
            temperature: None,
            top_p: None,
            top_k: None,
            tools: None,
            tool_choice: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(stop_sequences);
        self
    }

    /// Replaces any tools with `tool` and forces the model to call it.
    pub(crate) fn with_forced_tool(mut self, tool: Tool) -> Self {
        self.tool_choice = Some(ToolChoice::tool(tool.name.clone()));
        self.tools = Some(vec![tool]);
        self
    }

    pub(crate) fn validate(&self, id: &RequestId) -> Result<(), ValidationError> {
        let invalid = |field: &'static str, reason: String| ValidationError::InvalidParameter {
            id: id.clone(),
            field,
            reason,
        };

        if self.messages.is_empty() {
            return Err(ValidationError::NoMessages(id.clone()));
        }
        if self.max_tokens == 0 {
            return Err(invalid("max_tokens", "must be greater than zero".to_string()));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=1.0).contains(&t) {
                return Err(invalid("temperature", format!("{t} is outside [0, 1]")));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid("top_p", format!("{p} is outside [0, 1]")));
            }
        }
        if let Some(choice) = &self.tool_choice {
            if choice.kind == ToolChoiceKind::Tool {
                let name = choice
                    .name
                    .as_deref()
                    .ok_or_else(|| invalid("tool_choice", "a forced tool needs a name".to_string()))?;
                let defined = self
                    .tools
                    .as_ref()
                    .is_some_and(|tools| tools.iter().any(|tool| tool.name == name));
                if !defined {
                    return Err(invalid("tool_choice", format!("tool `{name}` is not defined")));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_options_are_omitted() {
        let input = ModelInput::new(vec![Message::user("hi")]);
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(
            value,
            json!({
                "messages": [{"role": "user", "content": "hi"}],
                "anthropic_version": "bedrock-2023-05-31",
                "max_tokens": 2000
            })
        );
    }

    #[test]
    fn test_tool_choice_wire_shape() {
        let choice = serde_json::to_value(ToolChoice::tool("Person")).unwrap();
        assert_eq!(choice, json!({"type": "tool", "name": "Person"}));
    }

    #[test]
    fn test_sampling_round_trip() {
        let input = ModelInput::new(vec![Message::user("hi")])
            .with_temperature(0.1)
            .with_top_p(0.999)
            .with_top_k(250)
            .with_system("be brief");
        let text = serde_json::to_string(&input).unwrap();
        let back: ModelInput = serde_json::from_str(&text).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn test_out_of_range_temperature() {
        let input = ModelInput::new(vec![Message::user("hi")]).with_temperature(1.5);
        let err = input.validate(&RequestId::from("r")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidParameter { field: "temperature", .. }));
    }

    #[test]
    fn test_forced_tool_must_exist() {
        let mut input = ModelInput::new(vec![Message::user("hi")]);
        input.tool_choice = Some(ToolChoice::tool("Missing"));
        let err = input.validate(&RequestId::from("r")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidParameter { field: "tool_choice", .. }));
    }

    #[test]
    fn test_empty_messages() {
        let input = ModelInput::new(vec![]);
        assert_eq!(
            input.validate(&RequestId::from("r")),
            Err(ValidationError::NoMessages(RequestId::from("r")))
        );
    }
}
