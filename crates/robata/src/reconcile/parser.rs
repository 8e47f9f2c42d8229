use std::marker::PhantomData;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::request::OutputSchema;
use super::outcome::{FailureReason, Outcome};

/// Token usage reported with a model response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// One block of a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// A messages-API response body, as found in `modelOutput`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ModelOutput {
    pub fn from_value(value: &Value) -> Result<Self, ParseFailure> {
        Self::deserialize(value).map_err(|e| ParseFailure::malformed(format!("not a model response: {e}")))
    }

    /// All text blocks, concatenated in order.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } => Some((name.as_str(), input)),
            _ => None,
        })
    }
}

/// Why a model output could not be turned into a typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Whether the same request may produce a usable output next time.
    pub recoverable: bool,
    pub reason: FailureReason,
}

impl ParseFailure {
    /// The output was well-formed but did not have the requested shape.
    pub fn schema_mismatch(detail: impl Into<String>) -> Self {
        Self {
            recoverable: true,
            reason: FailureReason::SchemaMismatch { detail: detail.into() },
        }
    }

    /// The output could not be interpreted at all.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            recoverable: false,
            reason: FailureReason::MalformedOutput { detail: detail.into() },
        }
    }

    pub(crate) fn into_outcome<T>(self) -> Outcome<T> {
        if self.recoverable {
            Outcome::RecoverableError(self.reason)
        } else {
            Outcome::UnrecoverableError(self.reason)
        }
    }
}

/// # OutputParser
///
/// Turns the `modelOutput` of one record into the caller's payload type.
pub trait OutputParser: Send + Sync {
    type Output;

    fn parse(&self, output: &Value) -> Result<Self::Output, ParseFailure>;
}

/// The model response as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawOutput;

impl OutputParser for RawOutput {
    type Output = ModelOutput;

    fn parse(&self, output: &Value) -> Result<ModelOutput, ParseFailure> {
        ModelOutput::from_value(output)
    }
}

/// The concatenated text of the response, for free-form requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOutput;

impl OutputParser for TextOutput {
    type Output = String;

    fn parse(&self, output: &Value) -> Result<String, ParseFailure> {
        let output = ModelOutput::from_value(output)?;
        if !output.content.iter().any(|b| matches!(b, ContentBlock::Text { .. })) {
            return Err(ParseFailure::schema_mismatch("response has no text content"));
        }
        Ok(output.text())
    }
}

/// # ToolOutput
///
/// The input of the forced tool call, deserialized into `T`.
///
/// The response must have stopped for `tool_use` and hold exactly one call of
/// the expected tool. Anything else is a schema mismatch, which a retry may
/// fix.
pub struct ToolOutput<T> {
    tool: String,
    _payload: PhantomData<fn() -> T>,
}

impl<T> ToolOutput<T> {
    /// Expects calls of the tool named `tool`.
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            _payload: PhantomData,
        }
    }

    pub fn for_schema(schema: &OutputSchema) -> Self {
        Self::new(schema.name())
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }
}

#[cfg(feature = "schemars")]
impl<T: schemars::JsonSchema> ToolOutput<T> {
    /// Expects calls of the tool derived by [`OutputSchema::for_type`].
    pub fn for_type() -> Self {
        Self::new(T::schema_name())
    }
}

impl<T> Clone for ToolOutput<T> {
    fn clone(&self) -> Self {
        Self::new(self.tool.clone())
    }
}

impl<T> std::fmt::Debug for ToolOutput<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolOutput").field("tool", &self.tool).finish()
    }
}

impl<T: DeserializeOwned> OutputParser for ToolOutput<T> {
    type Output = T;

    fn parse(&self, output: &Value) -> Result<T, ParseFailure> {
        let output = ModelOutput::from_value(output)?;
        match output.stop_reason.as_deref() {
            Some("tool_use") => {}
            other => {
                return Err(ParseFailure::schema_mismatch(format!(
                    "model did not use the tool (stop_reason {})",
                    other.unwrap_or("missing")
                )));
            }
        }

        let mut calls = output.tool_uses();
        let (name, input) = match (calls.next(), calls.next()) {
            (Some(call), None) => call,
            (None, _) => return Err(ParseFailure::schema_mismatch("no tool_use block")),
            (Some(_), Some(_)) => return Err(ParseFailure::schema_mismatch("more than one tool_use block")),
        };
        if name != self.tool {
            return Err(ParseFailure::schema_mismatch(format!(
                "expected tool `{}`, model called `{name}`",
                self.tool
            )));
        }
        T::deserialize(input).map_err(|e| ParseFailure::schema_mismatch(e.to_string()))
    }
}
