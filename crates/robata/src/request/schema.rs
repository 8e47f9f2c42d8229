use serde::{Deserialize, Serialize};
use serde_json::Value;
use super::model_input::Tool;

/// Description used when a schema type carries no doc comment.
pub const DEFAULT_SCHEMA_DESCRIPTION: &str = "please fill in the schema";

const MAX_NAME_LEN: usize = 64;

/// # OutputSchema
///
/// Describes the shape a structured answer must take. It is sent to the model
/// as a tool definition and the model is forced to call that tool, so the
/// tool call's `input` is the structured answer.
///
/// With the `schemars` feature the schema can be derived from a Rust type via
/// [`OutputSchema::for_type`], in which case the same type can be used with
/// [`ToolOutput`](crate::reconcile::ToolOutput) to read the answers back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    name: String,
    description: String,
    input_schema: Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        let description = description.into();
        Self {
            name: name.into(),
            description: if description.is_empty() {
                DEFAULT_SCHEMA_DESCRIPTION.to_string()
            } else {
                description
            },
            input_schema,
        }
    }

    /// Derives the schema from a type implementing [`schemars::JsonSchema`].
    ///
    /// The tool is named after the type; the description is the type's doc
    /// comment when it has one.
    #[cfg_attr(docsrs, doc(cfg(feature = "schemars")))]
    #[cfg(feature = "schemars")]
    pub fn for_type<T: schemars::JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let description = root
            .schema
            .metadata
            .as_ref()
            .and_then(|meta| meta.description.clone())
            .unwrap_or_default();
        // RootSchema always serializes to an object
        let input_schema = serde_json::to_value(&root).unwrap_or(Value::Null);
        Self::new(T::schema_name(), description, input_schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// The tool definition submitted with each structured request.
    pub fn tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Checks the tool name rules and that the schema describes an object.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.len() > MAX_NAME_LEN {
            return Err(format!("name must be 1 to {MAX_NAME_LEN} characters long"));
        }
        if let Some(c) = self
            .name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(format!("name `{}` contains invalid character {c:?}", self.name));
        }
        let Some(object) = self.input_schema.as_object() else {
            return Err("input schema must be a JSON object".to_string());
        };
        match object.get("type") {
            None => Ok(()),
            Some(Value::String(t)) if t == "object" => Ok(()),
            Some(other) => Err(format!("input schema must describe an object, found type {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_description_gets_default() {
        let schema = OutputSchema::new("Thing", "", json!({"type": "object"}));
        assert_eq!(schema.description(), DEFAULT_SCHEMA_DESCRIPTION);
    }

    #[test]
    fn test_tool_mirrors_schema() {
        let schema = OutputSchema::new("Thing", "a thing", json!({"type": "object"}));
        let tool = schema.tool();
        assert_eq!(tool.name, "Thing");
        assert_eq!(tool.description, "a thing");
        assert_eq!(tool.input_schema, json!({"type": "object"}));
    }

    #[test]
    fn test_validate_rejects_non_object_schema() {
        let schema = OutputSchema::new("Thing", "", json!({"type": "array"}));
        assert!(schema.validate().is_err());
        let schema = OutputSchema::new("Thing", "", json!("object"));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_name_rules() {
        assert!(OutputSchema::new("ok_name-1", "", json!({})).validate().is_ok());
        assert!(OutputSchema::new("", "", json!({})).validate().is_err());
        assert!(OutputSchema::new("a".repeat(65), "", json!({})).validate().is_err());
        assert!(OutputSchema::new("dot.name", "", json!({})).validate().is_err());
    }

    #[cfg(feature = "schemars")]
    #[test]
    fn test_for_type_uses_doc_comment() {
        /// A class to store details about people
        #[derive(schemars::JsonSchema)]
        #[allow(dead_code)]
        struct NameAge {
            name: String,
            age: u32,
        }

        let schema = OutputSchema::for_type::<NameAge>();
        assert_eq!(schema.name(), "NameAge");
        assert_eq!(schema.description(), "A class to store details about people");
        assert_eq!(schema.input_schema()["type"], json!("object"));
        assert!(schema.input_schema()["properties"].get("age").is_some());
        assert!(schema.validate().is_ok());
    }
}
