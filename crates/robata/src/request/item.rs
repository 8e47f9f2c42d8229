use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::error::ValidationError;
use super::model_input::ModelInput;
use super::schema::OutputSchema;

/// Caller-chosen identifier of a single request, unique within a batch.
///
/// On the wire this is Bedrock's `recordId`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for RequestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// # Request
///
/// One inference request: an identifier, the prompt payload, and an optional
/// output schema.
///
/// Without a schema the model answers in free text. With a schema the encoder
/// registers it as the only tool and forces the model to call it, so the
/// answer arrives as a JSON object shaped by the schema.
///
/// Requests are immutable once built; a batch shares schemas through [`Arc`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id: RequestId,
    model_input: ModelInput,
    schema: Option<Arc<OutputSchema>>,
}

impl Request {
    /// Creates a free-text request.
    pub fn new(id: impl Into<RequestId>, model_input: ModelInput) -> Self {
        Self {
            id: id.into(),
            model_input,
            schema: None,
        }
    }

    /// Creates a request whose output must match `schema`.
    pub fn structured(id: impl Into<RequestId>, model_input: ModelInput, schema: Arc<OutputSchema>) -> Self {
        Self {
            id: id.into(),
            model_input,
            schema: Some(schema),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn model_input(&self) -> &ModelInput {
        &self.model_input
    }

    pub fn schema(&self) -> Option<&Arc<OutputSchema>> {
        self.schema.as_ref()
    }

    /// The model input exactly as it will be submitted: the schema, if any,
    /// becomes the single tool and the tool choice is forced onto it.
    pub fn wire_input(&self) -> ModelInput {
        match &self.schema {
            None => self.model_input.clone(),
            Some(schema) => self.model_input.clone().with_forced_tool(schema.tool()),
        }
    }

    /// Checks the request in isolation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if let Some(schema) = &self.schema {
            schema.validate().map_err(|reason| ValidationError::Schema {
                id: self.id.clone(),
                reason,
            })?;
        }
        self.wire_input().validate(&self.id)
    }
}

/// Validates every request and checks that ids are unique.
pub fn validate_batch(requests: &[Request]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(requests.len());
    for request in requests {
        request.validate()?;
        if !seen.insert(request.id()) {
            return Err(ValidationError::DuplicateId(request.id().clone()));
        }
    }
    Ok(())
}
