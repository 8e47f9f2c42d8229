use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::request::{ModelInput, RequestId};

/// One line of the submission artifact.
#[derive(Debug, Serialize)]
pub(crate) struct InputRecord<'a> {
    #[serde(rename = "recordId")]
    pub record_id: &'a RequestId,
    #[serde(rename = "modelInput")]
    pub model_input: ModelInput,
}

/// One line of an output or error artifact, as loosely as the service may
/// write it. Which fields are present decides how the line is classified.
#[derive(Debug, Deserialize)]
pub(crate) struct OutputLine {
    #[serde(rename = "recordId", alias = "custom_id", default)]
    pub record_id: Option<Value>,
    #[serde(rename = "modelOutput", alias = "model_output", default)]
    pub model_output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// A per-record failure reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// HTTP-like status code, when the service gives one.
    #[serde(rename = "errorCode", default)]
    pub code: Option<u16>,
    #[serde(rename = "errorMessage", default)]
    pub message: String,
}

impl RecordError {
    pub fn new(code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Reads the `error` field of an output line.
    ///
    /// Accepts the structured form as well as a bare string or number, which
    /// some error artifacts use.
    pub(crate) fn from_value(value: Value) -> Self {
        match value {
            Value::String(message) => Self::new(None, message),
            Value::Number(code) => Self::new(code.as_u64().and_then(|c| u16::try_from(c).ok()), String::new()),
            other => serde_json::from_value::<RecordError>(other.clone())
                .unwrap_or_else(|_| Self::new(None, other.to_string())),
        }
    }

    /// Throttling, timeouts and server-side failures may succeed on resubmission.
    pub fn is_recoverable(&self) -> bool {
        if let Some(code) = self.code {
            if code == 408 || code == 429 || (500..600).contains(&code) {
                return true;
            }
        }
        let message = self.message.to_ascii_lowercase();
        ["throttl", "timeout", "timed out", "too many requests", "service unavailable", "internal server error"]
            .iter()
            .any(|needle| message.contains(needle))
    }
}

/// What a decoded line carries.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// The model's response body.
    Output(Value),
    /// The service failed this record.
    Error(RecordError),
    /// The line could not be understood.
    Undecodable(String),
}

/// One decoded line of an output or error artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// 1-based line number within its artifact.
    pub line: usize,
    /// `None` when no id could be read from the line.
    pub request_id: Option<RequestId>,
    pub record: RawRecord,
}

impl RawResult {
    pub fn output(id: impl Into<RequestId>, output: Value) -> Self {
        Self {
            line: 0,
            request_id: Some(id.into()),
            record: RawRecord::Output(output),
        }
    }

    pub fn error(id: impl Into<RequestId>, error: RecordError) -> Self {
        Self {
            line: 0,
            request_id: Some(id.into()),
            record: RawRecord::Error(error),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}
