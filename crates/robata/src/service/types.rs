use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use super::location::ObjectLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceErrorKind {
    /// Throttling, timeouts, connection resets: worth retrying.
    Transient,
    /// Bad request, missing job, permissions: retrying will not help.
    Permanent,
}

/// An error reported by the [`BatchExecutionService`](super::BatchExecutionService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} service error: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
    /// Server-suggested delay before the next attempt.
    pub retry_after: Option<Duration>,
}

impl ServiceError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Transient,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Permanent,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ServiceErrorKind::Transient
    }
}

/// An error reported by an [`ObjectStore`](super::ObjectStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("io error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object store failure: {0}")]
    Other(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Job status as the remote service spells it.
///
/// The variants mirror Bedrock's model-invocation job statuses. The job state
/// machine folds the non-terminal ones into a single in-progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteStatus {
    Submitted,
    Validating,
    Scheduled,
    InProgress,
    Stopping,
    Completed,
    PartiallyCompleted,
    Failed,
    Stopped,
    Expired,
}

impl RemoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStatus::Submitted => "Submitted",
            RemoteStatus::Validating => "Validating",
            RemoteStatus::Scheduled => "Scheduled",
            RemoteStatus::InProgress => "InProgress",
            RemoteStatus::Stopping => "Stopping",
            RemoteStatus::Completed => "Completed",
            RemoteStatus::PartiallyCompleted => "PartiallyCompleted",
            RemoteStatus::Failed => "Failed",
            RemoteStatus::Stopped => "Stopped",
            RemoteStatus::Expired => "Expired",
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "Submitted" => RemoteStatus::Submitted,
            "Validating" => RemoteStatus::Validating,
            "Scheduled" => RemoteStatus::Scheduled,
            "InProgress" => RemoteStatus::InProgress,
            "Stopping" => RemoteStatus::Stopping,
            "Completed" => RemoteStatus::Completed,
            "PartiallyCompleted" => RemoteStatus::PartiallyCompleted,
            "Failed" => RemoteStatus::Failed,
            "Stopped" => RemoteStatus::Stopped,
            "Expired" => RemoteStatus::Expired,
            other => return Err(format!("unknown job status `{other}`")),
        };
        Ok(status)
    }
}

/// Per-record progress counters, when the service reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Result of a single `describe_job` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub status: RemoteStatus,
    /// Where the job writes (or wrote) its output artifacts.
    pub output_location: Option<ObjectLocation>,
    /// Service-provided failure message, if any.
    pub error_summary: Option<String>,
    pub record_counts: Option<RecordCounts>,
}

impl JobDescription {
    pub fn new(status: RemoteStatus) -> Self {
        Self {
            status,
            output_location: None,
            error_summary: None,
            record_counts: None,
        }
    }

    pub fn with_output(mut self, location: ObjectLocation) -> Self {
        self.output_location = Some(location);
        self
    }

    pub fn with_error_summary(mut self, summary: impl Into<String>) -> Self {
        self.error_summary = Some(summary.into());
        self
    }

    pub fn with_counts(mut self, counts: RecordCounts) -> Self {
        self.record_counts = Some(counts);
        self
    }
}

/// Artifacts a finished job left in object storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutputs {
    /// Main output artifacts, in the order they should be read.
    pub outputs: Vec<ObjectLocation>,
    /// Records the service failed before producing an output line.
    pub error_artifact: Option<ObjectLocation>,
    /// Job statistics document.
    pub manifest: Option<ObjectLocation>,
}

/// Everything needed to create one remote batch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJobRequest {
    pub job_name: String,
    pub model_id: String,
    pub role_arn: Option<String>,
    pub input: ObjectLocation,
    pub output_prefix: ObjectLocation,
    pub timeout_hours: u32,
    /// Idempotency token: repeating a create with the same token must not
    /// start a second job.
    pub client_token: String,
    pub tags: BTreeMap<String, String>,
}
