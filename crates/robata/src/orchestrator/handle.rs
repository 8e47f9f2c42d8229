use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::BatchError;
use crate::job::{BatchJob, JobId};
use crate::request::RequestId;
use crate::service::ObjectLocation;

/// # JobHandle
///
/// Everything needed to pick a submitted batch back up: which remote job to
/// poll and which ids it must answer for.
///
/// A handle is plain data. Save it right after submission and any process,
/// including a restarted one, can resume the batch from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: JobId,
    pub job_name: String,
    /// Submitted ids, in submission order.
    pub request_ids: Vec<RequestId>,
    pub submitted_at: DateTime<Utc>,
    pub input_location: ObjectLocation,
}

impl JobHandle {
    /// A fresh local record of the handle's job. Its state is learned on the
    /// next poll.
    pub fn job(&self) -> BatchJob {
        BatchJob::resumed(self.job_id.clone(), self.submitted_at)
    }

    pub fn to_json(&self) -> Result<String, BatchError> {
        serde_json::to_string_pretty(self).map_err(|e| BatchError::Handle(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        serde_json::from_str(json).map_err(|e| BatchError::Handle(e.to_string()))
    }

    /// Writes the handle to `path`, creating parent directories as needed.
    /// An existing file is replaced.
    pub async fn save(&self, path: &Path) -> Result<(), BatchError> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BatchError::Handle(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| BatchError::Handle(format!("{}: {e}", path.display())))?;
        debug!(job_id = %self.job_id, path = %path.display(), "saved job handle");
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, BatchError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BatchError::Handle(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}
