use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::{BatchError, ValidationError};
use crate::request::{validate_batch, Request, RequestId};
use crate::service::ObjectLocation;
use super::record::InputRecord;

/// Size bounds a submission artifact must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLimits {
    pub min_records: usize,
    pub max_records: usize,
    pub max_bytes: usize,
}

impl ArtifactLimits {
    /// Bedrock model-invocation job quotas.
    pub const BEDROCK: ArtifactLimits = ArtifactLimits {
        min_records: 100,
        max_records: 50_000,
        max_bytes: 1024 * 1024 * 1024,
    };

    /// Bedrock's upper bounds without its minimum batch size.
    pub fn new() -> Self {
        Self {
            min_records: 0,
            ..Self::BEDROCK
        }
    }

    pub fn with_min_records(mut self, min_records: usize) -> Self {
        self.min_records = min_records;
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if self.max_records == 0 {
            return Err("max_records must be positive".to_string());
        }
        if self.min_records > self.max_records {
            return Err("min_records exceeds max_records".to_string());
        }
        Ok(())
    }
}

impl Default for ArtifactLimits {
    fn default() -> Self {
        Self::new()
    }
}

/// # SubmissionArtifact
///
/// The encoded JSONL input of one batch job, one record per request in
/// request order.
///
/// Written once: after staging, only [`SubmissionArtifact::location`] changes.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionArtifact {
    bytes: Vec<u8>,
    ids: Vec<RequestId>,
    location: Option<ObjectLocation>,
}

impl SubmissionArtifact {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn ids(&self) -> &[RequestId] {
        &self.ids
    }

    pub fn record_count(&self) -> usize {
        self.ids.len()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Where the artifact was staged, once it has been.
    pub fn location(&self) -> Option<&ObjectLocation> {
        self.location.as_ref()
    }

    pub(crate) fn staged_at(mut self, location: ObjectLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Validates `requests` and encodes them, one JSON object per line.
///
/// Fails with [`BatchError::EmptyBatch`] on an empty slice and with
/// [`BatchError::Validation`] when a request is malformed or an id repeats.
pub fn encode(requests: &[Request]) -> Result<SubmissionArtifact, BatchError> {
    if requests.is_empty() {
        return Err(BatchError::EmptyBatch);
    }
    validate_batch(requests)?;

    let mut bytes = Vec::new();
    let mut ids = Vec::with_capacity(requests.len());
    for request in requests {
        let record = InputRecord {
            record_id: request.id(),
            model_input: request.wire_input(),
        };
        serde_json::to_writer(&mut bytes, &record).map_err(|e| {
            ValidationError::InvalidParameter {
                id: request.id().clone(),
                field: "model_input",
                reason: e.to_string(),
            }
        })?;
        bytes.push(b'\n');
        ids.push(request.id().clone());
    }

    debug!(records = ids.len(), bytes = bytes.len(), "encoded submission artifact");
    Ok(SubmissionArtifact {
        bytes,
        ids,
        location: None,
    })
}

/// [`encode`] plus the record-count and size bounds in `limits`.
pub fn encode_with_limits(
    requests: &[Request],
    limits: &ArtifactLimits,
) -> Result<SubmissionArtifact, BatchError> {
    if requests.len() > limits.max_records {
        return Err(ValidationError::BatchTooLarge {
            max: limits.max_records,
            actual: requests.len(),
        }
        .into());
    }
    if !requests.is_empty() && requests.len() < limits.min_records {
        return Err(ValidationError::BatchTooSmall {
            min: limits.min_records,
            actual: requests.len(),
        }
        .into());
    }

    let artifact = encode(requests)?;
    if artifact.size() > limits.max_bytes {
        return Err(ValidationError::ArtifactTooLarge {
            max: limits.max_bytes,
            actual: artifact.size(),
        }
        .into());
    }
    Ok(artifact)
}

/// Splits `requests` into consecutive chunks of at most `max_records`,
/// preserving order. A `max_records` of zero is treated as one.
pub fn partition(requests: &[Request], max_records: usize) -> Vec<&[Request]> {
    requests.chunks(max_records.max(1)).collect()
}
