//! # Errors
//!
//! Whole-batch failures. Anything that only affects a single request is never
//! raised through these types; it is folded into the
//! [`ResultMap`](crate::reconcile::ResultMap) as an
//! [`Outcome`](crate::reconcile::Outcome) instead.

use std::time::Duration;
use thiserror::Error;
use crate::job::{JobId, JobState};
use crate::request::RequestId;
use crate::service::{ServiceError, StoreError};

/// Reasons a batch of requests is rejected before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request id must not be empty")]
    EmptyId,

    #[error("request id `{0}` appears more than once in the batch")]
    DuplicateId(RequestId),

    #[error("request `{0}` has no messages")]
    NoMessages(RequestId),

    #[error("request `{id}` has an invalid `{field}`: {reason}")]
    InvalidParameter {
        id: RequestId,
        field: &'static str,
        reason: String,
    },

    #[error("request `{id}` has an invalid output schema: {reason}")]
    Schema {
        id: RequestId,
        reason: String,
    },

    #[error("batch holds {actual} requests, the minimum is {min}")]
    BatchTooSmall { min: usize, actual: usize },

    #[error("batch holds {actual} requests, the maximum is {max}")]
    BatchTooLarge { max: usize, actual: usize },

    #[error("submission artifact is {actual} bytes, the maximum is {max}")]
    ArtifactTooLarge { max: usize, actual: usize },
}

/// Failures that affect an entire batch operation.
///
/// Errors raised after the remote job exists always carry its [`JobId`] so the
/// caller can resume polling instead of resubmitting.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Bad input shape, raised before any remote call.
    #[error("invalid batch: {0}")]
    Validation(#[from] ValidationError),

    /// Nothing to submit.
    #[error("cannot submit an empty batch")]
    EmptyBatch,

    /// Transient service errors persisted past the retry budget.
    #[error("batch service unavailable after {attempts} attempts{}: {source}", job_suffix(.job_id))]
    ServiceUnavailable {
        job_id: Option<JobId>,
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    /// The service rejected a call outright.
    #[error("batch service error{}: {source}", job_suffix(.job_id))]
    Service {
        job_id: Option<JobId>,
        #[source]
        source: ServiceError,
    },

    /// The wait budget ran out before the job reached a terminal state.
    #[error("job {job_id} still {state} after waiting {waited:?}")]
    Timeout {
        job_id: JobId,
        state: JobState,
        waited: Duration,
    },

    /// An object store call failed.
    #[error("object store error{}: {source}", job_suffix(.job_id))]
    Store {
        job_id: Option<JobId>,
        #[source]
        source: StoreError,
    },

    /// The service reported something that contradicts the job contract.
    #[error("protocol violation on job {job_id}: {detail}")]
    Protocol { job_id: JobId, detail: String },

    /// Reading or writing a persisted job handle failed.
    #[error("job handle persistence failed: {0}")]
    Handle(String),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

fn job_suffix(job_id: &Option<JobId>) -> String {
    match job_id {
        Some(id) => format!(" (job {id})"),
        None => String::new(),
    }
}

impl BatchError {
    /// The remote job this error belongs to, if one had been created.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            BatchError::ServiceUnavailable { job_id, .. }
            | BatchError::Service { job_id, .. }
            | BatchError::Store { job_id, .. } => job_id.as_ref(),
            BatchError::Timeout { job_id, .. } | BatchError::Protocol { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// `true` when the remote job exists and polling it again may succeed.
    pub fn is_resumable(&self) -> bool {
        match self {
            BatchError::Timeout { .. } => true,
            BatchError::ServiceUnavailable { job_id, .. } | BatchError::Store { job_id, .. } => {
                job_id.is_some()
            }
            _ => false,
        }
    }

    pub(crate) fn attach_job(self, id: &JobId) -> Self {
        match self {
            BatchError::ServiceUnavailable { job_id: None, attempts, source } => {
                BatchError::ServiceUnavailable { job_id: Some(id.clone()), attempts, source }
            }
            BatchError::Service { job_id: None, source } => {
                BatchError::Service { job_id: Some(id.clone()), source }
            }
            BatchError::Store { job_id: None, source } => {
                BatchError::Store { job_id: Some(id.clone()), source }
            }
            other => other,
        }
    }
}
