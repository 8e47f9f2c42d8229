use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::codec::RecordError;
use crate::job::JobState;
use crate::request::RequestId;

/// Why a request did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum FailureReason {
    /// The service failed the record.
    Service {
        code: Option<u16>,
        message: String,
    },
    /// The output did not match the requested schema.
    SchemaMismatch { detail: String },
    /// The model output could not be interpreted at all.
    MalformedOutput { detail: String },
    /// The result line could not be decoded.
    DecodeFailure { detail: String },
    /// The job produced output but nothing for this request.
    NoResultReturned,
    /// The result named an id that was never submitted.
    Protocol { detail: String },
    JobFailed,
    JobStopped,
    JobExpired,
}

impl FailureReason {
    /// Stable short name of the reason.
    pub fn tag(&self) -> &'static str {
        match self {
            FailureReason::Service { .. } => "service_error",
            FailureReason::SchemaMismatch { .. } => "schema_mismatch",
            FailureReason::MalformedOutput { .. } => "malformed_output",
            FailureReason::DecodeFailure { .. } => "decode_failure",
            FailureReason::NoResultReturned => "no_result_returned",
            FailureReason::Protocol { .. } => "protocol",
            FailureReason::JobFailed => "job_failed",
            FailureReason::JobStopped => "job_stopped",
            FailureReason::JobExpired => "job_expired",
        }
    }

    /// Reason for requests left without a result by a job in `state`.
    pub(crate) fn for_unanswered(state: JobState) -> Self {
        match state {
            JobState::Stopped => FailureReason::JobStopped,
            JobState::Expired => FailureReason::JobExpired,
            JobState::Completed | JobState::PartiallyCompleted => FailureReason::NoResultReturned,
            _ => FailureReason::JobFailed,
        }
    }
}

impl From<RecordError> for FailureReason {
    fn from(error: RecordError) -> Self {
        FailureReason::Service {
            code: error.code,
            message: error.message,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Service { code: Some(code), message } => write!(f, "service_error {code}: {message}"),
            FailureReason::Service { code: None, message } => write!(f, "service_error: {message}"),
            FailureReason::SchemaMismatch { detail }
            | FailureReason::MalformedOutput { detail }
            | FailureReason::DecodeFailure { detail }
            | FailureReason::Protocol { detail } => write!(f, "{}: {detail}", self.tag()),
            _ => f.write_str(self.tag()),
        }
    }
}

/// # Outcome
///
/// Final classification of one request.
///
/// `Missing` is the starting point of reconciliation only; a finished
/// [`ResultMap`] never holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    /// Resubmitting the request may succeed.
    RecoverableError(FailureReason),
    /// Resubmitting the same request will fail again.
    UnrecoverableError(FailureReason),
    Missing,
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Outcome::RecoverableError(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Outcome::RecoverableError(reason) | Outcome::UnrecoverableError(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Counts of a [`ResultMap`] by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub succeeded: usize,
    pub recoverable: usize,
    pub unrecoverable: usize,
}

/// # ResultMap
///
/// One [`Outcome`] per submitted request id, ordered by id. Its key set is
/// always exactly the submitted id set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultMap<T>(BTreeMap<RequestId, Outcome<T>>);

impl<T> ResultMap<T> {
    pub(crate) fn new(outcomes: BTreeMap<RequestId, Outcome<T>>) -> Self {
        Self(outcomes)
    }

    pub fn get(&self, id: &str) -> Option<&Outcome<T>> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, RequestId, Outcome<T>> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RequestId> {
        self.0.keys()
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for outcome in self.0.values() {
            match outcome {
                Outcome::Success(_) => counts.succeeded += 1,
                Outcome::RecoverableError(_) => counts.recoverable += 1,
                Outcome::UnrecoverableError(_) | Outcome::Missing => counts.unrecoverable += 1,
            }
        }
        counts
    }

    /// Ids whose outcome is worth resubmitting.
    pub fn retryable_ids(&self) -> Vec<&RequestId> {
        self.0
            .iter()
            .filter(|(_, outcome)| outcome.is_recoverable())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&RequestId, &T)> {
        self.0.iter().filter_map(|(id, outcome)| outcome.success().map(|v| (id, v)))
    }

    pub fn into_inner(self) -> BTreeMap<RequestId, Outcome<T>> {
        self.0
    }
}

impl<T> IntoIterator for ResultMap<T> {
    type Item = (RequestId, Outcome<T>);
    type IntoIter = btree_map::IntoIter<RequestId, Outcome<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ResultMap<T> {
    type Item = (&'a RequestId, &'a Outcome<T>);
    type IntoIter = btree_map::Iter<'a, RequestId, Outcome<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
