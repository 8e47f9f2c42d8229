use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::service::{JobDescription, ObjectLocation, RecordCounts, RemoteStatus};

/// Identifier the remote service assigned to a batch job (a Bedrock job ARN).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing segment of an ARN-style id, which the service uses as the
    /// job's output directory name.
    pub fn unique_suffix(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle state of a [`BatchJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Created,
    InProgress,
    Completed,
    PartiallyCompleted,
    Failed,
    Stopped,
    Expired,
}

impl JobState {
    /// No transition ever leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Created | JobState::InProgress)
    }

    /// Terminal states that come with an output artifact.
    pub fn has_output(&self) -> bool {
        matches!(self, JobState::Completed | JobState::PartiallyCompleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::InProgress => "in_progress",
            JobState::Completed => "completed",
            JobState::PartiallyCompleted => "partially_completed",
            JobState::Failed => "failed",
            JobState::Stopped => "stopped",
            JobState::Expired => "expired",
        }
    }

    /// Folds a remote status, plus its record counts when known, into a
    /// local state.
    ///
    /// A `Completed` report whose counts show failed records is partial, and
    /// one where nothing succeeded is a failure.
    pub fn from_remote(status: RemoteStatus, counts: Option<&RecordCounts>) -> Self {
        match status {
            RemoteStatus::Submitted
            | RemoteStatus::Validating
            | RemoteStatus::Scheduled
            | RemoteStatus::InProgress
            | RemoteStatus::Stopping => JobState::InProgress,
            RemoteStatus::Completed => match counts {
                Some(c) if c.total > 0 && c.succeeded == 0 => JobState::Failed,
                Some(c) if c.failed > 0 => JobState::PartiallyCompleted,
                _ => JobState::Completed,
            },
            RemoteStatus::PartiallyCompleted => match counts {
                Some(c) if c.total > 0 && c.succeeded == 0 => JobState::Failed,
                _ => JobState::PartiallyCompleted,
            },
            RemoteStatus::Failed => JobState::Failed,
            RemoteStatus::Stopped => JobState::Stopped,
            RemoteStatus::Expired => JobState::Expired,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an observation did to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state did not change.
    Unchanged,
    /// The job moved from one state to another.
    Moved { from: JobState, to: JobState },
    /// The job was already terminal, the observation was ignored.
    Frozen,
}

/// # BatchJob
///
/// Local record of one remote batch job.
///
/// Only the job state machine mutates it, one observation at a time. Once a
/// terminal state is reached the record is frozen. The output location is
/// recorded exactly when the job finishes in a state that has output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    job_id: JobId,
    state: JobState,
    output_location: Option<ObjectLocation>,
    error_summary: Option<String>,
    record_counts: Option<RecordCounts>,
    created_at: DateTime<Utc>,
    last_polled_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    /// A job the service has just accepted.
    pub fn created(job_id: JobId, created_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            state: JobState::Created,
            output_location: None,
            error_summary: None,
            record_counts: None,
            created_at,
            last_polled_at: None,
        }
    }

    /// Rebuilds a job from nothing but its id, for resuming after a restart.
    /// Its real state is learned from the next observation.
    pub fn resumed(job_id: JobId, submitted_at: DateTime<Utc>) -> Self {
        Self {
            state: JobState::InProgress,
            ..Self::created(job_id, submitted_at)
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn output_location(&self) -> Option<&ObjectLocation> {
        self.output_location.as_ref()
    }

    pub fn error_summary(&self) -> Option<&str> {
        self.error_summary.as_deref()
    }

    pub fn record_counts(&self) -> Option<&RecordCounts> {
        self.record_counts.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_polled_at(&self) -> Option<DateTime<Utc>> {
        self.last_polled_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// `Created -> InProgress` once submission succeeded.
    pub(crate) fn mark_submitted(&mut self) -> Transition {
        if self.state != JobState::Created {
            return Transition::Unchanged;
        }
        self.state = JobState::InProgress;
        Transition::Moved {
            from: JobState::Created,
            to: JobState::InProgress,
        }
    }

    /// Applies one `describe_job` result.
    ///
    /// Returns an error, leaving the job untouched, when the service claims
    /// output exists but gives no location for it.
    pub(crate) fn observe(
        &mut self,
        description: &JobDescription,
        at: DateTime<Utc>,
    ) -> Result<Transition, String> {
        if self.state.is_terminal() {
            return Ok(Transition::Frozen);
        }
        let next = JobState::from_remote(description.status, description.record_counts.as_ref());
        if next.has_output() && description.output_location.is_none() {
            return Err(format!(
                "service reported {} without an output location",
                description.status
            ));
        }

        self.last_polled_at = Some(at);
        if description.record_counts.is_some() {
            self.record_counts = description.record_counts;
        }
        if description.error_summary.is_some() {
            self.error_summary = description.error_summary.clone();
        }

        let from = self.state;
        if next == from {
            return Ok(Transition::Unchanged);
        }
        self.state = next;
        if next.has_output() {
            self.output_location = description.output_location.clone();
        }
        Ok(Transition::Moved { from, to: next })
    }
}
