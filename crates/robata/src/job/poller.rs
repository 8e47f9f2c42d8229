use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::error::BatchError;
use crate::service::{BatchExecutionService, JobDescription};
use super::backoff::{secs, Backoff};
use super::clock::Clock;
use super::retry::{with_retries, RetryPolicy};
use super::state::{BatchJob, JobId, Transition};

/// Cadence and budgets of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between consecutive status checks. Grows while the job runs.
    pub interval: Backoff,
    /// Retries for transient failures of a single status check.
    pub retry: RetryPolicy,
    /// Give up waiting (not on the job) after this long.
    #[serde(with = "secs")]
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Backoff::new(Duration::from_secs(30), Duration::from_secs(600)),
            retry: RetryPolicy::default(),
            max_wait: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl PollPolicy {
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_interval(mut self, interval: Backoff) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        self.interval.check()?;
        self.retry.backoff.check()?;
        if self.retry.max_attempts == 0 {
            return Err("retry max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

/// # JobPoller
///
/// Drives a [`BatchJob`] towards a terminal state by observing it through the
/// [`BatchExecutionService`].
///
/// The poller holds no job state of its own: everything lives in the
/// `BatchJob` passed in, so a job rebuilt with [`BatchJob::resumed`] after a
/// restart polls exactly like the original. Polling is read-only on the
/// remote side; abandoning a poll (dropping the future) leaves the remote job
/// running.
pub struct JobPoller<S: ?Sized, C: ?Sized> {
    service: Arc<S>,
    clock: Arc<C>,
    policy: PollPolicy,
}

impl<S: ?Sized, C: ?Sized> Clone for JobPoller<S, C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            clock: self.clock.clone(),
            policy: self.policy,
        }
    }
}

impl<S, C> JobPoller<S, C>
where
    S: BatchExecutionService + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(service: Arc<S>, clock: Arc<C>, policy: PollPolicy) -> Self {
        Self {
            service,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// One `describe_job`, retrying transient failures.
    pub async fn describe(&self, job_id: &JobId) -> Result<JobDescription, BatchError> {
        with_retries(&*self.clock, &self.policy.retry, "describe_job", || {
            self.service.describe_job(job_id)
        })
        .await
        .map_err(|e| e.attach_job(job_id))
    }

    /// Observes the job once and applies the result.
    ///
    /// On any error the job keeps its last known state.
    pub async fn poll_once(&self, job: &mut BatchJob) -> Result<Transition, BatchError> {
        if job.is_terminal() {
            return Ok(Transition::Frozen);
        }
        let description = self.describe(job.job_id()).await?;
        let transition = job
            .observe(&description, self.clock.timestamp())
            .map_err(|detail| BatchError::Protocol {
                job_id: job.job_id().clone(),
                detail,
            })?;

        match transition {
            Transition::Moved { from, to } => {
                info!(job_id = %job.job_id(), %from, %to, remote = %description.status, "job state changed");
            }
            _ => {
                debug!(job_id = %job.job_id(), state = %job.state(), remote = %description.status, "job polled");
            }
        }
        Ok(transition)
    }

    /// Polls until the job is terminal or the policy's `max_wait` elapses.
    pub async fn poll_until_terminal(&self, job: &mut BatchJob) -> Result<(), BatchError> {
        self.poll_until_terminal_with(job, self.policy.max_wait, |_| {}).await
    }

    /// Polls until the job is terminal or `max_wait` elapses, calling
    /// `on_change` after every state change.
    ///
    /// Returns [`BatchError::Timeout`] carrying the job id when the budget
    /// runs out; the job itself is left untouched remotely.
    pub async fn poll_until_terminal_with<F>(
        &self,
        job: &mut BatchJob,
        max_wait: Duration,
        mut on_change: F,
    ) -> Result<(), BatchError>
    where
        F: FnMut(&BatchJob) + Send,
    {
        let started = self.clock.now();
        let mut delays = self.policy.interval.delays();
        loop {
            if let Transition::Moved { .. } = self.poll_once(job).await? {
                on_change(job);
            }
            if job.is_terminal() {
                return Ok(());
            }

            let waited = self.clock.now().duration_since(started);
            if waited >= max_wait {
                info!(job_id = %job.job_id(), waited_s = waited.as_secs(), "gave up waiting for job");
                return Err(BatchError::Timeout {
                    job_id: job.job_id().clone(),
                    state: job.state(),
                    waited,
                });
            }
            let delay = delays
                .next()
                .unwrap_or(self.policy.interval.max)
                .min(max_wait - waited);
            debug!(job_id = %job.job_id(), delay_ms = delay.as_millis() as u64, "waiting before next poll");
            self.clock.sleep(delay).await;
        }
    }
}
