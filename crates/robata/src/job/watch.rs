use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use crate::error::BatchError;
use crate::service::BatchExecutionService;
use super::clock::Clock;
use super::completion::WatchCompletion;
use super::poller::JobPoller;
use super::state::{BatchJob, JobId};
use super::updates::{JobUpdate, JobUpdates};
use super::worker::{stop_requested, WatchWorker};

/// # JobWatch
///
/// A job polled to completion in the background.
///
/// State changes arrive on [`JobWatch::updates`]; the final job (or the error
/// that ended polling) from [`JobWatch::finish`]. Stopping the watch, either
/// with [`JobWatch::cancel`] or by dropping it, only stops local polling; the
/// remote job keeps running and can be watched again later.
pub struct JobWatch {
    job_id: JobId,
    updates: JobUpdates,
    completion: WatchCompletion,
    worker: WatchWorker,
}

impl JobWatch {
    /// Starts polling `job` on the current tokio runtime.
    pub fn spawn<S, C>(poller: JobPoller<S, C>, job: BatchJob, max_wait: Duration) -> Self
    where
        S: BatchExecutionService + ?Sized + 'static,
        C: Clock + ?Sized + 'static,
    {
        let job_id = job.job_id().clone();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();

        let worker = WatchWorker::new(move |running, notifier| {
            tokio::spawn(async move {
                let mut job = job;
                let mut previous = job.state();
                let on_change = |job: &BatchJob| {
                    let update = JobUpdate {
                        job_id: job.job_id().clone(),
                        from: previous,
                        to: job.state(),
                        observed_at: job.last_polled_at().unwrap_or_else(chrono::Utc::now),
                    };
                    previous = job.state();
                    // the receiver may be gone; polling continues regardless
                    let _ = update_tx.send(update);
                };

                let result = tokio::select! {
                    result = poller.poll_until_terminal_with(&mut job, max_wait, on_change) => Some(result),
                    _ = stop_requested(&running, &notifier) => None,
                };
                match result {
                    Some(result) => {
                        let _ = done_tx.send(result.map(|()| job));
                    }
                    None => debug!(job_id = %job.job_id(), "watch stopped before the job finished"),
                }
            })
        });

        Self {
            job_id,
            updates: JobUpdates::new(update_rx),
            completion: WatchCompletion::new(done_rx),
            worker,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// The stream of state changes. Ends when polling ends.
    pub fn updates(&mut self) -> &mut JobUpdates {
        &mut self.updates
    }

    /// Waits for polling to end.
    ///
    /// Returns the terminal job, the error that ended polling (a `Timeout` or
    /// `ServiceUnavailable` carrying the job id), or `None` if the watch was
    /// stopped first.
    pub async fn finish(mut self) -> Option<Result<BatchJob, BatchError>> {
        (&mut self.completion).await
    }

    /// Stops local polling and waits for the background task to exit.
    pub async fn cancel(mut self) {
        self.worker.stop_and_join().await;
    }
}
