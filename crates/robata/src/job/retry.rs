use std::future::Future;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use crate::error::BatchError;
use crate::service::ServiceError;
use super::backoff::Backoff;
use super::clock::Clock;

/// How many times a transient service failure is retried, and how long to
/// wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::new(Duration::from_secs(1), Duration::from_secs(30)),
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or the attempt budget runs
/// out. A service-provided `retry_after` overrides the backoff delay.
///
/// Errors come back without a job id; callers attach one when they have it.
pub(crate) async fn with_retries<C, T, F, Fut>(
    clock: &C,
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, BatchError>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(source) if !source.is_transient() => {
                return Err(BatchError::Service { job_id: None, source });
            }
            Err(source) if attempt >= max_attempts => {
                return Err(BatchError::ServiceUnavailable {
                    job_id: None,
                    attempts: attempt,
                    source,
                });
            }
            Err(source) => {
                let delay = source
                    .retry_after
                    .unwrap_or_else(|| policy.backoff.delay(attempt - 1));
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %source,
                    "transient service error, retrying"
                );
                clock.sleep(delay).await;
            }
        }
    }
}
