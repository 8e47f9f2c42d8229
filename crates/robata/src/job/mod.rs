//! # Job
//!
//! The lifecycle of one remote batch job: the [`BatchJob`] state machine, the
//! [`JobPoller`] that drives it to a terminal state, and [`JobWatch`] for
//! polling in the background.
//!
//! Polling only suspends inside [`Clock::sleep`], between observations.
//! Dropping a poll future or a watch never touches the remote job.

mod backoff;
mod clock;
mod completion;
mod poller;
mod retry;
mod state;
mod updates;
mod watch;
mod worker;

pub use backoff::{Backoff, Delays};
pub use clock::{Clock, TokioClock};
pub use completion::WatchCompletion;
pub use poller::{JobPoller, PollPolicy};
pub use retry::RetryPolicy;
pub use state::{BatchJob, JobId, JobState, Transition};
pub use updates::{JobUpdate, JobUpdates};
pub use watch::JobWatch;

pub(crate) use retry::with_retries;

#[cfg(test)]
pub(crate) use clock::manual::ManualClock;
