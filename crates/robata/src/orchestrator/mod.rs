//! # Orchestrator
//!
//! [`BatchOrchestrator`] ties the pieces together: requests in, one outcome
//! per request out, with a [`JobHandle`] to resume from in between.

mod batcher;
mod config;
mod handle;
mod results;

pub use batcher::{BatchOrchestrator, BatchOutcome};
pub use config::{BatchConfig, ENV_PREFIX, JOB_TAG};
pub use handle::JobHandle;
pub use results::BatchResults;
