//! # Robata
//!
//! Orchestration of large LLM inference batches through a managed,
//! asynchronous batch-inference service (Bedrock model-invocation jobs).
//!
//! ## Overview
//!
//! Instead of calling a model once per prompt, a whole set of requests is
//! encoded into one JSONL artifact, staged in object storage and submitted as
//! a single remote job. The job is polled until it reaches a terminal state,
//! its output artifacts are fetched, and every result is matched back to the
//! request that produced it.
//!
//! The central guarantee: every submitted request id ends in exactly one
//! [`Outcome`](reconcile::Outcome), whether its result came back clean,
//! malformed, duplicated, failed, or not at all.
//!
//! ## Architecture
//!
//! ```text
//! requests -> codec::encode -> ObjectStore -> BatchExecutionService
//!                                                   |
//!          ResultMap <- reconcile <- codec::decode <- terminal job
//! ```
//!
//! - [`request`] - requests, model input, output schemas
//! - [`codec`] - submission and result artifacts
//! - [`job`] - the job state machine, poller and background watch
//! - [`service`] - the remote service and object store contracts
//! - [`reconcile`] - outcomes and output parsers
//! - [`orchestrator`] - the [`BatchOrchestrator`] facade, configuration and
//!   resumable [`JobHandle`]s
//!
//! ### Collaborators
//!
//! Cloud SDK calls stay outside this crate. Implement
//! [`BatchExecutionService`] and [`ObjectStore`] for your client; the crate
//! ships a memory and a filesystem object store.
//!
//! ### Resuming
//!
//! Nothing needed to finish a batch lives only in memory. A [`JobHandle`] is
//! plain data: persist it (or let the orchestrator write it to
//! `handle_path`) and call [`BatchOrchestrator::resume`] from any process.
//!
//! ## Features
//!
//! - **schemars** (default) - derive an [`OutputSchema`] from any
//!   `schemars::JsonSchema` type
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and spans; install a subscriber in your
//! application to see them.

pub mod codec;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod reconcile;
pub mod request;
pub mod service;

pub use error::{BatchError, ValidationError};
pub use job::{BatchJob, JobId, JobState, JobWatch, PollPolicy};
pub use orchestrator::{BatchConfig, BatchOrchestrator, BatchOutcome, BatchResults, JobHandle};
pub use reconcile::{Outcome, OutputParser, RawOutput, ResultMap, TextOutput, ToolOutput};
pub use request::{Message, ModelInput, OutputSchema, Request, RequestId};
pub use service::{BatchExecutionService, ObjectLocation, ObjectStore};
