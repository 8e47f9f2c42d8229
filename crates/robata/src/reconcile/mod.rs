//! # Reconcile
//!
//! Turns the raw results of a terminal job into exactly one [`Outcome`] per
//! submitted request. Per-request problems live here as values and are
//! never raised as errors.

mod engine;
mod outcome;
mod parser;

pub use engine::{reconcile, ArtifactKind, Reconciliation, Superseded, Unassignable};
pub use outcome::{FailureReason, Outcome, OutcomeCounts, ResultMap};
pub use parser::{
    ContentBlock,
    ModelOutput,
    OutputParser,
    ParseFailure,
    RawOutput,
    TextOutput,
    ToolOutput,
    Usage,
};
