//! # Requests
//!
//! The typed representation of what a caller wants inferred: a [`Request`]
//! pairs a caller-chosen [`RequestId`] with a Bedrock-shaped [`ModelInput`]
//! and, for structured output, an [`OutputSchema`].

mod item;
mod model_input;
mod schema;

pub use item::{validate_batch, Request, RequestId};
pub use model_input::{
    Message,
    ModelInput,
    Role,
    Tool,
    ToolChoice,
    ToolChoiceKind,
    DEFAULT_ANTHROPIC_VERSION,
    DEFAULT_MAX_TOKENS,
};
pub use schema::{OutputSchema, DEFAULT_SCHEMA_DESCRIPTION};
