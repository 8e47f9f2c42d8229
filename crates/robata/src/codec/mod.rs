//! # Codec
//!
//! The JSONL artifacts exchanged with the batch service.
//!
//! Submission artifacts hold one `{"recordId", "modelInput"}` object per line.
//! Output and error artifacts echo the `recordId` with either a `modelOutput`
//! or an `error`. Decoding is line-by-line and never fails as a whole.

mod decode;
mod encode;
mod manifest;
mod record;

pub use decode::decode;
pub use encode::{encode, encode_with_limits, partition, ArtifactLimits, SubmissionArtifact};
pub use manifest::{decode_manifest, Manifest};
pub use record::{RawRecord, RawResult, RecordError};
