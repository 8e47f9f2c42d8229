//! # Collaborators
//!
//! Contracts for the two external systems a batch depends on: the remote
//! [`BatchExecutionService`] that runs jobs, and the [`ObjectStore`] holding
//! submission and result artifacts. Cloud SDK bindings implement these traits
//! outside this crate.
//!
//! Two object stores ship with the crate:
//!
//! * [`MemoryObjectStore`] - everything in memory, for tests and dry runs
//! * [`LocalObjectStore`] - a directory tree on the local filesystem

mod core_trait;
mod local;
mod location;
mod memory;
mod types;

pub use core_trait::{BatchExecutionService, ObjectStore};
pub use local::LocalObjectStore;
pub use location::ObjectLocation;
pub use memory::MemoryObjectStore;
pub use types::{
    CreateJobRequest,
    JobDescription,
    JobOutputs,
    RecordCounts,
    RemoteStatus,
    ServiceError,
    ServiceErrorKind,
    StoreError,
};

#[cfg(test)]
/// Scripted service double.
pub(crate) mod mock;
