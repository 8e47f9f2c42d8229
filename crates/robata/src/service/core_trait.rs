use async_trait::async_trait;
use crate::job::JobId;
use super::location::ObjectLocation;
use super::types::{CreateJobRequest, JobDescription, JobOutputs, ServiceError, StoreError};

/// # BatchExecutionService
///
/// The remote, asynchronous batch-inference service (Bedrock
/// model-invocation jobs in production).
///
/// Implementations wrap a cloud SDK client and translate its failures into
/// [`ServiceError`]s, marking throttling and network failures as transient so
/// the poller retries them.
///
/// ## Concurrency
///
/// The service is shared and externally synchronized. `describe_job` and
/// `list_job_outputs` must be read-only, so any number of pollers may watch
/// the same job at once.
#[async_trait]
pub trait BatchExecutionService: Send + Sync {
    /// Starts a job reading `request.input`. Creating twice with the same
    /// `client_token` must return the same job.
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobId, ServiceError>;

    /// Reports the job's current status.
    async fn describe_job(&self, job_id: &JobId) -> Result<JobDescription, ServiceError>;

    /// Lists the artifacts a finished job produced.
    async fn list_job_outputs(&self, job_id: &JobId) -> Result<JobOutputs, ServiceError>;

    /// Asks the service to stop the job. Only ever called on explicit request.
    async fn stop_job(&self, job_id: &JobId) -> Result<(), ServiceError>;
}

/// # ObjectStore
///
/// Blob storage used to stage submission artifacts and fetch results.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, location: &ObjectLocation, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when nothing is stored at `location`.
    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>, StoreError>;

    /// Removes the object. Deleting a missing object is not an error.
    async fn delete(&self, location: &ObjectLocation) -> Result<(), StoreError>;
}
