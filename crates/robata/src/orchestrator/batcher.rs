use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::codec::{decode, decode_manifest, encode_with_limits, Manifest, RawResult};
use crate::error::BatchError;
use crate::job::{with_retries, BatchJob, Clock, JobPoller, JobWatch, TokioClock};
use crate::reconcile::{reconcile, OutputParser};
use crate::request::Request;
use crate::service::{BatchExecutionService, CreateJobRequest, JobOutputs, ObjectLocation, ObjectStore};
use super::config::BatchConfig;
use super::handle::JobHandle;
use super::results::BatchResults;

/// What [`BatchOrchestrator::run_batch`] returns.
#[derive(Debug)]
pub enum BatchOutcome<T> {
    /// Blocking mode: the job reached a terminal state and was reconciled.
    Finished(BatchResults<T>),
    /// Non-blocking mode: the job was created; resume it from the handle.
    Submitted(JobHandle),
}

impl<T> BatchOutcome<T> {
    pub fn handle(&self) -> Option<&JobHandle> {
        match self {
            BatchOutcome::Submitted(handle) => Some(handle),
            BatchOutcome::Finished(_) => None,
        }
    }

    pub fn into_results(self) -> Option<BatchResults<T>> {
        match self {
            BatchOutcome::Finished(results) => Some(results),
            BatchOutcome::Submitted(_) => None,
        }
    }
}

/// # BatchOrchestrator
///
/// Runs batches of requests through a remote batch-inference service.
///
/// A batch is validated, encoded, staged in the object store and submitted as
/// one remote job; the job is then polled to a terminal state and its
/// artifacts are reconciled into one outcome per request.
///
/// ## Failure model
///
/// Until the job exists a failure leaves nothing behind: validation happens
/// before any remote call and a rejected `create_job` removes the staged
/// artifact. Each submission stages under its own key. When `create_job`
/// stays unavailable through every retry the artifact is kept, since the
/// service may have created the job anyway. Once the job exists it is never stopped or deleted on a local
/// failure, and every error carries its job id so the batch can be resumed
/// with [`BatchOrchestrator::resume`].
///
/// # Example
///
/// ```ignore
/// let orchestrator = BatchOrchestrator::new(service, store, BatchConfig::from_env()?)?;
/// let requests = vec![Request::new("q1", ModelInput::new(vec![Message::user("Hello")]))];
/// match orchestrator.run_batch(&requests, &TextOutput).await? {
///     BatchOutcome::Finished(results) => println!("{:?}", results.counts()),
///     BatchOutcome::Submitted(handle) => println!("submitted {}", handle.job_id),
/// }
/// ```
pub struct BatchOrchestrator<S: ?Sized, O: ?Sized, C: ?Sized = TokioClock> {
    service: Arc<S>,
    store: Arc<O>,
    clock: Arc<C>,
    config: BatchConfig,
}

impl<S, O> BatchOrchestrator<S, O, TokioClock>
where
    S: BatchExecutionService + ?Sized,
    O: ObjectStore + ?Sized,
{
    /// An orchestrator on the real clock. Fails if `config` is invalid.
    pub fn new(service: Arc<S>, store: Arc<O>, config: BatchConfig) -> Result<Self, BatchError> {
        Self::with_clock(service, store, Arc::new(TokioClock), config)
    }
}

impl<S, O, C> BatchOrchestrator<S, O, C>
where
    S: BatchExecutionService + ?Sized,
    O: ObjectStore + ?Sized,
    C: Clock + ?Sized,
{
    pub fn with_clock(
        service: Arc<S>,
        store: Arc<O>,
        clock: Arc<C>,
        config: BatchConfig,
    ) -> Result<Self, BatchError> {
        config.validate()?;
        Ok(Self {
            service,
            store,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn poller(&self) -> JobPoller<S, C> {
        JobPoller::new(self.service.clone(), self.clock.clone(), self.config.poll)
    }

    /// Submits `requests` as one job and, in blocking mode, waits for and
    /// reconciles its results.
    pub async fn run_batch<P>(
        &self,
        requests: &[Request],
        parser: &P,
    ) -> Result<BatchOutcome<P::Output>, BatchError>
    where
        P: OutputParser + ?Sized,
    {
        let handle = self.submit(requests).await?;
        if !self.config.blocking {
            return Ok(BatchOutcome::Submitted(handle));
        }
        self.resume(&handle, parser).await.map(BatchOutcome::Finished)
    }

    /// Validates, encodes and stages `requests`, then creates the remote job.
    ///
    /// When `handle_path` is configured the handle is saved there before
    /// returning.
    #[tracing::instrument(skip_all, fields(requests = requests.len()))]
    pub async fn submit(&self, requests: &[Request]) -> Result<JobHandle, BatchError> {
        let artifact = encode_with_limits(requests, &self.config.limits)?;
        let job_name = self.config.job_name_or_generate();
        let client_token = Uuid::new_v4().simple().to_string();
        let input = self.config.input_location(&job_name, &client_token);

        self.store
            .put(&input, artifact.bytes().to_vec())
            .await
            .map_err(|source| BatchError::Store { job_id: None, source })?;
        let artifact = artifact.staged_at(input.clone());
        debug!(%input, records = artifact.record_count(), "staged submission artifact");

        let request = CreateJobRequest {
            job_name: job_name.clone(),
            model_id: self.config.model_id.clone(),
            role_arn: self.config.role_arn.clone(),
            input: input.clone(),
            output_prefix: self.config.output_location(),
            timeout_hours: self.config.timeout_hours,
            client_token,
            tags: self.config.job_tags(&job_name),
        };
        let created = with_retries(&*self.clock, &self.config.poll.retry, "create_job", || {
            self.service.create_job(&request)
        })
        .await;
        let job_id = match created {
            Ok(job_id) => job_id,
            // the service may have accepted the job before the calls started failing
            Err(err @ BatchError::ServiceUnavailable { .. }) => {
                warn!(
                    %input,
                    client_token = %request.client_token,
                    error = %err,
                    "job creation outcome unknown, keeping staged artifact"
                );
                return Err(err);
            }
            Err(err) => {
                warn!(%input, error = %err, "job creation failed, removing staged artifact");
                if let Err(e) = self.store.delete(&input).await {
                    warn!(%input, error = %e, "could not remove staged artifact");
                }
                return Err(err);
            }
        };

        let mut job = BatchJob::created(job_id, self.clock.timestamp());
        job.mark_submitted();
        info!(job_id = %job.job_id(), %job_name, records = artifact.record_count(), "batch job submitted");

        let handle = JobHandle {
            job_id: job.job_id().clone(),
            job_name,
            request_ids: artifact.ids().to_vec(),
            submitted_at: job.created_at(),
            input_location: input,
        };
        if let Some(path) = &self.config.handle_path {
            // the job exists; the caller still gets the handle
            if let Err(e) = handle.save(path).await {
                warn!(job_id = %handle.job_id, error = %e, "could not persist job handle");
            }
        }
        Ok(handle)
    }

    /// Polls the job behind `handle` to a terminal state and reconciles its
    /// results. Resuming twice yields the same results.
    #[tracing::instrument(skip_all, fields(job_id = %handle.job_id))]
    pub async fn resume<P>(
        &self,
        handle: &JobHandle,
        parser: &P,
    ) -> Result<BatchResults<P::Output>, BatchError>
    where
        P: OutputParser + ?Sized,
    {
        self.collect_results(handle, handle.job(), parser).await
    }

    /// Reconciles the results of `job`, polling it first if it is not
    /// terminal yet. Use with the job a [`JobWatch`] finished with.
    pub async fn collect_results<P>(
        &self,
        handle: &JobHandle,
        mut job: BatchJob,
        parser: &P,
    ) -> Result<BatchResults<P::Output>, BatchError>
    where
        P: OutputParser + ?Sized,
    {
        if !job.is_terminal() {
            self.poller().poll_until_terminal(&mut job).await?;
        }

        let (results, error_results, manifest) = if job.state().has_output() {
            self.fetch_artifacts(&job).await?
        } else {
            info!(job_id = %job.job_id(), state = %job.state(), summary = ?job.error_summary(), "job ended without output");
            (vec![], vec![], None)
        };

        let reconciliation = reconcile(&handle.request_ids, &results, &error_results, job.state(), parser);
        let results = BatchResults::new(job, reconciliation, manifest);
        let counts = results.counts();
        info!(
            job_id = %results.job.job_id(),
            succeeded = counts.succeeded,
            recoverable = counts.recoverable,
            unrecoverable = counts.unrecoverable,
            unassignable = results.unassignable.len(),
            "batch reconciled"
        );
        Ok(results)
    }

    /// Observes the job once.
    pub async fn status(&self, handle: &JobHandle) -> Result<BatchJob, BatchError> {
        let mut job = handle.job();
        self.poller().poll_once(&mut job).await?;
        Ok(job)
    }

    /// Polls the job in the background. Must be called within a tokio runtime.
    pub fn watch(&self, handle: &JobHandle) -> JobWatch
    where
        S: 'static,
        C: 'static,
    {
        JobWatch::spawn(self.poller(), handle.job(), self.config.poll.max_wait)
    }

    /// Asks the service to stop the job. Never called implicitly.
    #[tracing::instrument(skip_all, fields(job_id = %handle.job_id))]
    pub async fn cancel(&self, handle: &JobHandle) -> Result<(), BatchError> {
        with_retries(&*self.clock, &self.config.poll.retry, "stop_job", || {
            self.service.stop_job(&handle.job_id)
        })
        .await
        .map_err(|e| e.attach_job(&handle.job_id))?;
        info!(job_id = %handle.job_id, "stop requested");
        Ok(())
    }

    async fn fetch_artifacts(
        &self,
        job: &BatchJob,
    ) -> Result<(Vec<RawResult>, Vec<RawResult>, Option<Manifest>), BatchError> {
        let job_id = job.job_id();
        let outputs: JobOutputs = with_retries(&*self.clock, &self.config.poll.retry, "list_job_outputs", || {
            self.service.list_job_outputs(job_id)
        })
        .await
        .map_err(|e| e.attach_job(job_id))?;
        if outputs.outputs.is_empty() {
            warn!(%job_id, "job reported output but listed no output artifacts");
        }

        // line numbers continue from one output artifact to the next
        let mut results = Vec::new();
        let mut offset = 0;
        for location in &outputs.outputs {
            let bytes = self.fetch(job, location).await?;
            results.extend(decode(&bytes).into_iter().map(|r| {
                let line = r.line + offset;
                r.at_line(line)
            }));
            offset += bytes.split(|b| *b == b'\n').count();
        }

        let mut error_results = Vec::new();
        if let Some(location) = &outputs.error_artifact {
            match self.store.get(location).await {
                Ok(bytes) => error_results = decode(&bytes),
                Err(e) if e.is_not_found() => debug!(%location, "no error artifact"),
                Err(source) => return Err(BatchError::Store { job_id: Some(job_id.clone()), source }),
            }
        }

        let manifest = match &outputs.manifest {
            Some(location) => match self.store.get(location).await.map(|b| decode_manifest(&b)) {
                Ok(Ok(manifest)) => Some(manifest),
                Ok(Err(e)) => {
                    warn!(%location, error = %e, "unreadable manifest");
                    None
                }
                Err(e) => {
                    warn!(%location, error = %e, "manifest not fetched");
                    None
                }
            },
            None => None,
        };
        Ok((results, error_results, manifest))
    }

    async fn fetch(&self, job: &BatchJob, location: &ObjectLocation) -> Result<Vec<u8>, BatchError> {
        self.store
            .get(location)
            .await
            .map_err(|source| BatchError::Store {
                job_id: Some(job.job_id().clone()),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::tempdir;
    use crate::job::{Backoff, JobId, JobState, ManualClock, PollPolicy, RetryPolicy};
    use crate::reconcile::{ArtifactKind, FailureReason, Outcome, Superseded, TextOutput, ToolOutput};
    use crate::request::{Message, ModelInput, OutputSchema, RequestId};
    use crate::service::mock::ScriptedService;
    use crate::service::{JobDescription, MemoryObjectStore, RemoteStatus, ServiceError};
    use crate::orchestrator::JOB_TAG;

    const OUTPUT_DIR: &str = "output/job-1/";

    fn config() -> BatchConfig {
        BatchConfig::new("anthropic.claude-3-haiku", "bucket")
            .with_role_arn("arn:aws:iam::123456789012:role/BatchRole")
            .with_job_name("test-job")
            .with_poll(
                PollPolicy::default()
                    .with_interval(Backoff::new(Duration::from_secs(30), Duration::from_secs(300)).with_jitter(0.0))
                    .with_retry(RetryPolicy {
                        max_attempts: 3,
                        backoff: Backoff::new(Duration::from_secs(1), Duration::from_secs(4)).with_jitter(0.0),
                    })
                    .with_max_wait(Duration::from_secs(3600)),
            )
    }

    fn requests(ids: &[&str]) -> Vec<Request> {
        ids.iter()
            .map(|id| Request::new(*id, ModelInput::new(vec![Message::user(format!("question {id}"))])))
            .collect()
    }

    fn completed() -> JobDescription {
        JobDescription::new(RemoteStatus::Completed).with_output(ObjectLocation::new("bucket", OUTPUT_DIR))
    }

    fn outputs() -> JobOutputs {
        let dir = ObjectLocation::new("bucket", OUTPUT_DIR);
        JobOutputs {
            outputs: vec![dir.join("test-job.jsonl.out")],
            error_artifact: Some(dir.join("errors.jsonl.out")),
            manifest: Some(dir.join("manifest.json.out")),
        }
    }

    fn text_line(id: &str, text: &str) -> String {
        json!({
            "recordId": id,
            "modelOutput": {"stop_reason": "end_turn", "content": [{"type": "text", "text": text}]}
        })
        .to_string()
    }

    async fn store_with_outputs(lines: &[String]) -> Arc<MemoryObjectStore> {
        let store = Arc::new(MemoryObjectStore::new());
        let out = outputs();
        store.put(&out.outputs[0], lines.join("\n").into_bytes()).await.unwrap();
        store
            .put(
                out.manifest.as_ref().unwrap(),
                br#"{"totalRecordCount":3,"processedRecordCount":3,"successRecordCount":1,"errorRecordCount":1}"#.to_vec(),
            )
            .await
            .unwrap();
        store
    }

    fn orchestrator(
        service: Arc<ScriptedService>,
        store: Arc<MemoryObjectStore>,
        config: BatchConfig,
    ) -> BatchOrchestrator<ScriptedService, MemoryObjectStore, ManualClock> {
        BatchOrchestrator::with_clock(service, store, Arc::new(ManualClock::new()), config).unwrap()
    }

    #[tokio::test]
    async fn test_blocking_run_reconciles_every_request() {
        let service = Arc::new(
            ScriptedService::new()
                .then_status(RemoteStatus::Validating)
                .then_status(RemoteStatus::InProgress)
                .then_describe(Ok(completed()))
                .with_outputs(Ok(outputs())),
        );
        let store = store_with_outputs(&[
            text_line("a", "answer a"),
            json!({"recordId": "b", "error": {"errorCode": 429, "errorMessage": "throttled"}}).to_string(),
        ])
        .await;
        let orchestrator = orchestrator(service.clone(), store.clone(), config());

        let requests = requests(&["a", "b", "c"]);
        let results = orchestrator
            .run_batch(&requests, &TextOutput)
            .await
            .unwrap()
            .into_results()
            .unwrap();

        assert_eq!(results.job.state(), JobState::Completed);
        assert_eq!(results.get("a"), Some(&Outcome::Success("answer a".to_string())));
        assert!(results.get("b").unwrap().is_recoverable());
        assert_eq!(results.get("c"), Some(&Outcome::UnrecoverableError(FailureReason::NoResultReturned)));
        assert_eq!(results.manifest.as_ref().map(|m| m.total_record_count), Some(3));
        assert_eq!(results.retry_requests(&requests).len(), 1);

        let created = service.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].job_name, "test-job");
        assert!(created[0].input.key.starts_with("input/test-job-"));
        assert!(created[0].input.key.ends_with(".jsonl"));
        assert!(created[0].input.key.contains(created[0].client_token.as_str()));
        assert_eq!(created[0].output_prefix.to_string(), "s3://bucket/output/");
        assert!(!created[0].client_token.is_empty());
        assert_eq!(created[0].tags.get(JOB_TAG).map(String::as_str), Some("test-job"));

        let staged = store.get(&created[0].input).await.unwrap();
        assert_eq!(decode(&staged).len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_batch_makes_no_remote_call() {
        let service = Arc::new(ScriptedService::new());
        let store = Arc::new(MemoryObjectStore::new());
        let orchestrator = orchestrator(service.clone(), store.clone(), config());

        let err = orchestrator.run_batch(&requests(&["a", "a"]), &TextOutput).await.unwrap_err();
        assert!(matches!(err, BatchError::Validation(_)));
        assert!(orchestrator.run_batch(&[], &TextOutput).await.is_err());
        assert!(store.is_empty().await);
        assert!(service.created().is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_removes_staged_artifact() {
        let service = Arc::new(ScriptedService::new().fail_create(ServiceError::permanent("AccessDenied")));
        let store = Arc::new(MemoryObjectStore::new());
        let orchestrator = orchestrator(service.clone(), store.clone(), config());

        let err = orchestrator.submit(&requests(&["a"])).await.unwrap_err();
        assert!(matches!(err, BatchError::Service { job_id: None, .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_transient_create_failure_is_retried() {
        let service = Arc::new(
            ScriptedService::new()
                .fail_create(ServiceError::transient("ThrottlingException"))
                .fail_create(ServiceError::transient("ThrottlingException")),
        );
        let store = Arc::new(MemoryObjectStore::new());
        let orchestrator = orchestrator(service.clone(), store.clone(), config());

        let handle = orchestrator.submit(&requests(&["a"])).await.unwrap();
        assert_eq!(handle.job_id, JobId::from("job-1"));
        assert_eq!(service.created().len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_exhausted_create_retries_keep_staged_artifact() {
        let service = Arc::new(
            ScriptedService::new()
                .fail_create(ServiceError::transient("RequestTimeout"))
                .fail_create(ServiceError::transient("RequestTimeout"))
                .fail_create(ServiceError::transient("RequestTimeout")),
        );
        let store = Arc::new(MemoryObjectStore::new());
        let orchestrator = orchestrator(service.clone(), store.clone(), config());

        let err = orchestrator.submit(&requests(&["a"])).await.unwrap_err();
        assert!(matches!(err, BatchError::ServiceUnavailable { job_id: None, attempts: 3, .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_shared_job_name_keeps_earlier_input() {
        let store = Arc::new(MemoryObjectStore::new());
        let first = orchestrator(Arc::new(ScriptedService::new()), store.clone(), config());
        let handle = first.submit(&requests(&["a"])).await.unwrap();

        let rejecting = Arc::new(ScriptedService::new().fail_create(ServiceError::permanent("ConflictException")));
        let second = orchestrator(rejecting, store.clone(), config());
        let err = second.submit(&requests(&["z"])).await.unwrap_err();
        assert!(matches!(err, BatchError::Service { job_id: None, .. }));

        let staged = store.get(&handle.input_location).await.unwrap();
        assert_eq!(decode(&staged)[0].request_id, Some(RequestId::from("a")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_line_numbers_run_across_output_artifacts() {
        let dir = ObjectLocation::new("bucket", OUTPUT_DIR);
        let parts = vec![dir.join("part-1.jsonl.out"), dir.join("part-2.jsonl.out")];
        let service = Arc::new(ScriptedService::new().then_describe(Ok(completed())).with_outputs(Ok(JobOutputs {
            outputs: parts.clone(),
            error_artifact: None,
            manifest: None,
        })));
        let store = Arc::new(MemoryObjectStore::new());
        store.put(&parts[0], text_line("a", "first").into_bytes()).await.unwrap();
        store.put(&parts[1], text_line("a", "second").into_bytes()).await.unwrap();
        let orchestrator = orchestrator(service, store, config());

        let results = orchestrator.run_batch(&requests(&["a"]), &TextOutput).await.unwrap().into_results().unwrap();
        assert_eq!(results.get("a"), Some(&Outcome::Success("second".to_string())));
        assert_eq!(
            results.superseded,
            vec![Superseded { request_id: RequestId::from("a"), artifact: ArtifactKind::Output, line: 1, by_line: 2 }]
        );
    }

    #[tokio::test]
    async fn test_non_blocking_handle_resumes_elsewhere() {
        let dir = tempdir().unwrap();
        let handle_path = dir.path().join("job.json");
        let service = Arc::new(
            ScriptedService::new()
                .then_status(RemoteStatus::InProgress)
                .then_describe(Ok(completed()))
                .with_outputs(Ok(outputs())),
        );
        let store = store_with_outputs(&[text_line("a", "A"), text_line("b", "B")]).await;

        let submitter = orchestrator(
            service.clone(),
            store.clone(),
            config().with_blocking(false).with_handle_path(&handle_path),
        );
        let outcome = submitter.run_batch(&requests(&["a", "b"]), &TextOutput).await.unwrap();
        let handle = outcome.handle().cloned().unwrap();
        assert_eq!(service.describe_calls(), 0);

        // a different process picks the batch up from disk
        let loaded = JobHandle::load(&handle_path).await.unwrap();
        assert_eq!(loaded, handle);
        let resumer = orchestrator(service.clone(), store.clone(), config());
        let first = resumer.resume(&loaded, &TextOutput).await.unwrap();
        let second = resumer.resume(&loaded, &TextOutput).await.unwrap();

        assert_eq!(first.counts().succeeded, 2);
        assert_eq!(first.outcomes, second.outcomes);
    }

    #[tokio::test]
    async fn test_timeout_keeps_job_alive_and_is_resumable() {
        let service = Arc::new(ScriptedService::new().then_status(RemoteStatus::InProgress));
        let store = Arc::new(MemoryObjectStore::new());
        let orchestrator = orchestrator(service.clone(), store, config());

        let err = orchestrator.run_batch(&requests(&["a"]), &TextOutput).await.unwrap_err();
        assert!(err.is_resumable());
        assert_eq!(err.job_id(), Some(&JobId::from("job-1")));
        assert!(service.stopped().is_empty());
    }

    #[tokio::test]
    async fn test_failed_job_fails_every_request() {
        let service = Arc::new(
            ScriptedService::new()
                .then_describe(Ok(JobDescription::new(RemoteStatus::Failed).with_error_summary("bad role"))),
        );
        let store = Arc::new(MemoryObjectStore::new());
        let orchestrator = orchestrator(service, store, config());

        let results = orchestrator
            .run_batch(&requests(&["a", "b"]), &TextOutput)
            .await
            .unwrap()
            .into_results()
            .unwrap();
        assert_eq!(results.job.error_summary(), Some("bad role"));
        assert_eq!(results.counts().unrecoverable, 2);
        assert!(results.outcomes.iter().all(|(_, o)| o == &Outcome::UnrecoverableError(FailureReason::JobFailed)));
    }

    #[tokio::test]
    async fn test_error_artifact_fills_missing_results() {
        let service = Arc::new(
            ScriptedService::new()
                .then_describe(Ok(JobDescription::new(RemoteStatus::PartiallyCompleted)
                    .with_output(ObjectLocation::new("bucket", OUTPUT_DIR))))
                .with_outputs(Ok(outputs())),
        );
        let store = store_with_outputs(&[text_line("a", "A")]).await;
        store
            .put(
                outputs().error_artifact.as_ref().unwrap(),
                json!({"recordId": "b", "error": {"errorCode": 400, "errorMessage": "prompt too long"}})
                    .to_string()
                    .into_bytes(),
            )
            .await
            .unwrap();
        let orchestrator = orchestrator(service, store, config());

        let results = orchestrator.run_batch(&requests(&["a", "b"]), &TextOutput).await.unwrap().into_results().unwrap();
        assert_eq!(results.job.state(), JobState::PartiallyCompleted);
        assert_eq!(
            results.get("b").and_then(Outcome::failure).map(FailureReason::tag),
            Some("service_error")
        );
    }

    #[tokio::test]
    async fn test_missing_output_artifact_is_store_error_with_job_id() {
        let service = Arc::new(
            ScriptedService::new()
                .then_describe(Ok(completed()))
                .with_outputs(Ok(outputs())),
        );
        let store = Arc::new(MemoryObjectStore::new());
        let orchestrator = orchestrator(service, store, config());

        let err = orchestrator.run_batch(&requests(&["a"]), &TextOutput).await.unwrap_err();
        assert!(matches!(err, BatchError::Store { job_id: Some(_), .. }));
        assert!(err.is_resumable());
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Verdict {
        approved: bool,
    }

    #[tokio::test]
    async fn test_structured_outputs() {
        let schema = Arc::new(OutputSchema::new(
            "Verdict",
            "",
            json!({"type": "object", "properties": {"approved": {"type": "boolean"}}, "required": ["approved"]}),
        ));
        let requests = vec![Request::structured(
            "v1",
            ModelInput::new(vec![Message::user("approve?")]),
            schema.clone(),
        )];
        let line = json!({
            "recordId": "v1",
            "modelOutput": {
                "stop_reason": "tool_use",
                "content": [{"type": "tool_use", "id": "t", "name": "Verdict", "input": {"approved": true}}]
            }
        })
        .to_string();
        let service = Arc::new(ScriptedService::new().then_describe(Ok(completed())).with_outputs(Ok(outputs())));
        let store = store_with_outputs(&[line]).await;
        let orchestrator = orchestrator(service, store, config());

        let parser = ToolOutput::<Verdict>::for_schema(&schema);
        let results = orchestrator.run_batch(&requests, &parser).await.unwrap().into_results().unwrap();
        assert_eq!(results.get("v1").and_then(Outcome::success), Some(&Verdict { approved: true }));
    }

    #[tokio::test]
    async fn test_status_and_cancel() {
        let service = Arc::new(ScriptedService::new().then_status(RemoteStatus::Scheduled));
        let store = Arc::new(MemoryObjectStore::new());
        let orchestrator = orchestrator(service.clone(), store, config().with_blocking(false));

        let handle = orchestrator.submit(&requests(&["a"])).await.unwrap();
        let job = orchestrator.status(&handle).await.unwrap();
        assert_eq!(job.state(), JobState::InProgress);
        assert_eq!(service.describe_calls(), 1);
        assert!(service.stopped().is_empty());

        orchestrator.cancel(&handle).await.unwrap();
        assert_eq!(service.stopped(), vec![handle.job_id.clone()]);
    }

    #[tokio::test]
    async fn test_watch_then_collect() {
        let service = Arc::new(
            ScriptedService::new()
                .then_status(RemoteStatus::InProgress)
                .then_describe(Ok(completed()))
                .with_outputs(Ok(outputs())),
        );
        let store = store_with_outputs(&[text_line("a", "A")]).await;
        let orchestrator = orchestrator(service, store, config().with_blocking(false));

        let handle = orchestrator.submit(&requests(&["a"])).await.unwrap();
        let watch = orchestrator.watch(&handle);
        let job = watch.finish().await.unwrap().unwrap();
        assert!(job.is_terminal());

        let results = orchestrator.collect_results(&handle, job, &TextOutput).await.unwrap();
        assert!(results.get("a").unwrap().is_success());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = BatchOrchestrator::new(
            Arc::new(ScriptedService::new()),
            Arc::new(MemoryObjectStore::new()),
            BatchConfig::new("m", "").with_role_arn("arn:aws:iam::1:role/r"),
        );
        assert!(matches!(result, Err(BatchError::Config(_))));
    }
}
