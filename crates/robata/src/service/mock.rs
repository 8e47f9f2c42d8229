use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use async_trait::async_trait;
use crate::job::JobId;
use super::core_trait::BatchExecutionService;
use super::types::{CreateJobRequest, JobDescription, JobOutputs, RemoteStatus, ServiceError};

#[derive(Default)]
struct State {
    create_failures: VecDeque<ServiceError>,
    created: Vec<CreateJobRequest>,
    tokens: HashMap<String, JobId>,
    describe: VecDeque<Result<JobDescription, ServiceError>>,
    last: Option<JobDescription>,
    outputs: Option<Result<JobOutputs, ServiceError>>,
    describe_calls: usize,
    stopped: Vec<JobId>,
}

/// A [`BatchExecutionService`] that replays a scripted sequence of
/// responses. Once the describe script runs dry the last successful
/// description repeats, or `InProgress` if there never was one.
#[derive(Default)]
pub(crate) struct ScriptedService {
    state: Mutex<State>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(self, error: ServiceError) -> Self {
        self.state.lock().unwrap().create_failures.push_back(error);
        self
    }

    pub fn then_describe(self, response: Result<JobDescription, ServiceError>) -> Self {
        self.state.lock().unwrap().describe.push_back(response);
        self
    }

    pub fn then_status(self, status: RemoteStatus) -> Self {
        self.then_describe(Ok(JobDescription::new(status)))
    }

    pub fn with_outputs(self, outputs: Result<JobOutputs, ServiceError>) -> Self {
        self.state.lock().unwrap().outputs = Some(outputs);
        self
    }

    pub fn created(&self) -> Vec<CreateJobRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn describe_calls(&self) -> usize {
        self.state.lock().unwrap().describe_calls
    }

    pub fn stopped(&self) -> Vec<JobId> {
        self.state.lock().unwrap().stopped.clone()
    }
}

#[async_trait]
impl BatchExecutionService for ScriptedService {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobId, ServiceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.create_failures.pop_front() {
            return Err(err);
        }
        if let Some(existing) = state.tokens.get(&request.client_token) {
            return Ok(existing.clone());
        }
        let job_id = JobId::from(format!("job-{}", state.created.len() + 1));
        state.tokens.insert(request.client_token.clone(), job_id.clone());
        state.created.push(request.clone());
        Ok(job_id)
    }

    async fn describe_job(&self, _job_id: &JobId) -> Result<JobDescription, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.describe_calls += 1;
        match state.describe.pop_front() {
            Some(Ok(description)) => {
                state.last = Some(description.clone());
                Ok(description)
            }
            Some(Err(err)) => Err(err),
            None => Ok(state
                .last
                .clone()
                .unwrap_or_else(|| JobDescription::new(RemoteStatus::InProgress))),
        }
    }

    async fn list_job_outputs(&self, _job_id: &JobId) -> Result<JobOutputs, ServiceError> {
        let state = self.state.lock().unwrap();
        state.outputs.clone().unwrap_or_else(|| Ok(JobOutputs::default()))
    }

    async fn stop_job(&self, job_id: &JobId) -> Result<(), ServiceError> {
        self.state.lock().unwrap().stopped.push(job_id.clone());
        Ok(())
    }
}
