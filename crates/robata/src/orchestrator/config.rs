//! Orchestrator configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::codec::ArtifactLimits;
use crate::error::BatchError;
use crate::job::PollPolicy;
use crate::service::ObjectLocation;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "ROBATA_";

/// Tag key attached to every created job, valued with the job name.
pub const JOB_TAG: &str = "bedrock_batch_inference";

/// Settings shared by every batch an orchestrator runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Model the batch job invokes.
    pub model_id: String,

    /// Bucket holding submission and result artifacts.
    pub bucket: String,

    /// IAM role the service assumes to read and write the bucket.
    #[serde(default)]
    pub role_arn: Option<String>,

    #[serde(default = "default_input_prefix")]
    pub input_prefix: String,

    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Fixed job name. Generated per batch when unset.
    #[serde(default)]
    pub job_name: Option<String>,

    /// Remote runtime limit of a job, in hours.
    #[serde(default = "default_timeout_hours")]
    pub timeout_hours: u32,

    /// Wait for results in `run_batch`, or return a handle right after submission.
    #[serde(default = "default_blocking")]
    pub blocking: bool,

    #[serde(default)]
    pub poll: PollPolicy,

    #[serde(default)]
    pub limits: ArtifactLimits,

    /// Where to persist the handle of each submitted job.
    #[serde(default)]
    pub handle_path: Option<PathBuf>,

    /// Extra tags for created jobs.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_input_prefix() -> String {
    "input/".to_string()
}

fn default_output_prefix() -> String {
    "output/".to_string()
}

fn default_timeout_hours() -> u32 {
    24
}

fn default_blocking() -> bool {
    true
}

impl BatchConfig {
    pub fn new(model_id: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            bucket: bucket.into(),
            role_arn: None,
            input_prefix: default_input_prefix(),
            output_prefix: default_output_prefix(),
            job_name: None,
            timeout_hours: default_timeout_hours(),
            blocking: default_blocking(),
            poll: PollPolicy::default(),
            limits: ArtifactLimits::default(),
            handle_path: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = Some(job_name.into());
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_limits(mut self, limits: ArtifactLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_handle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.handle_path = Some(path.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Loads a JSON configuration file and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let buf = std::fs::read(path)
            .map_err(|e| BatchError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: BatchConfig = serde_json::from_slice(&buf)
            .map_err(|e| BatchError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.apply_env()
    }

    /// Builds a configuration purely from `ROBATA_*` variables.
    /// `ROBATA_MODEL_ID` and `ROBATA_BUCKET` are required.
    pub fn from_env() -> Result<Self, BatchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn apply_env(self) -> Result<Self, BatchError> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, BatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .ok_or_else(|| BatchError::Config(format!("{ENV_PREFIX}{name} is not set")))
        };
        Self::new(required("MODEL_ID")?, required("BUCKET")?).apply_lookup(&lookup)
    }

    /// Overrides fields from `ROBATA_<FIELD>` variables found through `lookup`.
    fn apply_lookup<F>(mut self, lookup: F) -> Result<Self, BatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("MODEL_ID") {
            self.model_id = v;
        }
        if let Some(v) = var("BUCKET") {
            self.bucket = v;
        }
        if let Some(v) = var("ROLE_ARN") {
            self.role_arn = Some(v);
        }
        if let Some(v) = var("INPUT_PREFIX") {
            self.input_prefix = v;
        }
        if let Some(v) = var("OUTPUT_PREFIX") {
            self.output_prefix = v;
        }
        if let Some(v) = var("JOB_NAME") {
            self.job_name = Some(v);
        }
        if let Some(v) = var("TIMEOUT_HOURS") {
            self.timeout_hours = parse_var("TIMEOUT_HOURS", &v)?;
        }
        if let Some(v) = var("BLOCKING") {
            self.blocking = parse_var("BLOCKING", &v)?;
        }
        if let Some(v) = var("MAX_WAIT_SECS") {
            self.poll.max_wait = Duration::from_secs(parse_var("MAX_WAIT_SECS", &v)?);
        }
        if let Some(v) = var("HANDLE_PATH") {
            self.handle_path = Some(PathBuf::from(v));
        }
        Ok(self)
    }

    /// Rejects unusable settings before anything is submitted.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.model_id.trim().is_empty() {
            return Err(BatchError::Config("model_id must not be empty".to_string()));
        }
        if self.bucket.trim().is_empty() || self.bucket.contains('/') {
            return Err(BatchError::Config(format!("invalid bucket name `{}`", self.bucket)));
        }
        if let Some(arn) = &self.role_arn {
            if !arn.starts_with("arn:aws:iam::") || !arn.contains(":role/") {
                return Err(BatchError::Config(format!("invalid role ARN `{arn}`")));
            }
        }
        if let Some(name) = &self.job_name {
            validate_job_name(name)?;
        }
        if !(24..=168).contains(&self.timeout_hours) {
            return Err(BatchError::Config(format!(
                "timeout_hours must be within 24..=168, got {}",
                self.timeout_hours
            )));
        }
        self.poll.check().map_err(BatchError::Config)?;
        self.limits.check().map_err(BatchError::Config)?;
        Ok(())
    }

    /// The configured job name, or a fresh `batch_inference_xxxxxx`.
    pub fn job_name_or_generate(&self) -> String {
        match &self.job_name {
            Some(name) => name.clone(),
            None => {
                let id = Uuid::new_v4().simple().to_string();
                format!("batch_inference_{}", &id[..6])
            }
        }
    }

    /// Where one submission of `job_name` is staged. `submission` keeps
    /// batches that share a job name from writing the same key.
    pub fn input_location(&self, job_name: &str, submission: &str) -> ObjectLocation {
        ObjectLocation::new(
            &self.bucket,
            format!("{}{job_name}-{submission}.jsonl", dir_prefix(&self.input_prefix)),
        )
    }

    /// Where the service writes job outputs.
    pub fn output_location(&self) -> ObjectLocation {
        ObjectLocation::new(&self.bucket, dir_prefix(&self.output_prefix))
    }

    pub(crate) fn job_tags(&self, job_name: &str) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.entry(JOB_TAG.to_string()).or_insert_with(|| job_name.to_string());
        tags
    }
}

fn dir_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, BatchError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| BatchError::Config(format!("{ENV_PREFIX}{name}=`{value}`: {e}")))
}

/// Bedrock job names: 1 to 63 characters of `[a-zA-Z0-9-_+]`.
fn validate_job_name(name: &str) -> Result<(), BatchError> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'));
    if valid {
        Ok(())
    } else {
        Err(BatchError::Config(format!("invalid job name `{name}`")))
    }
}
