//! Job abstraction: the unit of work a queue message names.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::OrchestrationApi;
use crate::error::{JobError, Result};
use crate::model::{ControlRegistry, Response, Session, Webhook};

/// Keyword arguments of a queue message.
pub type JobArgs = Map<String, Value>;

pub const WIDGET_SESSION_GUID: &str = "widget_session_guid";
pub const USER_REQUEST_GUID: &str = "user_request_guid";
pub const WEBHOOK_REQUEST_GUID: &str = "webhook_request_guid";
/// Key the pre-run hook injects the fetched webhook request under.
pub const WEBHOOK_REQUEST: &str = "webhook_request";

/// Value returned by a job body.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    /// Session plus status; what every application job must return.
    Response(Response),
    /// Free-form JSON.
    Value(Value),
    /// Nothing.
    Empty,
}

impl JobOutput {
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Short shape name for logs and contract errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Response(_) => "response",
            Self::Value(_) => "value",
            Self::Empty => "empty",
        }
    }
}

impl From<Response> for JobOutput {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Shared, read-only dependencies handed to every job.
#[derive(Clone)]
pub struct JobDeps {
    pub api: Arc<dyn OrchestrationApi>,
    pub controls: Arc<ControlRegistry>,
}

/// Everything a job body sees for one invocation.
pub struct JobContext {
    pub job_name: String,
    pub args: JobArgs,
    deps: JobDeps,
}

impl JobContext {
    pub fn new(job_name: impl Into<String>, args: JobArgs, deps: JobDeps) -> Self {
        Self {
            job_name: job_name.into(),
            args,
            deps,
        }
    }

    pub fn api(&self) -> &dyn OrchestrationApi {
        self.deps.api.as_ref()
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.deps.controls
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    pub fn required_str(&self, key: &str) -> std::result::Result<&str, JobError> {
        required_str(&self.job_name, &self.args, key)
    }

    /// Fetch the widget session named by `widget_session_guid`.
    pub async fn load_session(&self) -> Result<Session> {
        let guid = self.required_str(WIDGET_SESSION_GUID)?;
        Session::load(self.api(), self.controls(), guid).await
    }

    /// Decode the webhook request injected by the pre-run hook.
    pub fn webhook(&self) -> Result<Webhook> {
        let request = self
            .arg(WEBHOOK_REQUEST)
            .ok_or_else(|| JobError::MissingArgument {
                job: self.job_name.clone(),
                key: WEBHOOK_REQUEST.to_string(),
            })?;
        Ok(Webhook::decode(request)?)
    }
}

/// A string argument that must be present.
pub fn required_str<'a>(
    job: &str,
    args: &'a JobArgs,
    key: &str,
) -> std::result::Result<&'a str, JobError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(JobError::MissingArgument {
            job: job.to_string(),
            key: key.to_string(),
        }),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(JobError::InvalidArgument {
            job: job.to_string(),
            key: key.to_string(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}

/// A named unit of work.
#[async_trait]
pub trait Job: Send + Sync {
    /// Dotted job name; its first segment decides the lifecycle group.
    fn name(&self) -> &str;

    /// Execute the job body.
    async fn run(&self, ctx: JobContext) -> Result<JobOutput>;
}
