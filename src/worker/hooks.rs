//! Lifecycle hooks run around every job body.
//!
//! [`TaskLifecycleCoordinator`] mirrors job progress into the orchestration
//! API. Remote failures inside a hook are logged and swallowed so a computed
//! job result is never lost; only argument validation and the return-value
//! contract produce hook errors.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{OrchestrationApi, Retval, SessionStatusUpdate};
use crate::error::{JobError, Result};
use crate::model::Status;
use crate::worker::group::{JobGroup, action_type};
use crate::worker::job::{
    JobArgs, JobOutput, USER_REQUEST_GUID, WEBHOOK_REQUEST, WEBHOOK_REQUEST_GUID,
    WIDGET_SESSION_GUID, required_str,
};
use crate::worker::state::JobState;

/// Middleware invoked synchronously by the executor around each job body.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Runs after the job enters `Running` and before its body. May add
    /// arguments; an error fails the job without running the body.
    async fn before_run(&self, job_name: &str, args: &mut JobArgs) -> Result<()>;

    /// Runs once the job reached a terminal state. Errors never change that state.
    async fn after_run(
        &self,
        job_name: &str,
        args: &JobArgs,
        state: JobState,
        output: Option<&JobOutput>,
    ) -> Result<()>;
}

/// Hooks that do nothing; used for workers without a remote API.
pub struct NoopHooks;

#[async_trait]
impl LifecycleHooks for NoopHooks {
    async fn before_run(&self, _job_name: &str, _args: &mut JobArgs) -> Result<()> {
        Ok(())
    }

    async fn after_run(
        &self,
        _job_name: &str,
        _args: &JobArgs,
        _state: JobState,
        _output: Option<&JobOutput>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Synchronizes job lifecycle with user requests, widget sessions and
/// webhook requests on the orchestration API.
pub struct TaskLifecycleCoordinator {
    api: Arc<dyn OrchestrationApi>,
}

impl TaskLifecycleCoordinator {
    pub fn new(api: Arc<dyn OrchestrationApi>) -> Self {
        Self { api }
    }

    async fn mark_user_request(&self, job_name: &str, guid: &str, state: &str) {
        if let Err(e) = self.api.update_user_request(guid, state).await {
            tracing::error!(
                critical = true,
                job = %job_name,
                user_request = %guid,
                state,
                error = %e,
                "Failed to update user request"
            );
        }
    }

    async fn report_application(
        &self,
        job_name: &str,
        args: &JobArgs,
        state: JobState,
        output: Option<&JobOutput>,
    ) -> Result<()> {
        let response = match output {
            Some(JobOutput::Response(response)) => response,
            other => {
                return Err(JobError::ContractViolation {
                    job: job_name.to_string(),
                    reason: format!(
                        "application jobs must return a Response, got {}",
                        other.map_or("nothing", JobOutput::kind)
                    ),
                }
                .into());
            }
        };
        let session_guid = required_str(job_name, args, WIDGET_SESSION_GUID)?;
        let user_request_guid = required_str(job_name, args, USER_REQUEST_GUID)?;
        let remote_state = state.remote_name();

        let update = SessionStatusUpdate {
            widget_session_guid: session_guid.to_string(),
            widget_session: response.session.encode()?,
            state: remote_state.to_string(),
            action_type: action_type(job_name).to_string(),
            retval: Retval {
                status: response.status,
            },
        };
        if let Err(e) = self.api.change_session_status(&update).await {
            tracing::error!(
                critical = true,
                job = %job_name,
                session = %session_guid,
                error = %e,
                "Failed to report session status"
            );
        }

        self.mark_user_request(job_name, user_request_guid, remote_state)
            .await;
        Ok(())
    }
}

#[async_trait]
impl LifecycleHooks for TaskLifecycleCoordinator {
    async fn before_run(&self, job_name: &str, args: &mut JobArgs) -> Result<()> {
        match JobGroup::classify(job_name) {
            JobGroup::Application => {
                required_str(job_name, args, WIDGET_SESSION_GUID)?;
                let guid = required_str(job_name, args, USER_REQUEST_GUID)?.to_string();
                self.mark_user_request(job_name, &guid, JobState::Running.remote_name())
                    .await;
            }
            JobGroup::Webhook => {
                let guid = required_str(job_name, args, WEBHOOK_REQUEST_GUID)?.to_string();
                match self
                    .api
                    .update_webhook_request(&guid, JobState::Running.remote_name())
                    .await
                {
                    Ok(request) => {
                        args.insert(WEBHOOK_REQUEST.to_string(), request);
                    }
                    Err(e) => tracing::error!(
                        critical = true,
                        job = %job_name,
                        webhook_request = %guid,
                        error = %e,
                        "Failed to update webhook request"
                    ),
                }
            }
            JobGroup::PassThrough => {}
        }
        Ok(())
    }

    async fn after_run(
        &self,
        job_name: &str,
        args: &JobArgs,
        state: JobState,
        output: Option<&JobOutput>,
    ) -> Result<()> {
        match JobGroup::classify(job_name) {
            JobGroup::Application => {
                self.report_application(job_name, args, state, output)
                    .await
            }
            JobGroup::Webhook => {
                let guid = required_str(job_name, args, WEBHOOK_REQUEST_GUID)?;
                // Reported as success whatever the job's outcome.
                let reported = Status::Success.to_string();
                if let Err(e) = self.api.update_webhook_request(guid, &reported).await {
                    tracing::error!(
                        critical = true,
                        job = %job_name,
                        webhook_request = %guid,
                        error = %e,
                        "Failed to update webhook request"
                    );
                }
                Ok(())
            }
            JobGroup::PassThrough => Ok(()),
        }
    }
}
