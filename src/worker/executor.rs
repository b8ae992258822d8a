//! Job executor: runs queue messages through the lifecycle hooks.
//!
//! Each invocation goes `Pending -> Running -> Succeeded | Failed`. The
//! pre-run hook runs after the job enters `Running`; the post-run hook runs
//! after the terminal state is fixed, so its errors never change it. Bodies
//! run on their own task, so a panicking body fails only its own job.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{JobError, Result};
use crate::worker::hooks::LifecycleHooks;
use crate::worker::job::{Job, JobArgs, JobContext, JobDeps, JobOutput};
use crate::worker::queue::JobMessage;
use crate::worker::registry::JobRegistry;
use crate::worker::state::{JobRun, JobState};

/// Outcome of one job invocation.
#[derive(Debug)]
pub struct JobReport {
    /// State history of the invocation.
    pub run: JobRun,
    /// What the body returned, or why it (or the pre-run hook) failed.
    pub result: Result<JobOutput>,
    /// Outcome of the post-run hook.
    pub post_run: Result<()>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.run.state == JobState::Succeeded
    }
}

/// Executes jobs from the registry with lifecycle hooks around them.
pub struct JobExecutor {
    jobs: Arc<JobRegistry>,
    hooks: Arc<dyn LifecycleHooks>,
    deps: JobDeps,
    max_parallel: usize,
}

impl JobExecutor {
    pub fn new(
        jobs: Arc<JobRegistry>,
        hooks: Arc<dyn LifecycleHooks>,
        deps: JobDeps,
        max_parallel: usize,
    ) -> Self {
        Self {
            jobs,
            hooks,
            deps,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Run one message to completion.
    ///
    /// Only an unregistered job name is an `Err`; every other failure is
    /// captured in the returned [`JobReport`].
    pub async fn execute(&self, message: JobMessage) -> Result<JobReport> {
        let JobMessage { task, mut kwargs } = message;
        let job = self
            .jobs
            .get(&task)
            .await
            .ok_or_else(|| JobError::UnknownJob { name: task.clone() })?;

        let mut run = JobRun::new(&task);
        advance(&mut run, JobState::Running, None);
        tracing::info!(job = %task, run_id = %run.run_id, "Job started");

        let result = match self.hooks.before_run(&task, &mut kwargs).await {
            Ok(()) => self.run_body(job, &task, kwargs.clone()).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(output) => {
                advance(&mut run, JobState::Succeeded, None);
                tracing::info!(
                    job = %task,
                    run_id = %run.run_id,
                    output = output.kind(),
                    elapsed_ms = elapsed_ms(&run),
                    "Job succeeded"
                );
            }
            Err(e) => {
                advance(&mut run, JobState::Failed, Some(e.to_string()));
                tracing::error!(
                    job = %task,
                    run_id = %run.run_id,
                    error = %e,
                    elapsed_ms = elapsed_ms(&run),
                    "Job failed"
                );
            }
        }

        let post_run = self
            .hooks
            .after_run(&task, &kwargs, run.state, result.as_ref().ok())
            .await;
        if let Err(e) = &post_run {
            tracing::error!(
                critical = true,
                job = %task,
                run_id = %run.run_id,
                error = %e,
                "Post-run hook failed"
            );
        }

        Ok(JobReport {
            run,
            result,
            post_run,
        })
    }

    async fn run_body(&self, job: Arc<dyn Job>, task: &str, args: JobArgs) -> Result<JobOutput> {
        let ctx = JobContext::new(task, args, self.deps.clone());
        match tokio::spawn(async move { job.run(ctx).await }).await {
            Ok(result) => result,
            Err(e) => Err(JobError::Panicked {
                job: task.to_string(),
                reason: join_reason(e),
            }
            .into()),
        }
    }

    /// Consume messages until the channel closes, running at most
    /// `max_parallel` jobs at a time.
    pub async fn run_queue(&self, rx: mpsc::Receiver<JobMessage>) {
        tracing::info!(max_parallel = self.max_parallel, "Job queue consumer started");
        ReceiverStream::new(rx)
            .for_each_concurrent(self.max_parallel, move |message| async move {
                let task = message.task.clone();
                if let Err(e) = self.execute(message).await {
                    tracing::error!(job = %task, error = %e, "Rejected job message");
                }
            })
            .await;
        tracing::info!("Job queue consumer stopped");
    }
}

fn advance(run: &mut JobRun, state: JobState, reason: Option<String>) {
    if let Err(e) = run.transition_to(state, reason) {
        tracing::warn!(job = %run.job_name, error = %e, "Ignoring invalid state transition");
    }
}

fn elapsed_ms(run: &JobRun) -> u128 {
    run.elapsed().map(|d| d.as_millis()).unwrap_or_default()
}

fn join_reason(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
