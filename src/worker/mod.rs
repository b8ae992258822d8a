//! Worker system: job execution with lifecycle synchronization.
//!
//! Core components:
//! - `job`: Job trait, per-invocation context and outputs
//! - `group`: Classification of job names (applications / webhooks / other)
//! - `state`: Job state machine (Pending → Running → Succeeded/Failed)
//! - `hooks`: Pre-run and post-run lifecycle hooks
//! - `registry`: Named job lookup
//! - `executor`: Runs queue messages through the hooks with bounded parallelism
//! - `queue`: Queue messages and their line-delimited feed

pub mod executor;
pub mod group;
pub mod hooks;
pub mod job;
pub mod queue;
pub mod registry;
pub mod state;

pub use executor::{JobExecutor, JobReport};
pub use group::{JobGroup, action_type};
pub use hooks::{LifecycleHooks, NoopHooks, TaskLifecycleCoordinator};
pub use job::{Job, JobArgs, JobContext, JobDeps, JobOutput};
pub use queue::{JobMessage, feed_lines};
pub use registry::JobRegistry;
pub use state::{JobRun, JobState, StateTransition};
