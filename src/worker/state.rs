//! Job state machine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a job invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Received, hooks not yet run.
    Pending,
    /// Pre-run hook and job body are executing.
    Running,
    /// Job body returned a value.
    Succeeded,
    /// Job body (or its pre-run validation) failed.
    Failed,
}

impl JobState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: JobState) -> bool {
        use JobState::*;

        matches!(
            (self, target),
            (Pending, Running) | (Running, Succeeded) | (Running, Failed)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// State name reported to the orchestration API.
    pub fn remote_name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "started",
            Self::Succeeded => "success",
            Self::Failed => "failure",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A state transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// Previous state.
    pub from: JobState,
    /// New state.
    pub to: JobState,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// Reason for the transition.
    pub reason: Option<String>,
}

/// Record of one job invocation.
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    /// Unique id of this invocation.
    pub run_id: Uuid,
    /// Registered job name.
    pub job_name: String,
    /// Current state.
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// State transition history.
    pub transitions: Vec<StateTransition>,
}

impl JobRun {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job_name: job_name.into(),
            state: JobState::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new state.
    pub fn transition_to(
        &mut self,
        new_state: JobState,
        reason: Option<String>,
    ) -> Result<(), String> {
        if !self.state.can_transition_to(new_state) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.state, new_state
            ));
        }

        self.transitions.push(StateTransition {
            from: self.state,
            to: new_state,
            timestamp: Utc::now(),
            reason,
        });
        self.state = new_state;

        match new_state {
            JobState::Running => self.started_at = Some(Utc::now()),
            JobState::Succeeded | JobState::Failed => self.completed_at = Some(Utc::now()),
            JobState::Pending => {}
        }

        Ok(())
    }

    /// Get the duration since the job started.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            let end = self.completed_at.unwrap_or_else(Utc::now);
            end.signed_duration_since(start)
                .to_std()
                .unwrap_or_default()
        })
    }
}
