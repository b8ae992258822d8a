//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::api::http::RetryPolicy;
use crate::error::ConfigError;
use crate::worker::JobGroup;

/// Worker configuration, read once at process start and immutable afterwards.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the orchestration API (no trailing slash).
    pub api_url: String,
    /// Bearer credential sent with every API call.
    pub api_token: SecretString,
    /// Application guid used to name the per-application queues.
    pub application_guid: String,
    /// Per-attempt timeout for session and settings fetches.
    pub fetch_timeout: Duration,
    /// Per-attempt timeout for lifecycle hook calls.
    pub hook_timeout: Duration,
    /// Per-attempt timeout for the startup registration handshake.
    pub register_timeout: Duration,
    /// Retry policy shared by every remote call.
    pub retry: RetryPolicy,
    /// Maximum number of job bodies running at once.
    pub max_parallel_jobs: usize,
}

impl WorkerConfig {
    /// Configuration with defaults for everything but the endpoint and token.
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: SecretString::from(api_token.into()),
            application_guid: String::new(),
            fetch_timeout: Duration::from_millis(1000),
            hook_timeout: Duration::from_millis(4000),
            register_timeout: Duration::from_millis(4000),
            retry: RetryPolicy::default(),
            max_parallel_jobs: 10,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("WORKER_API_URL").unwrap_or_else(|| "http://127.0.0.1/api".to_string());
        let api_token = lookup("WORKER_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("WORKER_API_TOKEN".to_string()))?;

        let mut config = Self::new(api_url, api_token);
        config.application_guid = lookup("WORKER_APPLICATION_GUID").unwrap_or_default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, "WORKER_FETCH_TIMEOUT_MS")? {
            config.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "WORKER_HOOK_TIMEOUT_MS")? {
            config.hook_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "WORKER_REGISTER_TIMEOUT_MS")? {
            config.register_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, "WORKER_MAX_PARALLEL_JOBS")? {
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "WORKER_MAX_PARALLEL_JOBS".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            config.max_parallel_jobs = max;
        }

        Ok(config)
    }

    /// Queue names this worker consumes.
    pub fn queue_names(&self) -> Vec<String> {
        [JobGroup::PassThrough, JobGroup::Webhook, JobGroup::Application]
            .iter()
            .map(|group| group.queue_name(&self.application_guid))
            .collect()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}
