//! Error types for the widget worker.

/// Top-level error type for the worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Remote orchestration API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure, exhausted retries, or a non-200 final status.
    #[error("Remote API unavailable at {endpoint} (status {status:?}): {reason}")]
    RemoteUnavailable {
        endpoint: String,
        status: Option<u16>,
        reason: String,
    },

    /// The API answered, but its envelope carried a non-zero `code`.
    #[error("Remote API rejected {endpoint} (code {code}): {message}")]
    RemoteRejected {
        endpoint: String,
        code: i64,
        message: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Malformed wire schema for sessions, controls and items.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Unknown control type: {tag}")]
    UnknownControlType { tag: String },

    #[error("Missing field `{field}` in {entity}")]
    MissingField { entity: String, field: String },

    #[error("Invalid {entity}: {reason}")]
    InvalidValue { entity: String, reason: String },
}

impl SchemaError {
    /// Classify a serde decoding failure for `entity`.
    ///
    /// serde reports absent fields as "missing field `name`"; those become
    /// [`SchemaError::MissingField`], everything else [`SchemaError::InvalidValue`].
    pub fn from_serde(entity: &str, err: &serde_json::Error) -> Self {
        let message = err.to_string();
        if let Some(rest) = message.strip_prefix("missing field `")
            && let Some(end) = rest.find('`')
        {
            return Self::MissingField {
                entity: entity.to_string(),
                field: rest[..end].to_string(),
            };
        }
        Self::InvalidValue {
            entity: entity.to_string(),
            reason: message,
        }
    }
}

/// Job execution errors.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job {name} is not registered")]
    UnknownJob { name: String },

    #[error("Job {job} is missing required argument `{key}`")]
    MissingArgument { job: String, key: String },

    #[error("Job {job} has invalid argument `{key}`: {reason}")]
    InvalidArgument {
        job: String,
        key: String,
        reason: String,
    },

    /// A job body handed the post-run hook a value of the wrong shape.
    #[error("Job {job} broke the return contract: {reason}")]
    ContractViolation { job: String, reason: String },

    #[error("Job {job} failed: {reason}")]
    Failed { job: String, reason: String },

    #[error("Job {job} panicked: {reason}")]
    Panicked { job: String, reason: String },
}

/// Result type alias for the worker.
pub type Result<T> = std::result::Result<T, Error>;
