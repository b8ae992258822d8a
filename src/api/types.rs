//! Wire types of the orchestration API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::model::Status;

/// Application-level response envelope. `code == 0` means success.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub settings: Option<Map<String, Value>>,
}

impl Envelope {
    /// Parse a JSON body. An empty body is an empty, successful envelope.
    ///
    /// Nesting depth is unlimited (tree views can be arbitrarily deep); the
    /// parser grows its stack on the heap instead of overflowing.
    pub fn parse(endpoint: &str, body: &str) -> Result<Self, ApiError> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        let invalid = |e: serde_json::Error| ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        };
        let mut de = serde_json::Deserializer::from_str(body);
        de.disable_recursion_limit();
        let envelope = Self::deserialize(serde_stacker::Deserializer::new(&mut de)).map_err(invalid)?;
        de.end().map_err(invalid)?;
        Ok(envelope)
    }

    /// Turn a non-zero `code` into [`ApiError::RemoteRejected`].
    pub fn into_success(self, endpoint: &str) -> Result<Self, ApiError> {
        if self.code != 0 {
            return Err(ApiError::RemoteRejected {
                endpoint: endpoint.to_string(),
                code: self.code,
                message: self.msg.unwrap_or_default(),
            });
        }
        Ok(self)
    }
}

/// `data` of a `get_widget_session` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetSessionPayload {
    pub widget: Value,
    #[serde(default)]
    pub steps: Value,
}

/// Job names announced at startup, split by group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCatalog {
    pub application_task_codes: Vec<String>,
    pub webhook_task_codes: Vec<String>,
}

/// What the job body reported back, alongside the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retval {
    pub status: Status,
}

/// Request body of `change_session_status`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusUpdate {
    pub widget_session_guid: String,
    pub widget_session: Value,
    pub state: String,
    pub action_type: String,
    pub retval: Retval,
}
