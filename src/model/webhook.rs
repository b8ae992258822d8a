//! Inbound webhook request handed to webhook jobs.

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::api::OrchestrationApi;
use crate::error::{ApiError, SchemaError};

/// A webhook request as injected into job arguments by the pre-run hook.
///
/// Settings are fetched from the API on first access and cached for the rest
/// of the invocation.
#[derive(Debug, Deserialize)]
pub struct Webhook {
    pub guid: String,
    #[serde(rename = "requestId")]
    pub request_id: Value,
    #[serde(default)]
    pub app_guid: Option<String>,
    pub account_guid: String,
    pub status: Value,
    #[serde(default)]
    pub status_description: Option<String>,
    pub data: Value,
    #[serde(skip)]
    settings: OnceCell<Map<String, Value>>,
}

impl Webhook {
    pub fn decode(json: &Value) -> Result<Self, SchemaError> {
        serde_json::from_value(json.clone()).map_err(|e| SchemaError::from_serde("webhook request", &e))
    }

    /// Settings for this webhook's (app, account) pair.
    pub async fn settings(&self, api: &dyn OrchestrationApi) -> Result<&Map<String, Value>, ApiError> {
        self.settings
            .get_or_try_init(|| api.get_settings(self.app_guid.as_deref(), &self.account_guid))
            .await
    }
}

impl std::fmt::Display for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Webhook: {}>", self.request_id)
    }
}
