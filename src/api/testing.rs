//! In-memory [`OrchestrationApi`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::api::{OrchestrationApi, SessionStatusUpdate, TaskCatalog, WidgetSessionPayload};
use crate::error::ApiError;

/// Records every call as `(endpoint, body)` and answers from canned data.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<(String, Value)>>,
    failing: Vec<&'static str>,
    sessions: HashMap<String, Value>,
}

impl RecordingApi {
    /// Calls to any endpoint in `endpoints` are recorded, then fail.
    pub fn failing(endpoints: &[&'static str]) -> Self {
        Self {
            failing: endpoints.to_vec(),
            ..Self::default()
        }
    }

    /// Serve `payload` (`{widget, steps}`) for `get_widget_session(guid)`.
    pub fn with_session(mut self, guid: &str, payload: Value) -> Self {
        self.sessions.insert(guid.to_string(), payload);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// Bodies of calls to `endpoint`, in order.
    pub fn calls_to(&self, endpoint: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name == endpoint)
            .map(|(_, body)| body)
            .collect()
    }

    fn record(&self, endpoint: &'static str, body: Value) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push((endpoint.to_string(), body));
        if self.failing.contains(&endpoint) {
            return Err(ApiError::RemoteUnavailable {
                endpoint: endpoint.to_string(),
                status: Some(503),
                reason: "down".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrchestrationApi for RecordingApi {
    async fn get_widget_session(&self, guid: &str) -> Result<WidgetSessionPayload, ApiError> {
        self.record("get_widget_session", json!({"widget_session_guid": guid}))?;
        let payload = self
            .sessions
            .get(guid)
            .cloned()
            .ok_or_else(|| ApiError::RemoteRejected {
                endpoint: "get_widget_session".to_string(),
                code: 404,
                message: format!("no session {guid}"),
            })?;
        serde_json::from_value(payload).map_err(|e| ApiError::InvalidResponse {
            endpoint: "get_widget_session".to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_settings(
        &self,
        app_guid: Option<&str>,
        account_guid: &str,
    ) -> Result<Map<String, Value>, ApiError> {
        self.record(
            "get_settings",
            json!({"app_guid": app_guid, "account_guid": account_guid}),
        )?;
        Ok(Map::new())
    }

    async fn register_tasks(&self, catalog: &TaskCatalog) -> Result<(), ApiError> {
        self.record("register_tasks", serde_json::to_value(catalog).unwrap())
    }

    async fn change_session_status(&self, update: &SessionStatusUpdate) -> Result<(), ApiError> {
        self.record("change_session_status", serde_json::to_value(update).unwrap())
    }

    async fn update_user_request(&self, guid: &str, state: &str) -> Result<Value, ApiError> {
        self.record(
            "update_user_request",
            json!({"user_request_guid": guid, "state": state}),
        )?;
        Ok(json!({"guid": guid, "state": state}))
    }

    async fn update_webhook_request(&self, guid: &str, state: &str) -> Result<Value, ApiError> {
        self.record(
            "update_webhook_request",
            json!({"webhook_request_guid": guid, "state": state}),
        )?;
        Ok(json!({
            "guid": guid,
            "requestId": "r-1",
            "account_guid": "acc",
            "status": state,
            "data": {"order": 1}
        }))
    }
}
