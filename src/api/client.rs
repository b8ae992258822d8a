//! Orchestration API client.
//!
//! One method per remote endpoint. Every call goes through
//! [`RetryingHttpClient`]; a non-200 final status is logged as a critical
//! fault and surfaced as [`ApiError::RemoteUnavailable`]. What the caller does
//! with that error (abort the job or swallow it) is decided upstream.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};

use crate::api::http::{HttpReply, RetryingHttpClient};
use crate::api::types::{Envelope, SessionStatusUpdate, TaskCatalog, WidgetSessionPayload};
use crate::config::WorkerConfig;
use crate::error::{ApiError, ConfigError};

const GET_WIDGET_SESSION: &str = "celery/get_widget_session";
const GET_SETTINGS: &str = "celery/get_settings";
const REGISTER_TASKS: &str = "register_tasks";
const CHANGE_SESSION_STATUS: &str = "change_session_status";
const UPDATE_USER_REQUEST: &str = "update_user_request";
const UPDATE_WEBHOOK_REQUEST: &str = "update_webhook_request";

/// The remote orchestration API as seen by the worker.
#[async_trait]
pub trait OrchestrationApi: Send + Sync {
    /// Fetch the current state of a widget session.
    async fn get_widget_session(&self, guid: &str) -> Result<WidgetSessionPayload, ApiError>;

    /// Fetch settings for an (app, account) pair.
    async fn get_settings(
        &self,
        app_guid: Option<&str>,
        account_guid: &str,
    ) -> Result<Map<String, Value>, ApiError>;

    /// Announce the job names this worker serves.
    async fn register_tasks(&self, catalog: &TaskCatalog) -> Result<(), ApiError>;

    /// Push a session's new state after an application job.
    async fn change_session_status(&self, update: &SessionStatusUpdate) -> Result<(), ApiError>;

    /// Move a user request to `state`; returns the updated request.
    async fn update_user_request(
        &self,
        user_request_guid: &str,
        state: &str,
    ) -> Result<Value, ApiError>;

    /// Move a webhook request to `state`; returns the updated request.
    async fn update_webhook_request(
        &self,
        webhook_request_guid: &str,
        state: &str,
    ) -> Result<Value, ApiError>;
}

/// HTTP implementation of [`OrchestrationApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: RetryingHttpClient,
    base_url: String,
    headers: HeaderMap,
    fetch_timeout: Duration,
    hook_timeout: Duration,
    register_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", config.api_token.expose_secret()))
                .map_err(|e| ConfigError::InvalidValue {
                    key: "WORKER_API_TOKEN".to_string(),
                    message: e.to_string(),
                })?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            http: RetryingHttpClient::new(config.retry.clone()),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            headers,
            fetch_timeout: config.fetch_timeout,
            hook_timeout: config.hook_timeout,
            register_timeout: config.register_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POST and insist on a 200 final status.
    async fn call(
        &self,
        path: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, ApiError> {
        let url = self.url(path);
        tracing::debug!(endpoint = path, "Calling orchestration API");

        let reply = self
            .http
            .post(&url, payload, &self.headers, timeout)
            .await
            .inspect_err(|e| {
                tracing::error!(critical = true, endpoint = path, error = %e, "API not working");
            })?;

        if reply.status != StatusCode::OK {
            tracing::error!(
                critical = true,
                endpoint = path,
                status = reply.status.as_u16(),
                "API not working"
            );
            return Err(ApiError::RemoteUnavailable {
                endpoint: path.to_string(),
                status: Some(reply.status.as_u16()),
                reason: truncate(&reply.body, 200),
            });
        }
        Ok(reply)
    }

    async fn call_envelope(
        &self,
        path: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Envelope, ApiError> {
        let reply = self.call(path, payload, timeout).await?;
        Envelope::parse(path, &reply.body)?.into_success(path)
    }
}

#[async_trait]
impl OrchestrationApi for ApiClient {
    async fn get_widget_session(&self, guid: &str) -> Result<WidgetSessionPayload, ApiError> {
        let envelope = self
            .call_envelope(GET_WIDGET_SESSION, &json!({ "guid": guid }), self.fetch_timeout)
            .await?;
        serde_json::from_value(envelope.data).map_err(|e| ApiError::InvalidResponse {
            endpoint: GET_WIDGET_SESSION.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_settings(
        &self,
        app_guid: Option<&str>,
        account_guid: &str,
    ) -> Result<Map<String, Value>, ApiError> {
        let payload = json!({ "app_guid": app_guid, "account_guid": account_guid });
        let envelope = self
            .call_envelope(GET_SETTINGS, &payload, self.fetch_timeout)
            .await?;
        Ok(envelope.settings.unwrap_or_default())
    }

    async fn register_tasks(&self, catalog: &TaskCatalog) -> Result<(), ApiError> {
        let payload = serde_json::to_value(catalog).map_err(|e| ApiError::InvalidResponse {
            endpoint: REGISTER_TASKS.to_string(),
            reason: e.to_string(),
        })?;
        self.call_envelope(REGISTER_TASKS, &payload, self.register_timeout)
            .await?;
        Ok(())
    }

    async fn change_session_status(&self, update: &SessionStatusUpdate) -> Result<(), ApiError> {
        let payload = serde_json::to_value(update).map_err(|e| ApiError::InvalidResponse {
            endpoint: CHANGE_SESSION_STATUS.to_string(),
            reason: e.to_string(),
        })?;
        self.call(CHANGE_SESSION_STATUS, &payload, self.hook_timeout)
            .await?;
        Ok(())
    }

    async fn update_user_request(
        &self,
        user_request_guid: &str,
        state: &str,
    ) -> Result<Value, ApiError> {
        let payload = json!({ "user_request_guid": user_request_guid, "state": state });
        let envelope = self
            .call_envelope(UPDATE_USER_REQUEST, &payload, self.hook_timeout)
            .await?;
        Ok(envelope.data)
    }

    async fn update_webhook_request(
        &self,
        webhook_request_guid: &str,
        state: &str,
    ) -> Result<Value, ApiError> {
        let payload = json!({ "webhook_request_guid": webhook_request_guid, "state": state });
        let envelope = self
            .call_envelope(UPDATE_WEBHOOK_REQUEST, &payload, self.hook_timeout)
            .await?;
        Ok(envelope.data)
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_bearer_headers() {
        let client = ApiClient::new(&WorkerConfig::new("http://localhost/api/", "tok")).unwrap();
        assert_eq!(client.url(REGISTER_TASKS), "http://localhost/api/register_tasks");
        let auth = client.headers.get(AUTHORIZATION).unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(auth.to_str().unwrap(), "Bearer tok");
    }

    #[test]
    fn rejects_unprintable_token() {
        let err = ApiClient::new(&WorkerConfig::new("http://localhost", "bad\ntoken")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("ääää", 2), "ää...");
    }
}
