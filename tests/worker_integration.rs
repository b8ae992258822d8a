//! Integration tests against a fake orchestration API.
//!
//! Each test spins up an Axum server on a random port that records every
//! call, then drives the real reqwest-based client, registration and job
//! executor against it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use widget_worker::api::{ApiClient, OrchestrationApi, RetryPolicy, RetryingHttpClient};
use widget_worker::bootstrap;
use widget_worker::config::WorkerConfig;
use widget_worker::error::{ApiError, Error, JobError};
use widget_worker::jobs;
use widget_worker::model::ControlRegistry;
use widget_worker::worker::{
    JobDeps, JobExecutor, JobMessage, JobOutput, JobRegistry, JobState, TaskLifecycleCoordinator,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One recorded request: endpoint path, Authorization header, JSON body.
type Call = (String, Option<String>, Value);

#[derive(Clone)]
struct FakeApi {
    calls: Arc<Mutex<Vec<Call>>>,
    flaky_hits: Arc<AtomicUsize>,
    /// `flaky` answers 503 this many times before succeeding.
    flaky_failures: usize,
    reject_registration: bool,
    session: Value,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            flaky_hits: Arc::new(AtomicUsize::new(0)),
            flaky_failures: 0,
            reject_registration: false,
            session: session_payload(),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn endpoints(&self) -> Vec<String> {
        self.calls().into_iter().map(|(endpoint, _, _)| endpoint).collect()
    }

    fn bodies(&self, endpoint: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(name, _, _)| name == endpoint)
            .map(|(_, _, body)| body)
            .collect()
    }
}

async fn handle(
    State(api): State<FakeApi>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    api.calls
        .lock()
        .unwrap()
        .push((endpoint.clone(), auth, payload.clone()));

    let reply = match endpoint.as_str() {
        "flaky" => {
            let hit = api.flaky_hits.fetch_add(1, Ordering::SeqCst) + 1;
            if hit <= api.flaky_failures {
                return (StatusCode::SERVICE_UNAVAILABLE, "busy".to_string());
            }
            json!({"code": 0, "data": {"hit": hit}})
        }
        "celery/get_widget_session" => json!({"code": 0, "msg": "", "data": api.session}),
        "celery/get_settings" => json!({"code": 0, "settings": {"currency": "EUR"}}),
        "register_tasks" if api.reject_registration => {
            json!({"code": 3, "msg": "unknown application"})
        }
        "register_tasks" => json!({"code": 0}),
        "change_session_status" => return (StatusCode::OK, String::new()),
        "update_user_request" => json!({
            "code": 0,
            "data": {"guid": payload["user_request_guid"], "state": payload["state"]}
        }),
        "update_webhook_request" => json!({
            "code": 0,
            "data": {
                "guid": payload["webhook_request_guid"],
                "requestId": "req-9",
                "app_guid": null,
                "account_guid": "acc-1",
                "status": payload["state"],
                "data": {"order": 42}
            }
        }),
        _ => return (StatusCode::NOT_FOUND, "no such endpoint".to_string()),
    };
    (StatusCode::OK, reply.to_string())
}

/// Start the fake API on a random port, return its base URL.
async fn start_server(api: FakeApi) -> String {
    let app = Router::new()
        .route("/api/{*endpoint}", post(handle))
        .with_state(api);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}/api")
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        backoff_factor: Duration::from_millis(1),
        ..RetryPolicy::default()
    }
}

fn config(base_url: &str) -> WorkerConfig {
    let mut config = WorkerConfig::new(base_url, "test-token");
    config.retry = fast_retry();
    config
}

fn control(guid: &str, tag: &str, extra: Value) -> Value {
    let mut control = json!({
        "guid": guid, "name": guid, "code": guid, "description": null,
        "describe": {}, "alert": false, "alert_style": null, "order": 1,
        "hide": false, "disabled": false, "type": tag, "style": null
    });
    if let (Some(map), Value::Object(extra)) = (control.as_object_mut(), extra) {
        map.extend(extra);
    }
    control
}

fn session_payload() -> Value {
    json!({
        "widget": {"current_step": "step-1", "code": "sales", "name": "Sales",
                   "status": "active", "description": null, "async_execute": false},
        "steps": [
            {"guid": "step-1", "name": "Goods", "code": "goods", "description": null,
             "controls": [
                control("title", "text_box", json!({"value": "Order", "default_value": null})),
                control("goods", "check_box_list",
                        json!({"value": null, "default_value": null, "items": []}))
             ]}
        ]
    })
}

fn kwargs(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}

async fn executor_for(base_url: &str) -> JobExecutor {
    let api: Arc<dyn OrchestrationApi> = Arc::new(ApiClient::new(&config(base_url)).unwrap());
    let registry = Arc::new(JobRegistry::new());
    jobs::register_builtin(&registry);
    bootstrap::register(api.as_ref(), &registry).await.unwrap();

    JobExecutor::new(
        registry,
        Arc::new(TaskLifecycleCoordinator::new(Arc::clone(&api))),
        JobDeps {
            api,
            controls: Arc::new(ControlRegistry::new()),
        },
        4,
    )
}

// ── Retry policy ─────────────────────────────────────────────────────

#[tokio::test]
async fn retry_succeeds_on_fifth_attempt() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeApi {
            flaky_failures: 4,
            ..FakeApi::new()
        };
        let base = start_server(api.clone()).await;

        let reply = RetryingHttpClient::new(fast_retry())
            .post(
                &format!("{base}/flaky"),
                &json!({}),
                &HeaderMap::new(),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.attempts, 5);
        assert_eq!(api.flaky_hits.load(Ordering::SeqCst), 5);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn retry_gives_up_after_five_unavailable() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeApi {
            flaky_failures: 5,
            ..FakeApi::new()
        };
        let base = start_server(api.clone()).await;

        let err = RetryingHttpClient::new(fast_retry())
            .post(
                &format!("{base}/flaky"),
                &json!({}),
                &HeaderMap::new(),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::RemoteUnavailable { status: Some(503), .. }));
        assert_eq!(api.flaky_hits.load(Ordering::SeqCst), 5);
    })
    .await
    .expect("test timed out");
}

// ── Client and registration ──────────────────────────────────────────

#[tokio::test]
async fn client_sends_bearer_token() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeApi::new();
        let base = start_server(api.clone()).await;
        let client = ApiClient::new(&config(&base)).unwrap();

        let settings = client.get_settings(Some("app-1"), "acc-1").await.unwrap();
        assert_eq!(settings["currency"], "EUR");

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "celery/get_settings");
        assert_eq!(calls[0].1.as_deref(), Some("Bearer test-token"));
        assert_eq!(calls[0].2, json!({"app_guid": "app-1", "account_guid": "acc-1"}));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_registration_is_fatal() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeApi {
            reject_registration: true,
            ..FakeApi::new()
        };
        let base = start_server(api.clone()).await;
        let client = ApiClient::new(&config(&base)).unwrap();
        let registry = JobRegistry::new();
        jobs::register_builtin(&registry);

        let err = bootstrap::register(&client, &registry).await.unwrap_err();
        match err {
            Error::Api(ApiError::RemoteRejected { code, message, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(message, "unknown application");
            }
            other => panic!("expected RemoteRejected, got {other:?}"),
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unreachable_api_is_unavailable() {
    timeout(TEST_TIMEOUT, async {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ApiClient::new(&config(&format!("http://127.0.0.1:{port}/api"))).unwrap();
        let err = client.get_widget_session("ws-1").await.unwrap_err();
        assert!(matches!(err, ApiError::RemoteUnavailable { status: None, .. }));
    })
    .await
    .expect("test timed out");
}

// ── End-to-end lifecycle ─────────────────────────────────────────────

#[tokio::test]
async fn init_job_reports_ten_items() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeApi::new();
        let base = start_server(api.clone()).await;
        let executor = executor_for(&base).await;

        let report = executor
            .execute(JobMessage::new(
                "applications.sales.init",
                kwargs(&[("widget_session_guid", "ws-1"), ("user_request_guid", "ur-1")]),
            ))
            .await
            .unwrap();

        assert_eq!(report.run.state, JobState::Succeeded);
        assert!(report.post_run.is_ok());
        assert_eq!(
            api.endpoints(),
            vec![
                "register_tasks",
                "update_user_request",
                "celery/get_widget_session",
                "change_session_status",
                "update_user_request",
            ]
        );

        let user_requests = api.bodies("update_user_request");
        assert_eq!(user_requests[0], json!({"user_request_guid": "ur-1", "state": "started"}));
        assert_eq!(user_requests[1], json!({"user_request_guid": "ur-1", "state": "success"}));

        let status = &api.bodies("change_session_status")[0];
        assert_eq!(status["widget_session_guid"], "ws-1");
        assert_eq!(status["state"], "success");
        assert_eq!(status["action_type"], "init");
        assert_eq!(status["retval"], json!({"status": "success"}));

        let items = status["widget_session"]["steps"]["step-1"]["controls"]["goods"]["items"]
            .as_array()
            .unwrap();
        assert_eq!(items.len(), 10);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item["value"], json!(format!("Item {}", i + 1)));
            assert_eq!(item["checked"], true);
        }
        // Untouched controls survive the round trip.
        assert_eq!(
            status["widget_session"]["steps"]["step-1"]["controls"]["title"]["value"],
            "Order"
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn webhook_job_sees_injected_request() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeApi::new();
        let base = start_server(api.clone()).await;
        let executor = executor_for(&base).await;

        let report = executor
            .execute(JobMessage::new(
                "webhooks.sales.order_handler",
                kwargs(&[("webhook_request_guid", "wr-1")]),
            ))
            .await
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(report.result.unwrap(), JobOutput::Value(json!({"order": 42})));
        assert_eq!(
            api.bodies("update_webhook_request"),
            vec![
                json!({"webhook_request_guid": "wr-1", "state": "started"}),
                json!({"webhook_request_guid": "wr-1", "state": "success"}),
            ]
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn missing_argument_fails_without_remote_calls() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeApi::new();
        let base = start_server(api.clone()).await;
        let executor = executor_for(&base).await;

        let report = executor
            .execute(JobMessage::new(
                "applications.sales.validate",
                kwargs(&[("widget_session_guid", "ws-1")]),
            ))
            .await
            .unwrap();

        assert_eq!(report.run.state, JobState::Failed);
        assert!(matches!(
            report.result,
            Err(Error::Job(JobError::MissingArgument { .. }))
        ));
        // The post-run hook still runs and reports the missing return value.
        assert!(matches!(
            report.post_run,
            Err(Error::Job(JobError::ContractViolation { .. }))
        ));
        assert_eq!(api.endpoints(), vec!["register_tasks"]);
    })
    .await
    .expect("test timed out");
}
