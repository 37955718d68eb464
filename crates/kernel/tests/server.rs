mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use linkpilot_core_types::{AuthFailure, FailureKind};
use linkpilot_kernel::coordinator::LLM_PROVIDER_KEY;
use linkpilot_kernel::{
    build_router, last_data_object, Coordinator, ExecutionMode, LocalRunner, MarketplaceClient,
    SecretKeys, ServeState,
};
use serde_json::json;
use support::{
    connectable_profile, engine, mock_personalizer, test_config, FakeLauncher, FakeSite, FEED,
    LOGIN, PROFILE,
};
use tower::ServiceExt;

const PROMPT: &str = "Connect with Jane Doe: https://site.example/in/jane-doe";

fn split_state(reply: &str) -> (ServeState, Arc<FakeLauncher>) {
    split_state_with_keys(reply, SecretKeys::new().with(LLM_PROVIDER_KEY, "mock"))
}

fn split_state_with_keys(reply: &str, keys: SecretKeys) -> (ServeState, Arc<FakeLauncher>) {
    let mut config = test_config();
    config.mode = ExecutionMode::Split;
    let site = FakeSite::new();
    let launcher = FakeLauncher::new(site.clone());
    let coordinator = Coordinator::new(Arc::new(config.clone()), launcher.clone())
        .unwrap()
        .with_personalizer(mock_personalizer(reply))
        .with_engine(engine(&site, &config));
    (ServeState::new(Arc::new(coordinator), keys), launcher)
}

/// SSE event names in stream order.
fn event_names(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("event:"))
        .map(|name| name.trim().to_string())
        .collect()
}

async fn post_execute(state: ServeState, body: serde_json::Value, llm_key: Option<&str>) -> String {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/agents/linkedin-agent/execute")
        .header("content-type", "application/json");
    if let Some(key) = llm_key {
        builder = builder.header("X-User-LLM-Key", key);
    }
    let response = build_router(state)
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn execute_streams_status_then_result() {
    let (state, launcher) = split_state("Great to meet you.");
    let body = post_execute(
        state,
        json!({ "prompt": PROMPT, "language": "en", "options": { "action": "connect" } }),
        Some("sk-test"),
    )
    .await;

    let names = event_names(&body);
    assert!(names.len() >= 2);
    assert!(names[..names.len() - 1].iter().all(|n| n == "status"));
    assert_eq!(names.last().map(String::as_str), Some("result"));

    let result = last_data_object(&body).unwrap();
    assert_eq!(result["command"]["type"], "linkedin_automation");
    assert_eq!(result["personalized_note"], "Great to meet you.");
    assert_eq!(launcher.launch_count(), 0);
}

#[tokio::test]
async fn missing_llm_key_header_streams_one_error() {
    let (state, _) = split_state("unused");
    let body = post_execute(state, json!({ "prompt": PROMPT }), None).await;

    assert_eq!(event_names(&body), vec!["error".to_string()]);
    let result = last_data_object(&body).unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "LLM API key missing (LLM_API_KEY)");
}

#[tokio::test]
async fn body_keys_are_accepted() {
    let (state, _) = split_state("Hi there.");
    let body = post_execute(
        state,
        json!({ "prompt": PROMPT, "keys": { "LLM_API_KEY": "sk-body" } }),
        None,
    )
    .await;
    assert_eq!(event_names(&body).last().map(String::as_str), Some("result"));
}

#[tokio::test]
async fn health_and_metrics_respond() {
    let (state, _) = split_state("Hi there.");
    post_execute(state.clone(), json!({ "prompt": PROMPT }), Some("sk")).await;

    let router = build_router(state);
    let health = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let metrics = router
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let text = to_bytes(metrics.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&text).contains("linkpilot_runs_total"));
}

async fn spawn_marketplace(state: ServeState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn local_runner_executes_prepared_note_in_own_browser() {
    let (state, _) = split_state("Loved your talk.");
    let base = spawn_marketplace(state).await;

    let config = test_config();
    let site = FakeSite::new();
    connectable_profile(&site, &config.selectors);
    let launcher = FakeLauncher::new(site.clone());
    let client = MarketplaceClient::new(&base, Duration::from_secs(5)).unwrap();
    let runner = LocalRunner::new(&config, client, launcher.clone())
        .unwrap()
        .with_engine(engine(&site, &config));

    let report = runner.run(PROMPT, "sk-test").await.unwrap();

    assert!(report.outcome.success(), "{:?}", report.outcome);
    assert_eq!(report.request.profile_url, PROFILE);
    assert_eq!(report.full_name, "Jane Doe");
    assert_eq!(site.gotos()[0], FEED);
    assert!(site.fills()[0].ends_with("=Loved your talk."));
    assert!(site.is_closed());
}

#[tokio::test]
async fn local_runner_needs_a_signed_in_profile() {
    let (state, _) = split_state("Loved your talk.");
    let base = spawn_marketplace(state).await;

    let config = test_config();
    let site = FakeSite::new();
    site.redirect(FEED, LOGIN);
    let launcher = FakeLauncher::new(site.clone());
    let client = MarketplaceClient::new(&base, Duration::from_secs(5)).unwrap();
    let runner = LocalRunner::new(&config, client, launcher)
        .unwrap()
        .with_engine(engine(&site, &config));

    let report = runner.run(PROMPT, "sk-test").await.unwrap();

    assert_eq!(
        report.outcome.error_kind(),
        Some(&FailureKind::AuthFailure(AuthFailure::NotLoggedIn))
    );
}

#[tokio::test]
async fn local_runner_requires_llm_key() {
    let (state, _) = split_state("unused");
    let base = spawn_marketplace(state).await;

    let config = test_config();
    let site = FakeSite::new();
    let launcher = FakeLauncher::new(site.clone());
    let client = MarketplaceClient::new(&base, Duration::from_secs(5)).unwrap();
    let runner = LocalRunner::new(&config, client, launcher.clone()).unwrap();

    let err = runner
        .run("Connect with someone on https://site.example/company/acme", "   ")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("LLM API key missing"));
    assert_eq!(launcher.launch_count(), 0);
}

#[tokio::test]
async fn local_runner_surfaces_marketplace_errors() {
    let keys = SecretKeys::new().with(LLM_PROVIDER_KEY, "cohere");
    let (state, _) = split_state_with_keys("unused", keys);
    let base = spawn_marketplace(state).await;

    let config = test_config();
    let site = FakeSite::new();
    let launcher = FakeLauncher::new(site.clone());
    let client = MarketplaceClient::new(&base, Duration::from_secs(5)).unwrap();
    let runner = LocalRunner::new(&config, client, launcher.clone()).unwrap();

    let err = runner.run(PROMPT, "sk-test").await.unwrap_err();
    assert!(err.to_string().contains("Unknown LLM provider: cohere"));
    assert_eq!(launcher.launch_count(), 0);
}
