//! HTTP surface: one streaming execute endpoint plus health and metrics.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::State,
    http::{HeaderMap, Method},
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use linkpilot_core_types::ProgressEvent;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::coordinator::{Coordinator, InvocationRequest, SecretKeys, LLM_API_KEY};
use crate::errors::KernelError;
use crate::metrics::{metrics_handler, register_metrics};
use crate::progress::progress_channel;

pub const EXECUTE_PATH: &str = "/v1/agents/linkedin-agent/execute";
pub const LLM_KEY_HEADER: &str = "x-user-llm-key";

#[derive(Clone)]
pub struct ServeState {
    coordinator: Arc<Coordinator>,
    /// Keys every request starts from; body and header values override them.
    base_keys: SecretKeys,
}

impl ServeState {
    pub fn new(coordinator: Arc<Coordinator>, base_keys: SecretKeys) -> Self {
        Self {
            coordinator,
            base_keys,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteBody {
    #[serde(flatten)]
    request: InvocationRequest,
    #[serde(default)]
    keys: BTreeMap<String, String>,
}

/// JSON carried on an SSE `data:` line. Errors become an object so a
/// consumer keeping only the last object still sees why the run failed.
pub fn event_data(event: &ProgressEvent) -> Value {
    match event {
        ProgressEvent::Status(text) => Value::String(text.clone()),
        ProgressEvent::Result(payload) => payload.clone(),
        ProgressEvent::Error(message) => json!({ "success": false, "error": message }),
    }
}

fn to_sse(event: &ProgressEvent) -> Event {
    Event::default()
        .event(event.kind().as_str())
        .data(event_data(event).to_string())
}

async fn execute_handler(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Json(body): Json<ExecuteBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut keys = state.base_keys.clone();
    keys.merge(body.keys.into_iter().collect());
    if let Some(value) = headers
        .get(LLM_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        keys.insert(LLM_API_KEY, value);
    }
    debug!(keys = ?keys, "execute request");

    let (reporter, mut rx) = progress_channel();
    let coordinator = state.coordinator.clone();
    let request = body.request;
    tokio::spawn(async move {
        coordinator.execute(request, &keys, reporter).await;
    });

    let stream = stream! {
        while let Some(event) = rx.recv().await {
            yield Ok::<Event, Infallible>(to_sse(&event));
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn build_router(state: ServeState) -> Router {
    register_metrics();
    Router::new()
        .route(EXECUTE_PATH, post(execute_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors_layer())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, state: ServeState) -> Result<(), KernelError> {
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "serving");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
