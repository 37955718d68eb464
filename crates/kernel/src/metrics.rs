use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::{debug, error};

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();
static RUNS: OnceCell<IntCounterVec> = OnceCell::new();
static LLM_REQUESTS: OnceCell<IntCounterVec> = OnceCell::new();

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        let runs = IntCounterVec::new(
            Opts::new(
                "linkpilot_runs_total",
                "Completed invocations by action and terminal outcome",
            ),
            &["action", "outcome"],
        )
        .expect("create runs counter");
        if let Err(err) = registry.register(Box::new(runs.clone())) {
            error!(?err, "failed to register runs counter");
        }
        let _ = RUNS.set(runs);

        let llm = IntCounterVec::new(
            Opts::new(
                "linkpilot_llm_requests_total",
                "Note generation requests by provider and outcome",
            ),
            &["provider", "outcome"],
        )
        .expect("create llm request counter");
        if let Err(err) = registry.register(Box::new(llm.clone())) {
            error!(?err, "failed to register llm request counter");
        }
        let _ = LLM_REQUESTS.set(llm);
    });
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// `outcome` is one of `success`, `error` or `command`.
pub fn record_run(action: &str, outcome: &str) {
    register_metrics();
    if let Some(counter) = RUNS.get() {
        counter.with_label_values(&[action, outcome]).inc();
    }
    debug!(target = "metrics", %action, %outcome, "run recorded");
}

/// `outcome` is `ok` or the error kind reported by the provider adapter.
pub fn record_llm_request(provider: &str, outcome: &str) {
    register_metrics();
    if let Some(counter) = LLM_REQUESTS.get() {
        counter.with_label_values(&[provider, outcome]).inc();
    }
}

/// Text exposition of the global registry.
pub fn render() -> Result<String, String> {
    register_metrics();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&global_registry().gather(), &mut buffer)
        .map_err(|err| err.to_string())?;
    String::from_utf8(buffer).map_err(|err| err.to_string())
}

pub async fn metrics_handler() -> Response {
    let format_type = TextEncoder::new().format_type().to_string();
    match render() {
        Ok(body) => match HeaderValue::from_str(&format_type) {
            Ok(value) => ([(CONTENT_TYPE, value)], body).into_response(),
            Err(err) => {
                error!(?err, "failed to build content-type header");
                (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
            }
        },
        Err(err) => {
            error!(%err, "failed to encode prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}
