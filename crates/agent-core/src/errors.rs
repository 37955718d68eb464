use linkpilot_core_types::truncate_chars;
use thiserror::Error;

/// Longest slice of a provider's error body carried into diagnostics.
pub const DETAIL_LIMIT: usize = 200;

/// Failures of a personalization call, shared by every provider adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Invalid {provider} API key. Please check your API key and try again.")]
    Auth { provider: String },

    #[error("{provider} rate limit exceeded. Please try again later.")]
    RateLimited { provider: String },

    #[error("{provider} API timeout. Please try again.")]
    Timeout { provider: String },

    #[error("{provider} API error ({status}): {detail}")]
    Provider {
        provider: String,
        status: u16,
        detail: String,
    },

    #[error("{provider} returned an unusable response: {detail}")]
    InvalidResponse { provider: String, detail: String },

    #[error("{provider} request failed: {detail}")]
    Transport { provider: String, detail: String },

    /// Rejected before any network call.
    #[error("{0}")]
    Config(String),
}

impl LlmError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_response(provider: &str, detail: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limited",
            Self::Timeout { .. } => "timeout",
            Self::Provider { .. } => "provider",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::Transport { .. } => "transport",
            Self::Config(_) => "config",
        }
    }
}

/// Map a non-2xx response onto the shared taxonomy. `auth_statuses` lists the
/// codes a given provider uses to reject a key.
pub fn classify_status(provider: &str, status: u16, body: &str, auth_statuses: &[u16]) -> LlmError {
    if auth_statuses.contains(&status) {
        return LlmError::Auth {
            provider: provider.to_string(),
        };
    }
    if status == 429 {
        return LlmError::RateLimited {
            provider: provider.to_string(),
        };
    }
    LlmError::Provider {
        provider: provider.to_string(),
        status,
        detail: truncate_chars(body.trim(), DETAIL_LIMIT),
    }
}

pub fn classify_transport(provider: &str, err: &reqwest::Error) -> LlmError {
    if err.is_timeout() {
        return LlmError::Timeout {
            provider: provider.to_string(),
        };
    }
    LlmError::Transport {
        provider: provider.to_string(),
        detail: truncate_chars(&err.to_string(), DETAIL_LIMIT),
    }
}
