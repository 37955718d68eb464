use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::errors::LlmError;

/// Shared prompt handed to every backend.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Single capability every text-generation backend implements.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Human-facing provider label, e.g. "OpenAI".
    fn label(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Everything an adapter needs to talk to its endpoint.
#[derive(Clone)]
pub struct ProviderSettings {
    pub model: String,
    pub api_key: String,
    pub api_base: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("model", &self.model)
            .field("api_key", &"***")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderSettings {
    pub(crate) fn base_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.api_base
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| LlmError::config(format!("failed to build HTTP client: {err}")))
}

/// Deterministic backend used for tests and offline development.
#[derive(Debug, Clone, Default)]
pub struct MockCompletion {
    pub reply: Option<String>,
}

#[async_trait]
impl TextCompletion for MockCompletion {
    fn label(&self) -> &str {
        "Mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let first_line = request.user.lines().find(|l| !l.trim().is_empty());
        Ok(format!(
            "Would love to connect. {}",
            first_line.unwrap_or_default().trim()
        ))
    }
}
