use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{classify_status, classify_transport, LlmError};
use crate::provider::{http_client, CompletionRequest, ProviderSettings, TextCompletion};

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const LABEL: &str = "Anthropic";

pub struct AnthropicCompletion {
    client: Client,
    settings: ProviderSettings,
}

impl AnthropicCompletion {
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            settings,
        })
    }
}

#[async_trait]
impl TextCompletion for AnthropicCompletion {
    fn label(&self) -> &str {
        LABEL
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.settings.base_or(ANTHROPIC_API_BASE));
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: [Message {
                role: "user",
                content: &request.user,
            }],
        };

        debug!(model = %self.settings.model, "anthropic completion request");
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| classify_transport(LABEL, &err))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(LABEL, status.as_u16(), &text, &[401, 403]));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|err| LlmError::invalid_response(LABEL, err.to_string()))?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(LlmError::invalid_response(LABEL, "response missing text block"));
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}
