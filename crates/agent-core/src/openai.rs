use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{classify_status, classify_transport, LlmError};
use crate::provider::{http_client, CompletionRequest, ProviderSettings, TextCompletion};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const LABEL: &str = "OpenAI";

pub struct OpenAiCompletion {
    client: Client,
    settings: ProviderSettings,
}

impl OpenAiCompletion {
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            settings,
        })
    }
}

#[async_trait]
impl TextCompletion for OpenAiCompletion {
    fn label(&self) -> &str {
        LABEL
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.settings.base_or(OPENAI_API_BASE));
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        debug!(model = %self.settings.model, "openai completion request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| classify_transport(LABEL, &err))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(LABEL, status.as_u16(), &text, &[401, 403]));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::invalid_response(LABEL, err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::invalid_response(LABEL, "response missing content"))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}
