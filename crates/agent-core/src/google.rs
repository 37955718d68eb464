use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{classify_status, classify_transport, LlmError};
use crate::provider::{http_client, CompletionRequest, ProviderSettings, TextCompletion};

pub const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const LABEL: &str = "Google";

/// Gemini `generateContent`. The API has no separate system slot in this
/// shape, so the system prompt is prepended to the user turn.
pub struct GoogleCompletion {
    client: Client,
    settings: ProviderSettings,
}

impl GoogleCompletion {
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            settings,
        })
    }
}

#[async_trait]
impl TextCompletion for GoogleCompletion {
    fn label(&self) -> &str {
        LABEL
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.base_or(GOOGLE_API_BASE),
            self.settings.model
        );
        let prompt = format!("{}\n\n{}", request.system, request.user);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        debug!(model = %self.settings.model, "gemini completion request");
        // Key goes in a header so it never appears in URLs or error strings.
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| classify_transport(LABEL, &err))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(
                LABEL,
                status.as_u16(),
                &text,
                &[400, 401, 403],
            ));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| LlmError::invalid_response(LABEL, err.to_string()))?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .ok_or_else(|| LlmError::invalid_response(LABEL, "response missing candidate text"))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}
