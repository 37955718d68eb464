//! Split-mode executor: fetch a prepared command from a coordinator, then
//! perform it in the user's own signed-in browser.

use std::sync::Arc;
use std::time::Duration;

use cdp_adapter::BrowserLauncher;
use linkpilot_core_types::{ActionKind, ActionOutcome, ActionRequest, AutomationCommand};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::app_settings::{Config, ExecutionMode};
use crate::auth::AuthStrategy;
use crate::coordinator::{InvocationOptions, InvocationRequest, MISSING_PROFILE_URL};
use crate::engine::ActionEngine;
use crate::errors::KernelError;
use crate::intent::{infer_action_from_prompt, IntentExtractor};
use crate::server::{EXECUTE_PATH, LLM_KEY_HEADER};

/// Last JSON object carried on a `data:` line of an SSE body.
pub fn last_data_object(body: &str) -> Option<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<Value>(data.trim()).ok())
        .filter(Value::is_object)
        .last()
}

/// What the coordinator prepared for local execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedAction {
    pub command: Option<AutomationCommand>,
    /// Personalized note or message when no command was returned.
    pub text: Option<String>,
}

impl PreparedAction {
    fn from_result(result: &Value) -> Result<Self, KernelError> {
        if result.get("success").and_then(Value::as_bool) != Some(true) {
            let reason = result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(KernelError::marketplace(reason));
        }
        let command = match result.get("command") {
            Some(raw) => Some(
                serde_json::from_value::<AutomationCommand>(raw.clone())
                    .map_err(|err| KernelError::InvalidCommand(err.to_string()))?,
            ),
            None => None,
        };
        let text = ["personalized_note", "message"]
            .iter()
            .filter_map(|field| result.get(*field).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
            .map(str::to_string);
        Ok(Self { command, text })
    }
}

pub struct MarketplaceClient {
    endpoint: Url,
    client: Client,
}

impl MarketplaceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, KernelError> {
        let base = Url::parse(base_url)
            .map_err(|err| KernelError::config(format!("invalid marketplace url {base_url}: {err}")))?;
        let endpoint = base
            .join(EXECUTE_PATH)
            .map_err(|err| KernelError::config(format!("invalid marketplace url {base_url}: {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| KernelError::config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn prepare(
        &self,
        request: &InvocationRequest,
        llm_key: &str,
    ) -> Result<PreparedAction, KernelError> {
        info!(endpoint = %self.endpoint, "requesting prepared command");
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(LLM_KEY_HEADER, llm_key)
            .json(request)
            .send()
            .await
            .map_err(|err| KernelError::marketplace(format!("Marketplace call failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(KernelError::marketplace(format!(
                "Marketplace API error: {}",
                status.as_u16()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|err| KernelError::marketplace(format!("Marketplace call failed: {err}")))?;
        let result = last_data_object(&body)
            .ok_or_else(|| KernelError::marketplace("No response"))?;
        PreparedAction::from_result(&result)
    }
}

/// Outcome of one local run, ready to print.
#[derive(Debug, Clone)]
pub struct LocalReport {
    pub request: ActionRequest,
    pub full_name: String,
    pub outcome: ActionOutcome,
}

pub struct LocalRunner {
    client: MarketplaceClient,
    launcher: Arc<dyn BrowserLauncher>,
    engine: ActionEngine,
    extractor: IntentExtractor,
}

impl LocalRunner {
    pub fn new(
        config: &Config,
        client: MarketplaceClient,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Result<Self, KernelError> {
        Ok(Self {
            client,
            launcher,
            engine: ActionEngine::new(config),
            extractor: IntentExtractor::for_domain(&config.site.domain)?,
        })
    }

    pub fn with_engine(mut self, engine: ActionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub async fn run(&self, prompt: &str, llm_key: &str) -> Result<LocalReport, KernelError> {
        if llm_key.trim().is_empty() {
            return Err(KernelError::config("LLM API key missing (LLM_API_KEY)"));
        }
        let profile_url = self
            .extractor
            .extract_profile_url(prompt)
            .ok_or_else(|| KernelError::InvalidCommand(MISSING_PROFILE_URL.to_string()))?;
        let action = infer_action_from_prompt(prompt);
        let full_name = self.extractor.extract_name(prompt);

        let invocation = InvocationRequest {
            prompt: prompt.to_string(),
            language: "en".to_string(),
            options: InvocationOptions {
                action: Some(action.as_str().to_string()),
                personalize: Some(true),
                full_name: (!full_name.is_empty()).then(|| full_name.clone()),
                // The prompt doubles as the draft to personalize.
                message_text: (action == ActionKind::Message).then(|| prompt.to_string()),
                ..InvocationOptions::default()
            },
            mode: Some(ExecutionMode::Split),
        };

        let prepared = self.client.prepare(&invocation, llm_key).await?;
        let request = match &prepared.command {
            Some(command) => command
                .to_request()
                .map_err(|err| KernelError::InvalidCommand(err.to_string()))?,
            None => match action {
                ActionKind::Connect => ActionRequest::connect(profile_url, prepared.text.clone()),
                ActionKind::Message => {
                    ActionRequest::message(profile_url, prepared.text.clone().unwrap_or_default())
                        .map_err(|err| KernelError::InvalidCommand(err.to_string()))?
                }
            },
        };
        if let Some(text) = &request.text {
            info!(chars = text.chars().count(), "prepared text received");
        }

        let outcome = self
            .engine
            .execute(self.launcher.as_ref(), &AuthStrategy::ExistingProfile, &request)
            .await;
        if !outcome.success() {
            warn!(failure = ?outcome.error_kind(), "local run failed");
        }
        Ok(LocalReport {
            request,
            full_name,
            outcome,
        })
    }
}
