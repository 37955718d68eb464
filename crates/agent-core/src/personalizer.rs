use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use linkpilot_core_types::{truncate_note, ProspectContext};
use tracing::{info, warn};

use crate::errors::LlmError;
use crate::prompt::build_note_prompt;
use crate::provider::{CompletionRequest, ProviderSettings};
use crate::registry::ProviderRegistry;

/// Which backend to call, resolved once per invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"***")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct LlmSettings {
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-provider endpoint overrides, keyed by provider name.
    pub api_bases: BTreeMap<String, String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_tokens: 300,
            temperature: 0.7,
            api_bases: BTreeMap::new(),
        }
    }
}

/// Trim and cap a completion. Applied once here, whatever the backend.
pub fn finalize_note(raw: &str) -> String {
    truncate_note(raw.trim())
}

pub struct Personalizer {
    registry: Arc<ProviderRegistry>,
    settings: LlmSettings,
}

impl Personalizer {
    pub fn new(registry: Arc<ProviderRegistry>, settings: LlmSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Checks that need no network: provider known, key present.
    pub fn validate(&self, config: &ProviderConfig) -> Result<(), LlmError> {
        if !self.registry.contains(&config.provider) {
            return Err(LlmError::config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                config.provider,
                self.registry.names().join(", ")
            )));
        }
        if config.api_key.trim().is_empty() {
            return Err(LlmError::config("LLM API key missing (LLM_API_KEY)"));
        }
        Ok(())
    }

    pub async fn generate_note(
        &self,
        config: &ProviderConfig,
        prospect: &ProspectContext,
    ) -> Result<String, LlmError> {
        self.validate(config)?;
        let provider_key = config.provider.trim().to_ascii_lowercase();
        let backend = self.registry.build(
            &provider_key,
            ProviderSettings {
                model: config.model.clone(),
                api_key: config.api_key.clone(),
                api_base: self.settings.api_bases.get(&provider_key).cloned(),
                timeout: self.settings.timeout,
            },
        )?;

        let prompt = build_note_prompt(prospect);
        let request = CompletionRequest {
            system: prompt.system,
            user: prompt.user,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let raw = backend.complete(&request).await.map_err(|err| {
            warn!(provider = backend.label(), error = %err, "personalization failed");
            err
        })?;
        let note = finalize_note(&raw);
        if note.is_empty() {
            return Err(LlmError::invalid_response(backend.label(), "empty completion"));
        }
        info!(
            provider = backend.label(),
            model = %config.model,
            chars = note.chars().count(),
            "personalized note generated"
        );
        Ok(note)
    }
}
