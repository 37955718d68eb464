use std::collections::BTreeMap;
use std::sync::Arc;

use crate::anthropic::AnthropicCompletion;
use crate::errors::LlmError;
use crate::google::GoogleCompletion;
use crate::openai::OpenAiCompletion;
use crate::provider::{ProviderSettings, TextCompletion};

pub type ProviderFactory =
    Arc<dyn Fn(ProviderSettings) -> Result<Arc<dyn TextCompletion>, LlmError> + Send + Sync>;

#[derive(Clone)]
struct ProviderEntry {
    default_model: String,
    factory: ProviderFactory,
}

/// Name → adapter factory. Adding a backend means one `register` call.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    entries: BTreeMap<String, ProviderEntry>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Anthropic, OpenAI and Google adapters with their default models.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("anthropic", "claude-sonnet-4-5", |settings| {
            Ok(Arc::new(AnthropicCompletion::new(settings)?) as Arc<dyn TextCompletion>)
        });
        registry.register("openai", "gpt-4o-mini", |settings| {
            Ok(Arc::new(OpenAiCompletion::new(settings)?) as Arc<dyn TextCompletion>)
        });
        registry.register("google", "gemini-2.0-flash-exp", |settings| {
            Ok(Arc::new(GoogleCompletion::new(settings)?) as Arc<dyn TextCompletion>)
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, default_model: &str, factory: F)
    where
        F: Fn(ProviderSettings) -> Result<Arc<dyn TextCompletion>, LlmError> + Send + Sync + 'static,
    {
        self.entries.insert(
            normalize(name),
            ProviderEntry {
                default_model: default_model.to_string(),
                factory: Arc::new(factory),
            },
        );
    }

    /// Replace the default model of a registered provider.
    pub fn set_default_model(&mut self, name: &str, model: &str) -> bool {
        match self.entries.get_mut(&normalize(name)) {
            Some(entry) => {
                entry.default_model = model.to_string();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    pub fn default_model(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&normalize(name))
            .map(|entry| entry.default_model.as_str())
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Unknown names fail here, before any adapter exists.
    pub fn build(
        &self,
        name: &str,
        settings: ProviderSettings,
    ) -> Result<Arc<dyn TextCompletion>, LlmError> {
        let entry = self.entries.get(&normalize(name)).ok_or_else(|| {
            LlmError::config(format!(
                "Unknown LLM provider: {name}. Supported: {}",
                self.names().join(", ")
            ))
        })?;
        (entry.factory)(settings)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
