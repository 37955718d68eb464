use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::KernelError;

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:to|with|for)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").expect("name regex")
});

/// Pulls the target profile URL and a best-guess person name out of free text.
#[derive(Debug, Clone)]
pub struct IntentExtractor {
    profile_url: Regex,
}

impl IntentExtractor {
    /// Accept profile URLs on `domain` (e.g. `linkedin.com`), with or
    /// without a `www.` prefix.
    pub fn for_domain(domain: &str) -> Result<Self, KernelError> {
        let domain = domain.trim().trim_start_matches("www.");
        if domain.is_empty() {
            return Err(KernelError::config("site domain must not be empty"));
        }
        let pattern = format!(
            r"https?://(?:www\.)?{}/(?:in|company)/[\w\-]+",
            regex::escape(domain)
        );
        let profile_url = Regex::new(&pattern)
            .map_err(|err| KernelError::config(format!("invalid profile pattern: {err}")))?;
        Ok(Self { profile_url })
    }

    /// First profile URL in `text`, if any.
    pub fn extract_profile_url(&self, text: &str) -> Option<String> {
        self.profile_url
            .find(text)
            .map(|m| m.as_str().to_string())
    }

    /// Capitalized word run following "to", "with" or "for". Empty when absent.
    pub fn extract_name(&self, text: &str) -> String {
        NAME_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}

/// Split-mode heuristic: a prompt mentioning "message" asks for a message.
pub fn infer_action_from_prompt(prompt: &str) -> linkpilot_core_types::ActionKind {
    if prompt.to_lowercase().contains("message") {
        linkpilot_core_types::ActionKind::Message
    } else {
        linkpilot_core_types::ActionKind::Connect
    }
}
