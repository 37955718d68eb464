use std::collections::BTreeMap;
use std::time::Duration;

use action_primitives::WaitTimings;
use agent_core::LlmSettings;
use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};

use crate::selectors::SelectorCatalog;

/// Everything an invocation needs besides per-run secrets. Resolved once and
/// passed down by value.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub mode: ExecutionMode,
    pub site: SiteConfig,
    pub selectors: SelectorCatalog,
    pub timings: TimingsConfig,
    pub browser: CdpConfig,
    pub llm: LlmConfig,
    pub policy: PolicyConfig,
    pub server: ServerConfig,
    pub marketplace_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Authenticate, personalize and drive the browser in one process.
    #[default]
    Remote,
    /// Personalize only; return a command for a local executor.
    Split,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Split => "split",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    /// Registrable domain accepted in profile URLs.
    pub domain: String,
    pub cookie_name: String,
    pub cookie_domain: String,
    pub feed_path: String,
    pub login_path: String,
    pub checkpoint_markers: Vec<String>,
    pub login_markers: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com".to_string(),
            domain: "linkedin.com".to_string(),
            cookie_name: "li_at".to_string(),
            cookie_domain: ".linkedin.com".to_string(),
            feed_path: "/feed/".to_string(),
            login_path: "/login".to_string(),
            checkpoint_markers: vec!["checkpoint".to_string(), "challenge".to_string()],
            login_markers: vec!["login".to_string()],
        }
    }
}

impl SiteConfig {
    pub fn feed_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.feed_path)
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.login_path)
    }

    pub fn is_checkpoint(&self, url: &str) -> bool {
        self.checkpoint_markers.iter().any(|m| url.contains(m.as_str()))
    }

    pub fn is_login(&self, url: &str) -> bool {
        self.login_markers.iter().any(|m| url.contains(m.as_str()))
    }

    pub fn is_feed(&self, url: &str) -> bool {
        url.contains(self.feed_path.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TimingsConfig {
    pub navigation_timeout_ms: u64,
    pub login_timeout_ms: u64,
    pub network_idle_ms: u64,
    pub poll_interval_ms: u64,
    pub click_settle_ms: u64,
    pub step_settle_ms: u64,
    pub submit_settle_ms: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            login_timeout_ms: 30_000,
            network_idle_ms: 500,
            poll_interval_ms: 100,
            click_settle_ms: 2_000,
            step_settle_ms: 1_000,
            submit_settle_ms: 3_000,
        }
    }
}

impl TimingsConfig {
    pub fn to_wait_timings(&self) -> WaitTimings {
        WaitTimings {
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            login_timeout: Duration::from_millis(self.login_timeout_ms),
            network_idle_quiet: Duration::from_millis(self.network_idle_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            click_settle: Duration::from_millis(self.click_settle_ms),
            step_settle: Duration::from_millis(self.step_settle_ms),
            submit_settle: Duration::from_millis(self.submit_settle_ms),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub default_provider: String,
    /// Default model per provider name; unset providers use the registry default.
    pub models: BTreeMap<String, String>,
    pub api_bases: BTreeMap<String, String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let models = [
            ("anthropic", "claude-sonnet-4-5"),
            ("openai", "gpt-4o-mini"),
            ("google", "gemini-2.0-flash-exp"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            default_provider: "google".to_string(),
            models,
            api_bases: BTreeMap::new(),
            timeout_secs: 30,
            max_tokens: 300,
            temperature: 0.7,
        }
    }
}

impl LlmConfig {
    pub fn to_settings(&self) -> LlmSettings {
        LlmSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            api_bases: self.api_bases.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Report already-connected and already-pending as success.
    pub treat_satisfied_as_success: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn marketplace_url(&self) -> String {
        self.marketplace_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.server.bind))
    }
}
