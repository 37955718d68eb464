use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use agent_core::{Personalizer, ProviderConfig, ProviderRegistry};
use cdp_adapter::BrowserLauncher;
use linkpilot_core_types::{
    truncate_chars, ActionKind, ActionRequest, AutomationCommand, Credentials, FailureKind,
    ProgressEvent, ProspectContext, RunId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};

use crate::app_settings::{Config, ExecutionMode};
use crate::auth::AuthStrategy;
use crate::engine::ActionEngine;
use crate::errors::KernelError;
use crate::intent::IntentExtractor;
use crate::metrics;
use crate::progress::{collect_events, progress_channel, ProgressReporter};

pub const SESSION_COOKIE_KEY: &str = "LINKEDIN_SESSION_COOKIE";
pub const EMAIL_KEY: &str = "LINKEDIN_EMAIL";
pub const PASSWORD_KEY: &str = "LINKEDIN_PASSWORD";
pub const LLM_API_KEY: &str = "LLM_API_KEY";
pub const LLM_PROVIDER_KEY: &str = "LLM_PROVIDER";
pub const LLM_MODEL_KEY: &str = "LLM_MODEL";

const KNOWN_KEYS: [&str; 6] = [
    SESSION_COOKIE_KEY,
    EMAIL_KEY,
    PASSWORD_KEY,
    LLM_API_KEY,
    LLM_PROVIDER_KEY,
    LLM_MODEL_KEY,
];

pub const MISSING_AUTH: &str = "LinkedIn authentication missing. Provide either:\n\
1. LINKEDIN_SESSION_COOKIE (recommended - no security checkpoints)\n\
2. LINKEDIN_EMAIL + LINKEDIN_PASSWORD (may trigger security verification)";
pub const MISSING_PROFILE_URL: &str =
    "No LinkedIn profile URL found in prompt. Example: https://linkedin.com/in/username";
pub const PASSWORD_AUTH_WARNING: &str =
    "Using password auth - may encounter security checkpoint. Consider using session cookie instead.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationOptions {
    pub action: Option<String>,
    pub personalize: Option<bool>,
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub message_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub prompt: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub options: InvocationOptions,
    /// Overrides the configured execution mode for this invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
}

fn default_language() -> String {
    "en".to_string()
}

impl InvocationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            language: default_language(),
            options: InvocationOptions::default(),
            mode: None,
        }
    }
}

/// Per-invocation secrets, keyed by their environment variable names.
/// Never persisted; `Debug` lists key names only.
#[derive(Clone, Default)]
pub struct SecretKeys(BTreeMap<String, String>);

impl SecretKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known keys present in the process environment.
    pub fn from_env() -> Self {
        let mut keys = Self::new();
        for name in KNOWN_KEYS {
            if let Ok(value) = std::env::var(name) {
                keys.insert(name, value);
            }
        }
        keys
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Entries in `other` win.
    pub fn merge(&mut self, other: SecretKeys) {
        self.0.extend(other.0);
    }

    /// Non-blank value, trimmed.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::resolve(
            self.get(SESSION_COOKIE_KEY),
            self.get(EMAIL_KEY),
            self.get(PASSWORD_KEY),
        )
    }
}

impl fmt::Debug for SecretKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

impl FromIterator<(String, String)> for SecretKeys {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validated, defaulted view of one invocation. Built before any event.
struct Plan {
    mode: ExecutionMode,
    action: ActionKind,
    profile_url: String,
    full_name: String,
    prospect: ProspectContext,
    message_text: Option<String>,
    provider: Option<ProviderConfig>,
    strategy: Option<AuthStrategy>,
}

/// Runs one invocation end to end and reports it through a progress log.
pub struct Coordinator {
    config: Arc<Config>,
    personalizer: Arc<Personalizer>,
    launcher: Arc<dyn BrowserLauncher>,
    engine: ActionEngine,
    extractor: IntentExtractor,
}

impl Coordinator {
    pub fn new(config: Arc<Config>, launcher: Arc<dyn BrowserLauncher>) -> Result<Self, KernelError> {
        config.selectors.validate().map_err(KernelError::config)?;
        let mut registry = ProviderRegistry::with_builtin();
        for (name, model) in &config.llm.models {
            if !registry.set_default_model(name, model) {
                warn!(provider = %name, "default model configured for unknown provider");
            }
        }
        let personalizer = Personalizer::new(Arc::new(registry), config.llm.to_settings());
        Ok(Self {
            extractor: IntentExtractor::for_domain(&config.site.domain)?,
            engine: ActionEngine::new(&config),
            personalizer: Arc::new(personalizer),
            launcher,
            config,
        })
    }

    pub fn with_personalizer(mut self, personalizer: Arc<Personalizer>) -> Self {
        self.personalizer = personalizer;
        self
    }

    pub fn with_engine(mut self, engine: ActionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run to completion, emitting exactly one terminal event on `reporter`.
    pub async fn execute(
        &self,
        request: InvocationRequest,
        keys: &SecretKeys,
        reporter: ProgressReporter,
    ) {
        let run_id = RunId::new();
        let mode = request.mode.unwrap_or(self.config.mode);
        let span = info_span!("invocation", run_id = %run_id, mode = mode.as_str());
        self.execute_inner(request, keys, reporter)
            .instrument(span)
            .await
    }

    /// Run and return the whole progress log.
    pub async fn execute_collect(
        &self,
        request: InvocationRequest,
        keys: &SecretKeys,
    ) -> Vec<ProgressEvent> {
        let (reporter, rx) = progress_channel();
        self.execute(request, keys, reporter).await;
        collect_events(rx).await
    }

    async fn execute_inner(
        &self,
        request: InvocationRequest,
        keys: &SecretKeys,
        reporter: ProgressReporter,
    ) {
        let plan = match self.plan(&request, keys) {
            Ok(plan) => plan,
            Err(message) => {
                warn!(error = %message, "invocation rejected");
                metrics::record_run("invalid", "error");
                reporter.error(message);
                return;
            }
        };
        info!(
            action = plan.action.as_str(),
            profile_url = %plan.profile_url,
            personalize = plan.provider.is_some(),
            "invocation accepted"
        );

        let action = plan.action.as_str();
        match self.carry_out(&plan, &reporter).await {
            Ok((payload, outcome)) => {
                metrics::record_run(action, outcome);
                reporter.result(payload);
            }
            Err(message) => {
                metrics::record_run(action, "error");
                reporter.error(message);
            }
        }
    }

    /// Every input check. Nothing here touches the network or the browser.
    fn plan(&self, request: &InvocationRequest, keys: &SecretKeys) -> Result<Plan, String> {
        let opts = &request.options;

        let mode = request.mode.unwrap_or(self.config.mode);
        let strategy = match mode {
            ExecutionMode::Remote => Some(AuthStrategy::Credentials(
                keys.credentials().ok_or_else(|| MISSING_AUTH.to_string())?,
            )),
            ExecutionMode::Split => None,
        };

        let action = match opts.action.as_deref().map(str::trim) {
            None | Some("") => ActionKind::Connect,
            Some(raw) => raw.parse::<ActionKind>().map_err(|err| err.to_string())?,
        };
        let personalize = opts.personalize.unwrap_or(true);

        let provider = if personalize {
            let config = self.provider_config(keys);
            self.personalizer
                .validate(&config)
                .map_err(|err| err.to_string())?;
            Some(config)
        } else {
            None
        };

        let profile_url = self
            .extractor
            .extract_profile_url(&request.prompt)
            .ok_or_else(|| MISSING_PROFILE_URL.to_string())?;

        let message_text = match action {
            ActionKind::Message => {
                let text = non_blank(opts.message_text.as_deref()).ok_or_else(|| {
                    linkpilot_core_types::CoreError::EmptyMessage.to_string()
                })?;
                Some(text.to_string())
            }
            ActionKind::Connect => None,
        };

        let full_name = non_blank(opts.full_name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| self.extractor.extract_name(&request.prompt));
        let prospect = ProspectContext {
            full_name: full_name.clone(),
            title: opts.title.clone().unwrap_or_default(),
            company: opts.company.clone().unwrap_or_default(),
            profile_url: profile_url.clone(),
            base_message: None,
        };

        Ok(Plan {
            mode,
            action,
            profile_url,
            full_name,
            prospect,
            message_text,
            provider,
            strategy,
        })
    }

    fn provider_config(&self, keys: &SecretKeys) -> ProviderConfig {
        let provider = keys
            .get(LLM_PROVIDER_KEY)
            .unwrap_or(self.config.llm.default_provider.as_str())
            .to_ascii_lowercase();
        let model = keys
            .get(LLM_MODEL_KEY)
            .map(str::to_string)
            .or_else(|| {
                self.personalizer
                    .registry()
                    .default_model(&provider)
                    .map(str::to_string)
            })
            .unwrap_or_default();
        ProviderConfig {
            provider,
            model,
            api_key: keys.get(LLM_API_KEY).unwrap_or_default().to_string(),
        }
    }

    async fn carry_out(
        &self,
        plan: &Plan,
        reporter: &ProgressReporter,
    ) -> Result<(Value, &'static str), String> {
        if let Some(AuthStrategy::Credentials(Credentials::Password { .. })) = &plan.strategy {
            reporter.status(PASSWORD_AUTH_WARNING);
        }
        reporter.status(format!("Found LinkedIn profile: {}", plan.profile_url));

        let request = match plan.action {
            ActionKind::Connect => {
                let note = match &plan.provider {
                    Some(provider) => {
                        reporter.status("Generating personalized connection note...");
                        let note = self.personalize(provider, &plan.prospect).await?;
                        reporter.status(format!(
                            "Generated note: \"{}...\"",
                            truncate_chars(&note, 50)
                        ));
                        Some(note)
                    }
                    None => None,
                };
                ActionRequest::connect(plan.profile_url.clone(), note)
            }
            ActionKind::Message => {
                let mut text = plan.message_text.clone().unwrap_or_default();
                if let Some(provider) = &plan.provider {
                    reporter.status("Personalizing message with AI...");
                    let prospect = ProspectContext {
                        base_message: Some(text.clone()),
                        ..plan.prospect.clone()
                    };
                    text = self.personalize(provider, &prospect).await?;
                }
                ActionRequest::message(plan.profile_url.clone(), text)
                    .map_err(|err| err.to_string())?
            }
        };

        match plan.mode {
            ExecutionMode::Split => {
                reporter.status("Prepared command for local execution");
                Ok((self.command_payload(plan, &request), "command"))
            }
            ExecutionMode::Remote => self
                .perform(plan, &request, reporter)
                .await
                .map(|payload| (payload, "success")),
        }
    }

    async fn personalize(
        &self,
        provider: &ProviderConfig,
        prospect: &ProspectContext,
    ) -> Result<String, String> {
        match self.personalizer.generate_note(provider, prospect).await {
            Ok(note) => {
                metrics::record_llm_request(&provider.provider, "ok");
                Ok(note)
            }
            Err(err) => {
                metrics::record_llm_request(&provider.provider, err.kind());
                Err(format!("Personalization failed: {err}"))
            }
        }
    }

    async fn perform(
        &self,
        plan: &Plan,
        request: &ActionRequest,
        reporter: &ProgressReporter,
    ) -> Result<Value, String> {
        let strategy = plan
            .strategy
            .as_ref()
            .ok_or_else(|| MISSING_AUTH.to_string())?;
        reporter.status(match request.kind {
            ActionKind::Connect => "Sending LinkedIn connection request...",
            ActionKind::Message => "Sending LinkedIn message...",
        });

        let outcome = self
            .engine
            .execute(self.launcher.as_ref(), strategy, request)
            .await;
        if outcome.success() {
            return Ok(success_payload(plan, request));
        }

        let kind = outcome
            .error_kind()
            .cloned()
            .unwrap_or_else(|| FailureKind::UnknownAutomationError("no outcome".to_string()));
        if kind.is_goal_satisfied() && self.config.policy.treat_satisfied_as_success {
            info!(failure = ?kind, "goal already satisfied, reporting success");
            let mut payload = success_payload(plan, request);
            payload["already_satisfied"] = Value::Bool(true);
            payload[status_field(request.kind)] = Value::String(kind.message());
            return Ok(payload);
        }
        Err(match request.kind {
            ActionKind::Connect => format!("Failed to send connection: {kind}"),
            ActionKind::Message => format!("Failed to send message: {kind}"),
        })
    }

    fn command_payload(&self, plan: &Plan, request: &ActionRequest) -> Value {
        let command = AutomationCommand::new(request, plan.full_name.clone());
        let mut payload = json!({
            "success": true,
            "action": request.kind.as_str(),
            "linkedin_url": plan.profile_url,
            "command": command,
        });
        match request.kind {
            ActionKind::Connect => payload["personalized_note"] = json!(request.text),
            ActionKind::Message => payload["message"] = json!(request.text),
        }
        payload
    }
}

fn status_field(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Connect => "message",
        ActionKind::Message => "status",
    }
}

fn success_payload(plan: &Plan, request: &ActionRequest) -> Value {
    let target = if plan.full_name.is_empty() {
        plan.profile_url.as_str()
    } else {
        plan.full_name.as_str()
    };
    match request.kind {
        ActionKind::Connect => json!({
            "success": true,
            "action": "connect",
            "linkedin_url": plan.profile_url,
            "personalized_note": request.text,
            "message": format!("Connection request sent to {target}"),
        }),
        ActionKind::Message => json!({
            "success": true,
            "action": "message",
            "linkedin_url": plan.profile_url,
            "message": request.text,
            "status": format!("Message sent to {target}"),
        }),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
