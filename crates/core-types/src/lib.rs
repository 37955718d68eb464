use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Maximum number of characters the site accepts in a connection note.
pub const NOTE_LIMIT: usize = 300;

/// Type tag carried by split-mode commands.
pub const AUTOMATION_COMMAND_TYPE: &str = "linkedin_automation";

/// Truncate text to [`NOTE_LIMIT`] characters. Re-applying is a no-op.
pub fn truncate_note(text: &str) -> String {
    truncate_chars(text, NOTE_LIMIT)
}

/// Truncate on a character boundary.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown action: {0}. Use 'connect' or 'message'")]
    UnknownAction(String),
    #[error("Message text required for 'message' action (provide in options.message_text)")]
    EmptyMessage,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secrets used to open an authenticated session. Built once per run and
/// dropped with it.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Cookie { token: String },
    Password { email: String, password: String },
}

/// Trimmed value, or `None` when absent or blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl Credentials {
    /// Pick a strategy from whatever the caller supplied. A session token
    /// always wins over email and password.
    pub fn resolve(
        cookie: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Option<Self> {
        if let Some(token) = present(cookie) {
            return Some(Self::Cookie {
                token: token.to_string(),
            });
        }
        match (present(email), present(password)) {
            (Some(email), Some(_)) => Some(Self::Password {
                email: email.to_string(),
                password: password.unwrap_or_default().to_string(),
            }),
            _ => None,
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Cookie { .. } => "cookie",
            Self::Password { .. } => "password",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cookie { .. } => f.debug_struct("Cookie").field("token", &"***").finish(),
            Self::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"***")
                .finish(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Connect,
    Message,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "connect" => Ok(Self::Connect),
            "message" => Ok(Self::Message),
            _ => Err(CoreError::UnknownAction(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub profile_url: String,
    pub text: Option<String>,
}

impl ActionRequest {
    /// Connect request; a note is trimmed, truncated, and dropped when blank.
    pub fn connect(profile_url: impl Into<String>, note: Option<String>) -> Self {
        let text = note
            .map(|n| truncate_note(n.trim()))
            .filter(|n| !n.is_empty());
        Self {
            kind: ActionKind::Connect,
            profile_url: profile_url.into(),
            text,
        }
    }

    pub fn message(
        profile_url: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CoreError::EmptyMessage);
        }
        Ok(Self {
            kind: ActionKind::Message,
            profile_url: profile_url.into(),
            text: Some(text),
        })
    }

    pub fn note(&self) -> Option<&str> {
        match self.kind {
            ActionKind::Connect => self.text.as_deref(),
            ActionKind::Message => None,
        }
    }
}

/// Facts about the person being contacted, fed to personalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProspectContext {
    pub full_name: String,
    pub title: String,
    pub company: String,
    pub profile_url: String,
    pub base_message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    ExpiredOrInvalidSession,
    SecurityCheckpoint,
    MissingCredentialFields,
    NotLoggedIn,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ExpiredOrInvalidSession => {
                "Session cookie expired or invalid. Please provide a fresh cookie."
            }
            Self::SecurityCheckpoint => {
                "Security checkpoint detected. Please use session cookie authentication instead."
            }
            Self::MissingCredentialFields => "Login form fields not found on the sign-in page",
            Self::NotLoggedIn => "Not logged in. Please log in with your browser first.",
        }
    }
}

/// Terminal classification of a failed run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureKind {
    AuthFailure(AuthFailure),
    ControlNotFound,
    AlreadyRequested,
    AlreadyConnected,
    NotConnected,
    SubmitControlNotFound,
    InputFieldNotFound,
    Timeout,
    UnknownAutomationError(String),
}

impl FailureKind {
    pub fn message(&self) -> String {
        match self {
            Self::AuthFailure(reason) => reason.message().to_string(),
            Self::ControlNotFound => "Connect button not found on profile".into(),
            Self::AlreadyRequested => "Connection request already sent".into(),
            Self::AlreadyConnected => "Already connected with this person".into(),
            Self::NotConnected => {
                "Message button not found. Are you connected with this person?".into()
            }
            Self::SubmitControlNotFound => "Send button not found".into(),
            Self::InputFieldNotFound => "Message input field not found".into(),
            Self::Timeout => "Operation timed out (the site might be slow)".into(),
            Self::UnknownAutomationError(detail) => format!("Automation error: {detail}"),
        }
    }

    /// The relationship the caller asked for already exists.
    pub fn is_goal_satisfied(&self) -> bool {
        matches!(self, Self::AlreadyRequested | Self::AlreadyConnected)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Authenticating,
    Navigated,
    ButtonLocated,
    NotePending,
    Submitted,
    Success,
    Failed,
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Optional steps that were attempted and skipped without failing the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkippedStep {
    NoteAffordanceMissing,
    NoteFieldMissing,
}

/// Result of one engine run. Built once at the terminal transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    success: bool,
    error_kind: Option<FailureKind>,
    skipped: Vec<SkippedStep>,
    trace: Vec<EngineState>,
}

impl ActionOutcome {
    pub fn succeeded(trace: Vec<EngineState>, skipped: Vec<SkippedStep>) -> Self {
        Self {
            success: true,
            error_kind: None,
            skipped,
            trace,
        }
    }

    pub fn failed(kind: FailureKind, trace: Vec<EngineState>, skipped: Vec<SkippedStep>) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
            skipped,
            trace,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error_kind(&self) -> Option<&FailureKind> {
        self.error_kind.as_ref()
    }

    pub fn skipped(&self) -> &[SkippedStep] {
        &self.skipped
    }

    pub fn trace(&self) -> &[EngineState] {
        &self.trace
    }

    pub fn final_state(&self) -> EngineState {
        self.trace.last().copied().unwrap_or(EngineState::Idle)
    }
}

/// Structured instruction handed to a local executor in split mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationCommand {
    #[serde(rename = "type")]
    pub command_type: String,
    pub action: ActionKind,
    pub profile_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub full_name: String,
}

impl AutomationCommand {
    pub fn new(request: &ActionRequest, full_name: impl Into<String>) -> Self {
        let (note, message) = match request.kind {
            ActionKind::Connect => (request.text.clone(), None),
            ActionKind::Message => (None, request.text.clone()),
        };
        Self {
            command_type: AUTOMATION_COMMAND_TYPE.to_string(),
            action: request.kind,
            profile_url: request.profile_url.clone(),
            note,
            message,
            full_name: full_name.into(),
        }
    }

    /// Rebuild the engine request this command describes.
    pub fn to_request(&self) -> Result<ActionRequest, CoreError> {
        match self.action {
            ActionKind::Connect => Ok(ActionRequest::connect(
                self.profile_url.clone(),
                self.note.clone(),
            )),
            ActionKind::Message => ActionRequest::message(
                self.profile_url.clone(),
                self.message.clone().unwrap_or_default(),
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Status,
    Result,
    Error,
}

impl ProgressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Result => "result",
            Self::Error => "error",
        }
    }
}

/// One entry of the append-only progress log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProgressEvent {
    Status(String),
    Result(Value),
    Error(String),
}

impl ProgressEvent {
    pub fn kind(&self) -> ProgressKind {
        match self {
            Self::Status(_) => ProgressKind::Status,
            Self::Result(_) => ProgressKind::Result,
            Self::Error(_) => ProgressKind::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Status(_))
    }

    /// The payload alone, as carried in an SSE `data:` line.
    pub fn payload(&self) -> Value {
        match self {
            Self::Status(text) | Self::Error(text) => Value::String(text.clone()),
            Self::Result(value) => value.clone(),
        }
    }
}
