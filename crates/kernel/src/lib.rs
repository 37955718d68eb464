//! LinkPilot kernel: intent extraction, authentication, the connect/message
//! action engine, invocation coordination and the HTTP surfaces around it.

pub mod app_settings;
pub mod auth;
pub mod coordinator;
pub mod engine;
pub mod errors;
pub mod intent;
pub mod local;
pub mod metrics;
pub mod progress;
pub mod selectors;
pub mod server;

pub use app_settings::{
    Config, ExecutionMode, LlmConfig, PolicyConfig, ServerConfig, SiteConfig, TimingsConfig,
};
pub use auth::{AuthResolver, AuthResult, AuthStrategy};
pub use coordinator::{Coordinator, InvocationOptions, InvocationRequest, SecretKeys};
pub use engine::{classify_action_error, ActionEngine};
pub use errors::KernelError;
pub use intent::{infer_action_from_prompt, IntentExtractor};
pub use local::{last_data_object, LocalReport, LocalRunner, MarketplaceClient, PreparedAction};
pub use progress::{collect_events, progress_channel, ProgressReporter};
pub use selectors::SelectorCatalog;
pub use server::{build_router, serve, ServeState};
