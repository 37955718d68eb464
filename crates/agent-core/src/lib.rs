//! Personalization client.
//!
//! One capability, [`TextCompletion`], implemented by an adapter per backend
//! and selected by name through [`ProviderRegistry`]. [`Personalizer`] builds
//! the prompt, dispatches, and applies the shared post-processing.

pub mod anthropic;
pub mod errors;
pub mod google;
pub mod openai;
pub mod personalizer;
pub mod prompt;
pub mod provider;
pub mod registry;

pub use errors::LlmError;
pub use personalizer::{finalize_note, LlmSettings, Personalizer, ProviderConfig};
pub use prompt::{build_note_prompt, NotePrompt};
pub use provider::{CompletionRequest, MockCompletion, ProviderSettings, TextCompletion};
pub use registry::{ProviderFactory, ProviderRegistry};
