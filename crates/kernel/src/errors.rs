use thiserror::Error;

/// Errors outside a run's progress stream: setup, configuration, transport.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("marketplace request failed: {0}")]
    Marketplace(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl KernelError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn marketplace(message: impl Into<String>) -> Self {
        Self::Marketplace(message.into())
    }
}
