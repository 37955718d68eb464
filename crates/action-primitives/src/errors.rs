//! Error types for action primitives

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Navigation or an idle wait ran past its bound
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// A resolved element disappeared before it could be used
    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    /// The descriptor itself is malformed (empty text, invalid CSS)
    #[error("Invalid anchor: {0}")]
    InvalidAnchor(String),

    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ActionError::WaitTimeout(_) | ActionError::CdpIo(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ActionError::NavTimeout(_) | ActionError::WaitTimeout(_))
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let detail = err.to_string();
        match err.kind {
            AdapterErrorKind::NavTimeout => ActionError::NavTimeout(detail),
            AdapterErrorKind::TargetNotFound => ActionError::AnchorNotFound(detail),
            AdapterErrorKind::CdpIo | AdapterErrorKind::ScriptFailed => ActionError::CdpIo(detail),
            AdapterErrorKind::LaunchFailed | AdapterErrorKind::Internal => {
                ActionError::Internal(detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_timeout_maps_to_nav_timeout() {
        let err: ActionError = AdapterError::timeout("goto").into();
        assert!(err.is_timeout());
        assert!(matches!(err, ActionError::NavTimeout(_)));
    }

    #[test]
    fn missing_target_maps_to_anchor_not_found() {
        let err: ActionError = AdapterError::new(AdapterErrorKind::TargetNotFound).into();
        assert!(matches!(err, ActionError::AnchorNotFound(_)));
        assert!(!err.is_retryable());
    }
}
