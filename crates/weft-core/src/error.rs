use thiserror::Error;

use crate::command::CommandError;

/// Core error type for weft operations.
#[derive(Error, Debug)]
pub enum WeftError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Topology unavailable: {0}")]
    Topology(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A token was consumed from a scope whose queue is empty.
    #[error("No deferred token recorded for scope instance {scope_instance_key}")]
    NoDeferredToken { scope_instance_key: i64 },

    /// Processing a record hit a structural invariant violation. Never retried.
    #[error(
        "Invariant violated in workflow instance {workflow_instance_key} \
         (record {record_key}, element '{element_id}'): {reason}"
    )]
    InvariantViolation {
        workflow_instance_key: i64,
        record_key: i64,
        element_id: String,
        reason: String,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl WeftError {
    /// Whether this error must stop processing instead of being absorbed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoDeferredToken { .. } | Self::InvariantViolation { .. } | Self::Command(_)
        )
    }

    /// Workflow instance the error is attributed to, if any.
    pub fn workflow_instance_key(&self) -> Option<i64> {
        match self {
            Self::InvariantViolation {
                workflow_instance_key,
                ..
            } => Some(*workflow_instance_key),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for WeftError {
    fn from(e: serde_json::Error) -> Self {
        WeftError::Serialization(e.to_string())
    }
}

/// Result type alias using WeftError.
pub type Result<T> = std::result::Result<T, WeftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_violation_is_fatal() {
        let err = WeftError::InvariantViolation {
            workflow_instance_key: 42,
            record_key: 7,
            element_id: "sub".into(),
            reason: "no deferred token".into(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.workflow_instance_key(), Some(42));
        let message = err.to_string();
        assert!(message.contains("42"));
        assert!(message.contains("no deferred token"));
    }

    #[test]
    fn test_config_error_is_not_fatal() {
        let err = WeftError::Config("bad".into());
        assert!(!err.is_fatal());
        assert_eq!(err.workflow_instance_key(), None);
    }
}
