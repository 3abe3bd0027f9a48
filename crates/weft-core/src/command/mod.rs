mod backoff;
mod status;

pub use backoff::{BackoffConfig, BackoffPolicy, BackoffStrategy};
pub use status::{
    classify, CommandOutcome, FAILURE_CODES, IGNORABLE_FAILURE_CODES, RETRIABLE_CODES,
    SUCCESS_CODES,
};

use thiserror::Error;
use tonic::Code;

/// Why a remote command did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    /// The remote side answered with a status code.
    Status { code: Code, message: String },
    /// Anything that never produced a status (local errors, panics, decoding).
    Other(String),
}

impl CommandFailure {
    /// Create a status failure.
    pub fn status(code: Code, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Status code, if the failure carries one.
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::Other(_) => None,
        }
    }

    /// Classify this failure. Failures without a status are fatal.
    pub fn outcome(&self) -> CommandOutcome {
        self.code().map(classify).unwrap_or(CommandOutcome::Fatal)
    }
}

impl std::fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { code, message } => write!(f, "{:?}: {}", code, message),
            Self::Other(message) => write!(f, "{}", message),
        }
    }
}

impl From<tonic::Status> for CommandFailure {
    fn from(status: tonic::Status) -> Self {
        Self::Status {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Lifecycle of one in-flight remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Created or executing.
    Pending,
    /// Completed, or the remote reported the effect already applied.
    Succeeded,
    /// Failed in a way that makes the command moot.
    Ignored,
    /// Failed transiently and was rescheduled.
    RetryScheduled,
    /// Failed permanently.
    Failed,
}

impl CommandState {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Ignored => "ignored",
            Self::RetryScheduled => "retry_scheduled",
            Self::Failed => "failed",
        }
    }

    /// Whether no further execution will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Ignored | Self::Failed)
    }
}

/// Terminal command errors surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Could not execute {command} due to error of type '{code:?}' and no retries are left")]
    RetriesExhausted { command: String, code: Code },

    #[error("Could not execute {command} due to error of type '{code:?}'")]
    Failed { command: String, code: Code },

    #[error("Could not execute {command} due to exception: {message}")]
    Exception { command: String, message: String },
}

impl CommandError {
    /// Terminal status code, if the failure came from the remote side.
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::RetriesExhausted { code, .. } | Self::Failed { code, .. } => Some(*code),
            Self::Exception { .. } => None,
        }
    }

    /// Description of the command that failed.
    pub fn command(&self) -> &str {
        match self {
            Self::RetriesExhausted { command, .. }
            | Self::Failed { command, .. }
            | Self::Exception { command, .. } => command,
        }
    }
}
