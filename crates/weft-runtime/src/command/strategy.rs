use std::sync::Arc;

use weft_core::command::{
    classify, BackoffPolicy, CommandError, CommandFailure, CommandOutcome, CommandState,
};

use super::scheduler::Scheduler;
use super::wrapper::{CommandResult, CommandWrapper};

/// Decides what happens to a command that failed.
pub trait CommandExceptionHandlingStrategy: Send + Sync {
    /// Handle one failed execution.
    ///
    /// Either schedules another execution and returns
    /// `Ok(CommandState::RetryScheduled)`, or completes the command with the
    /// returned terminal result.
    fn handle_command_error(&self, command: CommandWrapper, failure: CommandFailure)
        -> CommandResult;
}

/// Retries transient failures with backoff, ignores failures meaning the
/// target is already gone, and fails on everything else.
pub struct DefaultCommandExceptionHandlingStrategy {
    backoff: Arc<dyn BackoffPolicy>,
    scheduler: Arc<dyn Scheduler>,
}

impl DefaultCommandExceptionHandlingStrategy {
    pub fn new(backoff: Arc<dyn BackoffPolicy>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self { backoff, scheduler }
    }
}

impl CommandExceptionHandlingStrategy for DefaultCommandExceptionHandlingStrategy {
    fn handle_command_error(
        &self,
        mut command: CommandWrapper,
        failure: CommandFailure,
    ) -> CommandResult {
        let result = match failure.code() {
            None => Err(CommandError::Exception {
                command: command.to_string(),
                message: failure.to_string(),
            }),
            Some(code) => match classify(code) {
                CommandOutcome::Success => Ok(CommandState::Succeeded),
                CommandOutcome::IgnorableFailure => {
                    tracing::warn!(
                        command = %command,
                        code = ?code,
                        "Ignoring the error of type '{:?}' during {}. The target might have been canceled or already completed",
                        code,
                        command
                    );
                    Ok(CommandState::Ignored)
                }
                CommandOutcome::Retriable if command.has_more_retries() => {
                    command.increase_backoff_using(self.backoff.as_ref());
                    tracing::warn!(
                        command = %command,
                        code = ?code,
                        retry = command.retries() + 1,
                        backoff = ?command.backoff(),
                        "Retrying command after error"
                    );
                    command.schedule_execution_using(self.scheduler.as_ref());
                    return Ok(CommandState::RetryScheduled);
                }
                CommandOutcome::Retriable => Err(CommandError::RetriesExhausted {
                    command: command.to_string(),
                    code,
                }),
                CommandOutcome::Fatal => Err(CommandError::Failed {
                    command: command.to_string(),
                    code,
                }),
            },
        };

        if let Err(e) = &result {
            tracing::error!(command = %command, error = %e, "Command failed");
        }
        command.complete(result.clone());
        result
    }
}
