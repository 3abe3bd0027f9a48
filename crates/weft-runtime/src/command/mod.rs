//! Remote command execution with retries.

mod scheduler;
mod strategy;
mod wrapper;

pub use scheduler::{ScheduledTask, Scheduler, TokioScheduler};
pub use strategy::{CommandExceptionHandlingStrategy, DefaultCommandExceptionHandlingStrategy};
pub use wrapper::{Command, CommandFuture, CommandHandle, CommandResult, CommandWrapper};

use std::sync::Arc;

use weft_core::config::CommandConfig;
use weft_core::Result;

/// Start executing a command on the current tokio runtime.
///
/// Failures go through `strategy`; the handle resolves once the command
/// reaches a terminal state.
pub fn execute_command(
    command: Arc<dyn Command>,
    max_retries: u32,
    strategy: Arc<dyn CommandExceptionHandlingStrategy>,
) -> CommandHandle {
    let (wrapper, handle) = CommandWrapper::new(command, max_retries, strategy);
    tokio::spawn(wrapper.execute());
    handle
}

/// Executes commands with the retry budget and backoff of a `[command]`
/// configuration section.
#[derive(Clone)]
pub struct CommandExecutor {
    max_retries: u32,
    strategy: Arc<dyn CommandExceptionHandlingStrategy>,
}

impl CommandExecutor {
    pub fn new(max_retries: u32, strategy: Arc<dyn CommandExceptionHandlingStrategy>) -> Self {
        Self {
            max_retries,
            strategy,
        }
    }

    /// Default strategy scheduling retries on the current tokio runtime.
    pub fn from_config(config: &CommandConfig) -> Result<Self> {
        let strategy = DefaultCommandExceptionHandlingStrategy::new(
            Arc::new(config.backoff_config()),
            Arc::new(TokioScheduler::current()?),
        );
        Ok(Self::new(config.max_retries, Arc::new(strategy)))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn execute(&self, command: Arc<dyn Command>) -> CommandHandle {
        execute_command(command, self.max_retries, self.strategy.clone())
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}
