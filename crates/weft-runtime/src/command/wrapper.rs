use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use weft_core::command::{BackoffPolicy, CommandError, CommandFailure, CommandState};

use super::scheduler::Scheduler;
use super::strategy::CommandExceptionHandlingStrategy;

/// Terminal result of a command, or the state it was left in.
pub type CommandResult = std::result::Result<CommandState, CommandError>;

/// Future returned by [`Command::execute`].
pub type CommandFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<(), CommandFailure>> + Send + 'a>>;

/// A remote effect that may be executed more than once.
pub trait Command: Send + Sync + 'static {
    /// Human-readable description used in logs and errors.
    fn describe(&self) -> String;

    /// Execute the command once.
    fn execute(&self) -> CommandFuture<'_>;
}

/// Awaits the terminal result of a command.
#[derive(Debug)]
pub struct CommandHandle {
    description: String,
    rx: oneshot::Receiver<CommandResult>,
}

impl CommandHandle {
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Wait until the command succeeded, was ignored, or failed for good.
    pub async fn outcome(self) -> CommandResult {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(CommandError::Exception {
                command: self.description,
                message: "command was dropped before completing".to_string(),
            }),
        }
    }
}

/// An in-flight command with its retry bookkeeping.
pub struct CommandWrapper {
    command: Arc<dyn Command>,
    description: String,
    strategy: Arc<dyn CommandExceptionHandlingStrategy>,
    max_retries: u32,
    retries: u32,
    attempts: u32,
    backoff: Duration,
    state: CommandState,
    completion: Option<oneshot::Sender<CommandResult>>,
}

impl CommandWrapper {
    /// Wrap a command. Failures are routed to `strategy`.
    pub fn new(
        command: Arc<dyn Command>,
        max_retries: u32,
        strategy: Arc<dyn CommandExceptionHandlingStrategy>,
    ) -> (Self, CommandHandle) {
        let description = command.describe();
        let (tx, rx) = oneshot::channel();
        let wrapper = Self {
            command,
            description: description.clone(),
            strategy,
            max_retries,
            retries: 0,
            attempts: 0,
            backoff: Duration::ZERO,
            state: CommandState::Pending,
            completion: Some(tx),
        };
        (wrapper, CommandHandle { description, rx })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Executions so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Retries scheduled so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay before the next retry.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn has_more_retries(&self) -> bool {
        self.retries < self.max_retries
    }

    /// Grow the retry delay.
    pub fn increase_backoff_using(&mut self, policy: &dyn BackoffPolicy) {
        self.backoff = policy.next_delay(self.backoff);
    }

    /// Hand the next execution to `scheduler`, delayed by the current backoff.
    pub fn schedule_execution_using(mut self, scheduler: &dyn Scheduler) {
        self.retries += 1;
        self.state = CommandState::RetryScheduled;
        let delay = self.backoff;
        scheduler.schedule(delay, Box::pin(self.execute()));
    }

    /// Execute once and route the outcome.
    pub async fn execute(mut self) {
        self.attempts += 1;
        self.state = CommandState::Pending;
        tracing::debug!(command = %self.description, attempt = self.attempts, "Executing command");

        let result = self.command.execute().await;
        match result {
            Ok(()) => self.complete(Ok(CommandState::Succeeded)),
            Err(failure) => {
                // The terminal result reaches the handle through `complete`.
                let strategy = self.strategy.clone();
                let _ = strategy.handle_command_error(self, failure);
            }
        }
    }

    /// Report a terminal result to the handle.
    pub fn complete(&mut self, result: CommandResult) {
        self.state = match &result {
            Ok(state) => *state,
            Err(_) => CommandState::Failed,
        };
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(result);
        }
    }
}

impl fmt::Display for CommandWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl fmt::Debug for CommandWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandWrapper")
            .field("command", &self.description)
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("retries", &self.retries)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish()
    }
}
