use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maps the current retry delay to the next one.
pub trait BackoffPolicy: Send + Sync {
    /// Delay to use for the next attempt, given the delay used so far
    /// (`Duration::ZERO` before the first retry).
    fn next_delay(&self, current: Duration) -> Duration;
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay each time.
    Fixed,
    /// Delay grows by the initial delay each time.
    Linear,
    /// Delay is multiplied each time.
    #[default]
    Exponential,
}

/// Backoff configuration; the stock [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Backoff strategy.
    pub strategy: BackoffStrategy,
    /// Delay of the first retry, and the lower bound of every delay.
    pub initial: Duration,
    /// Upper bound of every delay.
    pub max: Duration,
    /// Growth factor for the exponential strategy.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::Exponential,
            initial: Duration::from_millis(50),
            max: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Calculate the backoff for a given attempt (1-based).
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let mut delay = self.next_delay(Duration::ZERO);
        for _ in 1..attempt {
            let next = self.next_delay(delay);
            if next == delay {
                break;
            }
            delay = next;
        }
        delay
    }

    fn factor(&self) -> f64 {
        if self.multiplier.is_finite() && self.multiplier >= 1.0 {
            self.multiplier
        } else {
            1.0
        }
    }
}

impl BackoffPolicy for BackoffConfig {
    fn next_delay(&self, current: Duration) -> Duration {
        let next = match self.strategy {
            BackoffStrategy::Fixed => self.initial,
            BackoffStrategy::Linear => current.saturating_add(self.initial),
            BackoffStrategy::Exponential => {
                let secs = (current.as_secs_f64() * self.factor()).min(self.max.as_secs_f64());
                Duration::from_secs_f64(secs)
            }
        };
        next.max(current).max(self.initial).min(self.max)
    }
}
