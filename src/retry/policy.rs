use crate::config::RetryConfig;
use crate::retry::{Classify, ErrorClass};
use rand::{rng, Rng};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Lower bound of the random fraction added to each backoff
pub const JITTER_MIN: f64 = 0.10;

/// Upper bound of the random fraction added to each backoff
pub const JITTER_MAX: f64 = 0.30;

/// Bookkeeping for one wrapped call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryContext {
    /// Attempts made, including the first
    pub attempts: u32,
    /// Backoff delays slept between attempts, in order
    pub delays: Vec<Duration>,
}

impl RetryContext {
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// Result of a wrapped call
///
/// A failure is a value, not a panic: the pipeline logs it, skips the item
/// and moves on.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success {
        value: T,
        context: RetryContext,
    },
    Failure {
        error: E,
        context: RetryContext,
        /// `Permanent` when the policy gave up without exhausting attempts
        class: ErrorClass,
    },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn context(&self) -> &RetryContext {
        match self {
            Self::Success { context, .. } | Self::Failure { context, .. } => context,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.context().attempts
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Failure { error, .. } => Err(error),
        }
    }
}

/// Exponential backoff with jitter for classified failures
///
/// # Backoff Strategy
///
/// After the failed attempt with zero-based index `n`, the policy sleeps
/// ```text
/// delay = min(base_delay * 2^n * (1 + jitter), max_delay),  jitter ∈ [0.10, 0.30]
/// ```
/// Permanent failures are returned after a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy making at most `max_attempts` attempts in total
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay()).with_max_delay(config.max_delay())
    }

    /// Caps any single backoff
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Largest delay that may follow attempt `attempt` (zero-based)
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        self.scaled(attempt, 1.0 + JITTER_MAX)
    }

    /// Draws the jittered delay that follows attempt `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter = rng().random_range(JITTER_MIN..=JITTER_MAX);
        self.scaled(attempt, 1.0 + jitter)
    }

    fn scaled(&self, attempt: u32, factor: f64) -> Duration {
        let exponent = 2f64.powi(attempt.min(30) as i32);
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * exponent * factor)
            .map(|delay| delay.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails permanently, or attempts
    /// run out
    ///
    /// `operation` receives the zero-based attempt index. `label` only
    /// appears in logs.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        let started = Instant::now();
        let mut context = RetryContext::default();

        loop {
            let attempt = context.attempts;
            context.attempts += 1;

            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(
                            label,
                            attempts = context.attempts,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Succeeded after retry"
                        );
                    }
                    return RetryOutcome::Success { value, context };
                }
                Err(error) => error,
            };

            let class = error.classify();
            if class == ErrorClass::Permanent {
                warn!(
                    label,
                    attempt = context.attempts,
                    error = %error,
                    "Permanent failure; not retrying"
                );
                return RetryOutcome::Failure {
                    error,
                    context,
                    class,
                };
            }

            if context.attempts >= self.max_attempts {
                error!(
                    label,
                    attempts = context.attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "Retries exhausted"
                );
                return RetryOutcome::Failure {
                    error,
                    context,
                    class,
                };
            }

            let delay = self.delay_for(attempt);
            warn!(
                label,
                attempt = context.attempts,
                max = self.max_attempts,
                ?delay,
                error = %error,
                "Attempt failed; backing off"
            );
            context.delays.push(delay);
            sleep(delay).await;
        }
    }
}
