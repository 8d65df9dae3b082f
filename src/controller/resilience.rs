//! Resilient task running
//!
//! Generic retry with backoff, per-attempt timeout, and a circuit breaker
//! that suspends automatic retries after repeated consecutive failures
//! until manually reset. The layout controller is one client; any async
//! computation can be wrapped the same way. The computation itself never
//! retries — policy lives entirely here.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Ceiling for any backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry policy for a resilient task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_strategy: BackoffStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed { delay_ms: u64 },
    /// Exponential backoff
    Exponential { initial_ms: u64, factor: f32 },
    /// No retry
    None,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_strategy: BackoffStrategy::Exponential {
                initial_ms: 1000,
                factor: 2.0,
            },
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following failed attempt `attempt` (1-based),
    /// capped at the 30 second ceiling
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_strategy {
            BackoffStrategy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            BackoffStrategy::Exponential { initial_ms, factor } => {
                let scaled =
                    initial_ms as f64 * (factor as f64).powi(attempt.saturating_sub(1) as i32);
                Duration::from_millis(scaled as u64)
            }
            BackoffStrategy::None => Duration::ZERO,
        };
        delay.min(MAX_BACKOFF)
    }

    /// Effective attempt budget; `BackoffStrategy::None` means one shot
    pub fn effective_attempts(&self) -> u32 {
        match self.backoff_strategy {
            BackoffStrategy::None => 1,
            _ => self.max_attempts.max(1),
        }
    }
}

/// Circuit breaker tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
        }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open: bool,
}

/// Disables automatic retries after repeated consecutive failures
///
/// Once open, the breaker stays open until [`CircuitBreaker::reset`] is
/// called; there is no automatic half-open probing.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }

    /// Record a successful attempt, clearing the failure streak
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = 0;
    }

    /// Record a failed attempt; returns true when this failure opened the
    /// breaker
    pub fn record_failure(&self) -> bool {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;
        if !state.open && state.consecutive_failures >= self.config.failure_threshold {
            state.open = true;
            tracing::warn!(
                failures = state.consecutive_failures,
                "circuit breaker opened"
            );
            return true;
        }
        false
    }

    /// Manually close the breaker and clear the failure streak
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.open = false;
        state.consecutive_failures = 0;
        tracing::info!("circuit breaker reset");
    }
}

/// Errors surfaced by the resilient runner
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("circuit breaker is open; manual reset required")]
    CircuitOpen,

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: String },
}

/// Wraps an async computation with retry, timeout, and breaker policy
pub struct ResilientRunner {
    policy: RetryPolicy,
    attempt_timeout: Option<Duration>,
    breaker: Arc<CircuitBreaker>,
}

impl ResilientRunner {
    pub fn new(
        policy: RetryPolicy,
        attempt_timeout: Option<Duration>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            policy,
            attempt_timeout,
            breaker,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `task`, retrying per policy. A timed-out attempt counts as a
    /// failure like any other. Opens the breaker on the configured streak
    /// and refuses to run while it is open.
    pub async fn run<T, E, F, Fut>(&self, mut task: F) -> Result<T, RunnerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if self.breaker.is_open() {
            return Err(RunnerError::CircuitOpen);
        }

        let attempts = self.policy.effective_attempts();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let outcome = match self.attempt_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, task()).await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(_) => Err(format!("attempt timed out after {timeout:?}")),
                },
                None => task().await.map_err(|e| e.to_string()),
            };

            match outcome {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(error) => {
                    tracing::warn!(attempt, %error, "resilient task attempt failed");
                    last_error = error;
                    self.breaker.record_failure();
                    if self.breaker.is_open() {
                        return Err(RunnerError::CircuitOpen);
                    }
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(RunnerError::ExhaustedRetries {
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn runner_with(policy: RetryPolicy, threshold: u32) -> ResilientRunner {
        ResilientRunner::new(
            policy,
            None,
            Arc::new(CircuitBreaker::new(BreakerConfig {
                failure_threshold: threshold,
            })),
        )
    }

    #[test]
    fn test_exponential_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        // Far along the curve, the 30 second ceiling holds.
        assert_eq!(policy.delay_for(20), Duration::from_secs(30));
    }

    #[test]
    fn test_none_strategy_is_single_shot() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_strategy: BackoffStrategy::None,
        };
        assert_eq!(policy.effective_attempts(), 1);
    }

    #[test]
    fn test_breaker_opens_at_threshold_and_resets() {
        let breaker = CircuitBreaker::new(BreakerConfig {
            failure_threshold: 3,
        });

        assert!(!breaker.record_failure());
        assert!(!breaker.record_failure());
        assert!(breaker.record_failure());
        assert!(breaker.is_open());

        breaker.reset();
        assert!(!breaker.is_open());
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn test_success_clears_streak() {
        let breaker = CircuitBreaker::default();
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_succeeds_first_try() {
        let runner = runner_with(RetryPolicy::default(), 3);

        let result: Result<u32, RunnerError> =
            runner.run(|| async { Ok::<_, String>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_retries_until_success() {
        let runner = runner_with(RetryPolicy::default(), 10);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_ref = calls.clone();
        let result = runner
            .run(move || {
                let calls = calls_ref.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_trips_breaker() {
        let runner = runner_with(RetryPolicy::default(), 3);

        let result: Result<(), _> = runner
            .run(|| async { Err::<(), _>("always failing".to_string()) })
            .await;
        assert!(matches!(result, Err(RunnerError::CircuitOpen)));

        // Still open: further runs refuse immediately.
        let again: Result<(), _> = runner.run(|| async { Ok::<(), String>(()) }).await;
        assert!(matches!(again, Err(RunnerError::CircuitOpen)));

        // Manual reset restores service.
        runner.breaker().reset();
        let healed: Result<(), _> = runner.run(|| async { Ok::<(), String>(()) }).await;
        assert!(healed.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let runner = ResilientRunner::new(
            RetryPolicy {
                max_attempts: 2,
                backoff_strategy: BackoffStrategy::Fixed { delay_ms: 10 },
            },
            Some(Duration::from_millis(50)),
            Arc::new(CircuitBreaker::new(BreakerConfig {
                failure_threshold: 10,
            })),
        );

        let result: Result<(), _> = runner
            .run(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<(), String>(())
            })
            .await;

        assert!(matches!(
            result,
            Err(RunnerError::ExhaustedRetries { attempts: 2, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_reports_last_error() {
        let runner = runner_with(
            RetryPolicy {
                max_attempts: 2,
                backoff_strategy: BackoffStrategy::Fixed { delay_ms: 1 },
            },
            10,
        );

        let result: Result<(), _> = runner
            .run(|| async { Err::<(), _>("boom".to_string()) })
            .await;

        match result {
            Err(RunnerError::ExhaustedRetries {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last_error, "boom");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
