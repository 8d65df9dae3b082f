//! Continuous re-layout control
//!
//! Wraps an executor for streaming use: rapid layout requests are
//! debounced, at most one computation is in flight at a time, a cooldown
//! separates consecutive runs, and failures go through the resilient
//! runner so repeated breakage opens the circuit breaker instead of
//! hammering the engine. The core computation stays retry-free; all
//! policy lives here.

pub mod resilience;

pub use resilience::{
    BackoffStrategy, BreakerConfig, CircuitBreaker, ResilientRunner, RetryPolicy, RunnerError,
};

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::executor::{LayoutExecutor, LayoutRequest, ProgressSender};
use crate::layout::LayoutResult;

/// Controller tuning
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Quiet period before a request starts computing
    pub debounce: Duration,
    /// Minimum gap between the end of one run and the start of the next
    pub cooldown: Duration,
    /// Wall-clock budget per attempt; a timeout is a recoverable failure
    pub attempt_timeout: Option<Duration>,
    pub retry_policy: RetryPolicy,
    pub breaker: BreakerConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            cooldown: Duration::from_millis(500),
            attempt_timeout: Some(Duration::from_secs(30)),
            retry_policy: RetryPolicy::default(),
            breaker: BreakerConfig::default(),
        }
    }
}

/// Serializes and protects repeated layout computations
pub struct RelayoutController {
    executor: Arc<dyn LayoutExecutor>,
    config: ControllerConfig,
    runner: ResilientRunner,
    breaker: Arc<CircuitBreaker>,
    /// Held for the duration of one run; later requests queue behind it
    in_flight: tokio::sync::Mutex<()>,
    last_finished: Mutex<Option<Instant>>,
}

impl RelayoutController {
    pub fn new(executor: Arc<dyn LayoutExecutor>, config: ControllerConfig) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(config.breaker));
        let runner = ResilientRunner::new(
            config.retry_policy.clone(),
            config.attempt_timeout,
            breaker.clone(),
        );
        Self {
            executor,
            config,
            runner,
            breaker,
            in_flight: tokio::sync::Mutex::new(()),
            last_finished: Mutex::new(None),
        }
    }

    /// The shared breaker, for status displays and manual reset
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Re-enable automatic computation after the breaker opened
    pub fn reset(&self) {
        self.breaker.reset();
    }

    /// Debounce, then run one layout computation under the in-flight
    /// guard, respecting the cooldown since the previous run finished.
    pub async fn request_layout(
        &self,
        request: LayoutRequest,
        progress: Option<ProgressSender>,
    ) -> Result<LayoutResult, RunnerError> {
        if self.breaker.is_open() {
            return Err(RunnerError::CircuitOpen);
        }

        let run_id = Uuid::new_v4();
        tokio::time::sleep(self.config.debounce).await;

        let _guard = self.in_flight.lock().await;

        let last_finished = *self.last_finished.lock();
        if let Some(finished) = last_finished {
            let since = Instant::now().saturating_duration_since(finished);
            if since < self.config.cooldown {
                tokio::time::sleep(self.config.cooldown - since).await;
            }
        }

        tracing::debug!(%run_id, nodes = request.nodes.len(), "controller starting layout");

        let outcome = self
            .runner
            .run(|| self.executor.execute(request.clone(), progress.clone()))
            .await;

        *self.last_finished.lock() = Some(Instant::now());

        match &outcome {
            Ok(result) => {
                tracing::info!(%run_id, nodes = result.positions.len(), "controller layout complete")
            }
            Err(error) => tracing::warn!(%run_id, %error, "controller layout failed"),
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::InProcessExecutor;
    use crate::layout::LayoutError;
    use crate::simulation::SimulationConfig;
    use crate::value_objects::{Connection, GraphNode};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn small_request() -> LayoutRequest {
        LayoutRequest::new(
            vec![
                GraphNode::new("a", Utc::now()),
                GraphNode::new("b", Utc::now()),
            ],
            vec![Connection::new("a", "b", 0.9)],
        )
    }

    fn quick_config() -> ControllerConfig {
        ControllerConfig {
            debounce: Duration::from_millis(1),
            cooldown: Duration::from_millis(1),
            attempt_timeout: None,
            ..ControllerConfig::default()
        }
    }

    struct FailingExecutor {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LayoutExecutor for FailingExecutor {
        async fn execute(
            &self,
            _request: LayoutRequest,
            _progress: Option<ProgressSender>,
        ) -> Result<LayoutResult, LayoutError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LayoutError::WorkerFailed("synthetic failure".to_string()))
        }
    }

    #[tokio::test]
    async fn test_controller_computes_layout() {
        let executor = Arc::new(InProcessExecutor::new(SimulationConfig {
            iterations: 20,
            ..SimulationConfig::default()
        }));
        let controller = RelayoutController::new(executor, quick_config());

        let result = controller
            .request_layout(small_request(), None)
            .await
            .unwrap();
        assert_eq!(result.positions.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_controller_trips_breaker_on_persistent_failure() {
        let executor = Arc::new(FailingExecutor {
            calls: AtomicU32::new(0),
        });
        let controller = RelayoutController::new(executor.clone(), quick_config());

        let result = controller.request_layout(small_request(), None).await;
        assert!(matches!(result, Err(RunnerError::CircuitOpen)));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);

        // While open, requests are refused without touching the executor.
        let refused = controller.request_layout(small_request(), None).await;
        assert!(matches!(refused, Err(RunnerError::CircuitOpen)));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);

        // Manual reset restores service.
        controller.reset();
        let after_reset = controller.request_layout(small_request(), None).await;
        assert!(matches!(after_reset, Err(RunnerError::CircuitOpen)));
        assert!(executor.calls.load(Ordering::SeqCst) > 3);
    }

    #[tokio::test]
    async fn test_runs_are_serialized() {
        let executor = Arc::new(InProcessExecutor::new(SimulationConfig {
            iterations: 30,
            ..SimulationConfig::default()
        }));
        let controller = Arc::new(RelayoutController::new(executor, quick_config()));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.request_layout(small_request(), None).await })
        };
        let second = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.request_layout(small_request(), None).await })
        };

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
    }
}
