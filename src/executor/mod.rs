//! Execution placements for layout computation
//!
//! The layout pipeline is synchronous and CPU-bound, so it must run off
//! any latency-sensitive thread. Two placements implement the same
//! contract: [`InProcessExecutor`] blocks a tokio worker thread directly,
//! while [`LayoutWorker`]/[`WorkerExecutor`] run the pipeline on a
//! dedicated thread and deliver progress and the final result as discrete
//! messages over crossbeam channels.

use async_trait::async_trait;
use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::layout::{LayoutError, LayoutOrchestrator, LayoutResult, ProgressEvent};
use crate::simulation::{CancelFlag, SimulationConfig};
use crate::value_objects::{Connection, GraphNode};

/// Capacity for worker command and message channels
const CHANNEL_CAPACITY: usize = 1000;

/// One layout computation request
#[derive(Debug, Clone, Default)]
pub struct LayoutRequest {
    pub nodes: Vec<GraphNode>,
    pub connections: Vec<Connection>,
    /// Cooperative cancellation for this run
    pub cancel: CancelFlag,
}

impl LayoutRequest {
    pub fn new(nodes: Vec<GraphNode>, connections: Vec<Connection>) -> Self {
        Self {
            nodes,
            connections,
            cancel: CancelFlag::new(),
        }
    }
}

/// Progress delivery for async executors
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// The execution contract both placements implement
#[async_trait]
pub trait LayoutExecutor: Send + Sync {
    /// Compute a layout, delivering progress events through `progress`
    async fn execute(
        &self,
        request: LayoutRequest,
        progress: Option<ProgressSender>,
    ) -> Result<LayoutResult, LayoutError>;
}

/// Runs the pipeline on a blocking tokio thread; progress events are
/// forwarded from the orchestrator's callback.
pub struct InProcessExecutor {
    orchestrator: Arc<LayoutOrchestrator>,
}

impl InProcessExecutor {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            orchestrator: Arc::new(LayoutOrchestrator::new(config)),
        }
    }
}

#[async_trait]
impl LayoutExecutor for InProcessExecutor {
    async fn execute(
        &self,
        request: LayoutRequest,
        progress: Option<ProgressSender>,
    ) -> Result<LayoutResult, LayoutError> {
        let orchestrator = self.orchestrator.clone();
        tokio::task::spawn_blocking(move || {
            orchestrator.compute(
                &request.nodes,
                &request.connections,
                |event| {
                    if let Some(tx) = &progress {
                        let _ = tx.send(event);
                    }
                },
                &request.cancel,
            )
        })
        .await
        .map_err(|e| LayoutError::WorkerFailed(e.to_string()))?
    }
}

/// Messages a layout worker delivers back to its owner
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Progress(ProgressEvent),
    Completed(LayoutResult),
    Failed(String),
}

enum WorkerCommand {
    Compute(LayoutRequest),
    Shutdown,
}

/// A dedicated layout thread driven by message passing
///
/// Commands flow in over a bounded channel; progress and results flow
/// back the same way. Progress messages are dropped when the owner falls
/// behind, but the terminal `Completed`/`Failed` message always waits for
/// channel space.
pub struct LayoutWorker {
    command_tx: Sender<WorkerCommand>,
    message_rx: Receiver<WorkerMessage>,
    handle: Option<JoinHandle<()>>,
}

impl LayoutWorker {
    /// Spawn the worker thread with its own orchestrator
    pub fn spawn(config: SimulationConfig) -> Self {
        let (command_tx, command_rx) = bounded::<WorkerCommand>(CHANNEL_CAPACITY);
        let (message_tx, message_rx) = bounded::<WorkerMessage>(CHANNEL_CAPACITY);

        let handle = std::thread::spawn(move || {
            let orchestrator = LayoutOrchestrator::new(config);

            while let Ok(command) = command_rx.recv() {
                match command {
                    WorkerCommand::Compute(request) => {
                        let progress_tx = message_tx.clone();
                        let outcome = orchestrator.compute(
                            &request.nodes,
                            &request.connections,
                            |event| {
                                let _ = progress_tx.try_send(WorkerMessage::Progress(event));
                            },
                            &request.cancel,
                        );

                        let terminal = match outcome {
                            Ok(result) => WorkerMessage::Completed(result),
                            Err(error) => {
                                tracing::warn!(%error, "layout worker run failed");
                                WorkerMessage::Failed(error.to_string())
                            }
                        };
                        if message_tx.send(terminal).is_err() {
                            break; // Owner dropped the receiver.
                        }
                    }
                    WorkerCommand::Shutdown => break,
                }
            }
        });

        Self {
            command_tx,
            message_rx,
            handle: Some(handle),
        }
    }

    /// Submit a computation request
    pub fn submit(&self, request: LayoutRequest) -> Result<(), LayoutError> {
        self.command_tx
            .send(WorkerCommand::Compute(request))
            .map_err(|_| LayoutError::ChannelClosed)
    }

    /// Drain all currently available messages without blocking
    pub fn drain_messages(&self) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.message_rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Block up to `timeout` for the next message
    pub fn recv_message(&self, timeout: Duration) -> Option<WorkerMessage> {
        self.message_rx.recv_timeout(timeout).ok()
    }

    /// A cloned handle to the message stream
    pub fn message_receiver(&self) -> Receiver<WorkerMessage> {
        self.message_rx.clone()
    }

    /// Stop the worker thread and wait for it to exit
    pub fn shutdown(mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Async adapter exposing a [`LayoutWorker`] through the executor contract
pub struct WorkerExecutor {
    worker: LayoutWorker,
}

impl WorkerExecutor {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            worker: LayoutWorker::spawn(config),
        }
    }
}

#[async_trait]
impl LayoutExecutor for WorkerExecutor {
    async fn execute(
        &self,
        request: LayoutRequest,
        progress: Option<ProgressSender>,
    ) -> Result<LayoutResult, LayoutError> {
        self.worker.submit(request)?;
        let messages = self.worker.message_receiver();

        tokio::task::spawn_blocking(move || loop {
            match messages.recv() {
                Ok(WorkerMessage::Progress(event)) => {
                    if let Some(tx) = &progress {
                        let _ = tx.send(event);
                    }
                }
                Ok(WorkerMessage::Completed(result)) => return Ok(result),
                Ok(WorkerMessage::Failed(reason)) => {
                    return Err(LayoutError::WorkerFailed(reason))
                }
                Err(_) => return Err(LayoutError::ChannelClosed),
            }
        })
        .await
        .map_err(|e| LayoutError::WorkerFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn small_request() -> LayoutRequest {
        let nodes = vec![
            GraphNode::new("a", Utc::now()),
            GraphNode::new("b", Utc::now()),
        ];
        let connections = vec![Connection::new("a", "b", 0.9)];
        LayoutRequest::new(nodes, connections)
    }

    fn fast_config() -> SimulationConfig {
        SimulationConfig {
            iterations: 20,
            ..SimulationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_in_process_executor_completes() {
        let executor = InProcessExecutor::new(fast_config());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = executor
            .execute(small_request(), Some(tx))
            .await
            .unwrap();

        assert_eq!(result.positions.len(), 2);

        let mut last = 0.0;
        while let Ok(event) = rx.try_recv() {
            assert!(event.percent >= last);
            last = event.percent;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_worker_executor_matches_contract() {
        let executor = WorkerExecutor::new(fast_config());

        let result = tokio_test::block_on(executor.execute(small_request(), None)).unwrap();
        assert_eq!(result.positions.len(), 2);
    }

    #[test]
    fn test_worker_message_stream() {
        let worker = LayoutWorker::spawn(fast_config());
        worker.submit(small_request()).unwrap();

        let mut completed = None;
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while completed.is_none() && std::time::Instant::now() < deadline {
            match worker.recv_message(Duration::from_millis(100)) {
                Some(WorkerMessage::Completed(result)) => completed = Some(result),
                Some(WorkerMessage::Failed(reason)) => panic!("worker failed: {reason}"),
                _ => {}
            }
        }

        let result = completed.expect("worker did not complete in time");
        assert_eq!(result.positions.len(), 2);
        worker.shutdown();
    }

    #[test]
    fn test_worker_shutdown_is_clean() {
        let worker = LayoutWorker::spawn(fast_config());
        worker.shutdown();
    }

    #[tokio::test]
    async fn test_cancelled_request_fails() {
        let executor = InProcessExecutor::new(fast_config());
        let request = small_request();
        request.cancel.cancel();

        let result = executor.execute(request, None).await;
        assert!(matches!(result, Err(LayoutError::Cancelled)));
    }
}
