//! 3D layout and camera positioning for knowledge-graph visualization
//!
//! This is the computation core of a knowledge-graph visualizer: it turns
//! a node list with pairwise similarity connections into 3D positions and
//! semantic clusters, then derives a camera pose that frames the result.
//! It does not render, fetch, or persist anything; callers own the node
//! records and apply positions and poses however they like.
//!
//! The pipeline runs clustering, time-axis ordering, initial placement,
//! force simulation, and re-centering in strict sequence, reporting
//! monotone progress through five named phases. For continuous use, the
//! controller layer adds debouncing, retry with backoff, and a circuit
//! breaker around either execution placement (in-process or
//! worker-offloaded).

pub mod camera;
pub mod clustering;
pub mod controller;
pub mod executor;
pub mod layout;
pub mod simulation;
pub mod spatial;
pub mod topology;
pub mod value_objects;

// Re-export main types
pub use value_objects::{
    CameraPose, Cluster, ClusterId, Connection, GraphNode, NodeId, Position3D,
};

// Re-export the layout pipeline
pub use layout::{
    LayoutError, LayoutOrchestrator, LayoutPhase, LayoutQualityMetrics, LayoutResult,
    ProgressEvent,
};

// Re-export simulation configuration
pub use simulation::{
    CancelFlag, ForceSimulationEngine, QualityPreset, SimulationConfig, SimulationError,
};

// Re-export spatial and topology analysis
pub use spatial::{Axis, AxisStatistics, BoundingVolume, SpatialNodeIndex};
pub use topology::{TopologyClass, TopologyClassifier, TopologyProfile, TopologyThresholds};

// Re-export camera positioning
pub use camera::{CameraOptions, CameraPositioner, GateConfig, RepositionGate, ViewingAngle};

// Re-export clustering
pub use clustering::ClusterBuilder;

// Re-export execution placements and the control loop
pub use controller::{
    BackoffStrategy, BreakerConfig, CircuitBreaker, ControllerConfig, RelayoutController,
    ResilientRunner, RetryPolicy, RunnerError,
};
pub use executor::{
    InProcessExecutor, LayoutExecutor, LayoutRequest, LayoutWorker, ProgressSender,
    WorkerExecutor, WorkerMessage,
};
