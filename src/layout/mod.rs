//! Layout orchestration
//!
//! Sequences one layout run: semantic clustering, time-axis ordering,
//! initial placement, force simulation, and final re-centering on the
//! origin. Each step fully consumes the previous step's output and the
//! phases never overlap. Progress is reported as an ordered stream of
//! events with monotonically increasing percentages; callers drive UI
//! progress bars straight off it.

pub mod placement;
pub mod quality;

pub use quality::LayoutQualityMetrics;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::clustering::ClusterBuilder;
use crate::simulation::{CancelFlag, ForceSimulationEngine, SimulationConfig, SimulationError};
use crate::spatial::BoundingVolume;
use crate::value_objects::{Cluster, ClusterId, Connection, GraphNode, NodeId, Position3D};

/// The five sequential phases of a layout run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutPhase {
    ClusterCreation,
    TimeOrdering,
    InitialPlacement,
    Simulation,
    Finalization,
}

impl LayoutPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutPhase::ClusterCreation => "cluster-creation",
            LayoutPhase::TimeOrdering => "time-ordering",
            LayoutPhase::InitialPlacement => "initial-placement",
            LayoutPhase::Simulation => "simulation",
            LayoutPhase::Finalization => "finalization",
        }
    }
}

impl fmt::Display for LayoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One progress observation: percentage in [0, 100] plus the active phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub percent: f64,
    pub phase: LayoutPhase,
}

/// Progress milestones per phase. Simulation spans the range between the
/// placement milestone's end and the finalization start, proportional to
/// iterations completed.
const PROGRESS_CLUSTERS: f64 = 15.0;
const PROGRESS_TIME_ORDERING: f64 = 25.0;
const PROGRESS_PLACEMENT: f64 = 40.0;
const PROGRESS_SIMULATION_START: f64 = 50.0;
const PROGRESS_SIMULATION_END: f64 = 95.0;
const PROGRESS_DONE: f64 = 100.0;

/// Output of one layout run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// Final position per node, re-centered on the origin
    pub positions: IndexMap<NodeId, Position3D>,
    /// Cluster membership in discovery order
    pub clusters: IndexMap<ClusterId, Vec<NodeId>>,
    /// Diagnostics over the finished layout
    pub quality: LayoutQualityMetrics,
}

impl LayoutResult {
    /// An empty result for empty inputs
    pub fn empty() -> Self {
        Self {
            positions: IndexMap::new(),
            clusters: IndexMap::new(),
            quality: LayoutQualityMetrics::default(),
        }
    }

    /// The cluster map as owned value objects, in discovery order
    pub fn cluster_list(&self) -> Vec<Cluster> {
        self.clusters
            .iter()
            .map(|(id, members)| Cluster::new(*id, members.clone()))
            .collect()
    }
}

/// Errors surfaced by a layout run
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// A node or cluster member had no particle; inconsistent caller input
    #[error("no particle for node: {0}")]
    MissingParticle(NodeId),

    /// The run was cancelled between simulation iterations
    #[error("layout cancelled")]
    Cancelled,

    /// The worker thread running the layout died
    #[error("layout worker failed: {0}")]
    WorkerFailed(String),

    /// The channel to a worker closed before a result arrived
    #[error("layout channel closed")]
    ChannelClosed,
}

impl From<SimulationError> for LayoutError {
    fn from(error: SimulationError) -> Self {
        match error {
            SimulationError::MissingParticle(id) => LayoutError::MissingParticle(id),
            SimulationError::Cancelled => LayoutError::Cancelled,
        }
    }
}

/// Orchestrates the full layout pipeline
#[derive(Debug, Clone, Default)]
pub struct LayoutOrchestrator {
    engine: ForceSimulationEngine,
}

impl LayoutOrchestrator {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            engine: ForceSimulationEngine::new(config),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        self.engine.config()
    }

    /// Run the layout pipeline over caller-owned node snapshots.
    ///
    /// Empty input is a defined case: the result is empty, no simulation
    /// runs, and a single terminal progress event is emitted.
    pub fn compute(
        &self,
        nodes: &[GraphNode],
        connections: &[Connection],
        mut on_progress: impl FnMut(ProgressEvent),
        cancel: &CancelFlag,
    ) -> Result<LayoutResult, LayoutError> {
        let run_id = Uuid::new_v4();
        let config = *self.engine.config();

        if nodes.is_empty() {
            tracing::debug!(%run_id, "empty node set, returning empty layout");
            on_progress(ProgressEvent {
                percent: PROGRESS_DONE,
                phase: LayoutPhase::Finalization,
            });
            return Ok(LayoutResult::empty());
        }

        tracing::info!(
            %run_id,
            nodes = nodes.len(),
            connections = connections.len(),
            iterations = config.iterations,
            "starting layout run"
        );

        // Phase 1: semantic clustering.
        let clusters =
            ClusterBuilder::build_clusters(nodes, connections, config.similarity_threshold);
        on_progress(ProgressEvent {
            percent: PROGRESS_CLUSTERS,
            phase: LayoutPhase::ClusterCreation,
        });

        // Phase 2: time ordering onto the Z axis.
        let time_z = time_axis_offsets(nodes, config.time_spread);
        on_progress(ProgressEvent {
            percent: PROGRESS_TIME_ORDERING,
            phase: LayoutPhase::TimeOrdering,
        });

        // Phase 3: initial placement.
        let initial = placement::initial_placement(&clusters, &time_z, &config);
        on_progress(ProgressEvent {
            percent: PROGRESS_PLACEMENT,
            phase: LayoutPhase::InitialPlacement,
        });

        // Phase 4: force simulation.
        let simulation_span = PROGRESS_SIMULATION_END - PROGRESS_SIMULATION_START;
        let positions = self.engine.simulate(
            nodes,
            connections,
            &clusters,
            &initial,
            |done, total| {
                let fraction = done as f64 / total.max(1) as f64;
                on_progress(ProgressEvent {
                    percent: PROGRESS_SIMULATION_START + simulation_span * fraction,
                    phase: LayoutPhase::Simulation,
                });
            },
            cancel,
        )?;

        // Phase 5: re-center the layout on the origin.
        let positions = recenter(positions);
        let quality =
            LayoutQualityMetrics::measure(&positions, connections, config.spacing * 0.5);
        on_progress(ProgressEvent {
            percent: PROGRESS_DONE,
            phase: LayoutPhase::Finalization,
        });

        tracing::info!(
            %run_id,
            clusters = clusters.len(),
            overlaps = quality.node_overlap_count,
            "layout run complete"
        );

        Ok(LayoutResult {
            positions,
            clusters,
            quality,
        })
    }
}

/// Map each node's creation-time rank onto a Z coordinate spread evenly
/// over `[-spread/2, +spread/2]`, older content toward negative Z. Ties
/// keep input order (stable sort) so the mapping is deterministic.
pub(crate) fn time_axis_offsets(nodes: &[GraphNode], spread: f64) -> HashMap<NodeId, f64> {
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by_key(|&i| nodes[i].created_at);

    let mut offsets = HashMap::with_capacity(nodes.len());
    let last = order.len().saturating_sub(1).max(1) as f64;
    for (rank, &i) in order.iter().enumerate() {
        let z = if order.len() < 2 {
            0.0
        } else {
            -spread * 0.5 + spread * (rank as f64 / last)
        };
        offsets.insert(nodes[i].id.clone(), z);
    }
    offsets
}

/// Subtract the bounding-box center from every position so the layout is
/// centered on the origin regardless of where the forces settled it.
fn recenter(positions: IndexMap<NodeId, Position3D>) -> IndexMap<NodeId, Position3D> {
    let Some(bounds) = BoundingVolume::from_positions(positions.values()) else {
        return positions;
    };
    let center = bounds.center();
    positions
        .into_iter()
        .map(|(id, position)| (id, position - center))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn node_at(id: &str, minutes: i64) -> GraphNode {
        GraphNode::new(id, Utc::now() + Duration::minutes(minutes))
    }

    fn small_graph() -> (Vec<GraphNode>, Vec<Connection>) {
        let nodes = vec![
            node_at("a", 0),
            node_at("b", 1),
            node_at("c", 2),
            node_at("d", 3),
        ];
        let connections = vec![
            Connection::new("a", "b", 0.9),
            Connection::new("c", "d", 0.9),
        ];
        (nodes, connections)
    }

    fn fast_config() -> SimulationConfig {
        SimulationConfig {
            iterations: 50,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_empty_input_short_circuits() {
        let orchestrator = LayoutOrchestrator::default();
        let mut events = Vec::new();

        let result = orchestrator
            .compute(&[], &[], |e| events.push(e), &CancelFlag::new())
            .unwrap();

        assert!(result.positions.is_empty());
        assert!(result.clusters.is_empty());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].percent, 100.0);
    }

    #[test]
    fn test_result_is_centered_on_origin() {
        let orchestrator = LayoutOrchestrator::new(fast_config());
        let (nodes, connections) = small_graph();

        let result = orchestrator
            .compute(&nodes, &connections, |_| {}, &CancelFlag::new())
            .unwrap();

        let bounds = BoundingVolume::from_positions(result.positions.values()).unwrap();
        let center = bounds.center();
        assert!(center.magnitude() < 1e-9, "center {center:?} not at origin");
    }

    #[test]
    fn test_progress_is_monotone_and_complete() {
        let orchestrator = LayoutOrchestrator::new(fast_config());
        let (nodes, connections) = small_graph();
        let mut events = Vec::new();

        orchestrator
            .compute(&nodes, &connections, |e| events.push(e), &CancelFlag::new())
            .unwrap();

        for pair in events.windows(2) {
            assert!(
                pair[1].percent >= pair[0].percent,
                "progress went backwards: {pair:?}"
            );
        }
        assert_eq!(events.first().unwrap().phase, LayoutPhase::ClusterCreation);
        assert_eq!(events.last().unwrap().phase, LayoutPhase::Finalization);
        assert_eq!(events.last().unwrap().percent, 100.0);

        // All five phases observed.
        for phase in [
            LayoutPhase::ClusterCreation,
            LayoutPhase::TimeOrdering,
            LayoutPhase::InitialPlacement,
            LayoutPhase::Simulation,
            LayoutPhase::Finalization,
        ] {
            assert!(events.iter().any(|e| e.phase == phase), "missing {phase}");
        }
    }

    #[test]
    fn test_every_node_has_a_position_and_a_cluster() {
        let orchestrator = LayoutOrchestrator::new(fast_config());
        let (nodes, connections) = small_graph();

        let result = orchestrator
            .compute(&nodes, &connections, |_| {}, &CancelFlag::new())
            .unwrap();

        assert_eq!(result.positions.len(), nodes.len());
        let clustered: usize = result.clusters.values().map(Vec::len).sum();
        assert_eq!(clustered, nodes.len());
    }

    #[test]
    fn test_determinism_across_runs() {
        let orchestrator = LayoutOrchestrator::new(fast_config());
        let (nodes, connections) = small_graph();

        let a = orchestrator
            .compute(&nodes, &connections, |_| {}, &CancelFlag::new())
            .unwrap();
        let b = orchestrator
            .compute(&nodes, &connections, |_| {}, &CancelFlag::new())
            .unwrap();

        assert_eq!(a.positions, b.positions);
        assert_eq!(a.clusters, b.clusters);
    }

    #[test]
    fn test_cancellation_surfaces() {
        let orchestrator = LayoutOrchestrator::new(fast_config());
        let (nodes, connections) = small_graph();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = orchestrator.compute(&nodes, &connections, |_| {}, &cancel);
        assert!(matches!(result, Err(LayoutError::Cancelled)));
    }

    #[test]
    fn test_time_axis_offsets_order() {
        let nodes = vec![node_at("new", 10), node_at("old", -10), node_at("mid", 0)];
        let offsets = time_axis_offsets(&nodes, 30.0);

        assert_eq!(offsets[&NodeId::new("old")], -15.0);
        assert_eq!(offsets[&NodeId::new("mid")], 0.0);
        assert_eq!(offsets[&NodeId::new("new")], 15.0);
    }

    #[test]
    fn test_time_axis_single_node_centered() {
        let nodes = vec![node_at("only", 0)];
        let offsets = time_axis_offsets(&nodes, 30.0);
        assert_eq!(offsets[&NodeId::new("only")], 0.0);
    }
}
