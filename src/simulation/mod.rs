//! Force-directed simulation engine
//!
//! The physics core of the layout: spring attraction along similarity
//! connections, inverse-square repulsion between all node pairs, and a weak
//! cohesion pull toward cluster centroids, integrated with velocity damping
//! over a fixed iteration count. The engine is a pure function of its
//! inputs: it builds a private particle array, runs every configured
//! iteration (no early-convergence exit, so call cost is predictable), and
//! copies the converged positions out.
//!
//! The repulsion pass is O(n²) per iteration, which is fine for the
//! hundreds-of-nodes graphs this engine targets. Graphs expected to exceed
//! a couple thousand nodes should replace the pairwise loop with a query
//! against [`crate::spatial::SpatialNodeIndex`] behind the same force
//! accumulation; the spring and cohesion passes are unaffected.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::value_objects::{ClusterId, Connection, GraphNode, NodeId, Position3D};

/// Iteration-count presets trading layout quality against runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityPreset {
    /// Fast, coarser equilibrium
    Performance,
    /// Default balance
    Balanced,
    /// Slow, tightest equilibrium
    Quality,
}

impl QualityPreset {
    pub fn iterations(&self) -> u32 {
        match self {
            QualityPreset::Performance => 300,
            QualityPreset::Balanced => 600,
            QualityPreset::Quality => 1000,
        }
    }
}

/// Tunable parameters of the force simulation
///
/// The defaults are tuned values carried over from observed behavior, not
/// physical constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed number of iterations; the engine always runs all of them
    pub iterations: u32,
    /// Spring force coefficient for similarity connections
    pub spring_strength: f64,
    /// Inverse-square repulsion coefficient
    pub repulsion_strength: f64,
    /// Per-iteration velocity decay, in (0, 1)
    pub damping: f64,
    /// Target inter-node spacing; the spring ideal distance scales off this
    pub spacing: f64,
    /// Distance between cluster centers at initial placement
    pub cluster_separation: f64,
    /// Extent of the derived time axis
    pub time_spread: f64,
    /// Minimum strength for a connection to cluster or exert spring force
    pub similarity_threshold: f64,
    /// Weak pull toward cluster centroids, much smaller than spring/repulsion
    pub cohesion_strength: f64,
    /// Seed for placement jitter; fixed seed makes layouts reproducible
    pub jitter_seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: QualityPreset::Balanced.iterations(),
            spring_strength: 0.12,
            repulsion_strength: 1800.0,
            damping: 0.82,
            spacing: 60.0,
            cluster_separation: 150.0,
            time_spread: 30.0,
            similarity_threshold: 0.15,
            cohesion_strength: 0.001,
            jitter_seed: 7,
        }
    }
}

impl SimulationConfig {
    /// A default configuration at the given quality preset
    pub fn with_preset(preset: QualityPreset) -> Self {
        Self {
            iterations: preset.iterations(),
            ..Self::default()
        }
    }
}

/// Cooperative cancellation flag, checked between iterations only so a
/// cancelled run never leaves particles mid-update.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next iteration boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Errors raised for simulation contract violations
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// A node or cluster member has no particle; the caller fed
    /// inconsistent inputs
    #[error("no particle for node: {0}")]
    MissingParticle(NodeId),

    /// The run was cancelled between iterations
    #[error("simulation cancelled")]
    Cancelled,
}

/// Per-node working state, private to one simulation run
struct Particle {
    position: Position3D,
    velocity: Position3D,
    force: Position3D,
    mass: f64,
}

/// Mass grows with connectivity and quality so hub nodes move sluggishly.
fn particle_mass(connection_count: usize, quality: f64) -> f64 {
    1.0 + 0.1 * connection_count as f64 + 0.01 * quality
}

/// The force simulation engine
#[derive(Debug, Clone, Default)]
pub struct ForceSimulationEngine {
    config: SimulationConfig,
}

impl ForceSimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the simulation from the given initial placement and return the
    /// converged position per node.
    ///
    /// `on_iteration` is invoked after every completed iteration with
    /// `(completed, total)`. Connections with an unknown endpoint are
    /// skipped; a node (or cluster member) missing from
    /// `initial_positions` is a contract violation and fails the run.
    pub fn simulate(
        &self,
        nodes: &[GraphNode],
        connections: &[Connection],
        clusters: &IndexMap<ClusterId, Vec<NodeId>>,
        initial_positions: &IndexMap<NodeId, Position3D>,
        mut on_iteration: impl FnMut(u32, u32),
        cancel: &CancelFlag,
    ) -> Result<IndexMap<NodeId, Position3D>, SimulationError> {
        if nodes.is_empty() {
            return Ok(IndexMap::new());
        }

        let index_of: HashMap<&NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (&n.id, i))
            .collect();

        // Incident-edge counts feed the mass formula.
        let mut connection_counts = vec![0usize; nodes.len()];
        let mut springs: Vec<(usize, usize, f64)> = Vec::new();
        for connection in connections {
            let (Some(&s), Some(&t)) = (
                index_of.get(&connection.source),
                index_of.get(&connection.target),
            ) else {
                continue;
            };
            connection_counts[s] += 1;
            connection_counts[t] += 1;
            if connection.strength >= self.config.similarity_threshold {
                springs.push((s, t, connection.strength));
            }
        }

        let mut particles = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            let position = initial_positions
                .get(&node.id)
                .copied()
                .ok_or_else(|| SimulationError::MissingParticle(node.id.clone()))?;
            particles.push(Particle {
                position,
                velocity: Position3D::ZERO,
                force: Position3D::ZERO,
                mass: particle_mass(connection_counts[i], node.quality),
            });
        }

        // Cluster member indices, resolved once.
        let mut cluster_members: Vec<Vec<usize>> = Vec::with_capacity(clusters.len());
        for members in clusters.values() {
            if members.len() < 2 {
                continue;
            }
            let mut indices = Vec::with_capacity(members.len());
            for member in members {
                let &i = index_of
                    .get(member)
                    .ok_or_else(|| SimulationError::MissingParticle(member.clone()))?;
                indices.push(i);
            }
            cluster_members.push(indices);
        }

        let total = self.config.iterations;
        tracing::debug!(
            nodes = nodes.len(),
            springs = springs.len(),
            iterations = total,
            "starting force simulation"
        );

        for iteration in 0..total {
            if cancel.is_cancelled() {
                tracing::debug!(iteration, "simulation cancelled");
                return Err(SimulationError::Cancelled);
            }

            for particle in &mut particles {
                particle.force = Position3D::ZERO;
            }

            self.apply_spring_forces(&mut particles, &springs);
            self.apply_repulsion_forces(&mut particles);
            self.apply_cluster_cohesion(&mut particles, &cluster_members);

            for particle in &mut particles {
                let acceleration = particle.force * (1.0 / particle.mass);
                particle.velocity = (particle.velocity + acceleration) * self.config.damping;
                particle.position += particle.velocity;
            }

            on_iteration(iteration + 1, total);
        }

        let mut positions = IndexMap::with_capacity(nodes.len());
        for (node, particle) in nodes.iter().zip(particles.iter()) {
            positions.insert(node.id.clone(), particle.position);
        }
        Ok(positions)
    }

    /// Attraction toward an ideal distance derived from edge strength:
    /// stronger similarity pulls nodes closer together.
    fn apply_spring_forces(&self, particles: &mut [Particle], springs: &[(usize, usize, f64)]) {
        for &(s, t, strength) in springs {
            let delta = particles[t].position - particles[s].position;
            let distance = delta.magnitude();
            if distance <= f64::EPSILON {
                continue;
            }

            let ideal = self.config.spacing * (1.0 - strength * 0.5);
            let magnitude = self.config.spring_strength * (distance - ideal);
            let force = delta * (magnitude / distance);

            particles[s].force += force;
            particles[t].force -= force;
        }
    }

    /// Inverse-square repulsion between every unordered pair
    fn apply_repulsion_forces(&self, particles: &mut [Particle]) {
        for i in 0..particles.len() {
            for j in (i + 1)..particles.len() {
                let delta = particles[j].position - particles[i].position;
                let distance_squared = delta.dot(&delta);
                if distance_squared <= f64::EPSILON {
                    continue;
                }

                let magnitude = self.config.repulsion_strength / distance_squared;
                let force = delta.normalize() * magnitude;

                particles[i].force -= force;
                particles[j].force += force;
            }
        }
    }

    /// Weak pull toward each cluster's centroid; counteracts repulsion
    /// scatter at long range without fighting the springs up close.
    fn apply_cluster_cohesion(&self, particles: &mut [Particle], clusters: &[Vec<usize>]) {
        for members in clusters {
            let mut centroid = Position3D::ZERO;
            for &i in members {
                centroid += particles[i].position;
            }
            centroid = centroid * (1.0 / members.len() as f64);

            for &i in members {
                let displacement = centroid - particles[i].position;
                particles[i].force += displacement * self.config.cohesion_strength;
            }
        }
    }
}
