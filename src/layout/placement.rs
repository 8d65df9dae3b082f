//! Initial placement of clusters and their members
//!
//! Cluster centers go to cube vertices while there are at most eight
//! clusters, and onto a golden-angle sphere beyond that, which spreads any
//! number of centers evenly without visible banding. Members are arranged
//! in a jittered grid around their center; the jitter breaks up the
//! artificial regularity of a perfect lattice and is drawn from a seeded
//! generator so placements are reproducible.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::simulation::SimulationConfig;
use crate::value_objects::{ClusterId, NodeId, Position3D};

/// Fraction of a grid cell radius used as maximum jitter
const JITTER_FRACTION: f64 = 0.3;

/// Compute one center point per cluster
pub(crate) fn cluster_centers(count: usize, separation: f64) -> Vec<Position3D> {
    if count == 0 {
        return Vec::new();
    }

    if count <= 8 {
        // Cube vertices: stable, maximally separated for few clusters.
        let half = separation * 0.5;
        (0..count)
            .map(|i| {
                Position3D::new(
                    if i & 1 == 0 { -half } else { half },
                    if i & 2 == 0 { -half } else { half },
                    if i & 4 == 0 { -half } else { half },
                )
            })
            .collect()
    } else {
        // Golden-angle sphere: even angular distribution for many centers.
        let golden_ratio = (1.0 + 5.0_f64.sqrt()) / 2.0;
        let angle_increment = TAU / golden_ratio;
        // Sized so neighboring centers sit roughly `separation` apart.
        let radius = separation * (count as f64 / (4.0 * std::f64::consts::PI)).sqrt();

        (0..count)
            .map(|i| {
                let t = i as f64 / (count - 1) as f64;
                let inclination = (1.0 - 2.0 * t).acos();
                let azimuth = angle_increment * i as f64;
                Position3D::new(
                    radius * inclination.sin() * azimuth.cos(),
                    radius * inclination.sin() * azimuth.sin(),
                    radius * inclination.cos(),
                )
            })
            .collect()
    }
}

/// Arrange every cluster's members on a jittered grid around the cluster
/// center, with Z pinned to the node's time-axis coordinate.
pub(crate) fn initial_placement(
    clusters: &IndexMap<ClusterId, Vec<NodeId>>,
    time_z: &HashMap<NodeId, f64>,
    config: &SimulationConfig,
) -> IndexMap<NodeId, Position3D> {
    let centers = cluster_centers(clusters.len(), config.cluster_separation);
    let mut rng = StdRng::seed_from_u64(config.jitter_seed);
    let cell = config.spacing;
    let max_jitter = cell * 0.5 * JITTER_FRACTION;

    let mut positions = IndexMap::new();
    for (cluster_index, members) in clusters.values().enumerate() {
        let center = centers[cluster_index];
        let grid = (members.len() as f64).sqrt().ceil().max(1.0) as usize;
        let offset = (grid - 1) as f64 * 0.5;

        for (member_index, member) in members.iter().enumerate() {
            let row = member_index / grid;
            let col = member_index % grid;
            let jx = rng.gen_range(-max_jitter..=max_jitter);
            let jy = rng.gen_range(-max_jitter..=max_jitter);

            let z = time_z.get(member).copied().unwrap_or(0.0);
            positions.insert(
                member.clone(),
                Position3D::new(
                    center.x + (col as f64 - offset) * cell + jx,
                    center.y + (row as f64 - offset) * cell + jy,
                    z,
                ),
            );
        }
    }

    positions
}
