//! Topology classification of node distributions
//!
//! Classifies the coarse geometric shape of a node set from per-axis
//! variance and aspect ratios, with a proximity-grouping fallback that
//! separates clustered from mixed distributions. The decision rules are
//! evaluated in a fixed order and the first match wins.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::spatial::{Axis, AxisStatistics, BoundingVolume, SpatialNodeIndex};
use crate::value_objects::{NodeId, Position3D};

/// Coarse shape classification of a node distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopologyClass {
    /// Roughly isotropic spread on all three axes
    Spherical,
    /// One axis collapsed relative to the other two
    Planar,
    /// Dominant spread along a single axis
    Linear,
    /// Several well-separated proximity groups
    Clustered,
    /// None of the above
    Mixed,
}

/// Tuned decision thresholds for the classifier
///
/// These values are empirical, carried over from observed behavior rather
/// than derived from first principles. Retuning is allowed but the rule
/// ordering (linear before spherical before planar) must be preserved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologyThresholds {
    /// Variance ratio above which the set reads as a line or chain
    pub linear_variance_ratio: f64,
    /// Variance ratio below which the set may read as spherical
    pub spherical_variance_ratio: f64,
    /// Aspect ratio ceiling for the spherical rule
    pub spherical_aspect_limit: f64,
    /// Aspect ratio above which one axis reads as collapsed
    pub planar_aspect_ratio: f64,
    /// Distance within which nodes join the same proximity group
    pub proximity_distance: f64,
    /// Proximity-group count above which the set reads as clustered
    pub clustered_min_groups: usize,
}

impl Default for TopologyThresholds {
    fn default() -> Self {
        Self {
            linear_variance_ratio: 16.0,
            spherical_variance_ratio: 2.0,
            spherical_aspect_limit: 2.0,
            planar_aspect_ratio: 10.0,
            proximity_distance: 15.0,
            clustered_min_groups: 3,
        }
    }
}

/// Result of classifying a node distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyProfile {
    pub class: TopologyClass,
    /// Axis of maximum variance, set for linear distributions
    pub primary_axis: Option<Axis>,
    /// Proximity-group estimate, set when the grouping fallback ran
    pub cluster_count: Option<usize>,
    /// Nodes per unit of bounding volume
    pub density: f64,
    /// Pairwise spread ratios: x/y, x/z, y/z
    pub aspect_ratios: [f64; 3],
}

/// Classifies node distributions into topology classes
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyClassifier {
    pub thresholds: TopologyThresholds,
}

impl TopologyClassifier {
    pub fn new(thresholds: TopologyThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify the distribution of the given node positions
    pub fn classify(&self, positions: &IndexMap<NodeId, Position3D>) -> TopologyProfile {
        let points: Vec<Position3D> = positions.values().copied().collect();
        let stats = AxisStatistics::compute(&points);
        let aspect_ratios = stats.aspect_ratios();
        let density = Self::density(&points);

        // Too few points to infer a shape.
        if points.len() < 3 {
            return TopologyProfile {
                class: TopologyClass::Linear,
                primary_axis: Some(stats.primary_axis()),
                cluster_count: None,
                density,
                aspect_ratios,
            };
        }

        let variance_ratio = stats.variance_ratio();

        if variance_ratio > self.thresholds.linear_variance_ratio {
            return TopologyProfile {
                class: TopologyClass::Linear,
                primary_axis: Some(stats.primary_axis()),
                cluster_count: None,
                density,
                aspect_ratios,
            };
        }

        if variance_ratio < self.thresholds.spherical_variance_ratio
            && aspect_ratios
                .iter()
                .all(|&r| r < self.thresholds.spherical_aspect_limit)
        {
            return TopologyProfile {
                class: TopologyClass::Spherical,
                primary_axis: None,
                cluster_count: None,
                density,
                aspect_ratios,
            };
        }

        if stats.max_aspect_ratio() > self.thresholds.planar_aspect_ratio {
            return TopologyProfile {
                class: TopologyClass::Planar,
                primary_axis: None,
                cluster_count: None,
                density,
                aspect_ratios,
            };
        }

        let groups = self.estimate_proximity_groups(positions);
        let class = if groups > self.thresholds.clustered_min_groups {
            TopologyClass::Clustered
        } else {
            TopologyClass::Mixed
        };

        TopologyProfile {
            class,
            primary_axis: None,
            cluster_count: Some(groups),
            density,
            aspect_ratios,
        }
    }

    /// Count proximity groups: nodes within `proximity_distance` of each
    /// other transitively share a group.
    pub fn estimate_proximity_groups(&self, positions: &IndexMap<NodeId, Position3D>) -> usize {
        if positions.is_empty() {
            return 0;
        }

        let index = SpatialNodeIndex::build(positions.iter());
        let mut visited: HashSet<&NodeId> = HashSet::new();
        let mut groups = 0;

        for (id, _) in positions.iter() {
            if visited.contains(id) {
                continue;
            }
            groups += 1;

            let mut stack = vec![id];
            visited.insert(id);

            while let Some(current) = stack.pop() {
                let center = positions[current];
                for neighbor in index.within_distance(&center, self.thresholds.proximity_distance)
                {
                    // Resolve to the map's key so lifetimes line up.
                    if let Some((key, _)) = positions.get_key_value(neighbor) {
                        if visited.insert(key) {
                            stack.push(key);
                        }
                    }
                }
            }
        }

        groups
    }

    fn density(points: &[Position3D]) -> f64 {
        match BoundingVolume::from_positions(points.iter()) {
            Some(bounds) => {
                let volume = bounds.volume();
                if volume > f64::EPSILON {
                    points.len() as f64 / volume
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }
}
