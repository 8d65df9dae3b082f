//! Spatial statistics and indexing
//!
//! Pure math over node positions: padded bounding volumes, per-axis
//! variance analysis, and an R-tree point index for proximity queries.
//! Volumes are always recreated from the current positions, never mutated
//! in place.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{NodeId, Position3D};

/// A coordinate axis in layout space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Axis-aligned bounding volume over a node set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    pub min: Position3D,
    pub max: Position3D,
}

impl BoundingVolume {
    /// Compute a bounding volume over points expanded by their radii, then
    /// scaled by `padding` around the center. Returns `None` for an empty
    /// point set.
    pub fn compute(
        points: impl IntoIterator<Item = (Position3D, f64)>,
        padding: f64,
    ) -> Option<Self> {
        let mut min = Position3D::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Position3D::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut seen = false;

        for (pos, radius) in points {
            seen = true;
            min.x = min.x.min(pos.x - radius);
            min.y = min.y.min(pos.y - radius);
            min.z = min.z.min(pos.z - radius);
            max.x = max.x.max(pos.x + radius);
            max.y = max.y.max(pos.y + radius);
            max.z = max.z.max(pos.z + radius);
        }

        if !seen {
            return None;
        }

        let unpadded = Self { min, max };
        if padding <= 1.0 {
            return Some(unpadded);
        }

        let center = unpadded.center();
        let half = Position3D::new(
            (max.x - min.x) * 0.5 * padding,
            (max.y - min.y) * 0.5 * padding,
            (max.z - min.z) * 0.5 * padding,
        );
        Some(Self {
            min: center - half,
            max: center + half,
        })
    }

    /// Compute an unpadded bounding volume over bare positions
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position3D>) -> Option<Self> {
        Self::compute(positions.into_iter().map(|p| (*p, 0.0)), 1.0)
    }

    pub fn center(&self) -> Position3D {
        Position3D::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Per-axis extents
    pub fn dimensions(&self) -> Position3D {
        self.max - self.min
    }

    /// Euclidean length of the main diagonal
    pub fn diagonal(&self) -> f64 {
        self.dimensions().magnitude()
    }

    pub fn volume(&self) -> f64 {
        let d = self.dimensions();
        d.x * d.y * d.z
    }
}

/// Per-axis distribution statistics over a node set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisStatistics {
    pub mean: [f64; 3],
    pub variance: [f64; 3],
    /// Standard-deviation-derived spread per axis
    pub range: [f64; 3],
}

// Guards division by a collapsed axis when forming ratios.
const AXIS_EPSILON: f64 = 1e-9;

impl AxisStatistics {
    /// Compute mean, variance, and spread along each axis
    pub fn compute(positions: &[Position3D]) -> Self {
        let n = positions.len().max(1) as f64;

        let mut mean = [0.0; 3];
        for p in positions {
            mean[0] += p.x;
            mean[1] += p.y;
            mean[2] += p.z;
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = [0.0; 3];
        for p in positions {
            variance[0] += (p.x - mean[0]).powi(2);
            variance[1] += (p.y - mean[1]).powi(2);
            variance[2] += (p.z - mean[2]).powi(2);
        }
        for v in &mut variance {
            *v /= n;
        }

        let range = [
            2.0 * variance[0].sqrt(),
            2.0 * variance[1].sqrt(),
            2.0 * variance[2].sqrt(),
        ];

        Self {
            mean,
            variance,
            range,
        }
    }

    /// Ratio of the largest to the smallest axis variance
    pub fn variance_ratio(&self) -> f64 {
        let max = self.variance.iter().cloned().fold(f64::MIN, f64::max);
        let min = self.variance.iter().cloned().fold(f64::MAX, f64::min);
        max / min.max(AXIS_EPSILON)
    }

    /// The axis with the largest variance
    pub fn primary_axis(&self) -> Axis {
        let [vx, vy, vz] = self.variance;
        if vx >= vy && vx >= vz {
            Axis::X
        } else if vy >= vz {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Pairwise spread ratios: x/y, x/z, y/z (always >= 1)
    pub fn aspect_ratios(&self) -> [f64; 3] {
        let ratio = |a: f64, b: f64| {
            let hi = a.max(b);
            let lo = a.min(b).max(AXIS_EPSILON);
            hi / lo
        };
        [
            ratio(self.range[0], self.range[1]),
            ratio(self.range[0], self.range[2]),
            ratio(self.range[1], self.range[2]),
        ]
    }

    /// The largest pairwise aspect ratio
    pub fn max_aspect_ratio(&self) -> f64 {
        self.aspect_ratios().iter().cloned().fold(f64::MIN, f64::max)
    }
}

/// Spatial index entry for nodes
#[derive(Debug, Clone)]
struct SpatialNode {
    node_id: NodeId,
    position: [f64; 3],
}

impl RTreeObject for SpatialNode {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for SpatialNode {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// R-tree point index over node positions for efficient proximity queries
pub struct SpatialNodeIndex {
    rtree: RTree<SpatialNode>,
}

impl SpatialNodeIndex {
    /// Bulk-load the index from node positions
    pub fn build<'a>(positions: impl IntoIterator<Item = (&'a NodeId, &'a Position3D)>) -> Self {
        let nodes: Vec<SpatialNode> = positions
            .into_iter()
            .map(|(id, pos)| SpatialNode {
                node_id: id.clone(),
                position: [pos.x, pos.y, pos.z],
            })
            .collect();
        Self {
            rtree: RTree::bulk_load(nodes),
        }
    }

    /// Node ids within `distance` of a point
    pub fn within_distance(&self, center: &Position3D, distance: f64) -> Vec<&NodeId> {
        let point = [center.x, center.y, center.z];
        self.rtree
            .locate_within_distance(point, distance * distance)
            .map(|n| &n.node_id)
            .collect()
    }

    /// The `count` nearest nodes to a point with their distances
    pub fn nearest(&self, center: &Position3D, count: usize) -> Vec<(&NodeId, f64)> {
        let point = [center.x, center.y, center.z];
        self.rtree
            .nearest_neighbor_iter(&point)
            .take(count)
            .map(|n| (&n.node_id, n.distance_2(&point).sqrt()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }
}
