//! Layout quality metrics
//!
//! Diagnostics over a finished layout for tuning sessions. Nothing in the
//! engine consults these; they only describe the result.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::spatial::BoundingVolume;
use crate::value_objects::{Connection, NodeId, Position3D};

/// Quality measures of a computed layout
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutQualityMetrics {
    /// Standard deviation of realized edge lengths
    pub edge_length_deviation: f64,
    /// Node pairs closer than the overlap threshold
    pub node_overlap_count: usize,
    /// Width / height of the layout's bounding box
    pub aspect_ratio: f64,
    /// Evenness of nearest-neighbor distances in [0, 1], higher is better
    pub node_distribution_score: f64,
}

impl LayoutQualityMetrics {
    /// Measure a layout; `overlap_threshold` is the center distance below
    /// which two nodes count as overlapping.
    pub fn measure(
        positions: &IndexMap<NodeId, Position3D>,
        connections: &[Connection],
        overlap_threshold: f64,
    ) -> Self {
        let points: Vec<Position3D> = positions.values().copied().collect();
        let mut metrics = Self::default();

        let edge_lengths: Vec<f64> = connections
            .iter()
            .filter_map(|connection| {
                let source = positions.get(&connection.source)?;
                let target = positions.get(&connection.target)?;
                Some(source.distance_to(target))
            })
            .collect();

        if !edge_lengths.is_empty() {
            let mean = edge_lengths.iter().sum::<f64>() / edge_lengths.len() as f64;
            let variance = edge_lengths
                .iter()
                .map(|&len| (len - mean).powi(2))
                .sum::<f64>()
                / edge_lengths.len() as f64;
            metrics.edge_length_deviation = variance.sqrt();
        }

        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                if points[i].distance_to(&points[j]) < overlap_threshold {
                    metrics.node_overlap_count += 1;
                }
            }
        }

        if let Some(bounds) = BoundingVolume::from_positions(points.iter()) {
            let dimensions = bounds.dimensions();
            metrics.aspect_ratio = if dimensions.y > 0.0 {
                dimensions.x / dimensions.y
            } else {
                1.0
            };
        }

        // Coefficient of variation of nearest-neighbor distances.
        if points.len() > 1 {
            let mut nearest = Vec::with_capacity(points.len());
            for i in 0..points.len() {
                let mut min_distance = f64::INFINITY;
                for j in 0..points.len() {
                    if i != j {
                        min_distance = min_distance.min(points[i].distance_to(&points[j]));
                    }
                }
                nearest.push(min_distance);
            }

            let mean = nearest.iter().sum::<f64>() / nearest.len() as f64;
            if mean > 0.0 {
                let variance = nearest.iter().map(|&d| (d - mean).powi(2)).sum::<f64>()
                    / nearest.len() as f64;
                let cv = variance.sqrt() / mean;
                metrics.node_distribution_score = 1.0 / (1.0 + cv);
            }
        }

        metrics
    }
}
