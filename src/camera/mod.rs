//! Optimal camera positioning
//!
//! Derives a camera pose that frames the whole layout: a padded bounding
//! volume fixes the look-at target and fit distance, the topology
//! classification picks a viewing angle appropriate for the layout's
//! shape, and an orientation-preservation rule keeps small layout changes
//! from spinning the camera. The positioner is a pure function of its
//! inputs; the throttling memo lives in [`RepositionGate`].

pub mod reposition_gate;

pub use reposition_gate::{GateConfig, RepositionGate};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::spatial::{Axis, BoundingVolume};
use crate::topology::{TopologyClass, TopologyClassifier, TopologyProfile};
use crate::value_objects::{CameraPose, GraphNode, NodeId, Position3D};

/// Near clip plane for emitted poses
const NEAR_PLANE: f64 = 0.1;
/// Floor for the far clip plane
const MIN_FAR_PLANE: f64 = 1000.0;
/// The far plane always leaves this much headroom past the camera distance
const FAR_PLANE_FACTOR: f64 = 3.0;
/// Closest approach as a fraction of the bounding diagonal when
/// `prevent_close_up` is set
const CLOSE_UP_DIAGONAL_FRACTION: f64 = 0.8;
/// Angular difference under which the current orientation is kept
const ORIENTATION_TOLERANCE_DEG: f64 = 30.0;

/// Caller-tunable camera framing options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraOptions {
    /// Bounding-volume padding factor
    pub padding: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    /// Vertical field of view in degrees
    pub fov: f64,
    /// Viewport width / height
    pub aspect_ratio: f64,
    /// Enforce a distance floor relative to the layout's diagonal
    pub prevent_close_up: bool,
    /// Keep the current viewing direction across small layout changes
    pub maintain_orientation: bool,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            padding: 1.3,
            min_distance: 20.0,
            max_distance: 300.0,
            fov: 75.0,
            aspect_ratio: 16.0 / 9.0,
            prevent_close_up: true,
            maintain_orientation: true,
        }
    }
}

/// A viewing direction as elevation/azimuth in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewingAngle {
    pub elevation: f64,
    pub azimuth: f64,
}

impl ViewingAngle {
    /// Preset angle per topology class.
    ///
    /// Linear layouts are viewed from the side, perpendicular to the
    /// detected primary axis; planar layouts near top-down; clustered
    /// layouts from high up so group separation stays visible.
    pub fn for_topology(profile: &TopologyProfile) -> Self {
        match profile.class {
            TopologyClass::Spherical => Self {
                elevation: 30.0,
                azimuth: 45.0,
            },
            TopologyClass::Planar => Self {
                elevation: 72.0,
                azimuth: 0.0,
            },
            TopologyClass::Linear => Self {
                elevation: 45.0,
                azimuth: match profile.primary_axis {
                    Some(Axis::X) => 90.0,
                    Some(Axis::Z) => 0.0,
                    _ => 45.0,
                },
            },
            TopologyClass::Clustered => Self {
                elevation: 60.0,
                azimuth: 30.0,
            },
            TopologyClass::Mixed => Self {
                elevation: 45.0,
                azimuth: 45.0,
            },
        }
    }

    /// Unit vector pointing from the target toward the camera
    pub fn direction(&self) -> Position3D {
        let elevation = self.elevation.to_radians();
        let azimuth = self.azimuth.to_radians();
        Position3D::new(
            elevation.cos() * azimuth.cos(),
            elevation.sin(),
            elevation.cos() * azimuth.sin(),
        )
    }
}

/// Computes camera poses that frame a laid-out node set
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraPositioner {
    classifier: TopologyClassifier,
}

impl CameraPositioner {
    pub fn new(classifier: TopologyClassifier) -> Self {
        Self { classifier }
    }

    /// Compute the pose framing `positions`, or `None` for an empty set.
    ///
    /// `current` is the caller's present camera pose; with
    /// `maintain_orientation` it anchors the orientation-preservation
    /// rule. Node radii from `nodes` pad the bounding volume so large
    /// nodes are not clipped at the frame edge.
    pub fn compute_pose(
        &self,
        nodes: &[GraphNode],
        positions: &IndexMap<NodeId, Position3D>,
        current: Option<&CameraPose>,
        options: &CameraOptions,
    ) -> Option<CameraPose> {
        let bounds = self.padded_bounds(nodes, positions, options)?;
        let target = bounds.center();
        let diagonal = bounds.diagonal();

        let distance = self.framing_distance(diagonal, options);

        let profile = self.classifier.classify(positions);
        let optimal = ViewingAngle::for_topology(&profile).direction();

        let direction = match current {
            Some(pose) if options.maintain_orientation => {
                let current_direction = pose.view_direction();
                if angle_between_deg(&current_direction, &optimal) <= ORIENTATION_TOLERANCE_DEG
                    && current_direction.magnitude() > 0.0
                {
                    // Small change: keep the current direction and only
                    // refit the distance.
                    current_direction
                } else {
                    optimal
                }
            }
            _ => optimal,
        };

        tracing::debug!(
            topology = ?profile.class,
            distance,
            diagonal,
            "computed camera pose"
        );

        Some(CameraPose {
            position: target + direction * distance,
            target,
            up: Position3D::new(0.0, 1.0, 0.0),
            fov: options.fov,
            near: NEAR_PLANE,
            far: (distance * FAR_PLANE_FACTOR).max(MIN_FAR_PLANE),
        })
    }

    /// Padded bounds over the node positions, expanded by declared radii
    fn padded_bounds(
        &self,
        nodes: &[GraphNode],
        positions: &IndexMap<NodeId, Position3D>,
        options: &CameraOptions,
    ) -> Option<BoundingVolume> {
        let radius_of = |id: &NodeId| -> f64 {
            nodes
                .iter()
                .find(|n| &n.id == id)
                .and_then(|n| n.radius)
                .unwrap_or(0.0)
        };

        BoundingVolume::compute(
            positions.iter().map(|(id, pos)| (*pos, radius_of(id))),
            options.padding,
        )
    }

    /// Distance at which the bounding sphere fits the field of view,
    /// clamped to the configured range and the close-up floor.
    fn framing_distance(&self, diagonal: f64, options: &CameraOptions) -> f64 {
        let radius = diagonal * 0.5;
        let half_fov = (options.fov * 0.5).to_radians();

        let mut distance = if radius > f64::EPSILON && half_fov.tan() > f64::EPSILON {
            radius / half_fov.tan()
        } else {
            options.min_distance
        };

        // A viewport narrower than square fits less horizontally; back off
        // so the short dimension still frames the content.
        if options.aspect_ratio < 1.0 && options.aspect_ratio > f64::EPSILON {
            distance /= options.aspect_ratio;
        }

        distance = distance.clamp(options.min_distance, options.max_distance);

        if options.prevent_close_up {
            distance = distance
                .max(CLOSE_UP_DIAGONAL_FRACTION * diagonal)
                .min(options.max_distance);
        }

        distance
    }
}

/// Angle between two directions in degrees
fn angle_between_deg(a: &Position3D, b: &Position3D) -> f64 {
    let denom = a.magnitude() * b.magnitude();
    if denom <= f64::EPSILON {
        return 180.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}
