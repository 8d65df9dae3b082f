//! Layout value objects
//!
//! Value objects are immutable types that represent concepts in the layout
//! domain. They are compared by value rather than identity and carry no
//! behavior beyond simple derived quantities. The engine never mutates a
//! caller's `GraphNode`; simulated positions are returned as a separate map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node within one layout computation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new node identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation of the identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier for a cluster, assigned in discovery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(u32);

impl ClusterId {
    /// Create a cluster identifier from its discovery index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the discovery index
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster-{}", self.0)
    }
}

/// Represents a position or direction in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a new position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Get the distance to another position
    pub fn distance_to(&self, other: &Position3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Get the length of this vector
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Normalize to unit length, returning zero for the zero vector
    pub fn normalize(&self) -> Self {
        let len = self.magnitude();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            Self::ZERO
        }
    }

    /// Dot product with another vector
    pub fn dot(&self, other: &Position3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl Default for Position3D {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::ops::Add for Position3D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl std::ops::AddAssign for Position3D {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl std::ops::Sub for Position3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl std::ops::SubAssign for Position3D {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
    }
}

impl std::ops::Mul<f64> for Position3D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

/// Immutable snapshot of a knowledge-graph node supplied by the caller
///
/// The layout engine reads these and writes positions into a separate map;
/// it never mutates caller-owned records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier across the node set
    pub id: NodeId,
    /// Importance scalar, >= 0
    pub weight: f64,
    /// Quality/confidence scalar, feeds the simulated mass
    pub quality: f64,
    /// Creation timestamp, drives the derived time-axis coordinate
    pub created_at: DateTime<Utc>,
    /// Declared visual radius, used for bounding-box padding
    pub radius: Option<f64>,
}

impl GraphNode {
    /// Create a node snapshot with neutral weight and quality
    pub fn new(id: impl Into<NodeId>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            weight: 1.0,
            quality: 0.0,
            created_at,
            radius: None,
        }
    }

    /// Builder: set the importance weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    /// Builder: set the quality score
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    /// Builder: set the declared radius
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }
}

/// Similarity connection between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    /// Similarity strength in [0, 1]
    pub strength: f64,
}

impl Connection {
    /// Create a connection; strength is clamped into [0, 1]
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, strength: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            strength: strength.clamp(0.0, 1.0),
        }
    }
}

/// A semantic cluster of nodes, immutable once computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    /// Member node ids in discovery order
    pub members: Vec<NodeId>,
}

impl Cluster {
    /// Create a cluster from its discovery index and members
    pub fn new(id: ClusterId, members: Vec<NodeId>) -> Self {
        Self { id, members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A camera pose framing the layout
///
/// Produced fresh on each positioning call; the caller owns animating the
/// actual camera toward it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Position3D,
    /// Look-at point
    pub target: Position3D,
    /// Always +Y
    pub up: Position3D,
    /// Vertical field of view in degrees
    pub fov: f64,
    pub near: f64,
    pub far: f64,
}

impl CameraPose {
    /// Distance between the camera and its look-at target
    pub fn distance(&self) -> f64 {
        self.position.distance_to(&self.target)
    }

    /// Unit vector from the target toward the camera
    pub fn view_direction(&self) -> Position3D {
        (self.position - self.target).normalize()
    }
}
