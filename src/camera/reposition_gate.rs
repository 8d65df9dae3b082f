//! Reposition throttling
//!
//! Continuous small layout perturbations must not make the camera jitter.
//! The gate admits a reposition only when enough wall-clock time has
//! passed and the new bounding volume differs enough from the one that
//! triggered the previous reposition. Time is passed in by the caller so
//! tests control it; the memo is lock-protected so a gate instance can be
//! shared across threads.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::spatial::BoundingVolume;

/// Gate tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum interval between repositions
    pub min_interval: Duration,
    /// Combined bounds-change score above which a reposition is warranted
    pub change_threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(100),
            change_threshold: 0.1,
        }
    }
}

/// Weighting of the bounds-change score: center movement dominates size
/// change.
const CENTER_WEIGHT: f64 = 0.6;
const SIZE_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy)]
struct GateMemo {
    bounds: BoundingVolume,
    updated_at: Instant,
}

/// Stateful throttle deciding when camera repositioning is worthwhile
#[derive(Debug, Default)]
pub struct RepositionGate {
    config: GateConfig,
    memo: Mutex<Option<GateMemo>>,
}

impl RepositionGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            memo: Mutex::new(None),
        }
    }

    /// Whether the camera should be repositioned for `bounds` at `now`.
    ///
    /// Returns true on the first observation and whenever the interval has
    /// elapsed and the bounds moved or resized beyond the threshold; the
    /// memo then records these bounds as the new reference.
    pub fn should_reposition(&self, bounds: &BoundingVolume, now: Instant) -> bool {
        let mut memo = self.memo.lock();

        let Some(previous) = *memo else {
            *memo = Some(GateMemo {
                bounds: *bounds,
                updated_at: now,
            });
            return true;
        };

        if now.duration_since(previous.updated_at) < self.config.min_interval {
            return false;
        }

        let score = bounds_change_score(&previous.bounds, bounds);
        if score > self.config.change_threshold {
            *memo = Some(GateMemo {
                bounds: *bounds,
                updated_at: now,
            });
            true
        } else {
            false
        }
    }

    /// Forget the reference bounds; the next observation repositions
    pub fn reset(&self) {
        *self.memo.lock() = None;
    }
}

/// Weighted difference between two bounding volumes: 60% normalized
/// center movement, 40% relative size change.
fn bounds_change_score(previous: &BoundingVolume, current: &BoundingVolume) -> f64 {
    let previous_diagonal = previous.diagonal();
    let current_diagonal = current.diagonal();
    let scale = previous_diagonal.max(current_diagonal).max(f64::EPSILON);

    let center_score = (previous.center().distance_to(&current.center()) / scale).min(1.0);
    let size_score = (previous_diagonal - current_diagonal).abs() / scale;

    CENTER_WEIGHT * center_score + SIZE_WEIGHT * size_score
}
