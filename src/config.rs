//! Global configuration constants and tunables for the narrow phase.

use serde::{Deserialize, Serialize};

/// Default skin thickness wrapped around every convex core.
pub const DEFAULT_COLLISION_MARGIN: f32 = 0.04;

/// Distance beyond which a cached contact is dropped from its manifold.
pub const DEFAULT_CONTACT_BREAKING_THRESHOLD: f32 = 0.02;

/// Distance under which a pair is still handed to the solver.
pub const DEFAULT_CONTACT_PROCESSING_THRESHOLD: f32 = f32::MAX;

/// Maximum number of points kept per persistent manifold.
pub const MANIFOLD_CACHE_SIZE: usize = 4;

/// Upper bound for combined friction coefficients.
pub const MAX_FRICTION: f32 = 10.0;

/// Generic tolerance used for degenerate-vector checks.
pub const SIMD_EPSILON: f32 = f32::EPSILON;

/// Lower clamp applied to clipped polyhedral contact depths.
pub const POLYHEDRAL_CLIP_MIN_DISTANCE: f32 = -1e30;

/// Hysteresis factors used when picking the reference face of two planar boxes.
pub const BOX2D_RELATIVE_TOLERANCE: f32 = 0.98;
pub const BOX2D_ABSOLUTE_TOLERANCE: f32 = 0.001;

/// Tunables handed to [`NarrowPhase`](crate::collision::narrowphase::NarrowPhase).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Drift/depth at which cached points are discarded.
    pub contact_breaking_threshold: f32,
    /// Manifolds whose pair is farther apart than this are skipped by the solver.
    pub contact_processing_threshold: f32,
    /// Extra distance at which sphere pairs start reporting contacts.
    pub closest_point_distance_threshold: f32,
    /// Never evict the deepest point when a full manifold receives a new one.
    pub keep_deepest_point: bool,
    /// Run the inner-sphere/box rejection before exact SAT projections.
    pub use_internal_objects: bool,
    /// Process pairs on the rayon pool (requires the `parallel` feature).
    pub parallel: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            contact_breaking_threshold: DEFAULT_CONTACT_BREAKING_THRESHOLD,
            contact_processing_threshold: DEFAULT_CONTACT_PROCESSING_THRESHOLD,
            closest_point_distance_threshold: 0.0,
            keep_deepest_point: true,
            use_internal_objects: true,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl CollisionConfig {
    pub fn with_breaking_threshold(mut self, threshold: f32) -> Self {
        self.contact_breaking_threshold = threshold.max(0.0);
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }
}
