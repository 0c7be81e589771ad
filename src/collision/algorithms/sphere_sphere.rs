use glam::Vec3;

use super::CollisionAlgorithm;
use crate::{
    collision::{manifold_result::ManifoldResult, wrapper::CollisionObjectWrapper},
    config::SIMD_EPSILON,
};

/// Analytic sphere pair. The manifold is rebuilt from scratch every step.
#[derive(Debug, Clone, Copy)]
pub struct SphereSphereAlgorithm {
    owns_manifold: bool,
}

impl SphereSphereAlgorithm {
    pub fn new(owns_manifold: bool) -> Self {
        Self { owns_manifold }
    }
}

impl CollisionAlgorithm for SphereSphereAlgorithm {
    fn process_collision(
        &self,
        body0: &CollisionObjectWrapper<'_>,
        body1: &CollisionObjectWrapper<'_>,
        result: &mut ManifoldResult<'_>,
    ) {
        let (Some(radius0), Some(radius1)) = (
            body0.convex().and_then(|s| s.as_sphere_radius()),
            body1.convex().and_then(|s| s.as_sphere_radius()),
        ) else {
            return;
        };

        if self.owns_manifold {
            result.clear_manifold();
        }

        let diff = body0.world_transform.position - body1.world_transform.position;
        let len = diff.length();
        if len > radius0 + radius1 + result.closest_point_distance_threshold() {
            return;
        }

        let distance = len - (radius0 + radius1);
        let normal_on_b = if len > SIMD_EPSILON { diff / len } else { Vec3::X };
        let point_on_b = body1.world_transform.position + normal_on_b * radius1;

        log::trace!("sphere-sphere distance {distance}");
        result.add_contact_point(normal_on_b, point_on_b, distance);
    }

    fn name(&self) -> &'static str {
        "sphere_sphere"
    }
}
