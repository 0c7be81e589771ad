use super::{convex_convex::collide_polyhedra, CollisionAlgorithm};
use crate::collision::{manifold_result::ManifoldResult, wrapper::CollisionObjectWrapper};

/// Oriented box pair through the polyhedral SAT and clipping path.
#[derive(Debug, Clone, Copy)]
pub struct BoxBoxAlgorithm {
    owns_manifold: bool,
    use_internal_objects: bool,
}

impl BoxBoxAlgorithm {
    pub fn new(owns_manifold: bool, use_internal_objects: bool) -> Self {
        Self {
            owns_manifold,
            use_internal_objects,
        }
    }
}

impl CollisionAlgorithm for BoxBoxAlgorithm {
    fn process_collision(
        &self,
        body0: &CollisionObjectWrapper<'_>,
        body1: &CollisionObjectWrapper<'_>,
        result: &mut ManifoldResult<'_>,
    ) {
        let (Some(hull0), Some(hull1)) = (
            body0.convex().and_then(|s| s.polyhedron()),
            body1.convex().and_then(|s| s.polyhedron()),
        ) else {
            return;
        };

        let threshold =
            result.contact_breaking_threshold() + result.closest_point_distance_threshold();
        collide_polyhedra(
            hull0,
            hull1,
            &body0.world_transform,
            &body1.world_transform,
            threshold,
            self.use_internal_objects,
            result,
        );

        if self.owns_manifold {
            result.refresh_contact_points();
        }
    }

    fn name(&self) -> &'static str {
        "box_box"
    }
}
