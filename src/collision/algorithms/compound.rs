use super::{select_algorithm, CollisionAlgorithm};
use crate::{
    collision::{manifold_result::ManifoldResult, wrapper::CollisionObjectWrapper},
    config::CollisionConfig,
};

/// Compound shape against anything: every child whose bounds come near the other body is
/// tested with its own detector, all writing into the pair's single manifold.
/// `swapped` means body1 holds the compound.
#[derive(Debug, Clone, Copy)]
pub struct CompoundAlgorithm {
    owns_manifold: bool,
    swapped: bool,
    config: CollisionConfig,
}

impl CompoundAlgorithm {
    pub fn new(owns_manifold: bool, swapped: bool, config: CollisionConfig) -> Self {
        Self {
            owns_manifold,
            swapped,
            config,
        }
    }
}

impl CollisionAlgorithm for CompoundAlgorithm {
    fn process_collision(
        &self,
        body0: &CollisionObjectWrapper<'_>,
        body1: &CollisionObjectWrapper<'_>,
        result: &mut ManifoldResult<'_>,
    ) {
        let (compound_wrap, other_wrap) = if self.swapped {
            (body1, body0)
        } else {
            (body0, body1)
        };
        let Some(compound) = compound_wrap.shape.as_compound() else {
            return;
        };

        let threshold =
            result.contact_breaking_threshold() + result.closest_point_distance_threshold();
        let other_bounds = other_wrap
            .shape
            .aabb(&other_wrap.world_transform)
            .loosened(threshold);

        for (index, child) in compound.children.iter().enumerate() {
            let child_wrap = compound_wrap.child(&child.shape, &child.transform, index);
            if !child.shape.aabb(&child_wrap.world_transform).intersects(&other_bounds) {
                continue;
            }

            let (wrap0, wrap1) = if self.swapped {
                (other_wrap, &child_wrap)
            } else {
                (&child_wrap, other_wrap)
            };
            let algorithm = select_algorithm(wrap0.shape, wrap1.shape, false, &self.config);
            log::trace!("compound child {index} via {}", algorithm.name());
            let mut child_result = result.nested(wrap0, wrap1);
            algorithm.process_collision(wrap0, wrap1, &mut child_result);
        }

        if self.owns_manifold {
            result.refresh_contact_points();
        }
    }

    fn name(&self) -> &'static str {
        "compound"
    }
}
