//! Pairwise contact detectors and the table choosing one per shape pair.

pub mod box2d_box2d;
pub mod box_box;
pub mod compound;
pub mod convex_convex;
pub mod gjk;
pub mod sphere_box;
pub mod sphere_sphere;
pub mod sphere_triangle;

use std::fmt::Debug;

pub use box2d_box2d::Box2dBox2dAlgorithm;
pub use box_box::BoxBoxAlgorithm;
pub use compound::CompoundAlgorithm;
pub use convex_convex::ConvexConvexAlgorithm;
pub use gjk::{GJKAlgorithm, Penetration};
pub use sphere_box::SphereBoxAlgorithm;
pub use sphere_sphere::SphereSphereAlgorithm;
pub use sphere_triangle::SphereTriangleAlgorithm;

use super::{manifold_result::ManifoldResult, wrapper::CollisionObjectWrapper};
use crate::{
    config::CollisionConfig,
    core::shape::{CollisionShape, ShapeKind},
};

/// A detector bound to one shape pair. Stateless across steps apart from its flags, so
/// one instance may serve the pair for its whole lifetime.
pub trait CollisionAlgorithm: Debug + Send + Sync {
    /// Runs one detection step, writing through `result` only.
    ///
    /// `body0` and `body1` must be the wrappers `result` was built with.
    fn process_collision(
        &self,
        body0: &CollisionObjectWrapper<'_>,
        body1: &CollisionObjectWrapper<'_>,
        result: &mut ManifoldResult<'_>,
    );

    fn name(&self) -> &'static str;
}

/// Picks the detector for `shape0` against `shape1`.
///
/// Only the detector that owns the pair's manifold refreshes or clears it; detectors
/// created for compound children share their parent's manifold.
pub fn select_algorithm(
    shape0: &CollisionShape,
    shape1: &CollisionShape,
    owns_manifold: bool,
    config: &CollisionConfig,
) -> Box<dyn CollisionAlgorithm> {
    let (convex0, convex1) = match (shape0, shape1) {
        (CollisionShape::Compound(_), _) => {
            return Box::new(CompoundAlgorithm::new(owns_manifold, false, *config));
        }
        (_, CollisionShape::Compound(_)) => {
            return Box::new(CompoundAlgorithm::new(owns_manifold, true, *config));
        }
        (CollisionShape::Convex(a), CollisionShape::Convex(b)) => (a, b),
    };

    match (convex0.kind(), convex1.kind()) {
        (ShapeKind::Sphere { .. }, ShapeKind::Sphere { .. }) => {
            Box::new(SphereSphereAlgorithm::new(owns_manifold))
        }
        (ShapeKind::Sphere { .. }, ShapeKind::Box { .. }) => {
            Box::new(SphereBoxAlgorithm::new(owns_manifold, false))
        }
        (ShapeKind::Box { .. }, ShapeKind::Sphere { .. }) => {
            Box::new(SphereBoxAlgorithm::new(owns_manifold, true))
        }
        (ShapeKind::Sphere { .. }, ShapeKind::Triangle { .. }) => {
            Box::new(SphereTriangleAlgorithm::new(owns_manifold, false))
        }
        (ShapeKind::Triangle { .. }, ShapeKind::Sphere { .. }) => {
            Box::new(SphereTriangleAlgorithm::new(owns_manifold, true))
        }
        (ShapeKind::Box { .. }, ShapeKind::Box { .. }) => {
            Box::new(BoxBoxAlgorithm::new(owns_manifold, config.use_internal_objects))
        }
        (ShapeKind::Box2d { .. }, ShapeKind::Box2d { .. }) => {
            Box::new(Box2dBox2dAlgorithm::new(owns_manifold))
        }
        _ => Box::new(ConvexConvexAlgorithm::new(
            owns_manifold,
            config.use_internal_objects,
        )),
    }
}
