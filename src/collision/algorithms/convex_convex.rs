use super::{gjk::GJKAlgorithm, CollisionAlgorithm};
use crate::{
    collision::{
        manifold_result::{ContactSink, ManifoldResult},
        polyhedral::{clip_hull_against_hull, find_separating_axis},
        polyhedron::ConvexPolyhedron,
        wrapper::CollisionObjectWrapper,
    },
    config::POLYHEDRAL_CLIP_MIN_DISTANCE,
    core::{shape::ConvexShape, types::Transform},
};

/// General convex pair: SAT with face clipping when both shapes have a polyhedral form,
/// GJK/EPA on margin-inflated supports otherwise.
///
/// The GJK/EPA path reports one point per step; the persistent manifold gathers the rest.
#[derive(Debug, Clone, Copy)]
pub struct ConvexConvexAlgorithm {
    owns_manifold: bool,
    use_internal_objects: bool,
}

impl ConvexConvexAlgorithm {
    pub fn new(owns_manifold: bool, use_internal_objects: bool) -> Self {
        Self {
            owns_manifold,
            use_internal_objects,
        }
    }
}

impl CollisionAlgorithm for ConvexConvexAlgorithm {
    fn process_collision(
        &self,
        body0: &CollisionObjectWrapper<'_>,
        body1: &CollisionObjectWrapper<'_>,
        result: &mut ManifoldResult<'_>,
    ) {
        let (Some(shape0), Some(shape1)) = (body0.convex(), body1.convex()) else {
            return;
        };
        let threshold =
            result.contact_breaking_threshold() + result.closest_point_distance_threshold();
        let tr0 = body0.world_transform;
        let tr1 = body1.world_transform;

        match (shape0.polyhedron(), shape1.polyhedron()) {
            (Some(hull0), Some(hull1)) => {
                collide_polyhedra(
                    hull0,
                    hull1,
                    &tr0,
                    &tr1,
                    threshold,
                    self.use_internal_objects,
                    result,
                );
            }
            _ => collide_support_maps(shape0, &tr0, shape1, &tr1, threshold, result),
        }

        if self.owns_manifold {
            result.refresh_contact_points();
        }
    }

    fn name(&self) -> &'static str {
        "convex_convex"
    }
}

/// Separating-axis search followed by incident-face clipping.
pub(crate) fn collide_polyhedra<S: ContactSink + ?Sized>(
    hull0: &ConvexPolyhedron,
    hull1: &ConvexPolyhedron,
    tr0: &Transform,
    tr1: &Transform,
    threshold: f32,
    use_internal_objects: bool,
    sink: &mut S,
) {
    let Some(axis) = find_separating_axis(hull0, hull1, tr0, tr1, use_internal_objects, sink) else {
        return;
    };
    clip_hull_against_hull(
        axis,
        hull0,
        hull1,
        tr0,
        tr1,
        POLYHEDRAL_CLIP_MIN_DISTANCE - threshold,
        threshold,
        sink,
    );
}

/// One deepest-point contact from GJK/EPA, with each shape grown by half of `threshold`
/// so that pairs closer than `threshold` still register.
pub(crate) fn collide_support_maps<S: ContactSink + ?Sized>(
    shape0: &ConvexShape,
    tr0: &Transform,
    shape1: &ConvexShape,
    tr1: &Transform,
    threshold: f32,
    sink: &mut S,
) {
    let extra = threshold * 0.5;
    let Some(penetration) = GJKAlgorithm::penetration(shape0, tr0, shape1, tr1, extra) else {
        return;
    };

    let distance = 2.0 * extra - penetration.depth;
    let point_on_b = penetration.witness_on_b - penetration.normal_on_b * extra;
    log::trace!("gjk/epa distance {distance}");
    sink.add_contact_point(penetration.normal_on_b, point_on_b, distance);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collision::manifold_result::ContactSample, core::shape::UpAxis};
    use approx::assert_abs_diff_eq;
    use glam::Vec3;

    #[test]
    fn capsule_resting_on_box_uses_support_path() {
        let capsule = ConvexShape::capsule(0.5, 1.0, UpAxis::Y);
        let cube = ConvexShape::cuboid(Vec3::ONE);
        let tr_capsule = Transform::from_position(Vec3::new(0.0, 1.0 + 1.0 - 0.05, 0.0));
        let mut sink: Vec<ContactSample> = Vec::new();
        collide_support_maps(&capsule, &tr_capsule, &cube, &Transform::IDENTITY, 0.02, &mut sink);
        assert_eq!(sink.len(), 1);
        assert_abs_diff_eq!(sink[0].distance, -0.05, epsilon = 5e-3);
        assert!(sink[0].normal_on_b.y > 0.95);
        assert_abs_diff_eq!(sink[0].point_on_b.y, 1.0, epsilon = 5e-3);
    }

    #[test]
    fn hulls_clip_face_contacts() {
        let points: Vec<Vec3> = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 != 0 { 0.5 } else { -0.5 },
                    if i & 2 != 0 { 0.5 } else { -0.5 },
                    if i & 4 != 0 { 0.5 } else { -0.5 },
                )
            })
            .collect();
        let hull = ConvexShape::convex_hull(points).unwrap();
        let polyhedron = hull.polyhedron().unwrap();
        let tr0 = Transform::from_position(Vec3::new(0.0, 0.95, 0.0));
        let mut sink: Vec<ContactSample> = Vec::new();
        collide_polyhedra(
            polyhedron,
            polyhedron,
            &tr0,
            &Transform::IDENTITY,
            0.02,
            true,
            &mut sink,
        );
        assert_eq!(sink.len(), 4);
        assert!(sink.iter().all(|s| (s.distance + 0.05).abs() < 1e-4));
    }
}
