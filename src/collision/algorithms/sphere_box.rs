use glam::Vec3;

use super::CollisionAlgorithm;
use crate::{
    collision::{
        manifold_result::{ContactSample, ContactSink, ManifoldResult, SwappedSink},
        wrapper::CollisionObjectWrapper,
    },
    config::SIMD_EPSILON,
    core::{shape::ConvexShape, types::Transform},
};

/// Sphere against an oriented box. `swapped` means body0 is the box.
#[derive(Debug, Clone, Copy)]
pub struct SphereBoxAlgorithm {
    owns_manifold: bool,
    swapped: bool,
}

impl SphereBoxAlgorithm {
    pub fn new(owns_manifold: bool, swapped: bool) -> Self {
        Self {
            owns_manifold,
            swapped,
        }
    }
}

impl CollisionAlgorithm for SphereBoxAlgorithm {
    fn process_collision(
        &self,
        body0: &CollisionObjectWrapper<'_>,
        body1: &CollisionObjectWrapper<'_>,
        result: &mut ManifoldResult<'_>,
    ) {
        let (sphere_wrap, box_wrap) = if self.swapped {
            (body1, body0)
        } else {
            (body0, body1)
        };
        let (Some(radius), Some(box_shape)) = (
            sphere_wrap.convex().and_then(|s| s.as_sphere_radius()),
            box_wrap.convex(),
        ) else {
            return;
        };

        let contact = sphere_box_contact(
            box_shape,
            &box_wrap.world_transform,
            sphere_wrap.world_transform.position,
            radius,
            result.contact_breaking_threshold(),
        );
        if let Some(contact) = contact {
            log::trace!("sphere-box distance {}", contact.distance);
            if self.swapped {
                SwappedSink(result).add_contact_point(
                    contact.normal_on_b,
                    contact.point_on_b,
                    contact.distance,
                );
            } else {
                result.add_contact_point(contact.normal_on_b, contact.point_on_b, contact.distance);
            }
        }

        if self.owns_manifold && result.num_contacts() > 0 {
            result.refresh_contact_points();
        }
    }

    fn name(&self) -> &'static str {
        "sphere_box"
    }
}

/// Closest-feature contact between a sphere and a box, point and normal on the box.
///
/// When the sphere center lies inside the box core, the face with the least penetration
/// is chosen, testing +X, -X, +Y, -Y, +Z, -Z in that order; the first wins ties.
pub fn sphere_box_contact(
    box_shape: &ConvexShape,
    box_transform: &Transform,
    sphere_center: Vec3,
    radius: f32,
    max_contact_distance: f32,
) -> Option<ContactSample> {
    let half_extents = box_shape.box_core_half_extents();
    let box_margin = box_shape.margin();

    let relative = box_transform.inverse_transform_point(sphere_center);
    let mut closest = relative.clamp(-half_extents, half_extents);

    let intersection_distance = radius + box_margin;
    let contact_distance = intersection_distance + max_contact_distance;
    let mut normal = relative - closest;
    let dist2 = normal.length_squared();
    if dist2 > contact_distance * contact_distance {
        return None;
    }

    let distance = if dist2 <= SIMD_EPSILON * SIMD_EPSILON {
        let (depth, face_point, face_normal) = sphere_penetration(half_extents, relative);
        closest = face_point;
        normal = face_normal;
        -depth
    } else {
        let len = dist2.sqrt();
        normal /= len;
        len
    };

    let point_on_box = closest + normal * box_margin;
    Some(ContactSample {
        normal_on_b: box_transform.transform_vector(normal),
        point_on_b: box_transform.transform_point(point_on_box),
        distance: distance - intersection_distance,
    })
}

/// Face of least penetration for a center inside the box: `(depth, face point, normal)`.
fn sphere_penetration(half_extents: Vec3, relative: Vec3) -> (f32, Vec3, Vec3) {
    let mut min_distance = f32::MAX;
    let mut face_point = relative;
    let mut face_normal = Vec3::X;

    for axis in 0..3 {
        for sign in [1.0_f32, -1.0] {
            let face_distance = half_extents[axis] - sign * relative[axis];
            if face_distance < min_distance {
                min_distance = face_distance;
                face_point = relative;
                face_point[axis] = sign * half_extents[axis];
                face_normal = Vec3::ZERO;
                face_normal[axis] = sign;
            }
        }
    }

    (min_distance, face_point, face_normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Quat;

    #[test]
    fn touching_sphere_reports_face_contact() {
        let cube = ConvexShape::cuboid(Vec3::ONE);
        let center = Vec3::new(0.0, 1.4, 0.0);
        let contact =
            sphere_box_contact(&cube, &Transform::IDENTITY, center, 0.5, 0.02).expect("contact");
        assert_abs_diff_eq!(contact.normal_on_b, Vec3::Y, epsilon = 1e-6);
        assert_abs_diff_eq!(contact.point_on_b, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        assert_abs_diff_eq!(contact.distance, -0.1, epsilon = 1e-5);
    }

    #[test]
    fn far_sphere_misses() {
        let cube = ConvexShape::cuboid(Vec3::ONE);
        let center = Vec3::new(0.0, 3.0, 0.0);
        assert!(sphere_box_contact(&cube, &Transform::IDENTITY, center, 0.5, 0.02).is_none());
    }

    #[test]
    fn centered_sphere_picks_positive_x_face() {
        let cube = ConvexShape::cuboid(Vec3::ONE);
        let contact = sphere_box_contact(&cube, &Transform::IDENTITY, Vec3::ZERO, 0.5, 0.02)
            .expect("contact");
        assert_eq!(contact.normal_on_b, Vec3::X);
        assert_abs_diff_eq!(contact.point_on_b, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_abs_diff_eq!(contact.distance, -1.5, epsilon = 1e-5);
    }

    #[test]
    fn deep_center_picks_nearest_face() {
        let cube = ConvexShape::cuboid(Vec3::new(2.0, 1.0, 1.0));
        let center = Vec3::new(0.0, -0.5, 0.0);
        let contact =
            sphere_box_contact(&cube, &Transform::IDENTITY, center, 0.25, 0.02).expect("contact");
        assert_eq!(contact.normal_on_b, -Vec3::Y);
    }

    #[test]
    fn rotated_box_returns_world_normal() {
        let cube = ConvexShape::cuboid(Vec3::ONE);
        let transform = Transform::from_position_rotation(
            Vec3::new(5.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        let contact = sphere_box_contact(&cube, &transform, Vec3::new(6.4, 0.0, 0.0), 0.5, 0.02)
            .expect("contact");
        assert_abs_diff_eq!(contact.normal_on_b, Vec3::X, epsilon = 1e-5);
        assert_abs_diff_eq!(contact.distance, -0.1, epsilon = 1e-4);
    }
}
