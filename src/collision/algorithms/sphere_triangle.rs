use glam::Vec3;

use super::CollisionAlgorithm;
use crate::{
    collision::{
        manifold_result::{ContactSample, ContactSink, ManifoldResult, SwappedSink},
        wrapper::CollisionObjectWrapper,
    },
    config::SIMD_EPSILON,
    core::shape::ShapeKind,
    utils::math::closest_point_on_triangle,
};

/// Sphere against a single triangle. `swapped` means body0 is the triangle.
///
/// The triangle's own margin is not added; it acts as a zero-thickness face.
#[derive(Debug, Clone, Copy)]
pub struct SphereTriangleAlgorithm {
    owns_manifold: bool,
    swapped: bool,
}

impl SphereTriangleAlgorithm {
    pub fn new(owns_manifold: bool, swapped: bool) -> Self {
        Self {
            owns_manifold,
            swapped,
        }
    }
}

impl CollisionAlgorithm for SphereTriangleAlgorithm {
    fn process_collision(
        &self,
        body0: &CollisionObjectWrapper<'_>,
        body1: &CollisionObjectWrapper<'_>,
        result: &mut ManifoldResult<'_>,
    ) {
        let (sphere_wrap, triangle_wrap) = if self.swapped {
            (body1, body0)
        } else {
            (body0, body1)
        };
        let Some(radius) = sphere_wrap.convex().and_then(|s| s.as_sphere_radius()) else {
            return;
        };
        let Some(triangle) = triangle_wrap.convex() else {
            return;
        };
        let ShapeKind::Triangle { vertices } = triangle.kind() else {
            return;
        };

        let scaling = triangle.local_scaling();
        let world = vertices.map(|v| triangle_wrap.world_transform.transform_point(v * scaling));
        let contact = sphere_triangle_contact(
            sphere_wrap.world_transform.position,
            radius,
            world,
            result.contact_breaking_threshold(),
        );

        if let Some(contact) = contact {
            log::trace!("sphere-triangle distance {}", contact.distance);
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

        if self.owns_manifold {
            result.refresh_contact_points();
        }
    }

    fn name(&self) -> &'static str {
        "sphere_triangle"
    }
}

/// Contact of a sphere with triangle `vertices` (world space): point on the triangle,
/// normal from the triangle toward the sphere center.
///
/// Reports a contact while the center is within `radius + threshold` of the triangle.
pub fn sphere_triangle_contact(
    center: Vec3,
    radius: f32,
    vertices: [Vec3; 3],
    threshold: f32,
) -> Option<ContactSample> {
    let [a, b, c] = vertices;
    let radius_with_threshold = radius + threshold;

    let mut face_normal = (b - a).cross(c - a).normalize_or_zero();
    let mut distance_from_plane = (center - a).dot(face_normal);
    if distance_from_plane < 0.0 {
        distance_from_plane = -distance_from_plane;
        face_normal = -face_normal;
    }
    if distance_from_plane >= radius_with_threshold {
        return None;
    }

    let closest = closest_point_on_triangle(center, a, b, c);
    let to_center = center - closest;
    let dist2 = to_center.length_squared();
    if dist2 >= radius_with_threshold * radius_with_threshold {
        return None;
    }

    Some(if dist2 > SIMD_EPSILON {
        let dist = dist2.sqrt();
        ContactSample {
            normal_on_b: to_center / dist,
            point_on_b: closest,
            distance: dist - radius,
        }
    } else {
        ContactSample {
            normal_on_b: if face_normal == Vec3::ZERO { Vec3::Y } else { face_normal },
            point_on_b: closest,
            distance: -radius,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const TRI: [Vec3; 3] = [
        Vec3::new(-1.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::new(0.0, 0.0, 1.0),
    ];

    #[test]
    fn face_region_contact() {
        let contact =
            sphere_triangle_contact(Vec3::new(0.0, 0.4, 0.0), 0.5, TRI, 0.02).expect("contact");
        assert_abs_diff_eq!(contact.normal_on_b, Vec3::Y, epsilon = 1e-6);
        assert_abs_diff_eq!(contact.distance, -0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(contact.point_on_b, Vec3::ZERO, epsilon = 1e-6);
    }

    #[test]
    fn sphere_below_gets_flipped_normal() {
        let contact =
            sphere_triangle_contact(Vec3::new(0.0, -0.3, 0.0), 0.5, TRI, 0.02).expect("contact");
        assert_abs_diff_eq!(contact.normal_on_b, -Vec3::Y, epsilon = 1e-6);
    }

    #[test]
    fn edge_region_contact() {
        let contact =
            sphere_triangle_contact(Vec3::new(0.0, 0.0, -1.3), 0.5, TRI, 0.02).expect("contact");
        assert_abs_diff_eq!(contact.point_on_b, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_abs_diff_eq!(contact.normal_on_b, -Vec3::Z, epsilon = 1e-6);
        assert_abs_diff_eq!(contact.distance, -0.2, epsilon = 1e-5);
    }

    #[test]
    fn vertex_region_and_miss() {
        assert!(sphere_triangle_contact(Vec3::new(0.0, 0.0, 2.0), 0.5, TRI, 0.02).is_none());
        let contact =
            sphere_triangle_contact(Vec3::new(0.0, 0.0, 1.45), 0.5, TRI, 0.02).expect("vertex");
        assert_abs_diff_eq!(contact.point_on_b, TRI[2], epsilon = 1e-6);
    }
}
