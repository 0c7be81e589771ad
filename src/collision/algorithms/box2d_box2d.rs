use glam::Vec3;

use super::CollisionAlgorithm;
use crate::{
    collision::{
        clipping::clip_segment_to_line,
        manifold_result::{ContactSink, ManifoldResult},
        wrapper::CollisionObjectWrapper,
    },
    config::{BOX2D_ABSOLUTE_TOLERANCE, BOX2D_RELATIVE_TOLERANCE},
    core::{shape::ConvexShape, types::Transform},
};

/// Planar quads lying in their local XY plane, clipped edge against edge.
#[derive(Debug, Clone, Copy)]
pub struct Box2dBox2dAlgorithm {
    owns_manifold: bool,
}

impl Box2dBox2dAlgorithm {
    pub fn new(owns_manifold: bool) -> Self {
        Self { owns_manifold }
    }
}

impl CollisionAlgorithm for Box2dBox2dAlgorithm {
    fn process_collision(
        &self,
        body0: &CollisionObjectWrapper<'_>,
        body1: &CollisionObjectWrapper<'_>,
        result: &mut ManifoldResult<'_>,
    ) {
        let (Some(shape0), Some(shape1)) = (body0.convex(), body1.convex()) else {
            return;
        };
        box2d_contacts(shape0, &body0.world_transform, shape1, &body1.world_transform, result);

        if self.owns_manifold {
            result.refresh_contact_points();
        }
    }

    fn name(&self) -> &'static str {
        "box2d_box2d"
    }
}

struct Quad<'a> {
    vertices: [Vec3; 4],
    normals: [Vec3; 4],
    transform: &'a Transform,
}

impl<'a> Quad<'a> {
    fn new(shape: &ConvexShape, transform: &'a Transform) -> Self {
        Self {
            vertices: shape.box2d_vertices(),
            normals: shape.box2d_normals(),
            transform,
        }
    }

    /// Separation of `other` from this quad's edge `edge`: the deepest vertex of `other`
    /// measured along the edge's outward normal.
    fn edge_separation(&self, edge: usize, other: &Quad<'_>) -> f32 {
        let normal_world = self.transform.transform_vector(self.normals[edge]);
        let normal_other = other.transform.inverse_transform_vector(normal_world);

        let mut index = 0;
        let mut min_dot = f32::MAX;
        for (i, v) in other.vertices.iter().enumerate() {
            let dot = v.dot(normal_other);
            if dot < min_dot {
                min_dot = dot;
                index = i;
            }
        }

        let v1 = self.transform.transform_point(self.vertices[edge]);
        let v2 = other.transform.transform_point(other.vertices[index]);
        (v2 - v1).dot(normal_world)
    }

    /// Edge of this quad with the largest separation from `other`, found by hill-climbing
    /// from the edge facing `other`'s center.
    fn max_separation(&self, other: &Quad<'_>) -> (usize, f32) {
        let count = self.vertices.len();
        let dv = other.transform.position - self.transform.position;
        let d_local = self.transform.inverse_transform_vector(dv);

        let mut edge = 0;
        let mut max_dot = f32::MIN;
        for (i, n) in self.normals.iter().enumerate() {
            let dot = n.dot(d_local);
            if dot > max_dot {
                max_dot = dot;
                edge = i;
            }
        }

        let s = self.edge_separation(edge, other);
        let prev_edge = (edge + count - 1) % count;
        let s_prev = self.edge_separation(prev_edge, other);
        let next_edge = (edge + 1) % count;
        let s_next = self.edge_separation(next_edge, other);

        let (step, mut best_edge, mut best_separation) = if s_prev > s && s_prev > s_next {
            (count - 1, prev_edge, s_prev)
        } else if s_next > s {
            (1, next_edge, s_next)
        } else {
            return (edge, s);
        };

        loop {
            let candidate = (best_edge + step) % count;
            let separation = self.edge_separation(candidate, other);
            if separation > best_separation {
                best_edge = candidate;
                best_separation = separation;
            } else {
                return (best_edge, best_separation);
            }
        }
    }

    /// World-space edge of `incident` most anti-parallel to this quad's edge `edge`.
    fn incident_edge(&self, edge: usize, incident: &Quad<'_>) -> [Vec3; 2] {
        let normal_world = self.transform.transform_vector(self.normals[edge]);
        let normal = incident.transform.inverse_transform_vector(normal_world);

        let mut index = 0;
        let mut min_dot = f32::MAX;
        for (i, n) in incident.normals.iter().enumerate() {
            let dot = n.dot(normal);
            if dot < min_dot {
                min_dot = dot;
                index = i;
            }
        }

        let next = (index + 1) % incident.vertices.len();
        [
            incident.transform.transform_point(incident.vertices[index]),
            incident.transform.transform_point(incident.vertices[next]),
        ]
    }
}

/// Up to two contacts between two planar quads, reported in `shape_a`/`shape_b` order.
///
/// The reference face is taken from B only when its separation beats A's by the
/// hysteresis tolerances, so the choice does not flicker between nearly equal faces.
pub fn box2d_contacts<S: ContactSink + ?Sized>(
    shape_a: &ConvexShape,
    tr_a: &Transform,
    shape_b: &ConvexShape,
    tr_b: &Transform,
    sink: &mut S,
) {
    let quad_a = Quad::new(shape_a, tr_a);
    let quad_b = Quad::new(shape_b, tr_b);

    let (edge_a, separation_a) = quad_a.max_separation(&quad_b);
    if separation_a > 0.0 {
        return;
    }
    let (edge_b, separation_b) = quad_b.max_separation(&quad_a);
    if separation_b > 0.0 {
        return;
    }

    let flip = separation_b > BOX2D_RELATIVE_TOLERANCE * separation_a + BOX2D_ABSOLUTE_TOLERANCE;
    let (reference, incident, edge) = if flip {
        (&quad_b, &quad_a, edge_b)
    } else {
        (&quad_a, &quad_b, edge_a)
    };

    let incident_edge = reference.incident_edge(edge, incident);

    let count = reference.vertices.len();
    let v11 = reference.vertices[edge];
    let v12 = reference.vertices[(edge + 1) % count];
    let side_normal = reference.transform.transform_vector(v12 - v11).normalize_or_zero();
    let front_normal = Vec3::new(side_normal.y, -side_normal.x, 0.0);

    let v11 = reference.transform.transform_point(v11);
    let v12 = reference.transform.transform_point(v12);
    let front_offset = front_normal.dot(v11);
    let side_offset1 = -side_normal.dot(v11);
    let side_offset2 = side_normal.dot(v12);

    let clipped = clip_segment_to_line(incident_edge, -side_normal, side_offset1);
    if clipped.len() < 2 {
        return;
    }
    let clipped = clip_segment_to_line([clipped[0], clipped[1]], side_normal, side_offset2);
    if clipped.len() < 2 {
        return;
    }

    let normal_on_b = if flip { front_normal } else { -front_normal };
    for point in clipped {
        let separation = front_normal.dot(point) - front_offset;
        if separation <= 0.0 {
            // Incident points lie on A when flipped.
            let point_on_b = if flip {
                point - normal_on_b * separation
            } else {
                point
            };
            sink.add_contact_point(normal_on_b, point_on_b, separation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::manifold_result::ContactSample;
    use approx::assert_abs_diff_eq;

    fn unit_quad() -> ConvexShape {
        ConvexShape::box2d(Vec3::new(0.5, 0.5, 0.0))
    }

    #[test]
    fn overlapping_quads_produce_two_edge_points() {
        let quad = unit_quad();
        let tr_b = Transform::from_position(Vec3::new(0.9, 0.0, 0.0));
        let mut sink: Vec<ContactSample> = Vec::new();
        box2d_contacts(&quad, &Transform::IDENTITY, &quad, &tr_b, &mut sink);

        assert_eq!(sink.len(), 2);
        for sample in &sink {
            assert_abs_diff_eq!(sample.normal_on_b, -Vec3::X, epsilon = 1e-6);
            assert_abs_diff_eq!(sample.point_on_b.x, 0.4, epsilon = 1e-5);
            assert_abs_diff_eq!(sample.distance, -0.1, epsilon = 1e-5);
        }
    }

    #[test]
    fn separated_quads_report_nothing() {
        let quad = unit_quad();
        let tr_b = Transform::from_position(Vec3::new(1.2, 0.0, 0.0));
        let mut sink: Vec<ContactSample> = Vec::new();
        box2d_contacts(&quad, &Transform::IDENTITY, &quad, &tr_b, &mut sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn corner_into_face_flips_reference_and_keeps_point_on_b() {
        let small = ConvexShape::box2d(Vec3::new(0.25, 0.25, 0.0));
        let large = ConvexShape::box2d(Vec3::new(1.0, 1.0, 0.0));
        let height = 1.0 + 0.25 * std::f32::consts::SQRT_2 - 0.05;
        let tr_a = Transform::from_position_rotation(
            Vec3::new(0.0, height, 0.0),
            glam::Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
        );
        let mut sink: Vec<ContactSample> = Vec::new();
        box2d_contacts(&small, &tr_a, &large, &Transform::IDENTITY, &mut sink);

        assert_eq!(sink.len(), 1);
        assert_abs_diff_eq!(sink[0].normal_on_b, Vec3::Y, epsilon = 1e-6);
        assert_abs_diff_eq!(sink[0].point_on_b, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-4);
        assert_abs_diff_eq!(sink[0].distance, -0.05, epsilon = 1e-4);
    }

    #[test]
    fn nearly_equal_separations_keep_a_as_reference() {
        // B's face separates by slightly more than A's, but within the hysteresis band.
        let quad = unit_quad();
        let tr_a = Transform::from_position_rotation(Vec3::ZERO, glam::Quat::from_rotation_z(0.05));
        let tr_b = Transform::from_position(Vec3::new(0.9, 0.0, 0.0));
        let mut sink: Vec<ContactSample> = Vec::new();
        box2d_contacts(&quad, &tr_a, &quad, &tr_b, &mut sink);

        assert_eq!(sink.len(), 2);
        let expected = -tr_a.transform_vector(Vec3::X);
        for sample in &sink {
            assert_abs_diff_eq!(sample.normal_on_b, expected, epsilon = 1e-5);
            assert!(sample.distance <= 0.0);
        }
        // A flipped reference would report B's axis-aligned face normal instead.
        assert!(sink[0].normal_on_b.y < -0.04);
    }
}
