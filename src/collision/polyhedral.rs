//! Separating-axis search and face clipping between two convex polyhedra.

use glam::Vec3;

use super::{
    clipping::{clip_polygon, Plane},
    manifold_result::ContactSink,
    polyhedron::ConvexPolyhedron,
};
use crate::{
    config::SIMD_EPSILON,
    core::types::Transform,
    utils::math::{closest_points_segment_segment, is_almost_zero},
};

#[derive(Debug, Clone, Copy)]
struct AxisOverlap {
    depth: f32,
    witness_a: Vec3,
    witness_b: Vec3,
    index_a: usize,
    index_b: usize,
}

#[derive(Debug, Clone, Copy)]
struct EdgePair {
    local_a: Vec3,
    local_b: Vec3,
    world_a: Vec3,
    world_b: Vec3,
    overlap: AxisOverlap,
}

/// Interval overlap of both hulls on `axis`, or `None` when it separates them.
fn test_sep_axis(
    hull_a: &ConvexPolyhedron,
    hull_b: &ConvexPolyhedron,
    tr_a: &Transform,
    tr_b: &Transform,
    axis: Vec3,
) -> Option<AxisOverlap> {
    let pa = hull_a.project(tr_a, axis);
    let pb = hull_b.project(tr_b, axis);
    if pa.max < pb.min || pb.max < pa.min {
        return None;
    }

    let d0 = pa.max - pb.min;
    let d1 = pb.max - pa.min;
    Some(if d0 < d1 {
        AxisOverlap {
            depth: d0,
            witness_a: pa.witness_max,
            witness_b: pb.witness_min,
            index_a: pa.index_max,
            index_b: pb.index_min,
        }
    } else {
        AxisOverlap {
            depth: d1,
            witness_a: pa.witness_min,
            witness_b: pb.witness_max,
            index_a: pa.index_min,
            index_b: pb.index_max,
        }
    })
}

fn box_support_radius(extents: Vec3, local_axis: Vec3) -> f32 {
    let p = Vec3::select(local_axis.cmplt(Vec3::ZERO), -extents, extents);
    p.dot(local_axis)
}

/// Cheap lower bound on the overlap along `axis` from the inner spheres/boxes.
/// Returns `false` when the axis cannot beat `dmin`.
fn test_internal_objects(
    tr_a: &Transform,
    tr_b: &Transform,
    delta_c: Vec3,
    axis: Vec3,
    hull_a: &ConvexPolyhedron,
    hull_b: &ConvexPolyhedron,
    dmin: f32,
) -> bool {
    let dp = delta_c.dot(axis);
    let radius_a = box_support_radius(hull_a.extents, tr_a.inverse_transform_vector(axis))
        .max(hull_a.inner_radius);
    let radius_b = box_support_radius(hull_b.extents, tr_b.inverse_transform_vector(axis))
        .max(hull_b.inner_radius);

    let min_max_radius = radius_a + radius_b;
    let d0 = min_max_radius + dp;
    let d1 = min_max_radius - dp;
    d0.min(d1) <= dmin
}

/// Searches face normals of both hulls and cross products of their edges for the axis of
/// least penetration. Returns it oriented from B toward A, or `None` when separated.
///
/// When an edge pair wins, one edge-edge contact is reported to `sink` right away.
pub fn find_separating_axis<S: ContactSink + ?Sized>(
    hull_a: &ConvexPolyhedron,
    hull_b: &ConvexPolyhedron,
    tr_a: &Transform,
    tr_b: &Transform,
    use_internal_objects: bool,
    sink: &mut S,
) -> Option<Vec3> {
    let c0 = tr_a.transform_point(hull_a.local_center);
    let c1 = tr_b.transform_point(hull_b.local_center);
    let delta_c = c0 - c1;

    let mut dmin = f32::MAX;
    let mut sep = Vec3::ZERO;

    let face_normals = hull_a
        .faces
        .iter()
        .map(|face| tr_a.transform_vector(face.normal))
        .chain(hull_b.faces.iter().map(|face| tr_b.transform_vector(face.normal)));
    for normal in face_normals {
        let normal = if delta_c.dot(normal) < 0.0 { -normal } else { normal };
        if use_internal_objects
            && !test_internal_objects(tr_a, tr_b, delta_c, normal, hull_a, hull_b, dmin)
        {
            continue;
        }
        let overlap = test_sep_axis(hull_a, hull_b, tr_a, tr_b, normal)?;
        if overlap.depth < dmin {
            dmin = overlap.depth;
            sep = normal;
        }
    }

    let mut edge_pair: Option<EdgePair> = None;
    for local_a in &hull_a.unique_edges {
        let world_a = tr_a.transform_vector(*local_a);
        for local_b in &hull_b.unique_edges {
            let world_b = tr_b.transform_vector(*local_b);
            let cross = world_a.cross(world_b);
            if is_almost_zero(cross) {
                continue;
            }
            let mut axis = cross.normalize();
            if delta_c.dot(axis) < 0.0 {
                axis = -axis;
            }
            if use_internal_objects
                && !test_internal_objects(tr_a, tr_b, delta_c, axis, hull_a, hull_b, dmin)
            {
                continue;
            }
            let overlap = test_sep_axis(hull_a, hull_b, tr_a, tr_b, axis)?;
            if overlap.depth < dmin {
                dmin = overlap.depth;
                sep = axis;
                edge_pair = Some(EdgePair {
                    local_a: *local_a,
                    local_b: *local_b,
                    world_a,
                    world_b,
                    overlap,
                });
            }
        }
    }

    if let Some(pair) = edge_pair {
        add_edge_contact(hull_a, hull_b, tr_a, tr_b, delta_c, &pair, sink);
    }

    if delta_c.dot(sep) < 0.0 {
        sep = -sep;
    }
    log::trace!("separating axis {sep:?} depth {dmin} (edge pair: {})", edge_pair.is_some());
    Some(sep)
}

fn add_edge_contact<S: ContactSink + ?Sized>(
    hull_a: &ConvexPolyhedron,
    hull_b: &ConvexPolyhedron,
    tr_a: &Transform,
    tr_b: &Transform,
    delta_c: Vec3,
    pair: &EdgePair,
    sink: &mut S,
) {
    let segment_a = hull_a.edge_through(pair.overlap.index_a, pair.local_a);
    let segment_b = hull_b.edge_through(pair.overlap.index_b, pair.local_b);

    let (point_a, point_b) = match (segment_a, segment_b) {
        (Some((a0, a1)), Some((b0, b1))) => {
            let a0 = tr_a.transform_point(a0);
            let b0 = tr_b.transform_point(b0);
            closest_points_segment_segment(
                a0,
                tr_a.transform_point(a1) - a0,
                b0,
                tr_b.transform_point(b1) - b0,
            )
        }
        _ => closest_points_on_lines(
            pair.overlap.witness_a,
            pair.world_a,
            pair.overlap.witness_b,
            pair.world_b,
        ),
    };

    let between = point_b - point_a;
    let len2 = between.length_squared();
    if len2 <= SIMD_EPSILON {
        return;
    }
    let len = len2.sqrt();
    let mut normal = between / len;
    if normal.dot(delta_c) < 0.0 {
        normal = -normal;
    }
    sink.add_contact_point(normal, point_b, -len);
}

/// Closest points of the infinite lines `pa + s*da` and `pb + t*db`, `da`/`db` unit.
fn closest_points_on_lines(pa: Vec3, da: Vec3, pb: Vec3, db: Vec3) -> (Vec3, Vec3) {
    let translation = pb - pa;
    let da_db = da.dot(db);
    let da_t = da.dot(translation);
    let db_t = db.dot(translation);
    let denom = 1.0 - da_db * da_db;
    let ta = if denom == 0.0 {
        0.0
    } else {
        (da_t - db_t * da_db) / denom
    };
    let tb = ta * da_db - db_t;
    (pa + da * ta, pb + db * tb)
}

/// Picks B's face most aligned with `separating_normal` as incident and clips it against A.
#[allow(clippy::too_many_arguments)]
pub fn clip_hull_against_hull<S: ContactSink + ?Sized>(
    separating_normal: Vec3,
    hull_a: &ConvexPolyhedron,
    hull_b: &ConvexPolyhedron,
    tr_a: &Transform,
    tr_b: &Transform,
    min_dist: f32,
    max_dist: f32,
    sink: &mut S,
) {
    let normal = separating_normal.normalize_or_zero();

    let mut incident = None;
    let mut dmax = f32::MIN;
    for face in &hull_b.faces {
        let d = tr_b.transform_vector(face.normal).dot(normal);
        if d > dmax {
            dmax = d;
            incident = Some(face);
        }
    }
    let Some(incident) = incident else {
        return;
    };

    let polygon: Vec<Vec3> = incident
        .indices
        .iter()
        .map(|&i| tr_b.transform_point(hull_b.vertices[i]))
        .collect();
    clip_face_against_hull(normal, hull_a, tr_a, &polygon, min_dist, max_dist, sink);
}

/// Clips `incident` (world space) against the side planes of A's face least aligned with
/// `separating_normal` and reports every surviving vertex within `max_dist` of that face.
pub fn clip_face_against_hull<S: ContactSink + ?Sized>(
    separating_normal: Vec3,
    hull_a: &ConvexPolyhedron,
    tr_a: &Transform,
    incident: &[Vec3],
    min_dist: f32,
    max_dist: f32,
    sink: &mut S,
) {
    let mut reference = None;
    let mut dmin = f32::MAX;
    for face in &hull_a.faces {
        let d = tr_a.transform_vector(face.normal).dot(separating_normal);
        if d < dmin {
            dmin = d;
            reference = Some(face);
        }
    }
    let Some(reference) = reference else {
        return;
    };

    let reference_normal = tr_a.transform_vector(reference.normal);
    let count = reference.indices.len();
    let side_planes: Vec<Plane> = (0..count)
        .map(|e| {
            let a = hull_a.vertices[reference.indices[e]];
            let b = hull_a.vertices[reference.indices[(e + 1) % count]];
            let world_edge = tr_a.transform_vector(a - b);
            let side_normal = -world_edge.cross(reference_normal);
            Plane::from_point_normal(tr_a.transform_point(a), side_normal)
        })
        .collect();
    let polygon = clip_polygon(incident, &side_planes);

    let plane_offset = reference.offset - reference_normal.dot(tr_a.position);
    for vertex in polygon {
        let depth = (reference_normal.dot(vertex) + plane_offset).max(min_dist);
        if depth <= max_dist {
            sink.add_contact_point(separating_normal, vertex, depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::manifold_result::ContactSample;
    use approx::assert_abs_diff_eq;
    use glam::Quat;

    fn cube() -> ConvexPolyhedron {
        ConvexPolyhedron::cuboid(Vec3::splat(0.5))
    }

    #[test]
    fn separated_cubes_have_no_axis() {
        let mut sink: Vec<ContactSample> = Vec::new();
        let axis = find_separating_axis(
            &cube(),
            &cube(),
            &Transform::from_position(Vec3::new(2.0, 0.0, 0.0)),
            &Transform::IDENTITY,
            true,
            &mut sink,
        );
        assert!(axis.is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn stacked_cubes_clip_to_four_points() {
        let hull = cube();
        let tr_a = Transform::from_position(Vec3::new(0.0, 0.9, 0.0));
        let tr_b = Transform::IDENTITY;
        let mut sink: Vec<ContactSample> = Vec::new();
        let axis = find_separating_axis(&hull, &hull, &tr_a, &tr_b, true, &mut sink).unwrap();
        assert_abs_diff_eq!(axis, Vec3::Y, epsilon = 1e-5);

        clip_hull_against_hull(axis, &hull, &hull, &tr_a, &tr_b, -1e30, 0.02, &mut sink);
        assert_eq!(sink.len(), 4);
        for sample in &sink {
            assert_abs_diff_eq!(sample.distance, -0.1, epsilon = 1e-5);
            assert_abs_diff_eq!(sample.point_on_b.y, 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn oversized_incident_face_is_trimmed_to_reference_face() {
        let hull = cube();
        let incident = [
            Vec3::new(-1.0, 0.45, -1.0),
            Vec3::new(1.0, 0.45, -1.0),
            Vec3::new(1.0, 0.45, 1.0),
            Vec3::new(-1.0, 0.45, 1.0),
        ];
        let mut sink: Vec<ContactSample> = Vec::new();
        clip_face_against_hull(
            -Vec3::Y,
            &hull,
            &Transform::IDENTITY,
            &incident,
            -1e30,
            0.02,
            &mut sink,
        );

        assert_eq!(sink.len(), 4);
        for sample in &sink {
            assert_abs_diff_eq!(sample.point_on_b.x.abs(), 0.5, epsilon = 1e-5);
            assert_abs_diff_eq!(sample.point_on_b.z.abs(), 0.5, epsilon = 1e-5);
            assert_abs_diff_eq!(sample.distance, -0.05, epsilon = 1e-5);
        }
    }

    #[test]
    fn crossed_edges_report_edge_contact() {
        let hull = cube();
        let tr_a = Transform::from_position_rotation(
            Vec3::new(0.0, 1.1, 0.0),
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_4),
        );
        let tr_b = Transform::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
        );
        let mut sink: Vec<ContactSample> = Vec::new();
        let axis = find_separating_axis(&hull, &hull, &tr_a, &tr_b, false, &mut sink).unwrap();
        assert!(axis.y > 0.99);
        assert_eq!(sink.len(), 1);
        let edge_depth = 2.0 * 0.5 * std::f32::consts::SQRT_2 - 1.1;
        assert_abs_diff_eq!(sink[0].distance, -edge_depth, epsilon = 1e-4);
        assert!(sink[0].normal_on_b.y > 0.99);
    }
}
