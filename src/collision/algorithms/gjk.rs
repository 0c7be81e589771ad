use glam::Vec3;

use crate::{core::shape::ConvexShape, core::types::Transform};

/// Minkowski-difference vertex with the shape supports that produced it.
#[derive(Debug, Clone, Copy)]
struct SupportPoint {
    point: Vec3,
    on_a: Vec3,
    on_b: Vec3,
}

/// Penetration of two margin-inflated convex shapes.
#[derive(Debug, Clone, Copy)]
pub struct Penetration {
    /// Unit normal on B, pointing toward A.
    pub normal_on_b: Vec3,
    /// Overlap of the inflated shapes along `normal_on_b`.
    pub depth: f32,
    pub witness_on_a: Vec3,
    pub witness_on_b: Vec3,
}

struct MinkowskiPair<'s> {
    shape_a: &'s ConvexShape,
    transform_a: &'s Transform,
    shape_b: &'s ConvexShape,
    transform_b: &'s Transform,
    inflate: f32,
}

impl MinkowskiPair<'_> {
    fn support(&self, direction: Vec3) -> SupportPoint {
        let unit = direction.normalize_or_zero();
        let on_a = self.shape_a.support(self.transform_a, direction) + unit * self.inflate;
        let on_b = self.shape_b.support(self.transform_b, -direction) - unit * self.inflate;
        SupportPoint {
            point: on_a - on_b,
            on_a,
            on_b,
        }
    }
}

/// Gilbert-Johnson-Keerthi (GJK) boolean test feeding the EPA depth query.
pub struct GJKAlgorithm;

impl GJKAlgorithm {
    const MAX_ITERATIONS: usize = 32;
    const EPSILON: f32 = 1e-6;

    /// Overlap of `shape_a` and `shape_b` after growing each by `inflate`, or `None` when the
    /// inflated shapes are disjoint.
    pub fn penetration(
        shape_a: &ConvexShape,
        transform_a: &Transform,
        shape_b: &ConvexShape,
        transform_b: &Transform,
        inflate: f32,
    ) -> Option<Penetration> {
        let pair = MinkowskiPair {
            shape_a,
            transform_a,
            shape_b,
            transform_b,
            inflate,
        };

        let mut simplex: Vec<SupportPoint> = Vec::with_capacity(4);
        let mut direction = transform_a.position - transform_b.position;
        if direction.length_squared() < Self::EPSILON {
            direction = Vec3::X;
        }

        for _ in 0..Self::MAX_ITERATIONS {
            let support = pair.support(direction);
            if support.point.dot(direction) < 0.0 {
                return None;
            }

            simplex.push(support);
            if Self::contains_origin(&mut simplex, &mut direction) {
                return EPAAlgorithm::compute_penetration(&simplex, &pair);
            }
            if direction.length_squared() < Self::EPSILON * Self::EPSILON {
                // Origin on the simplex boundary: touching at exactly the inflated surfaces.
                return None;
            }
        }

        log::trace!("GJK did not converge in {} iterations", Self::MAX_ITERATIONS);
        None
    }

    fn contains_origin(simplex: &mut Vec<SupportPoint>, direction: &mut Vec3) -> bool {
        match simplex.len() {
            1 => {
                *direction = -simplex[0].point;
                false
            }
            2 => {
                let a = simplex[1].point;
                let b = simplex[0].point;
                let ab = b - a;
                let ao = -a;

                let dir = ab.cross(ao).cross(ab);
                if dir.length_squared() < Self::EPSILON {
                    // Origin is on the line AB. Pick a direction perpendicular to AB.
                    let axis = if ab.x.abs() < 0.1 { Vec3::X } else { Vec3::Y };
                    *direction = ab.cross(axis);
                } else {
                    *direction = dir;
                }
                false
            }
            3 => {
                let a = simplex[2].point;
                let b = simplex[1].point;
                let c = simplex[0].point;
                let ab = b - a;
                let ac = c - a;
                let ao = -a;
                let abc = ab.cross(ac);

                if abc.cross(ac).dot(ao) > 0.0 {
                    simplex.remove(1);
                    *direction = ac.cross(ao).cross(ac);
                } else if ab.cross(abc).dot(ao) > 0.0 {
                    simplex.remove(0);
                    *direction = ab.cross(ao).cross(ab);
                } else if abc.length_squared() < Self::EPSILON {
                    let axis = if ab.x.abs() < 0.1 { Vec3::X } else { Vec3::Y };
                    *direction = ab.cross(axis);
                } else if abc.dot(ao) > 0.0 {
                    *direction = abc;
                } else {
                    *direction = -abc;
                }
                false
            }
            4 => {
                let a = simplex[3].point;
                let faces = [
                    (2usize, 1usize, 0usize),
                    (2, 0, 1),
                    (1, 0, 2),
                ];
                // Each face contains the newest vertex `a`; the listed third index is the
                // vertex opposite the face, dropped when the origin lies outside it.
                for (i, j, opposite) in faces {
                    let b = simplex[i].point;
                    let c = simplex[j].point;
                    let mut normal = (b - a).cross(c - a);
                    if normal.dot(simplex[opposite].point - a) > 0.0 {
                        normal = -normal;
                    }
                    if normal.dot(-a) > 0.0 {
                        simplex.remove(opposite);
                        *direction = normal;
                        return false;
                    }
                }
                true
            }
            _ => false,
        }
    }
}

/// Expanding Polytope Algorithm for penetration depth calculation.
struct EPAAlgorithm;

impl EPAAlgorithm {
    const MAX_ITERATIONS: usize = 64;
    const TOLERANCE: f32 = 1e-4;

    fn compute_penetration(
        simplex: &[SupportPoint],
        pair: &MinkowskiPair<'_>,
    ) -> Option<Penetration> {
        let [p0, p1, p2, p3] = simplex else {
            return None;
        };
        let volume = (p1.point - p0.point)
            .cross(p2.point - p0.point)
            .dot(p3.point - p0.point);
        if volume.abs() < GJKAlgorithm::EPSILON * GJKAlgorithm::EPSILON {
            log::trace!("EPA skipped: flat initial simplex");
            return None;
        }

        let mut polytope = vec![*p0, *p1, *p2, *p3];
        let mut faces = Self::build_initial_faces(&polytope);

        for _ in 0..Self::MAX_ITERATIONS {
            let (face, min_dist, normal) = Self::find_closest_face(&polytope, &faces)?;

            let support = pair.support(normal);
            let distance = support.point.dot(normal);
            if distance - min_dist < Self::TOLERANCE * min_dist.abs().max(1.0) {
                return Some(Self::penetration_from_face(&polytope, faces[face], normal, min_dist));
            }

            Self::expand_polytope(&mut polytope, &mut faces, support);
            if faces.is_empty() {
                return None;
            }
        }

        log::warn!("EPA did not converge in {} iterations", Self::MAX_ITERATIONS);
        let (face, min_dist, normal) = Self::find_closest_face(&polytope, &faces)?;
        Some(Self::penetration_from_face(&polytope, faces[face], normal, min_dist))
    }

    fn penetration_from_face(
        polytope: &[SupportPoint],
        face: [usize; 3],
        normal: Vec3,
        distance: f32,
    ) -> Penetration {
        let [a, b, c] = face.map(|i| polytope[i]);
        let (u, v, w) = barycentric(normal * distance, a.point, b.point, c.point);
        Penetration {
            normal_on_b: -normal,
            depth: distance,
            witness_on_a: a.on_a * u + b.on_a * v + c.on_a * w,
            witness_on_b: a.on_b * u + b.on_b * v + c.on_b * w,
        }
    }

    /// Faces of the initial tetrahedron, wound so each normal points away from the vertex
    /// opposite it. The origin may lie on the tetrahedron's boundary, so it cannot be used
    /// to orient the faces.
    fn build_initial_faces(polytope: &[SupportPoint]) -> Vec<[usize; 3]> {
        let mut faces = [([0, 1, 2], 3), ([0, 2, 3], 1), ([0, 3, 1], 2), ([1, 3, 2], 0)];

        for (face, opposite) in &mut faces {
            let a = polytope[face[0]].point;
            let normal = (polytope[face[1]].point - a).cross(polytope[face[2]].point - a);
            if normal.dot(polytope[*opposite].point - a) > 0.0 {
                face.swap(1, 2);
            }
        }
        faces.into_iter().map(|(face, _)| face).collect()
    }

    fn find_closest_face(
        polytope: &[SupportPoint],
        faces: &[[usize; 3]],
    ) -> Option<(usize, f32, Vec3)> {
        let mut best: Option<(usize, f32, Vec3)> = None;

        for (idx, &[a, b, c]) in faces.iter().enumerate() {
            let ab = polytope[b].point - polytope[a].point;
            let ac = polytope[c].point - polytope[a].point;
            let normal = ab.cross(ac).normalize_or_zero();
            if normal == Vec3::ZERO {
                continue;
            }

            // Zero or slightly negative when the origin sits on this face.
            let dist = polytope[a].point.dot(normal).max(0.0);
            match best {
                Some((_, min_dist, _)) if min_dist <= dist => {}
                _ => best = Some((idx, dist, normal)),
            }
        }

        best
    }

    fn expand_polytope(
        polytope: &mut Vec<SupportPoint>,
        faces: &mut Vec<[usize; 3]>,
        support: SupportPoint,
    ) {
        let new_idx = polytope.len();
        polytope.push(support);

        let mut edges = Vec::new();
        let mut i = 0;
        while i < faces.len() {
            let [a, b, c] = faces[i];
            let ab = polytope[b].point - polytope[a].point;
            let ac = polytope[c].point - polytope[a].point;
            let normal = ab.cross(ac).normalize_or_zero();

            if normal.dot(support.point - polytope[a].point) > 0.0 {
                edges.push((a, b));
                edges.push((b, c));
                edges.push((c, a));
                faces.swap_remove(i);
            } else {
                i += 1;
            }
        }

        let mut boundary_edges: Vec<(usize, usize)> = Vec::new();
        for (u, v) in edges {
            if let Some(j) = boundary_edges.iter().position(|&edge| edge == (v, u)) {
                boundary_edges.swap_remove(j);
            } else {
                boundary_edges.push((u, v));
            }
        }

        for (u, v) in boundary_edges {
            faces.push([u, v, new_idx]);
        }
    }
}

/// Barycentric coordinates of `p` projected onto triangle `abc`.
fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < f32::EPSILON {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    (1.0 - v - w, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::UpAxis;
    use approx::assert_abs_diff_eq;

    #[test]
    fn overlapping_spheres_report_depth_and_normal() {
        let a = ConvexShape::sphere(1.0);
        let b = ConvexShape::sphere(1.0);
        let tr_a = Transform::from_position(Vec3::new(1.5, 0.0, 0.0));
        let pen = GJKAlgorithm::penetration(&a, &tr_a, &b, &Transform::IDENTITY, 0.0)
            .expect("overlapping spheres");
        assert!(pen.depth > 0.45 && pen.depth < 0.55, "depth was {}", pen.depth);
        assert!(pen.normal_on_b.x > 0.95, "normal was {:?}", pen.normal_on_b);
        assert!(pen.witness_on_b.x > 0.9 && pen.witness_on_b.x < 1.05);
    }

    #[test]
    fn sphere_depth_tracks_center_distance() {
        let sphere = ConvexShape::sphere(1.0);
        for x in [0.5_f32, 1.0, 1.5] {
            let tr_a = Transform::from_position(Vec3::new(x, 0.0, 0.0));
            let pen = GJKAlgorithm::penetration(&sphere, &tr_a, &sphere, &Transform::IDENTITY, 0.0)
                .expect("overlapping spheres");
            assert_abs_diff_eq!(pen.depth, 2.0 - x, epsilon = 2e-2);
            assert!(pen.normal_on_b.x > 0.99, "x {x}: normal was {:?}", pen.normal_on_b);
        }
    }

    #[test]
    fn separated_shapes_miss() {
        let a = ConvexShape::capsule(0.5, 1.0, UpAxis::Y);
        let b = ConvexShape::cylinder(Vec3::splat(0.5), UpAxis::Y);
        let tr_a = Transform::from_position(Vec3::new(3.0, 0.0, 0.0));
        assert!(GJKAlgorithm::penetration(&a, &tr_a, &b, &Transform::IDENTITY, 0.01).is_none());
    }

    #[test]
    fn inflation_detects_near_contact() {
        let a = ConvexShape::sphere(1.0);
        let b = ConvexShape::cylinder(Vec3::splat(1.0), UpAxis::Y);
        let tr_a = Transform::from_position(Vec3::new(0.0, 2.01, 0.0));
        assert!(GJKAlgorithm::penetration(&a, &tr_a, &b, &Transform::IDENTITY, 0.0).is_none());
        let pen = GJKAlgorithm::penetration(&a, &tr_a, &b, &Transform::IDENTITY, 0.02)
            .expect("inflated shapes overlap");
        assert_abs_diff_eq!(pen.depth, 0.03, epsilon = 5e-3);
        assert!(pen.normal_on_b.y > 0.95);
    }
}
