//! Facet representation of polyhedral convex shapes, used by the general SAT path.

use glam::{Vec2, Vec3};

use crate::{
    core::types::Transform,
    utils::math::{is_almost_zero, plane_space},
};

/// Hull inputs above this size skip the brute-force facet search and use GJK instead.
pub const MAX_HULL_BUILD_POINTS: usize = 64;

/// A face: vertex indices wound counter-clockwise seen from outside, and its plane.
///
/// Points `x` inside the hull satisfy `normal.dot(x) + offset <= 0`.
#[derive(Debug, Clone)]
pub struct Face {
    pub indices: Vec<usize>,
    pub normal: Vec3,
    pub offset: f32,
}

impl Face {
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.offset
    }
}

/// Result of projecting a hull on an axis, with the vertices realizing the extremes.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub min: f32,
    pub max: f32,
    pub witness_min: Vec3,
    pub witness_max: Vec3,
    pub index_min: usize,
    pub index_max: usize,
}

/// Cached vertices/faces/edges of a convex polyhedron in shape-local space.
#[derive(Debug, Clone)]
pub struct ConvexPolyhedron {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
    /// Edge directions with parallel duplicates (either sign) removed.
    pub unique_edges: Vec<Vec3>,
    /// Every edge as a vertex index pair, each stored once.
    pub edges: Vec<(usize, usize)>,
    pub local_center: Vec3,
    /// Half-extents of a box centered on `local_center` that fits inside the hull.
    pub extents: Vec3,
    /// Distance from `local_center` to the nearest face plane.
    pub inner_radius: f32,
    /// Distance from `local_center` to the farthest vertex.
    pub bounding_radius: f32,
}

impl ConvexPolyhedron {
    pub fn cuboid(half_extents: Vec3) -> Self {
        let vertices: Vec<Vec3> = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 != 0 { half_extents.x } else { -half_extents.x },
                    if i & 2 != 0 { half_extents.y } else { -half_extents.y },
                    if i & 4 != 0 { half_extents.z } else { -half_extents.z },
                )
            })
            .collect();

        let cycles: [([usize; 4], Vec3); 6] = [
            ([0, 2, 6, 4], -Vec3::X),
            ([1, 3, 7, 5], Vec3::X),
            ([0, 1, 5, 4], -Vec3::Y),
            ([2, 3, 7, 6], Vec3::Y),
            ([0, 1, 3, 2], -Vec3::Z),
            ([4, 5, 7, 6], Vec3::Z),
        ];
        let faces = cycles
            .iter()
            .map(|(cycle, normal)| face_from_cycle(&vertices, cycle.to_vec(), *normal))
            .collect();

        Self::finalize(vertices, faces)
    }

    /// Two-sided flat polygon; `vertices` must form a convex cycle.
    pub fn planar(vertices: Vec<Vec3>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let normal = newell_normal(&vertices, &(0..vertices.len()).collect::<Vec<_>>());
        if is_almost_zero(normal) {
            return None;
        }
        let normal = normal.normalize();
        let front: Vec<usize> = (0..vertices.len()).collect();
        let back: Vec<usize> = front.iter().rev().copied().collect();
        let faces = vec![
            face_from_cycle(&vertices, front, normal),
            face_from_cycle(&vertices, back, -normal),
        ];
        Some(Self::finalize(vertices, faces))
    }

    /// Facets of the convex hull of `points` via an exhaustive supporting-plane search.
    ///
    /// Returns `None` for degenerate input (fewer than three non-collinear points) or when the
    /// point count exceeds [`MAX_HULL_BUILD_POINTS`].
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let mut unique: Vec<Vec3> = Vec::with_capacity(points.len());
        for &p in points {
            if !unique.iter().any(|q| q.abs_diff_eq(p, 1e-6)) {
                unique.push(p);
            }
        }
        if unique.len() > MAX_HULL_BUILD_POINTS {
            log::warn!(
                "hull with {} points exceeds facet build limit {}",
                unique.len(),
                MAX_HULL_BUILD_POINTS
            );
            return None;
        }
        if unique.len() < 3 {
            log::warn!("hull needs at least 3 distinct points, got {}", unique.len());
            return None;
        }

        let scale = unique
            .iter()
            .map(|p| p.abs().max_element())
            .fold(1.0_f32, f32::max);
        let tolerance = 1e-5 * scale;

        let Some(base_normal) = first_plane_normal(&unique, tolerance) else {
            log::warn!("hull points are collinear");
            return None;
        };
        let base_offset = -base_normal.dot(unique[0]);
        if unique
            .iter()
            .all(|p| (base_normal.dot(*p) + base_offset).abs() <= tolerance)
        {
            let order = planar_hull_order(&unique, base_normal);
            let ring: Vec<Vec3> = order.into_iter().map(|i| unique[i]).collect();
            return Self::planar(ring);
        }

        let mut planes: Vec<(Vec3, f32)> = Vec::new();
        let n = unique.len();
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    let normal = (unique[j] - unique[i]).cross(unique[k] - unique[i]);
                    if normal.length_squared() <= tolerance * tolerance {
                        continue;
                    }
                    let normal = normal.normalize();
                    let offset = -normal.dot(unique[i]);

                    let mut above = false;
                    let mut below = false;
                    for p in &unique {
                        let s = normal.dot(*p) + offset;
                        above |= s > tolerance;
                        below |= s < -tolerance;
                        if above && below {
                            break;
                        }
                    }
                    if above && below {
                        continue;
                    }
                    let (normal, offset) = if above {
                        (-normal, -offset)
                    } else {
                        (normal, offset)
                    };
                    let duplicate = planes.iter().any(|(m, e)| {
                        m.dot(normal) > 1.0 - 1e-5 && (e - offset).abs() <= tolerance
                    });
                    if !duplicate {
                        planes.push((normal, offset));
                    }
                }
            }
        }

        let mut remap: Vec<Option<usize>> = vec![None; n];
        let mut vertices = Vec::new();
        let mut faces = Vec::with_capacity(planes.len());
        for (normal, offset) in &planes {
            let on_plane: Vec<usize> = (0..n)
                .filter(|&i| (normal.dot(unique[i]) + offset).abs() <= tolerance)
                .collect();
            let on_plane_points: Vec<Vec3> = on_plane.iter().map(|&i| unique[i]).collect();
            let ring = planar_hull_order(&on_plane_points, *normal);
            if ring.len() < 3 {
                continue;
            }
            let indices: Vec<usize> = ring
                .into_iter()
                .map(|local| {
                    let original = on_plane[local];
                    *remap[original].get_or_insert_with(|| {
                        vertices.push(unique[original]);
                        vertices.len() - 1
                    })
                })
                .collect();
            faces.push((indices, *normal));
        }

        let faces = faces
            .into_iter()
            .map(|(indices, normal)| face_from_cycle(&vertices, indices, normal))
            .collect::<Vec<_>>();
        log::debug!(
            "built hull facets: {} vertices, {} faces",
            vertices.len(),
            faces.len()
        );
        Some(Self::finalize(vertices, faces))
    }

    fn finalize(vertices: Vec<Vec3>, faces: Vec<Face>) -> Self {
        let mut unique_edges: Vec<Vec3> = Vec::new();
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for face in &faces {
            let count = face.indices.len();
            for i in 0..count {
                let a = face.indices[i];
                let b = face.indices[(i + 1) % count];
                let key = (a.min(b), a.max(b));
                if !edges.contains(&key) {
                    edges.push(key);
                }
                let direction = (vertices[b] - vertices[a]).normalize_or_zero();
                if direction == Vec3::ZERO {
                    continue;
                }
                let known = unique_edges.iter().any(|e| {
                    is_almost_zero(*e - direction) || is_almost_zero(*e + direction)
                });
                if !known {
                    unique_edges.push(direction);
                }
            }
        }

        let local_center = if vertices.is_empty() {
            Vec3::ZERO
        } else {
            vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32
        };

        let inner_radius = faces
            .iter()
            .map(|face| face.signed_distance(local_center).abs())
            .fold(f32::MAX, f32::min);
        let bounding_radius = vertices
            .iter()
            .map(|v| (*v - local_center).length())
            .fold(0.0, f32::max);

        let mut polyhedron = Self {
            vertices,
            faces,
            unique_edges,
            edges,
            local_center,
            extents: Vec3::ZERO,
            inner_radius: if inner_radius == f32::MAX { 0.0 } else { inner_radius },
            bounding_radius,
        };
        polyhedron.fit_inner_box();
        polyhedron
    }

    /// Fits the inner box: start from the cube inscribed in the inner sphere, stretch it along
    /// the longest hull axis, then widen the two remaining axes while it stays contained.
    fn fit_inner_box(&mut self) {
        const STEPS: usize = 1024;

        let r = self.inner_radius / 3.0_f32.sqrt();
        self.extents = Vec3::splat(r);
        if self.vertices.is_empty() {
            return;
        }

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for v in &self.vertices {
            min = min.min(*v);
            max = max.max(*v);
        }
        let half = (max - min) * 0.5;
        let largest = if half.x >= half.y && half.x >= half.z {
            0
        } else if half.y >= half.z {
            1
        } else {
            2
        };

        let step = (half[largest] * 0.5 - r) / STEPS as f32;
        self.extents[largest] = half[largest] * 0.5;
        let mut found = false;
        for _ in 0..STEPS {
            if self.inner_box_contained() {
                found = true;
                break;
            }
            self.extents[largest] -= step;
        }

        if !found {
            self.extents = Vec3::splat(r);
            return;
        }

        let step = (self.inner_radius - r) / STEPS as f32;
        let e0 = (1 << largest) & 3;
        let e1 = (1 << e0) & 3;
        for _ in 0..STEPS {
            let saved = self.extents;
            self.extents[e0] += step;
            self.extents[e1] += step;
            if !self.inner_box_contained() {
                self.extents = saved;
                break;
            }
        }
    }

    fn inner_box_contained(&self) -> bool {
        (0..8).all(|corner| {
            let sign = Vec3::new(
                if corner & 1 != 0 { 1.0 } else { -1.0 },
                if corner & 2 != 0 { 1.0 } else { -1.0 },
                if corner & 4 != 0 { 1.0 } else { -1.0 },
            );
            let point = self.local_center + self.extents * sign;
            self.faces.iter().all(|face| face.signed_distance(point) <= 0.0)
        })
    }

    /// Projects every vertex, placed by `transform`, on `axis`.
    pub fn project(&self, transform: &Transform, axis: Vec3) -> Projection {
        let mut projection = Projection {
            min: f32::MAX,
            max: f32::MIN,
            witness_min: transform.position,
            witness_max: transform.position,
            index_min: 0,
            index_max: 0,
        };
        for (index, vertex) in self.vertices.iter().enumerate() {
            let world = transform.transform_point(*vertex);
            let dp = world.dot(axis);
            if dp < projection.min {
                projection.min = dp;
                projection.witness_min = world;
                projection.index_min = index;
            }
            if dp > projection.max {
                projection.max = dp;
                projection.witness_max = world;
                projection.index_max = index;
            }
        }
        if projection.min > projection.max {
            projection.min = projection.max;
        }
        projection
    }

    /// An edge incident to `vertex` running parallel to `direction` (either sign).
    pub fn edge_through(&self, vertex: usize, direction: Vec3) -> Option<(Vec3, Vec3)> {
        self.edges
            .iter()
            .filter(|(a, b)| *a == vertex || *b == vertex)
            .map(|(a, b)| (self.vertices[*a], self.vertices[*b]))
            .find(|(a, b)| {
                let edge = (*b - *a).normalize_or_zero();
                edge.dot(direction).abs() > 1.0 - 1e-4
            })
    }
}

fn face_from_cycle(vertices: &[Vec3], mut indices: Vec<usize>, outward: Vec3) -> Face {
    let mut normal = newell_normal(vertices, &indices).normalize_or_zero();
    if normal == Vec3::ZERO {
        normal = outward.normalize_or_zero();
    } else if normal.dot(outward) < 0.0 {
        indices.reverse();
        normal = -normal;
    }
    let offset = -normal.dot(vertices[indices[0]]);
    Face {
        indices,
        normal,
        offset,
    }
}

fn newell_normal(vertices: &[Vec3], indices: &[usize]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for i in 0..indices.len() {
        let current = vertices[indices[i]];
        let next = vertices[indices[(i + 1) % indices.len()]];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal
}

fn first_plane_normal(points: &[Vec3], tolerance: f32) -> Option<Vec3> {
    let origin = points[0];
    let (far_index, far) = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, (*p - origin).length_squared()))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if far <= tolerance * tolerance {
        return None;
    }
    let axis = points[far_index] - origin;
    points
        .iter()
        .map(|p| axis.cross(*p - origin))
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .filter(|n| n.length_squared() > tolerance * tolerance)
        .map(Vec3::normalize)
}

/// Indices of the 2D convex hull of coplanar `points`, counter-clockwise around `normal`.
fn planar_hull_order(points: &[Vec3], normal: Vec3) -> Vec<usize> {
    let (u, v) = plane_space(normal);
    let projected: Vec<Vec2> = points.iter().map(|p| Vec2::new(p.dot(u), p.dot(v))).collect();

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        projected[a]
            .x
            .total_cmp(&projected[b].x)
            .then(projected[a].y.total_cmp(&projected[b].y))
    });

    let cross = |o: Vec2, a: Vec2, b: Vec2| (a - o).perp_dot(b - o);
    let mut hull: Vec<usize> = Vec::with_capacity(order.len() * 2);
    for &i in &order {
        while hull.len() >= 2
            && cross(projected[hull[hull.len() - 2]], projected[hull[hull.len() - 1]], projected[i])
                <= 1e-9
        {
            hull.pop();
        }
        hull.push(i);
    }
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(projected[hull[hull.len() - 2]], projected[hull[hull.len() - 1]], projected[i])
                <= 1e-9
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();
    hull
}
