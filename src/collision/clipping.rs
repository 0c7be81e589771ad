use arrayvec::ArrayVec;
use glam::Vec3;

const EPSILON: f32 = 1e-4;

/// Half-space `normal.dot(x) <= distance`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let n = normal.normalize_or_zero();
        Self {
            normal: n,
            distance: n.dot(point),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }
}

/// Clips the provided polygon against a set of planes using the Sutherland-Hodgman algorithm.
pub fn clip_polygon(vertices: &[Vec3], planes: &[Plane]) -> Vec<Vec3> {
    let mut output = vertices.to_vec();
    for plane in planes {
        output = clip_against_plane(&output, *plane);
        if output.is_empty() {
            break;
        }
    }
    output
}

/// Keeps the part of the polygon on the negative side of `plane`.
pub fn clip_against_plane(vertices: &[Vec3], plane: Plane) -> Vec<Vec3> {
    if vertices.is_empty() {
        return Vec::new();
    }

    let mut clipped = Vec::with_capacity(vertices.len() + 1);
    for i in 0..vertices.len() {
        let current = vertices[i];
        let next = vertices[(i + 1) % vertices.len()];

        let current_dist = plane.signed_distance(current);
        let next_dist = plane.signed_distance(next);

        let current_inside = current_dist <= 0.0;
        let next_inside = next_dist <= 0.0;

        match (current_inside, next_inside) {
            (true, true) => clipped.push(next),
            (true, false) => {
                if let Some(hit) = line_plane_intersection(current, next, current_dist, next_dist) {
                    clipped.push(hit);
                }
            }
            (false, true) => {
                if let Some(hit) = line_plane_intersection(current, next, current_dist, next_dist) {
                    clipped.push(hit);
                }
                clipped.push(next);
            }
            (false, false) => {}
        }
    }

    clipped
}

fn line_plane_intersection(start: Vec3, end: Vec3, start_dist: f32, end_dist: f32) -> Option<Vec3> {
    let denom = start_dist - end_dist;
    if denom.abs() <= EPSILON * EPSILON {
        return None;
    }
    let t = start_dist / denom;
    Some(start + (end - start) * t)
}

/// Two-point Sutherland-Hodgman step: keeps the part of `segment` with
/// `normal.dot(x) - offset <= 0`.
pub fn clip_segment_to_line(segment: [Vec3; 2], normal: Vec3, offset: f32) -> ArrayVec<Vec3, 2> {
    let mut out = ArrayVec::new();
    let d0 = normal.dot(segment[0]) - offset;
    let d1 = normal.dot(segment[1]) - offset;

    if d0 <= 0.0 {
        out.push(segment[0]);
    }
    if d1 <= 0.0 {
        out.push(segment[1]);
    }
    if d0 * d1 < 0.0 && !out.is_full() {
        let t = d0 / (d0 - d1);
        out.push(segment[0] + (segment[1] - segment[0]) * t);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn square_clipped_by_half_plane() {
        let square = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        let plane = Plane::from_point_normal(Vec3::ZERO, Vec3::X);
        let clipped = clip_polygon(&square, &[plane]);
        assert_eq!(clipped.len(), 4);
        assert!(clipped.iter().all(|v| v.x <= 1e-6));
    }

    #[test]
    fn polygon_fully_outside_is_dropped() {
        let tri = [Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 0.0)];
        let plane = Plane::from_point_normal(Vec3::ZERO, Vec3::X);
        assert!(clip_polygon(&tri, &[plane]).is_empty());
    }

    #[test]
    fn segment_clip_interpolates_crossing() {
        let segment = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];
        let out = clip_segment_to_line(segment, Vec3::X, 1.0);
        assert_eq!(out.len(), 2);
        assert_abs_diff_eq!(out[1].x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn segment_clip_rejects_outside_segment() {
        let segment = [Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];
        let out = clip_segment_to_line(segment, Vec3::X, 1.0);
        assert!(out.len() < 2);
    }
}
