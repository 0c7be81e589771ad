//! Support mapping, bounds and polyhedral feature extraction for [`ConvexShape`].

use std::sync::Arc;

use glam::Vec3;

use super::polyhedron::ConvexPolyhedron;
use crate::{
    config::SIMD_EPSILON,
    core::{
        aabb::Aabb,
        shape::{ConvexShape, ShapeKind, UpAxis},
        types::Transform,
    },
};

/// Box2D quads thinner than this are treated as flat polygons.
const FLAT_BOX2D_THICKNESS: f32 = 1e-6;

impl ConvexShape {
    /// Farthest point of the margin-eroded core along `direction`, in local space.
    pub fn local_support_without_margin(&self, direction: Vec3) -> Vec3 {
        let scaling = self.local_scaling();
        match self.kind() {
            ShapeKind::Sphere { .. } => Vec3::ZERO,
            ShapeKind::Box { .. } | ShapeKind::Box2d { .. } => {
                let core = self.box_core_half_extents();
                Vec3::select(direction.cmpge(Vec3::ZERO), core, -core)
            }
            ShapeKind::Capsule {
                half_height, axis, ..
            } => {
                let up = axis.index();
                let half_height = half_height * scaling[up];
                if direction[up] >= 0.0 {
                    axis.unit() * half_height
                } else {
                    -axis.unit() * half_height
                }
            }
            ShapeKind::Cylinder { axis, .. } => {
                let core = self.box_core_half_extents();
                cylinder_support(*axis, core, direction)
            }
            ShapeKind::Cone {
                radius,
                height,
                axis,
            } => {
                let (r0, r1) = axis.radial_indices();
                let radius = radius * (scaling[r0] + scaling[r1]) * 0.5;
                let height = height * scaling[axis.index()];
                cone_support(*axis, radius, height, direction)
            }
            ShapeKind::ConvexHull { points } => argmax_support(points, scaling, direction),
            ShapeKind::ConvexPointCloud { points } => argmax_support(points, scaling, direction),
            ShapeKind::Triangle { vertices } => argmax_support(vertices, scaling, direction),
        }
    }

    /// Core support pushed out by `margin` along the normalized direction.
    pub fn local_support(&self, direction: Vec3) -> Vec3 {
        let core = self.local_support_without_margin(direction);
        let margin = self.margin();
        if margin == 0.0 {
            return core;
        }
        let direction = if direction.length_squared() < SIMD_EPSILON * SIMD_EPSILON {
            Vec3::splat(-1.0)
        } else {
            direction
        };
        core + direction.normalize() * margin
    }

    /// World-space support under `transform`.
    pub fn support(&self, transform: &Transform, direction: Vec3) -> Vec3 {
        let local_dir = transform.inverse_transform_vector(direction);
        transform.transform_point(self.local_support(local_dir))
    }

    pub fn support_without_margin(&self, transform: &Transform, direction: Vec3) -> Vec3 {
        let local_dir = transform.inverse_transform_vector(direction);
        transform.transform_point(self.local_support_without_margin(local_dir))
    }

    /// Scaled half-extents including the margin, for box-like kinds.
    pub fn box_half_extents(&self) -> Vec3 {
        match self.kind() {
            ShapeKind::Box { half_extents }
            | ShapeKind::Box2d { half_extents }
            | ShapeKind::Cylinder { half_extents, .. } => *half_extents * self.local_scaling(),
            _ => Vec3::ZERO,
        }
    }

    /// Box half-extents shrunk by the margin.
    pub fn box_core_half_extents(&self) -> Vec3 {
        (self.box_half_extents() - Vec3::splat(self.margin())).max(Vec3::ZERO)
    }

    /// Corners of a Box2D quad in the local XY plane, counter-clockwise about +Z.
    pub fn box2d_vertices(&self) -> [Vec3; 4] {
        let he = self.box_half_extents();
        [
            Vec3::new(-he.x, -he.y, 0.0),
            Vec3::new(he.x, -he.y, 0.0),
            Vec3::new(he.x, he.y, 0.0),
            Vec3::new(-he.x, he.y, 0.0),
        ]
    }

    /// Outward normal of each Box2D edge `i -> i + 1`.
    pub fn box2d_normals(&self) -> [Vec3; 4] {
        [-Vec3::Y, Vec3::X, Vec3::Y, -Vec3::X]
    }

    /// Center and radius of a sphere enclosing the shape, in local space.
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.local_aabb.center(), self.local_aabb.radius())
    }

    pub(crate) fn rebuild_caches(&mut self) {
        self.polyhedron = self.build_polyhedron().map(Arc::new);
        self.local_aabb = self.support_aabb();
    }

    fn support_aabb(&self) -> Aabb {
        let mut min = Vec3::ZERO;
        let mut max = Vec3::ZERO;
        for i in 0..3 {
            let mut axis = Vec3::ZERO;
            axis[i] = 1.0;
            max[i] = self.local_support(axis)[i];
            min[i] = self.local_support(-axis)[i];
        }
        Aabb::new(min, max)
    }

    fn build_polyhedron(&self) -> Option<ConvexPolyhedron> {
        let scaling = self.local_scaling();
        match self.kind() {
            ShapeKind::Box { .. } => Some(ConvexPolyhedron::cuboid(self.box_half_extents())),
            ShapeKind::Box2d { .. } => {
                let he = self.box_half_extents();
                if he.z <= FLAT_BOX2D_THICKNESS {
                    ConvexPolyhedron::planar(self.box2d_vertices().to_vec())
                } else {
                    Some(ConvexPolyhedron::cuboid(he))
                }
            }
            ShapeKind::Triangle { vertices } => {
                ConvexPolyhedron::planar(vertices.iter().map(|v| *v * scaling).collect())
            }
            ShapeKind::ConvexHull { points } => {
                let scaled: Vec<Vec3> = points.iter().map(|p| *p * scaling).collect();
                ConvexPolyhedron::from_points(&scaled)
            }
            ShapeKind::ConvexPointCloud { points } => {
                let scaled: Vec<Vec3> = points.iter().map(|p| *p * scaling).collect();
                ConvexPolyhedron::from_points(&scaled)
            }
            ShapeKind::Sphere { .. }
            | ShapeKind::Capsule { .. }
            | ShapeKind::Cone { .. }
            | ShapeKind::Cylinder { .. } => None,
        }
    }
}

fn argmax_support(points: &[Vec3], scaling: Vec3, direction: Vec3) -> Vec3 {
    let mut best = Vec3::ZERO;
    let mut best_dot = f32::MIN;
    for point in points {
        let scaled = *point * scaling;
        let dot = scaled.dot(direction);
        if dot > best_dot {
            best_dot = dot;
            best = scaled;
        }
    }
    best
}

fn cylinder_support(axis: UpAxis, half_extents: Vec3, v: Vec3) -> Vec3 {
    let up = axis.index();
    let (r0, r1) = axis.radial_indices();
    let radius = half_extents[r0];
    let half_height = half_extents[up];

    let mut out = Vec3::ZERO;
    out[up] = if v[up] < 0.0 { -half_height } else { half_height };
    let s = (v[r0] * v[r0] + v[r1] * v[r1]).sqrt();
    if s != 0.0 {
        let d = radius / s;
        out[r0] = v[r0] * d;
        out[r1] = v[r1] * d;
    } else {
        out[r0] = radius;
    }
    out
}

fn cone_support(axis: UpAxis, radius: f32, height: f32, v: Vec3) -> Vec3 {
    let up = axis.index();
    let (r0, r1) = axis.radial_indices();
    let half_height = height * 0.5;
    let slant = (radius * radius + height * height).sqrt();
    let sin_angle = if slant > 0.0 { radius / slant } else { 0.0 };

    let mut out = Vec3::ZERO;
    if v[up] > v.length() * sin_angle {
        out[up] = half_height;
        return out;
    }
    out[up] = -half_height;
    let s = (v[r0] * v[r0] + v[r1] * v[r1]).sqrt();
    if s > SIMD_EPSILON {
        let d = radius / s;
        out[r0] = v[r0] * d;
        out[r1] = v[r1] * d;
    }
    out
}
