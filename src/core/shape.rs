use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{aabb::Aabb, types::Transform};
use crate::{
    collision::polyhedron::ConvexPolyhedron, config::DEFAULT_COLLISION_MARGIN, error::ShapeError,
};

/// Fixed symmetry axis of capsules, cones and cylinders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

impl UpAxis {
    pub fn index(self) -> usize {
        match self {
            UpAxis::X => 0,
            UpAxis::Y => 1,
            UpAxis::Z => 2,
        }
    }

    /// The two axes spanning the radial plane, in the order the support formulas use them.
    pub fn radial_indices(self) -> (usize, usize) {
        match self {
            UpAxis::X => (1, 2),
            UpAxis::Y => (0, 2),
            UpAxis::Z => (0, 1),
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            UpAxis::X => Vec3::X,
            UpAxis::Y => Vec3::Y,
            UpAxis::Z => Vec3::Z,
        }
    }
}

/// Geometry of a convex shape, unscaled and as given by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: Vec3,
    },
    /// Planar quad in the local XY plane; `half_extents.z` is its thickness.
    Box2d {
        half_extents: Vec3,
    },
    /// `half_height` is the distance from the center to either cap center.
    Capsule {
        radius: f32,
        half_height: f32,
        axis: UpAxis,
    },
    Cone {
        radius: f32,
        height: f32,
        axis: UpAxis,
    },
    Cylinder {
        half_extents: Vec3,
        axis: UpAxis,
    },
    ConvexHull {
        points: Vec<Vec3>,
    },
    /// Points shared with other owners (e.g. a render mesh) instead of copied.
    ConvexPointCloud {
        points: Arc<[Vec3]>,
    },
    Triangle {
        vertices: [Vec3; 3],
    },
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Sphere { .. } => "sphere",
            ShapeKind::Box { .. } => "box",
            ShapeKind::Box2d { .. } => "box2d",
            ShapeKind::Capsule { .. } => "capsule",
            ShapeKind::Cone { .. } => "cone",
            ShapeKind::Cylinder { .. } => "cylinder",
            ShapeKind::ConvexHull { .. } => "convex_hull",
            ShapeKind::ConvexPointCloud { .. } => "convex_point_cloud",
            ShapeKind::Triangle { .. } => "triangle",
        }
    }

    /// Spheres and capsules are pure margin around a point/segment core.
    pub fn margin_is_radius(&self) -> bool {
        matches!(self, ShapeKind::Sphere { .. } | ShapeKind::Capsule { .. })
    }

    fn validate(&self) -> Result<(), ShapeError> {
        fn dim(name: &'static str, value: f32) -> Result<(), ShapeError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ShapeError::InvalidDimension { name, value })
            }
        }
        fn vec_dim(name: &'static str, value: Vec3) -> Result<(), ShapeError> {
            dim(name, value.x)?;
            dim(name, value.y)?;
            dim(name, value.z)
        }

        match self {
            ShapeKind::Sphere { radius } => dim("radius", *radius),
            ShapeKind::Box { half_extents } | ShapeKind::Box2d { half_extents } => {
                vec_dim("half_extents", *half_extents)
            }
            ShapeKind::Capsule {
                radius,
                half_height,
                ..
            } => {
                dim("radius", *radius)?;
                dim("half_height", *half_height)
            }
            ShapeKind::Cone { radius, height, .. } => {
                dim("radius", *radius)?;
                dim("height", *height)
            }
            ShapeKind::Cylinder { half_extents, .. } => vec_dim("half_extents", *half_extents),
            ShapeKind::ConvexHull { points } if points.is_empty() => Err(ShapeError::EmptyPointSet),
            ShapeKind::ConvexPointCloud { points } if points.is_empty() => {
                Err(ShapeError::EmptyPointSet)
            }
            ShapeKind::ConvexHull { .. }
            | ShapeKind::ConvexPointCloud { .. }
            | ShapeKind::Triangle { .. } => Ok(()),
        }
    }
}

/// A convex collision shape: kind, margin, scaling and the caches derived from them.
///
/// The kind never changes after construction. Margin and scaling may, and every setter
/// rebuilds the cached local AABB and polyhedral form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ConvexShapeDesc", into = "ConvexShapeDesc")]
pub struct ConvexShape {
    kind: ShapeKind,
    margin: f32,
    local_scaling: Vec3,
    pub(crate) local_aabb: Aabb,
    pub(crate) polyhedron: Option<Arc<ConvexPolyhedron>>,
}

/// Serializable description of a [`ConvexShape`] without its caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvexShapeDesc {
    pub kind: ShapeKind,
    pub margin: f32,
    #[serde(default = "unit_scaling")]
    pub local_scaling: Vec3,
}

fn unit_scaling() -> Vec3 {
    Vec3::ONE
}

impl TryFrom<ConvexShapeDesc> for ConvexShape {
    type Error = ShapeError;

    fn try_from(desc: ConvexShapeDesc) -> Result<Self, Self::Error> {
        let mut shape = ConvexShape::try_new(desc.kind, desc.margin)?;
        shape.set_local_scaling(desc.local_scaling)?;
        Ok(shape)
    }
}

impl From<ConvexShape> for ConvexShapeDesc {
    fn from(shape: ConvexShape) -> Self {
        Self {
            margin: shape.margin,
            local_scaling: shape.local_scaling,
            kind: shape.kind,
        }
    }
}

impl ConvexShape {
    /// Validates `kind` and `margin`, then builds the caches.
    pub fn try_new(kind: ShapeKind, margin: f32) -> Result<Self, ShapeError> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(ShapeError::InvalidMargin(margin));
        }
        kind.validate()?;
        let margin = match &kind {
            ShapeKind::Sphere { radius } => *radius,
            ShapeKind::Capsule { radius, .. } => *radius,
            _ => margin,
        };
        let mut shape = Self {
            kind,
            margin,
            local_scaling: Vec3::ONE,
            local_aabb: Aabb::empty(),
            polyhedron: None,
        };
        shape.rebuild_caches();
        Ok(shape)
    }

    fn from_valid(kind: ShapeKind) -> Self {
        debug_assert!(kind.validate().is_ok(), "invalid {} dimensions", kind.name());
        match Self::try_new(kind, DEFAULT_COLLISION_MARGIN) {
            Ok(shape) => shape,
            Err(err) => {
                log::warn!("falling back to unit sphere: {err}");
                Self::sphere(1.0)
            }
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::from_valid(ShapeKind::Sphere {
            radius: radius.max(0.0),
        })
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::from_valid(ShapeKind::Box {
            half_extents: half_extents.max(Vec3::ZERO),
        })
    }

    pub fn box2d(half_extents: Vec3) -> Self {
        Self::from_valid(ShapeKind::Box2d {
            half_extents: half_extents.max(Vec3::ZERO),
        })
    }

    /// `height` is the distance between the two cap centers.
    pub fn capsule(radius: f32, height: f32, axis: UpAxis) -> Self {
        Self::from_valid(ShapeKind::Capsule {
            radius: radius.max(0.0),
            half_height: (height * 0.5).max(0.0),
            axis,
        })
    }

    pub fn cone(radius: f32, height: f32, axis: UpAxis) -> Self {
        Self::from_valid(ShapeKind::Cone {
            radius: radius.max(0.0),
            height: height.max(0.0),
            axis,
        })
    }

    pub fn cylinder(half_extents: Vec3, axis: UpAxis) -> Self {
        Self::from_valid(ShapeKind::Cylinder {
            half_extents: half_extents.max(Vec3::ZERO),
            axis,
        })
    }

    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::from_valid(ShapeKind::Triangle {
            vertices: [a, b, c],
        })
    }

    pub fn convex_hull(points: Vec<Vec3>) -> Result<Self, ShapeError> {
        Self::try_new(ShapeKind::ConvexHull { points }, DEFAULT_COLLISION_MARGIN)
    }

    pub fn point_cloud(points: Arc<[Vec3]>) -> Result<Self, ShapeError> {
        Self::try_new(ShapeKind::ConvexPointCloud { points }, DEFAULT_COLLISION_MARGIN)
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn local_scaling(&self) -> Vec3 {
        self.local_scaling
    }

    /// Changes the skin thickness. Spheres and capsules keep their radius as margin.
    pub fn set_margin(&mut self, margin: f32) -> Result<(), ShapeError> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(ShapeError::InvalidMargin(margin));
        }
        if self.kind.margin_is_radius() {
            log::debug!("ignoring margin change on {}", self.kind.name());
            return Ok(());
        }
        self.margin = margin;
        self.rebuild_caches();
        Ok(())
    }

    pub fn set_local_scaling(&mut self, scaling: Vec3) -> Result<(), ShapeError> {
        if !scaling.is_finite() {
            return Err(ShapeError::InvalidScaling(scaling.to_array()));
        }
        self.local_scaling = scaling.abs();
        if let ShapeKind::Sphere { radius } = self.kind {
            self.margin = radius * self.local_scaling.x;
        } else if let ShapeKind::Capsule { radius, axis, .. } = self.kind {
            let (r0, _) = axis.radial_indices();
            self.margin = radius * self.local_scaling[r0];
        }
        self.rebuild_caches();
        Ok(())
    }

    /// Cached polyhedral form, present for box, box2d, triangle, hull and point cloud.
    pub fn polyhedron(&self) -> Option<&ConvexPolyhedron> {
        self.polyhedron.as_deref()
    }

    pub fn local_aabb(&self) -> Aabb {
        self.local_aabb
    }

    /// World-space bounds under `transform`.
    pub fn aabb(&self, transform: &Transform) -> Aabb {
        transform_aabb(&self.local_aabb, transform)
    }

    pub fn as_sphere_radius(&self) -> Option<f32> {
        match self.kind {
            ShapeKind::Sphere { .. } => Some(self.margin),
            _ => None,
        }
    }

    pub fn is_polyhedral(&self) -> bool {
        self.polyhedron.is_some()
    }
}

/// Rotates `local` bounds into world space and re-fits them.
pub fn transform_aabb(local: &Aabb, transform: &Transform) -> Aabb {
    let center = transform.transform_point(local.center());
    let basis = transform.basis();
    let abs_basis = glam::Mat3::from_cols(
        basis.x_axis.abs(),
        basis.y_axis.abs(),
        basis.z_axis.abs(),
    );
    let extent = abs_basis * local.half_extents();
    Aabb::new(center - extent, center + extent)
}

/// Child of a compound shape, placed relative to the compound's frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundChild {
    pub transform: Transform,
    pub shape: CollisionShape,
}

/// Rigid assembly of child shapes sharing one collision object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompoundShape {
    pub children: Vec<CompoundChild>,
}

impl CompoundShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_child(mut self, transform: Transform, shape: impl Into<CollisionShape>) -> Self {
        self.children.push(CompoundChild {
            transform,
            shape: shape.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Top-level shape attached to a collision object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CollisionShape {
    Convex(ConvexShape),
    Compound(CompoundShape),
}

impl From<ConvexShape> for CollisionShape {
    fn from(shape: ConvexShape) -> Self {
        CollisionShape::Convex(shape)
    }
}

impl From<CompoundShape> for CollisionShape {
    fn from(shape: CompoundShape) -> Self {
        CollisionShape::Compound(shape)
    }
}

impl CollisionShape {
    pub fn as_convex(&self) -> Option<&ConvexShape> {
        match self {
            CollisionShape::Convex(shape) => Some(shape),
            CollisionShape::Compound(_) => None,
        }
    }

    pub fn as_compound(&self) -> Option<&CompoundShape> {
        match self {
            CollisionShape::Compound(shape) => Some(shape),
            CollisionShape::Convex(_) => None,
        }
    }

    pub fn aabb(&self, transform: &Transform) -> Aabb {
        match self {
            CollisionShape::Convex(shape) => shape.aabb(transform),
            CollisionShape::Compound(compound) => {
                let mut bounds = Aabb::empty();
                for child in &compound.children {
                    let child_bounds = child.shape.aabb(&transform.combine(&child.transform));
                    bounds.extend(child_bounds.min);
                    bounds.extend(child_bounds.max);
                }
                if compound.is_empty() {
                    Aabb::new(transform.position, transform.position)
                } else {
                    bounds
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CollisionShape::Convex(shape) => shape.kind().name(),
            CollisionShape::Compound(_) => "compound",
        }
    }
}
