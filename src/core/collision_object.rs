use std::sync::Arc;

use super::{
    shape::{CollisionShape, ConvexShape},
    types::{Material, Transform},
};
use crate::utils::allocator::EntityId;

/// What the narrow phase reads from a rigid body: placement, shape and surface material.
///
/// Velocities, mass and inertia stay with the dynamics side and are never touched here.
#[derive(Debug, Clone)]
pub struct CollisionObject {
    pub id: EntityId,
    pub transform: Transform,
    pub shape: Arc<CollisionShape>,
    pub material: Material,
    /// Routes every new contact of this object through the contact-added hook.
    pub custom_material: bool,
}

impl Default for CollisionObject {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CollisionObject {
    pub fn new(id: EntityId, shape: impl Into<CollisionShape>, transform: Transform) -> Self {
        Self {
            id,
            transform,
            shape: Arc::new(shape.into()),
            material: Material::default(),
            custom_material: false,
        }
    }

    pub fn builder() -> CollisionObjectBuilder {
        CollisionObjectBuilder::new()
    }

    pub fn convex(&self) -> Option<&ConvexShape> {
        self.shape.as_convex()
    }
}

pub struct CollisionObjectBuilder {
    id: EntityId,
    shape: Arc<CollisionShape>,
    transform: Transform,
    material: Material,
    custom_material: bool,
}

impl Default for CollisionObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionObjectBuilder {
    pub fn new() -> Self {
        Self {
            id: EntityId::default(),
            shape: Arc::new(ConvexShape::sphere(1.0).into()),
            transform: Transform::default(),
            material: Material::default(),
            custom_material: false,
        }
    }

    pub fn id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn shape(mut self, shape: impl Into<CollisionShape>) -> Self {
        self.shape = Arc::new(shape.into());
        self
    }

    /// Shares an already-built shape between several objects.
    pub fn shared_shape(mut self, shape: Arc<CollisionShape>) -> Self {
        self.shape = shape;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn position(mut self, position: glam::Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn custom_material(mut self, enabled: bool) -> Self {
        self.custom_material = enabled;
        self
    }

    pub fn build(self) -> CollisionObject {
        CollisionObject {
            id: self.id,
            transform: self.transform,
            shape: self.shape,
            material: self.material,
            custom_material: self.custom_material,
        }
    }
}
