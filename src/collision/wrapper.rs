use crate::{
    core::{
        collision_object::CollisionObject,
        shape::{CollisionShape, ConvexShape},
        types::Transform,
    },
    utils::allocator::EntityId,
};

/// Borrowed view of one body (or one compound child of it) for a single pairwise test.
#[derive(Debug, Clone, Copy)]
pub struct CollisionObjectWrapper<'a> {
    pub parent: Option<&'a CollisionObjectWrapper<'a>>,
    pub shape: &'a CollisionShape,
    pub object: &'a CollisionObject,
    /// Placement of `shape`; differs from the object transform for compound children.
    pub world_transform: Transform,
    pub part_id: i32,
    pub index: i32,
}

impl<'a> CollisionObjectWrapper<'a> {
    pub fn new(object: &'a CollisionObject) -> Self {
        Self {
            parent: None,
            shape: &object.shape,
            object,
            world_transform: object.transform,
            part_id: -1,
            index: -1,
        }
    }

    /// Wrapper for child `index` of a compound, placed at `local` relative to this wrapper.
    pub fn child<'b>(
        &'b self,
        shape: &'b CollisionShape,
        local: &Transform,
        index: usize,
    ) -> CollisionObjectWrapper<'b>
    where
        'a: 'b,
    {
        CollisionObjectWrapper {
            parent: Some(self),
            shape,
            object: self.object,
            world_transform: self.world_transform.combine(local),
            part_id: self.part_id,
            index: index as i32,
        }
    }

    pub fn id(&self) -> EntityId {
        self.object.id
    }

    pub fn convex(&self) -> Option<&'a ConvexShape> {
        self.shape.as_convex()
    }
}
