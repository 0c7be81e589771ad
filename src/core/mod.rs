//! Core data describing collision objects, their shapes and materials.

pub mod aabb;
pub mod collision_object;
pub mod shape;
pub mod types;

pub use aabb::Aabb;
pub use collision_object::{CollisionObject, CollisionObjectBuilder};
pub use shape::{CollisionShape, CompoundChild, CompoundShape, ConvexShape, ShapeKind, UpAxis};
pub use types::{CombinedMaterial, Material, Transform};
