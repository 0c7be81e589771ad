//! Particle Narrowphase – persistent contact manifolds for Rust rigid-body engines.
//!
//! The crate turns pairs of overlapping collision objects into at most four cached
//! contact points each, keeps those points stable across steps for warm starting, and
//! leaves integration and constraint solving to the caller.

pub mod collision;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use glam::{Mat3, Quat, Vec3};

pub use collision::{
    CollisionAlgorithm, CollisionObjectWrapper, ContactEvent, ContactEventLog, ContactHooks,
    ManifoldPoint, ManifoldResult, MaterialPolicy, NarrowPhase, PersistentManifold,
};
pub use config::CollisionConfig;
pub use core::{
    Aabb, CollisionObject, CollisionShape, CombinedMaterial, CompoundShape, ConvexShape, Material,
    ShapeKind, Transform, UpAxis,
};
pub use error::ShapeError;
pub use utils::allocator::{Arena, EntityId, ManifoldHandle};
