//! Utility helpers: math extensions, the generational allocator, logging and profiling.

pub mod allocator;
pub mod logging;
pub mod math;
pub mod profiling;

pub use allocator::{Arena, EntityId, GenerationalId, ManifoldHandle};
pub use math::*;
