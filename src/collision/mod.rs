//! Contact generation: shape features, pairwise detectors, persistent manifolds and the
//! dispatcher that ties them to overlapping pairs.

pub mod algorithms;
pub mod callbacks;
pub mod clipping;
pub mod contact;
pub mod manifold;
pub mod manifold_result;
pub mod narrowphase;
pub mod polyhedral;
pub mod polyhedron;
pub mod shapes;
pub mod wrapper;

pub use algorithms::{select_algorithm, CollisionAlgorithm};
pub use callbacks::{
    ContactEvent, ContactEventLog, ContactHooks, DefaultMaterialPolicy, MaterialPolicy,
};
pub use contact::{ManifoldPoint, UserData};
pub use manifold::PersistentManifold;
pub use manifold_result::{ContactSample, ContactSink, ManifoldResult};
pub use narrowphase::{pair_key, NarrowPhase, PairKey};
pub use polyhedron::ConvexPolyhedron;
pub use wrapper::CollisionObjectWrapper;
