//! Pair bookkeeping and per-step dispatch of the contact detectors.

use std::collections::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{
    algorithms::{select_algorithm, CollisionAlgorithm},
    callbacks::ContactHooks,
    manifold::PersistentManifold,
    manifold_result::ManifoldResult,
    wrapper::CollisionObjectWrapper,
};
use crate::{
    config::CollisionConfig,
    core::collision_object::CollisionObject,
    utils::{
        allocator::{Arena, EntityId, ManifoldHandle},
        logging::{warn_if_budget_exceeded, ScopedTimer},
        profiling::NarrowPhaseProfiler,
    },
};

/// Key of a pair: the smaller id first, so `(a, b)` and `(b, a)` name the same pair.
pub type PairKey = (EntityId, EntityId);

pub fn pair_key(a: EntityId, b: EntityId) -> PairKey {
    if b < a {
        (b, a)
    } else {
        (a, b)
    }
}

/// Detector and manifold bound to one overlapping pair for as long as it overlaps.
#[derive(Debug)]
struct PairRecord {
    algorithm: Box<dyn CollisionAlgorithm>,
    manifold: ManifoldHandle,
}

struct PairJob<'a> {
    algorithm: &'a dyn CollisionAlgorithm,
    manifold: &'a mut PersistentManifold,
    object0: &'a CollisionObject,
    object1: &'a CollisionObject,
}

impl PairJob<'_> {
    fn run(&mut self, hooks: &ContactHooks, closest_point_distance_threshold: f32) -> usize {
        let wrap0 = CollisionObjectWrapper::new(self.object0);
        let wrap1 = CollisionObjectWrapper::new(self.object1);
        let mut result = ManifoldResult::new(&wrap0, &wrap1, hooks, Some(&mut *self.manifold))
            .with_closest_point_distance_threshold(closest_point_distance_threshold);
        self.algorithm.process_collision(&wrap0, &wrap1, &mut result);
        log::trace!(
            "pair ({:?}, {:?}) via {}: {} points",
            self.object0.id,
            self.object1.id,
            self.algorithm.name(),
            result.num_contacts()
        );
        result.num_contacts()
    }
}

/// Owns every persistent manifold and the detector of every overlapping pair.
///
/// The broad phase drives it with [`add_pair`](Self::add_pair) / [`remove_pair`](Self::remove_pair)
/// (or [`sync_pairs`](Self::sync_pairs)); each simulation step calls
/// [`process_pairs`](Self::process_pairs) once before the solver reads the manifolds.
pub struct NarrowPhase {
    manifolds: Arena<PersistentManifold, ManifoldHandle>,
    pairs: HashMap<PairKey, PairRecord>,
    config: CollisionConfig,
    hooks: ContactHooks,
    profiler: NarrowPhaseProfiler,
    time_budget_ms: Option<f32>,
}

impl Default for NarrowPhase {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

impl NarrowPhase {
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            manifolds: Arena::new(),
            pairs: HashMap::new(),
            config,
            hooks: ContactHooks::default(),
            profiler: NarrowPhaseProfiler::default(),
            time_budget_ms: None,
        }
    }

    pub fn with_hooks(mut self, hooks: ContactHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn hooks(&self) -> &ContactHooks {
        &self.hooks
    }

    pub fn set_hooks(&mut self, hooks: ContactHooks) {
        self.hooks = hooks;
    }

    /// Warn when a `process_pairs` call takes longer than `budget_ms`.
    pub fn set_time_budget(&mut self, budget_ms: Option<f32>) {
        self.time_budget_ms = budget_ms;
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.config.parallel = enabled;
    }

    pub fn profiler(&self) -> &NarrowPhaseProfiler {
        &self.profiler
    }

    /// Allocates an empty manifold for `body0`/`body1` with the configured thresholds.
    pub fn get_new_manifold(&mut self, body0: EntityId, body1: EntityId) -> ManifoldHandle {
        let mut manifold = PersistentManifold::new(
            body0,
            body1,
            self.config.contact_breaking_threshold,
            self.config.contact_processing_threshold,
        );
        manifold.set_keep_deepest_point(self.config.keep_deepest_point);
        let handle = self.manifolds.insert(manifold);
        log::debug!("manifold {handle:?} allocated for ({body0:?}, {body1:?})");
        handle
    }

    /// Clears and frees a manifold. Returns `false` for a stale handle.
    pub fn release_manifold(&mut self, handle: ManifoldHandle) -> bool {
        match self.manifolds.remove(handle) {
            Some(mut manifold) => {
                manifold.clear_manifold(&self.hooks);
                log::debug!("manifold {handle:?} released");
                true
            }
            None => false,
        }
    }

    pub fn manifold(&self, handle: ManifoldHandle) -> Option<&PersistentManifold> {
        self.manifolds.get(handle)
    }

    pub fn manifold_mut(&mut self, handle: ManifoldHandle) -> Option<&mut PersistentManifold> {
        self.manifolds.get_mut(handle)
    }

    pub fn manifolds(&self) -> impl Iterator<Item = (ManifoldHandle, &PersistentManifold)> + '_ {
        self.manifolds.iter()
    }

    pub fn manifolds_mut(
        &mut self,
    ) -> impl Iterator<Item = (ManifoldHandle, &mut PersistentManifold)> + '_ {
        self.manifolds.iter_mut()
    }

    /// Manifolds the solver should see: at least one point and within the processing threshold.
    pub fn touching_manifolds(&self) -> impl Iterator<Item = &PersistentManifold> + '_ {
        self.manifolds.iter().map(|(_, m)| m).filter(|m| {
            m.num_contacts() > 0
                && m.points()
                    .iter()
                    .any(|p| p.distance < m.contact_processing_threshold())
        })
    }

    pub fn num_manifolds(&self) -> usize {
        self.manifolds.len()
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn contains_pair(&self, a: EntityId, b: EntityId) -> bool {
        self.pairs.contains_key(&pair_key(a, b))
    }

    pub fn pair_manifold(&self, a: EntityId, b: EntityId) -> Option<&PersistentManifold> {
        let record = self.pairs.get(&pair_key(a, b))?;
        self.manifolds.get(record.manifold)
    }

    /// Starts tracking a pair: picks its detector and allocates its manifold.
    ///
    /// Re-adding a tracked pair returns the existing manifold. A body cannot pair with itself.
    pub fn add_pair(
        &mut self,
        object0: &CollisionObject,
        object1: &CollisionObject,
    ) -> Option<ManifoldHandle> {
        if object0.id == object1.id {
            log::warn!("ignoring self pair for {:?}", object0.id);
            return None;
        }
        if object0.id.is_null() || object1.id.is_null() {
            log::warn!("ignoring pair with an unassigned object id");
            return None;
        }
        let key = pair_key(object0.id, object1.id);
        if let Some(record) = self.pairs.get(&key) {
            return Some(record.manifold);
        }

        let (first, second) = if key.0 == object0.id {
            (object0, object1)
        } else {
            (object1, object0)
        };
        let algorithm = select_algorithm(&first.shape, &second.shape, true, &self.config);
        let manifold = self.get_new_manifold(first.id, second.id);
        log::debug!(
            "pair ({:?}, {:?}) created: {} vs {} via {}",
            first.id,
            second.id,
            first.shape.name(),
            second.shape.name(),
            algorithm.name()
        );
        self.pairs.insert(key, PairRecord { algorithm, manifold });
        Some(manifold)
    }

    /// Stops tracking a pair and releases its manifold.
    pub fn remove_pair(&mut self, a: EntityId, b: EntityId) -> bool {
        let Some(record) = self.pairs.remove(&pair_key(a, b)) else {
            log::warn!("remove_pair: unknown pair ({a:?}, {b:?})");
            return false;
        };
        self.release_manifold(record.manifold);
        log::debug!("pair ({a:?}, {b:?}) destroyed");
        true
    }

    /// Makes the tracked pairs equal to `overlaps`, as reported by a broad phase.
    /// Returns how many pairs were added and removed.
    pub fn sync_pairs(
        &mut self,
        objects: &Arena<CollisionObject>,
        overlaps: &[(EntityId, EntityId)],
    ) -> (usize, usize) {
        let wanted: HashSet<PairKey> = overlaps
            .iter()
            .filter(|(a, b)| a != b)
            .map(|&(a, b)| pair_key(a, b))
            .collect();

        let stale: Vec<PairKey> = self
            .pairs
            .keys()
            .filter(|key| !wanted.contains(*key))
            .copied()
            .collect();
        for (a, b) in &stale {
            self.remove_pair(*a, *b);
        }

        let mut added = 0;
        for &(a, b) in &wanted {
            if self.pairs.contains_key(&(a, b)) {
                continue;
            }
            match (objects.get(a), objects.get(b)) {
                (Some(object0), Some(object1)) => {
                    if self.add_pair(object0, object1).is_some() {
                        added += 1;
                    }
                }
                _ => log::debug!("sync_pairs: skipping ({a:?}, {b:?}) with a missing object"),
            }
        }
        (added, stale.len())
    }

    /// Runs every pair's detector once. Pairs are independent; with the `parallel`
    /// feature and `config.parallel` set they run on the rayon pool and are joined
    /// before this returns.
    pub fn process_pairs(&mut self, objects: &Arena<CollisionObject>) {
        self.profiler.reset();
        let timer = ScopedTimer::new("narrowphase::process_pairs");

        let pairs = &self.pairs;
        let mut jobs: Vec<PairJob<'_>> = self
            .manifolds
            .iter_mut()
            .filter_map(|(_, manifold)| {
                let record = pairs.get(&pair_key(manifold.body0(), manifold.body1()))?;
                let object0 = objects.get(manifold.body0())?;
                let object1 = objects.get(manifold.body1())?;
                Some(PairJob {
                    algorithm: record.algorithm.as_ref(),
                    manifold,
                    object0,
                    object1,
                })
            })
            .collect();

        let hooks = &self.hooks;
        let closest = self.config.closest_point_distance_threshold;
        let counts: Vec<usize> = if self.config.parallel {
            run_jobs(&mut jobs, hooks, closest)
        } else {
            jobs.iter_mut().map(|job| job.run(hooks, closest)).collect()
        };

        self.profiler.pairs_tested = counts.len();
        self.profiler.touching_manifolds = counts.iter().filter(|&&n| n > 0).count();
        self.profiler.contact_count = counts.iter().sum();
        self.profiler.detection_time = timer.elapsed();

        if let Some(budget) = self.time_budget_ms {
            warn_if_budget_exceeded("narrowphase", self.profiler.detection_time, budget);
        }
    }
}

#[cfg(feature = "parallel")]
fn run_jobs(jobs: &mut [PairJob<'_>], hooks: &ContactHooks, closest: f32) -> Vec<usize> {
    jobs.par_iter_mut().map(|job| job.run(hooks, closest)).collect()
}

#[cfg(not(feature = "parallel"))]
fn run_jobs(jobs: &mut [PairJob<'_>], hooks: &ContactHooks, closest: f32) -> Vec<usize> {
    jobs.iter_mut().map(|job| job.run(hooks, closest)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{shape::ConvexShape, types::Transform};
    use glam::Vec3;

    fn spawn(objects: &mut Arena<CollisionObject>, shape: ConvexShape, position: Vec3) -> EntityId {
        objects
            .insert_with(|id| CollisionObject::new(id, shape, Transform::from_position(position)))
    }

    #[test]
    fn pair_lifecycle_allocates_and_releases_manifold() {
        let mut objects = Arena::new();
        let a = spawn(&mut objects, ConvexShape::sphere(0.5), Vec3::ZERO);
        let b = spawn(&mut objects, ConvexShape::sphere(0.5), Vec3::X);
        let mut narrowphase = NarrowPhase::default();

        let handle = narrowphase
            .add_pair(objects.get(b).unwrap(), objects.get(a).unwrap())
            .unwrap();
        assert_eq!(narrowphase.num_manifolds(), 1);
        assert_eq!(narrowphase.manifold(handle).unwrap().body0(), a);
        assert_eq!(
            narrowphase.add_pair(objects.get(a).unwrap(), objects.get(b).unwrap()),
            Some(handle)
        );

        assert!(narrowphase.remove_pair(b, a));
        assert_eq!(narrowphase.num_manifolds(), 0);
        assert!(narrowphase.manifold(handle).is_none());
        assert!(!narrowphase.remove_pair(a, b));
    }

    #[test]
    fn self_pair_is_rejected() {
        let mut objects = Arena::new();
        let a = spawn(&mut objects, ConvexShape::sphere(0.5), Vec3::ZERO);
        let object = objects.get(a).unwrap();
        assert!(NarrowPhase::default().add_pair(object, object).is_none());

        let unassigned = CollisionObject::builder().build();
        assert!(NarrowPhase::default().add_pair(object, &unassigned).is_none());
    }

    #[test]
    fn process_pairs_fills_profiler() {
        let mut objects = Arena::new();
        let a = spawn(&mut objects, ConvexShape::sphere(0.5), Vec3::ZERO);
        let b = spawn(&mut objects, ConvexShape::sphere(0.5), Vec3::new(0.9, 0.0, 0.0));
        let c = spawn(&mut objects, ConvexShape::sphere(0.5), Vec3::new(5.0, 0.0, 0.0));
        let mut narrowphase = NarrowPhase::new(CollisionConfig::default().with_parallel(false));
        narrowphase.sync_pairs(&objects, &[(a, b), (a, c)]);

        narrowphase.process_pairs(&objects);
        let profiler = narrowphase.profiler();
        assert_eq!(profiler.pairs_tested, 2);
        assert_eq!(profiler.touching_manifolds, 1);
        assert_eq!(profiler.contact_count, 1);
        assert_eq!(narrowphase.touching_manifolds().count(), 1);
    }

    #[test]
    fn sync_pairs_adds_and_drops() {
        let mut objects = Arena::new();
        let a = spawn(&mut objects, ConvexShape::sphere(0.5), Vec3::ZERO);
        let b = spawn(&mut objects, ConvexShape::sphere(0.5), Vec3::X);
        let c = spawn(&mut objects, ConvexShape::cuboid(Vec3::ONE), Vec3::Y);
        let mut narrowphase = NarrowPhase::default();

        assert_eq!(narrowphase.sync_pairs(&objects, &[(a, b), (b, c), (c, b)]), (2, 0));
        assert_eq!(narrowphase.sync_pairs(&objects, &[(c, a), (b, c)]), (1, 1));
        assert!(narrowphase.contains_pair(a, c));
        assert!(!narrowphase.contains_pair(a, b));
        assert_eq!(narrowphase.num_manifolds(), 2);
    }
}
