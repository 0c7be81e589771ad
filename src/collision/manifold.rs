use arrayvec::ArrayVec;

use super::{callbacks::ContactHooks, contact::ManifoldPoint};
use crate::{
    config::{
        DEFAULT_CONTACT_BREAKING_THRESHOLD, DEFAULT_CONTACT_PROCESSING_THRESHOLD,
        MANIFOLD_CACHE_SIZE,
    },
    core::types::Transform,
    utils::{allocator::EntityId, math::max_axis4},
};

/// Contact cache for one pair of bodies, kept across steps for warm starting.
///
/// Holds at most [`MANIFOLD_CACHE_SIZE`] points. Anchors are relative to `body0` and
/// `body1` in the order the manifold was created with.
#[derive(Debug, Clone)]
pub struct PersistentManifold {
    points: ArrayVec<ManifoldPoint, MANIFOLD_CACHE_SIZE>,
    body0: EntityId,
    body1: EntityId,
    contact_breaking_threshold: f32,
    contact_processing_threshold: f32,
    keep_deepest_point: bool,
}

impl Default for PersistentManifold {
    fn default() -> Self {
        Self::new(
            EntityId::default(),
            EntityId::default(),
            DEFAULT_CONTACT_BREAKING_THRESHOLD,
            DEFAULT_CONTACT_PROCESSING_THRESHOLD,
        )
    }
}

impl PersistentManifold {
    pub fn new(
        body0: EntityId,
        body1: EntityId,
        breaking_threshold: f32,
        processing_threshold: f32,
    ) -> Self {
        Self {
            points: ArrayVec::new(),
            body0,
            body1,
            contact_breaking_threshold: breaking_threshold,
            contact_processing_threshold: processing_threshold,
            keep_deepest_point: true,
        }
    }

    pub fn body0(&self) -> EntityId {
        self.body0
    }

    pub fn body1(&self) -> EntityId {
        self.body1
    }

    pub fn set_bodies(&mut self, body0: EntityId, body1: EntityId) {
        self.body0 = body0;
        self.body1 = body1;
    }

    pub fn num_contacts(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points
    }

    pub fn point(&self, index: usize) -> Option<&ManifoldPoint> {
        self.points.get(index)
    }

    pub fn point_mut(&mut self, index: usize) -> Option<&mut ManifoldPoint> {
        self.points.get_mut(index)
    }

    pub fn contact_breaking_threshold(&self) -> f32 {
        self.contact_breaking_threshold
    }

    pub fn contact_processing_threshold(&self) -> f32 {
        self.contact_processing_threshold
    }

    pub fn set_contact_breaking_threshold(&mut self, threshold: f32) {
        self.contact_breaking_threshold = threshold;
    }

    pub fn set_contact_processing_threshold(&mut self, threshold: f32) {
        self.contact_processing_threshold = threshold;
    }

    /// Protect the deepest point from eviction when the cache is full.
    pub fn set_keep_deepest_point(&mut self, keep: bool) {
        self.keep_deepest_point = keep;
    }

    pub fn valid_contact_distance(&self, point: &ManifoldPoint) -> bool {
        point.distance <= self.contact_breaking_threshold
    }

    /// Slot whose body-A anchor lies within the breaking threshold of `new_point`'s, nearest first.
    pub fn get_cache_entry(&self, new_point: &ManifoldPoint) -> Option<usize> {
        let mut shortest = self.contact_breaking_threshold * self.contact_breaking_threshold;
        let mut nearest = None;
        for (i, point) in self.points.iter().enumerate() {
            let diff = point.local_point_a - new_point.local_point_a;
            let dist2 = diff.length_squared();
            if dist2 < shortest {
                shortest = dist2;
                nearest = Some(i);
            }
        }
        nearest
    }

    /// Slot to overwrite when the cache is full: the one whose removal leaves the largest
    /// spanned area, never the deepest point when that protection is on.
    fn sort_cached_points(&self, new_point: &ManifoldPoint) -> usize {
        let mut deepest = None;
        if self.keep_deepest_point {
            let mut max_penetration = new_point.distance;
            for (i, point) in self.points.iter().enumerate() {
                if point.distance < max_penetration {
                    max_penetration = point.distance;
                    deepest = Some(i);
                }
            }
        }

        let p = |i: usize| self.points[i].local_point_a;
        let new = new_point.local_point_a;
        let area = |excluded: usize, a: glam::Vec3, b: glam::Vec3| {
            if deepest == Some(excluded) {
                -1.0
            } else {
                a.cross(b).length_squared()
            }
        };

        let res0 = area(0, new - p(1), p(3) - p(2));
        let res1 = area(1, new - p(0), p(3) - p(2));
        let res2 = area(2, new - p(0), p(3) - p(1));
        let res3 = area(3, new - p(0), p(2) - p(1));

        max_axis4([res0, res1, res2, res3])
    }

    /// Stores `new_point`, evicting one slot when the cache is full. Returns its slot.
    pub fn add_manifold_point(&mut self, new_point: ManifoldPoint, hooks: &ContactHooks) -> usize {
        debug_assert!(
            self.valid_contact_distance(&new_point),
            "contact beyond breaking threshold"
        );
        if self.points.is_full() {
            let index = self.sort_cached_points(&new_point);
            log::debug!("manifold {:?}/{:?} full, evicting slot {}", self.body0, self.body1, index);
            Self::clear_user_cache(&mut self.points[index], hooks);
            self.points[index] = new_point;
            index
        } else {
            self.points.push(new_point);
            self.points.len() - 1
        }
    }

    /// Overwrites slot `index`, keeping its lifetime, impulses and user data.
    pub fn replace_contact_point(&mut self, mut new_point: ManifoldPoint, index: usize) {
        let Some(slot) = self.points.get_mut(index) else {
            debug_assert!(false, "contact index {index} out of range");
            return;
        };
        new_point.inherit_solver_state(slot);
        *slot = new_point;
    }

    /// Moves the last point into `index` and drops the vacated slot.
    pub fn remove_contact_point(&mut self, index: usize, hooks: &ContactHooks) {
        if index >= self.points.len() {
            debug_assert!(false, "contact index {index} out of range");
            return;
        }
        Self::clear_user_cache(&mut self.points[index], hooks);
        self.points.swap_remove(index);

        if self.points.is_empty() {
            if let Some(ended) = &hooks.contact_ended {
                ended(self);
            }
        }
    }

    fn clear_user_cache(point: &mut ManifoldPoint, hooks: &ContactHooks) {
        if let Some(data) = point.user_data.take() {
            if let Some(destroyed) = &hooks.contact_destroyed {
                destroyed(&data);
            }
        }
    }

    /// Recomputes world positions and distances from the anchors, then drops points that
    /// separated past the threshold or slid sideways too far.
    pub fn refresh_contact_points(
        &mut self,
        tr_a: &Transform,
        tr_b: &Transform,
        hooks: &ContactHooks,
    ) {
        for point in self.points.iter_mut().rev() {
            point.position_world_on_a = tr_a.transform_point(point.local_point_a);
            point.position_world_on_b = tr_b.transform_point(point.local_point_b);
            point.distance = (point.position_world_on_a - point.position_world_on_b)
                .dot(point.normal_world_on_b);
            point.lifetime += 1;
        }

        let breaking2 = self.contact_breaking_threshold * self.contact_breaking_threshold;
        for i in (0..self.points.len()).rev() {
            let point = &self.points[i];
            if !self.valid_contact_distance(point) {
                self.remove_contact_point(i, hooks);
                continue;
            }
            let projected = point.position_world_on_a - point.normal_world_on_b * point.distance;
            let drift = point.position_world_on_b - projected;
            if drift.length_squared() > breaking2 {
                self.remove_contact_point(i, hooks);
            } else if let Some(processed) = &hooks.contact_processed {
                let (body0, body1) = (self.body0, self.body1);
                processed(&mut self.points[i], body0, body1);
            }
        }
    }

    /// Removes every point, releasing user data and firing the ended hook once.
    pub fn clear_manifold(&mut self, hooks: &ContactHooks) {
        if self.points.is_empty() {
            return;
        }
        for point in self.points.iter_mut() {
            Self::clear_user_cache(point, hooks);
        }
        self.points.clear();
        if let Some(ended) = &hooks.contact_ended {
            ended(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn point(local_a: Vec3, distance: f32) -> ManifoldPoint {
        ManifoldPoint::new(local_a, local_a, Vec3::Y, distance)
    }

    fn manifold() -> PersistentManifold {
        PersistentManifold::new(EntityId::from_index(0), EntityId::from_index(1), 0.02, f32::MAX)
    }

    #[test]
    fn cache_entry_matches_nearby_anchor() {
        let hooks = ContactHooks::default();
        let mut m = manifold();
        m.add_manifold_point(point(Vec3::ZERO, -0.01), &hooks);
        m.add_manifold_point(point(Vec3::X, -0.01), &hooks);
        assert_eq!(m.get_cache_entry(&point(Vec3::new(1.001, 0.0, 0.0), 0.0)), Some(1));
        assert_eq!(m.get_cache_entry(&point(Vec3::new(0.5, 0.0, 0.0), 0.0)), None);
    }

    #[test]
    fn replace_keeps_warm_start_state() {
        let hooks = ContactHooks::default();
        let mut m = manifold();
        let index = m.add_manifold_point(point(Vec3::ZERO, -0.01), &hooks);
        m.point_mut(index).unwrap().applied_impulse = 3.0;
        m.point_mut(index).unwrap().lifetime = 7;
        m.replace_contact_point(point(Vec3::ZERO, -0.02), index);
        let p = m.point(index).unwrap();
        assert_eq!(p.applied_impulse, 3.0);
        assert_eq!(p.lifetime, 7);
        assert_eq!(p.distance, -0.02);
    }

    #[test]
    fn remove_swaps_last_into_slot_and_fires_ended() {
        let ended = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ended);
        let hooks = ContactHooks::default().on_contact_ended(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut m = manifold();
        m.add_manifold_point(point(Vec3::ZERO, -0.01), &hooks);
        m.add_manifold_point(point(Vec3::X, -0.03), &hooks);
        m.remove_contact_point(0, &hooks);
        assert_eq!(m.num_contacts(), 1);
        assert_eq!(m.point(0).unwrap().distance, -0.03);
        assert_eq!(ended.load(Ordering::SeqCst), 0);
        m.remove_contact_point(0, &hooks);
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_hook_sees_user_data() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);
        let hooks = ContactHooks::default().on_contact_destroyed(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        let mut m = manifold();
        let index = m.add_manifold_point(point(Vec3::ZERO, -0.01), &hooks);
        m.point_mut(index).unwrap().user_data = Some(Arc::new(42_u32));
        m.clear_manifold(&hooks);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(m.num_contacts(), 0);
    }

    #[test]
    fn refresh_drops_separated_points() {
        let hooks = ContactHooks::default();
        let mut m = manifold();
        m.add_manifold_point(point(Vec3::ZERO, -0.01), &hooks);
        let tr_a = Transform::from_position(Vec3::new(0.0, 1.0, 0.0));
        m.refresh_contact_points(&tr_a, &Transform::IDENTITY, &hooks);
        assert_eq!(m.num_contacts(), 0);
    }

    #[test]
    fn refresh_drops_sliding_points() {
        let hooks = ContactHooks::default();
        let mut m = manifold();
        m.add_manifold_point(point(Vec3::ZERO, 0.0), &hooks);
        let tr_a = Transform::from_position(Vec3::new(0.5, 0.0, 0.0));
        m.refresh_contact_points(&tr_a, &Transform::IDENTITY, &hooks);
        assert_eq!(m.num_contacts(), 0);
    }

    #[test]
    fn eviction_spares_deepest_point() {
        let hooks = ContactHooks::default();
        let mut m = manifold();
        m.add_manifold_point(point(Vec3::new(-1.0, 0.0, -1.0), -0.01), &hooks);
        m.add_manifold_point(point(Vec3::new(1.0, 0.0, -1.0), -0.015), &hooks);
        m.add_manifold_point(point(Vec3::new(1.0, 0.0, 1.0), -0.019), &hooks);
        m.add_manifold_point(point(Vec3::new(0.1, 0.0, 0.1), -0.018), &hooks);
        m.add_manifold_point(point(Vec3::new(-1.0, 0.0, 1.0), -0.005), &hooks);
        assert_eq!(m.num_contacts(), 4);
        assert!(m.points().iter().any(|p| p.distance == -0.019));
        assert!(m.points().iter().any(|p| p.distance == -0.005));
    }
}
