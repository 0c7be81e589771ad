use glam::Vec3;

use super::{
    callbacks::ContactHooks, contact::ManifoldPoint, manifold::PersistentManifold,
    wrapper::CollisionObjectWrapper,
};
use crate::utils::math::plane_space;

/// Funnels detector output into a [`PersistentManifold`].
///
/// Detectors report points in the order of `body0`/`body1`: the normal is on `body1`
/// pointing toward `body0`, the point lies on `body1`. The manifold may have been created
/// with the bodies the other way round; anchors, normal and part ids are converted so
/// they always follow the manifold's own ordering.
pub struct ManifoldResult<'a> {
    manifold: Option<&'a mut PersistentManifold>,
    body0: &'a CollisionObjectWrapper<'a>,
    body1: &'a CollisionObjectWrapper<'a>,
    hooks: &'a ContactHooks,
    closest_point_distance_threshold: f32,
}

impl<'a> ManifoldResult<'a> {
    pub fn new(
        body0: &'a CollisionObjectWrapper<'a>,
        body1: &'a CollisionObjectWrapper<'a>,
        hooks: &'a ContactHooks,
        manifold: Option<&'a mut PersistentManifold>,
    ) -> Self {
        Self {
            manifold,
            body0,
            body1,
            hooks,
            closest_point_distance_threshold: 0.0,
        }
    }

    pub fn with_closest_point_distance_threshold(mut self, threshold: f32) -> Self {
        self.closest_point_distance_threshold = threshold;
        self
    }

    pub fn closest_point_distance_threshold(&self) -> f32 {
        self.closest_point_distance_threshold
    }

    /// Result for a sub-test (e.g. one compound child) writing into the same manifold.
    pub fn nested<'b>(
        &'b mut self,
        body0: &'b CollisionObjectWrapper<'b>,
        body1: &'b CollisionObjectWrapper<'b>,
    ) -> ManifoldResult<'b> {
        ManifoldResult {
            manifold: self.manifold.as_deref_mut(),
            body0,
            body1,
            hooks: self.hooks,
            closest_point_distance_threshold: self.closest_point_distance_threshold,
        }
    }

    pub fn set_persistent_manifold(&mut self, manifold: &'a mut PersistentManifold) {
        self.manifold = Some(manifold);
    }

    pub fn manifold(&self) -> Option<&PersistentManifold> {
        self.manifold.as_deref()
    }

    pub fn manifold_mut(&mut self) -> Option<&mut PersistentManifold> {
        self.manifold.as_deref_mut()
    }

    pub fn body0(&self) -> &CollisionObjectWrapper<'a> {
        self.body0
    }

    pub fn body1(&self) -> &CollisionObjectWrapper<'a> {
        self.body1
    }

    pub fn hooks(&self) -> &ContactHooks {
        self.hooks
    }

    /// Breaking threshold of the bound manifold, or zero when none is bound.
    pub fn contact_breaking_threshold(&self) -> f32 {
        self.manifold
            .as_deref()
            .map_or(0.0, PersistentManifold::contact_breaking_threshold)
    }

    pub fn is_swapped(&self) -> bool {
        self.manifold
            .as_deref()
            .is_some_and(|m| m.body0() != self.body0.object.id)
    }

    /// Records a contact: `point_on_b` on body1's surface, `normal_on_b` from body1 toward
    /// body0, `distance` negative when penetrating.
    pub fn add_contact_point(&mut self, normal_on_b: Vec3, point_on_b: Vec3, distance: f32) {
        let Some(manifold) = self.manifold.as_deref_mut() else {
            debug_assert!(false, "contact added without a bound manifold");
            return;
        };
        if distance.is_nan() || distance > manifold.contact_breaking_threshold() {
            return;
        }

        let is_new_collision = manifold.num_contacts() == 0;
        let is_swapped = manifold.body0() != self.body0.object.id;
        let point_on_a = point_on_b + normal_on_b * distance;

        let transform0 = &self.body0.object.transform;
        let transform1 = &self.body1.object.transform;
        let mut new_point = if is_swapped {
            let mut p = ManifoldPoint::new(
                transform1.inverse_transform_point(point_on_b),
                transform0.inverse_transform_point(point_on_a),
                -normal_on_b,
                distance,
            );
            p.position_world_on_a = point_on_b;
            p.position_world_on_b = point_on_a;
            p.part_id0 = self.body1.part_id;
            p.part_id1 = self.body0.part_id;
            p.index0 = self.body1.index;
            p.index1 = self.body0.index;
            p
        } else {
            let mut p = ManifoldPoint::new(
                transform0.inverse_transform_point(point_on_a),
                transform1.inverse_transform_point(point_on_b),
                normal_on_b,
                distance,
            );
            p.position_world_on_a = point_on_a;
            p.position_world_on_b = point_on_b;
            p.part_id0 = self.body0.part_id;
            p.part_id1 = self.body1.part_id;
            p.index0 = self.body0.index;
            p.index1 = self.body1.index;
            p
        };

        new_point.combined = self.hooks.material.combine(self.body0.object, self.body1.object);
        let (dir1, dir2) = plane_space(new_point.normal_world_on_b);
        new_point.lateral_friction_dir1 = dir1;
        new_point.lateral_friction_dir2 = dir2;

        let index = match manifold.get_cache_entry(&new_point) {
            Some(index) => {
                manifold.replace_contact_point(new_point, index);
                index
            }
            None => manifold.add_manifold_point(new_point, self.hooks),
        };

        if self.body0.object.custom_material || self.body1.object.custom_material {
            if let Some(added) = &self.hooks.contact_added {
                let (wrap0, wrap1) = if is_swapped {
                    (self.body1, self.body0)
                } else {
                    (self.body0, self.body1)
                };
                if let Some(point) = manifold.point_mut(index) {
                    added(point, wrap0, wrap1);
                }
            }
        }

        if is_new_collision {
            if let Some(started) = &self.hooks.contact_started {
                started(manifold);
            }
        }
    }

    /// Drops every cached point of the bound manifold.
    pub fn clear_manifold(&mut self) {
        if let Some(manifold) = self.manifold.as_deref_mut() {
            manifold.clear_manifold(self.hooks);
        }
    }

    pub fn num_contacts(&self) -> usize {
        self.manifold.as_deref().map_or(0, PersistentManifold::num_contacts)
    }

    /// Revalidates the cached points against the current body transforms.
    pub fn refresh_contact_points(&mut self) {
        let Some(manifold) = self.manifold.as_deref_mut() else {
            debug_assert!(false, "refresh without a bound manifold");
            return;
        };
        if manifold.num_contacts() == 0 {
            return;
        }
        let (tr0, tr1) = (&self.body0.object.transform, &self.body1.object.transform);
        if manifold.body0() != self.body0.object.id {
            manifold.refresh_contact_points(tr1, tr0, self.hooks);
        } else {
            manifold.refresh_contact_points(tr0, tr1, self.hooks);
        }
    }
}

/// Receiver of raw detector output, in the detector's own body order.
pub trait ContactSink {
    fn add_contact_point(&mut self, normal_on_b: Vec3, point_on_b: Vec3, distance: f32);
}

impl ContactSink for ManifoldResult<'_> {
    fn add_contact_point(&mut self, normal_on_b: Vec3, point_on_b: Vec3, distance: f32) {
        ManifoldResult::add_contact_point(self, normal_on_b, point_on_b, distance);
    }
}

/// Forwards contacts computed with the two bodies exchanged, converting them back.
pub struct SwappedSink<'s, S: ContactSink + ?Sized>(pub &'s mut S);

impl<S: ContactSink + ?Sized> ContactSink for SwappedSink<'_, S> {
    fn add_contact_point(&mut self, normal_on_b: Vec3, point_on_b: Vec3, distance: f32) {
        self.0
            .add_contact_point(-normal_on_b, point_on_b + normal_on_b * distance, distance);
    }
}

/// One raw contact as a detector reported it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSample {
    pub normal_on_b: Vec3,
    pub point_on_b: Vec3,
    pub distance: f32,
}

impl ContactSink for Vec<ContactSample> {
    fn add_contact_point(&mut self, normal_on_b: Vec3, point_on_b: Vec3, distance: f32) {
        self.push(ContactSample {
            normal_on_b,
            point_on_b,
            distance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{collision_object::CollisionObject, shape::ConvexShape, types::Transform},
        utils::allocator::EntityId,
    };
    use approx::assert_abs_diff_eq;

    fn body(id: u32, position: Vec3) -> CollisionObject {
        CollisionObject::builder()
            .id(EntityId::from_index(id))
            .shape(ConvexShape::sphere(0.5))
            .transform(Transform::from_position(position))
            .build()
    }

    #[test]
    fn anchors_follow_manifold_order_when_swapped() {
        let a = body(0, Vec3::ZERO);
        let b = body(1, Vec3::new(0.9, 0.0, 0.0));
        let wrap_a = CollisionObjectWrapper::new(&a);
        let wrap_b = CollisionObjectWrapper::new(&b);
        let hooks = ContactHooks::default();
        let mut manifold = PersistentManifold::new(b.id, a.id, 0.02, f32::MAX);

        {
            let mut result = ManifoldResult::new(&wrap_a, &wrap_b, &hooks, Some(&mut manifold));
            assert!(result.is_swapped());
            // Normal on b toward a, point on b's surface.
            result.add_contact_point(-Vec3::X, Vec3::new(0.4, 0.0, 0.0), -0.1);
        }

        let p = &manifold.points()[0];
        assert_abs_diff_eq!(p.normal_world_on_b, Vec3::X, epsilon = 1e-6);
        assert_abs_diff_eq!(p.position_world_on_a, Vec3::new(0.4, 0.0, 0.0), epsilon = 1e-6);
        assert_abs_diff_eq!(p.position_world_on_b, Vec3::new(0.5, 0.0, 0.0), epsilon = 1e-6);
        assert_abs_diff_eq!(p.local_point_a, Vec3::new(-0.5, 0.0, 0.0), epsilon = 1e-6);

        manifold.refresh_contact_points(&b.transform, &a.transform, &hooks);
        assert_eq!(manifold.num_contacts(), 1);
        assert_abs_diff_eq!(manifold.points()[0].distance, -0.1, epsilon = 1e-5);
    }

    #[test]
    fn points_past_breaking_threshold_are_ignored() {
        let a = body(0, Vec3::ZERO);
        let b = body(1, Vec3::new(2.0, 0.0, 0.0));
        let wrap_a = CollisionObjectWrapper::new(&a);
        let wrap_b = CollisionObjectWrapper::new(&b);
        let hooks = ContactHooks::default();
        let mut manifold = PersistentManifold::new(a.id, b.id, 0.02, f32::MAX);
        let mut result = ManifoldResult::new(&wrap_a, &wrap_b, &hooks, Some(&mut manifold));
        result.add_contact_point(-Vec3::X, Vec3::new(1.5, 0.0, 0.0), 1.0);
        assert_eq!(manifold.num_contacts(), 0);
    }
}
