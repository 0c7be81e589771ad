//! Pluggable material combination and contact lifecycle hooks.
//!
//! Hooks are plain `Arc<dyn Fn>` values carried in [`ContactHooks`] and handed to every
//! detection call. Pairs may run on several threads at once, so every hook must be
//! `Send + Sync`; [`ContactEventLog`] collects lifecycle events behind a mutex for a
//! single-threaded drain once the step has joined.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use super::{
    contact::{ManifoldPoint, UserData},
    manifold::PersistentManifold,
    wrapper::CollisionObjectWrapper,
};
use crate::{
    config::MAX_FRICTION,
    core::{collision_object::CollisionObject, types::CombinedMaterial},
    utils::allocator::EntityId,
};

/// How two surface materials merge into the coefficients of one contact.
pub trait MaterialPolicy: Send + Sync {
    fn combine_friction(&self, a: &CollisionObject, b: &CollisionObject) -> f32 {
        (a.material.friction * b.material.friction).clamp(-MAX_FRICTION, MAX_FRICTION)
    }

    fn combine_restitution(&self, a: &CollisionObject, b: &CollisionObject) -> f32 {
        a.material.restitution * b.material.restitution
    }

    fn combine_rolling_friction(&self, a: &CollisionObject, b: &CollisionObject) -> f32 {
        (a.material.rolling_friction * b.material.friction
            + b.material.rolling_friction * a.material.friction)
            .clamp(-MAX_FRICTION, MAX_FRICTION)
    }

    fn combine_spinning_friction(&self, a: &CollisionObject, b: &CollisionObject) -> f32 {
        (a.material.spinning_friction * b.material.friction
            + b.material.spinning_friction * a.material.friction)
            .clamp(-MAX_FRICTION, MAX_FRICTION)
    }

    fn combine_damping(&self, a: &CollisionObject, b: &CollisionObject) -> f32 {
        a.material.contact_damping * b.material.contact_damping
    }

    /// Springs in series.
    fn combine_stiffness(&self, a: &CollisionObject, b: &CollisionObject) -> f32 {
        let s0 = a.material.contact_stiffness;
        let s1 = b.material.contact_stiffness;
        let inv = 1.0 / s0 + 1.0 / s1;
        if inv > 0.0 {
            1.0 / inv
        } else {
            0.0
        }
    }

    fn combine(&self, a: &CollisionObject, b: &CollisionObject) -> CombinedMaterial {
        CombinedMaterial {
            friction: self.combine_friction(a, b),
            restitution: self.combine_restitution(a, b),
            rolling_friction: self.combine_rolling_friction(a, b),
            spinning_friction: self.combine_spinning_friction(a, b),
            contact_damping: self.combine_damping(a, b),
            contact_stiffness: self.combine_stiffness(a, b),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMaterialPolicy;

impl MaterialPolicy for DefaultMaterialPolicy {}

/// Called for each new or replaced point when either object has `custom_material` set.
/// Wrappers arrive in manifold order. The return value is informational.
pub type ContactAddedHook = dyn Fn(
        &mut ManifoldPoint,
        &CollisionObjectWrapper<'_>,
        &CollisionObjectWrapper<'_>,
    ) -> bool
    + Send
    + Sync;
pub type ManifoldHook = dyn Fn(&PersistentManifold) + Send + Sync;
pub type ContactProcessedHook =
    dyn Fn(&mut ManifoldPoint, EntityId, EntityId) -> bool + Send + Sync;
pub type ContactDestroyedHook = dyn Fn(&UserData) -> bool + Send + Sync;

/// Material policy plus optional lifecycle callbacks, shared by every pair in a step.
#[derive(Clone)]
pub struct ContactHooks {
    pub material: Arc<dyn MaterialPolicy>,
    pub contact_added: Option<Arc<ContactAddedHook>>,
    pub contact_started: Option<Arc<ManifoldHook>>,
    pub contact_ended: Option<Arc<ManifoldHook>>,
    pub contact_processed: Option<Arc<ContactProcessedHook>>,
    pub contact_destroyed: Option<Arc<ContactDestroyedHook>>,
}

impl Default for ContactHooks {
    fn default() -> Self {
        Self {
            material: Arc::new(DefaultMaterialPolicy),
            contact_added: None,
            contact_started: None,
            contact_ended: None,
            contact_processed: None,
            contact_destroyed: None,
        }
    }
}

impl fmt::Debug for ContactHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactHooks")
            .field("contact_added", &self.contact_added.is_some())
            .field("contact_started", &self.contact_started.is_some())
            .field("contact_ended", &self.contact_ended.is_some())
            .field("contact_processed", &self.contact_processed.is_some())
            .field("contact_destroyed", &self.contact_destroyed.is_some())
            .finish_non_exhaustive()
    }
}

impl ContactHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_material_policy(mut self, policy: impl MaterialPolicy + 'static) -> Self {
        self.material = Arc::new(policy);
        self
    }

    pub fn on_contact_added(
        mut self,
        hook: impl Fn(
                &mut ManifoldPoint,
                &CollisionObjectWrapper<'_>,
                &CollisionObjectWrapper<'_>,
            ) -> bool
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.contact_added = Some(Arc::new(hook));
        self
    }

    pub fn on_contact_started(
        mut self,
        hook: impl Fn(&PersistentManifold) + Send + Sync + 'static,
    ) -> Self {
        self.contact_started = Some(Arc::new(hook));
        self
    }

    pub fn on_contact_ended(
        mut self,
        hook: impl Fn(&PersistentManifold) + Send + Sync + 'static,
    ) -> Self {
        self.contact_ended = Some(Arc::new(hook));
        self
    }

    pub fn on_contact_processed(
        mut self,
        hook: impl Fn(&mut ManifoldPoint, EntityId, EntityId) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.contact_processed = Some(Arc::new(hook));
        self
    }

    pub fn on_contact_destroyed(
        mut self,
        hook: impl Fn(&UserData) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.contact_destroyed = Some(Arc::new(hook));
        self
    }

    /// Routes started/ended/destroyed events into `log`, replacing those hooks.
    pub fn with_event_log(self, log: Arc<ContactEventLog>) -> Self {
        let started = Arc::clone(&log);
        let ended = Arc::clone(&log);
        self.on_contact_started(move |manifold| {
            started.push(ContactEvent::Started {
                body0: manifold.body0(),
                body1: manifold.body1(),
            })
        })
        .on_contact_ended(move |manifold| {
            ended.push(ContactEvent::Ended {
                body0: manifold.body0(),
                body1: manifold.body1(),
            })
        })
        .on_contact_destroyed(move |_| {
            log.push(ContactEvent::UserDataDestroyed);
            true
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    Started { body0: EntityId, body1: EntityId },
    Ended { body0: EntityId, body1: EntityId },
    UserDataDestroyed,
}

/// Thread-safe sink for lifecycle events raised while pairs run in parallel.
#[derive(Debug, Default)]
pub struct ContactEventLog {
    events: Mutex<Vec<ContactEvent>>,
}

impl ContactEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: ContactEvent) {
        self.events.lock().push(event);
    }

    /// Takes every event recorded so far, in arrival order.
    pub fn drain(&self) -> Vec<ContactEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Material;
    use approx::assert_relative_eq;

    fn object(material: Material) -> CollisionObject {
        CollisionObject::builder().material(material).build()
    }

    #[test]
    fn default_policy_clamps_friction() {
        let a = object(Material::default().with_friction(5.0));
        let b = object(Material::default().with_friction(4.0));
        let combined = DefaultMaterialPolicy.combine(&a, &b);
        assert_eq!(combined.friction, MAX_FRICTION);
    }

    #[test]
    fn stiffness_combines_in_series() {
        let mut a = Material::default();
        a.contact_stiffness = 100.0;
        let mut b = Material::default();
        b.contact_stiffness = 100.0;
        let combined = DefaultMaterialPolicy.combine(&object(a), &object(b));
        assert_relative_eq!(combined.contact_stiffness, 50.0, epsilon = 1e-4);
    }

    #[test]
    fn rolling_friction_mixes_with_friction() {
        let mut a = Material::default().with_friction(0.5);
        a.rolling_friction = 0.2;
        let mut b = Material::default().with_friction(0.8);
        b.rolling_friction = 0.1;
        let combined = DefaultMaterialPolicy.combine(&object(a), &object(b));
        assert_relative_eq!(combined.rolling_friction, 0.2 * 0.8 + 0.1 * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn custom_policy_overrides_one_rule() {
        struct MaxRestitution;
        impl MaterialPolicy for MaxRestitution {
            fn combine_restitution(&self, a: &CollisionObject, b: &CollisionObject) -> f32 {
                a.material.restitution.max(b.material.restitution)
            }
        }

        let a = object(Material::default().with_restitution(0.2));
        let b = object(Material::default().with_restitution(0.9));
        let combined = MaxRestitution.combine(&a, &b);
        assert_relative_eq!(combined.restitution, 0.9);
        assert_relative_eq!(combined.friction, 0.25);
    }

    #[test]
    fn event_log_drains_in_order() {
        let log = ContactEventLog::new();
        log.push(ContactEvent::UserDataDestroyed);
        log.push(ContactEvent::Started {
            body0: EntityId::from_index(0),
            body1: EntityId::from_index(1),
        });
        assert_eq!(log.len(), 2);
        let events = log.drain();
        assert_eq!(events[0], ContactEvent::UserDataDestroyed);
        assert!(log.is_empty());
    }
}
