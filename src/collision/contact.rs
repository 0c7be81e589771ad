use std::{any::Any, sync::Arc};

use glam::Vec3;

use crate::core::types::CombinedMaterial;

/// Opaque per-point data a solver may attach; released through the contact-destroyed hook.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// One cached contact between the two bodies of a manifold.
///
/// Anchors are stored in each body's local frame; world positions and `distance` are
/// recomputed by every refresh. `distance` is negative while the bodies penetrate.
#[derive(Debug, Clone)]
pub struct ManifoldPoint {
    pub local_point_a: Vec3,
    pub local_point_b: Vec3,
    pub position_world_on_a: Vec3,
    pub position_world_on_b: Vec3,
    /// Surface normal of body B, pointing toward body A.
    pub normal_world_on_b: Vec3,
    pub distance: f32,
    pub combined: CombinedMaterial,
    pub lateral_friction_dir1: Vec3,
    pub lateral_friction_dir2: Vec3,
    pub applied_impulse: f32,
    pub applied_impulse_lateral1: f32,
    pub applied_impulse_lateral2: f32,
    /// Refreshes survived since insertion.
    pub lifetime: u32,
    pub part_id0: i32,
    pub part_id1: i32,
    pub index0: i32,
    pub index1: i32,
    pub user_data: Option<UserData>,
}

impl ManifoldPoint {
    pub fn new(
        local_point_a: Vec3,
        local_point_b: Vec3,
        normal_world_on_b: Vec3,
        distance: f32,
    ) -> Self {
        Self {
            local_point_a,
            local_point_b,
            position_world_on_a: Vec3::ZERO,
            position_world_on_b: Vec3::ZERO,
            normal_world_on_b,
            distance,
            combined: CombinedMaterial::default(),
            lateral_friction_dir1: Vec3::ZERO,
            lateral_friction_dir2: Vec3::ZERO,
            applied_impulse: 0.0,
            applied_impulse_lateral1: 0.0,
            applied_impulse_lateral2: 0.0,
            lifetime: 0,
            part_id0: -1,
            part_id1: -1,
            index0: -1,
            index1: -1,
            user_data: None,
        }
    }

    pub fn is_penetrating(&self) -> bool {
        self.distance < 0.0
    }

    /// Copies the warm-start state of `previous` onto this point.
    pub(crate) fn inherit_solver_state(&mut self, previous: &ManifoldPoint) {
        self.lifetime = previous.lifetime;
        self.applied_impulse = previous.applied_impulse;
        self.applied_impulse_lateral1 = previous.applied_impulse_lateral1;
        self.applied_impulse_lateral2 = previous.applied_impulse_lateral2;
        self.user_data = previous.user_data.clone();
    }
}
