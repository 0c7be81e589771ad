use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid placement (position + orientation) of a collision object or child shape.
///
/// Non-uniform scale is a property of the shape (`local_scaling`), so transforms stay
/// invertible without a matrix inverse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Rotation as a 3x3 basis (columns are the local axes in world space).
    pub fn basis(&self) -> Mat3 {
        Mat3::from_quat(self.rotation)
    }

    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.conjugate() * (world - self.position)
    }

    pub fn transform_vector(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    pub fn inverse_transform_vector(&self, world: Vec3) -> Vec3 {
        self.rotation.conjugate() * world
    }

    /// Applies `other` in the local frame of `self`.
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.transform_point(other.position),
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.conjugate();
        Transform {
            position: rotation * -self.position,
            rotation,
        }
    }
}

/// Surface coefficients a collision object contributes to its contacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
    /// Resistance to rolling at the contact.
    pub rolling_friction: f32,
    /// Resistance to twisting about the contact normal.
    pub spinning_friction: f32,
    pub contact_damping: f32,
    pub contact_stiffness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
            rolling_friction: 0.0,
            spinning_friction: 0.0,
            contact_damping: 0.1,
            contact_stiffness: 1e18,
        }
    }
}

impl Material {
    pub fn rubber() -> Self {
        Self {
            friction: 1.0,
            restitution: 0.8,
            rolling_friction: 0.04,
            spinning_friction: 0.03,
            ..Self::default()
        }
    }

    pub fn steel() -> Self {
        Self {
            friction: 0.58,
            restitution: 0.4,
            rolling_friction: 0.015,
            spinning_friction: 0.012,
            ..Self::default()
        }
    }

    pub fn ice() -> Self {
        Self {
            friction: 0.05,
            restitution: 0.05,
            rolling_friction: 0.005,
            spinning_friction: 0.003,
            ..Self::default()
        }
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

/// Material values written onto a single contact point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinedMaterial {
    pub friction: f32,
    pub restitution: f32,
    pub rolling_friction: f32,
    pub spinning_friction: f32,
    pub contact_damping: f32,
    pub contact_stiffness: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_round_trips_points() {
        let transform = Transform::from_position_rotation(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3),
        );
        let local = Vec3::new(0.3, 0.4, -0.5);
        let world = transform.transform_point(local);
        assert!(transform.inverse_transform_point(world).abs_diff_eq(local, 1e-5));
        assert!(transform.inverse().transform_point(world).abs_diff_eq(local, 1e-5));
    }

    #[test]
    fn combine_nests_frames() {
        let parent = Transform::from_position_rotation(
            Vec3::new(0.0, 1.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        let child = Transform::from_position(Vec3::X);
        let world = parent.combine(&child);
        assert!(world.position.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5));
    }
}
