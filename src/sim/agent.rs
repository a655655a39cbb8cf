//! Agent state and per-tick control input

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;

/// The flight vehicle's collision-relevant state. Owned by the caller and
/// mutated in place each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Body orientation (local x right, y forward, z up)
    pub orientation: Quat,
    /// Horizontal half-extent of the collision volume
    pub radius_xy: f32,
    /// Vertical half-extent of the collision volume
    pub radius_z: f32,
}

impl AgentState {
    pub fn new(position: Vec3, radius_xy: f32, radius_z: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            radius_xy,
            radius_z,
        }
    }

    /// Face along `yaw` radians around +Z (0 = +Y forward)
    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.orientation = Quat::from_rotation_z(yaw);
        self
    }

    /// World-space right/forward/up axes
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (
            self.orientation * Vec3::X,
            self.orientation * Vec3::Y,
            self.orientation * Vec3::Z,
        )
    }

    /// Current collision volume
    pub fn volume(&self) -> Aabb {
        Aabb::from_center_half_extents(
            self.position,
            Vec3::new(self.radius_xy, self.radius_xy, self.radius_z),
        )
    }
}

/// Control-derived motion for one tick (already damped and scaled)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlInput {
    /// Desired velocity in the agent's local frame
    pub local_velocity: Vec3,
}

impl ControlInput {
    pub fn new(right: f32, forward: f32, up: f32) -> Self {
        Self {
            local_velocity: Vec3::new(right, forward, up),
        }
    }

    /// Desired world-space displacement over `dt`
    pub fn displacement(&self, agent: &AgentState, dt: f32) -> Vec3 {
        let (right, forward, up) = agent.basis();
        (right * self.local_velocity.x + forward * self.local_velocity.y + up * self.local_velocity.z)
            * dt
    }
}
