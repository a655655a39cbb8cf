//! Battlespace bounds clamp
//!
//! Keeps the agent inside the world's axis-aligned limits.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Which axes were clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundsHit {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl BoundsHit {
    pub fn any(&self) -> bool {
        self.x || self.y || self.z
    }
}

/// World limits for the agent's center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattlespaceBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl BattlespaceBounds {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Clamp `position` per axis; velocity pointing out of the bounds on a
    /// clamped axis is zeroed.
    pub fn clamp(&self, position: &mut Vec3, velocity: &mut Vec3) -> BoundsHit {
        let mut hit = [false; 3];
        for (axis, flag) in hit.iter_mut().enumerate() {
            if position[axis] < self.min[axis] {
                position[axis] = self.min[axis];
                velocity[axis] = velocity[axis].max(0.0);
                *flag = true;
            } else if position[axis] > self.max[axis] {
                position[axis] = self.max[axis];
                velocity[axis] = velocity[axis].min(0.0);
                *flag = true;
            }
        }
        BoundsHit {
            x: hit[0],
            y: hit[1],
            z: hit[2],
        }
    }
}
