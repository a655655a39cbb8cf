//! Obstacles and the per-level obstacle store
//!
//! The core only ever reads an obstacle's box, active flag and id. Kind is a
//! tagged variant so gameplay can ask "is this a landing surface" without
//! inspecting concrete types.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;

/// Stable obstacle handle (never reused within a level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

/// Obstacle types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Generic blocking geometry (walls, pillars, hangars)
    #[default]
    Solid,
    /// Flat-topped pad the vehicle may land on
    LandingPad,
}

impl ObstacleKind {
    /// Whether resting on top of this counts as a landing
    pub fn is_support_surface(&self) -> bool {
        matches!(self, ObstacleKind::LandingPad)
    }
}

/// An obstacle entity (axis-aligned box)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub kind: ObstacleKind,
    pub aabb: Aabb,
    pub active: bool,
}

impl Obstacle {
    pub fn new(id: ObstacleId, kind: ObstacleKind, aabb: Aabb) -> Self {
        Self {
            id,
            kind,
            aabb,
            active: true,
        }
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn is_support_surface(&self) -> bool {
        self.kind.is_support_surface()
    }
}

/// Owning obstacle store, iterated in id order for determinism
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleSet {
    obstacles: BTreeMap<ObstacleId, Obstacle>,
    next_id: u32,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self {
            obstacles: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Allocate a new obstacle ID
    fn next_obstacle_id(&mut self) -> ObstacleId {
        // Default-constructed sets start at 0; keep ids non-zero either way
        let id = ObstacleId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    /// Add an active obstacle and return its handle
    pub fn spawn(&mut self, kind: ObstacleKind, aabb: Aabb) -> ObstacleId {
        let id = self.next_obstacle_id();
        self.obstacles.insert(id, Obstacle::new(id, kind, aabb));
        id
    }

    pub fn despawn(&mut self, id: ObstacleId) -> Option<Obstacle> {
        self.obstacles.remove(&id)
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    /// Toggle the active flag. Returns false if the id is unknown.
    pub fn set_active(&mut self, id: ObstacleId, active: bool) -> bool {
        match self.obstacles.get_mut(&id) {
            Some(o) => {
                o.active = active;
                true
            }
            None => false,
        }
    }

    pub fn translate(&mut self, id: ObstacleId, offset: Vec3) -> Option<&Obstacle> {
        let o = self.obstacles.get_mut(&id)?;
        o.aabb = o.aabb.translated(offset);
        Some(o)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}
