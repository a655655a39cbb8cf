//! Axis-aligned bounding boxes
//!
//! World-space boxes with Z up. Obstacles, inflated collision volumes and
//! broad-phase query volumes are all expressed as `Aabb`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned box, `min` <= `max` componentwise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Build a box from two corners (any order)
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Bounding box of the segment `p0 -> p1` grown by `radius` on every axis
    pub fn from_segment(p0: Vec3, p1: Vec3, radius: f32) -> Self {
        let r = Vec3::splat(radius);
        Self {
            min: p0.min(p1) - r,
            max: p0.max(p1) + r,
        }
    }

    /// Minkowski-grow the box by the agent half-extents
    #[inline]
    pub fn inflated(&self, radius_xy: f32, radius_z: f32) -> Self {
        let grow = Vec3::new(radius_xy, radius_xy, radius_z);
        Self {
            min: self.min - grow,
            max: self.max + grow,
        }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Inclusive overlap test (touching faces overlap)
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Inclusive overlap in X/Y only
    pub fn overlaps_xy(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Strict interior test (points on a face are outside)
    pub fn contains_strict(&self, p: Vec3) -> bool {
        p.x > self.min.x
            && p.x < self.max.x
            && p.y > self.min.y
            && p.y < self.max.y
            && p.z > self.min.z
            && p.z < self.max.z
    }

    /// Shallowest per-axis overlap depth between two boxes, 0 when separated.
    ///
    /// Used to measure residual penetration after depenetration.
    pub fn penetration_depth(&self, other: &Self) -> f32 {
        let dx = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
        let dy = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        let dz = self.max.z.min(other.max.z) - self.min.z.max(other.min.z);
        if dx <= 0.0 || dy <= 0.0 || dz <= 0.0 {
            0.0
        } else {
            dx.min(dy).min(dz)
        }
    }
}
