//! Terrain-following correction
//!
//! Samples the heightfield under the agent's footprint (bottom center and
//! four bottom corners), finds the deepest point below the ground, lifts the
//! agent out by that amount and, on steep ground, projects the into-slope
//! part of the frame's displacement onto the terrain plane.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::terrain::TerrainQuery;
use crate::consts::*;

/// Tuning for terrain following
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainFollowParams {
    pub radius_xy: f32,
    pub radius_z: f32,
    /// Extra height kept between the footprint and the ground
    pub clearance: f32,
    /// Terrain normals with z below this are steep
    pub steep_normal_z: f32,
}

impl Default for TerrainFollowParams {
    fn default() -> Self {
        Self {
            radius_xy: AGENT_RADIUS_XY,
            radius_z: AGENT_RADIUS_Z,
            clearance: 0.0,
            steep_normal_z: STEEP_SLOPE_NORMAL_Z,
        }
    }
}

/// What terrain following did this tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TerrainCorrection {
    /// A footprint point was below the ground
    pub applied: bool,
    /// Upward correction applied to the position
    pub penetration: f32,
    /// Deepest footprint point (before correction)
    pub contact_point: Vec3,
    /// Terrain normal at the deepest point
    pub normal: Vec3,
    /// Displacement was projected onto the terrain plane
    pub projected: bool,
}

/// Bottom center plus the four bottom corners of the agent volume
pub fn footprint_points(position: Vec3, radius_xy: f32, radius_z: f32) -> [Vec3; 5] {
    let z = position.z - radius_z;
    let r = radius_xy;
    [
        Vec3::new(position.x, position.y, z),
        Vec3::new(position.x - r, position.y - r, z),
        Vec3::new(position.x + r, position.y - r, z),
        Vec3::new(position.x - r, position.y + r, z),
        Vec3::new(position.x + r, position.y + r, z),
    ]
}

/// Lift `position` out of the terrain and adjust `displacement` for slope.
///
/// Footprint points outside the terrain's safe interior are ignored. On
/// gentle slopes the displacement is left untouched.
pub fn correct_for_terrain<T>(
    terrain: &T,
    position: &mut Vec3,
    displacement: &mut Vec3,
    params: &TerrainFollowParams,
) -> TerrainCorrection
where
    T: TerrainQuery + ?Sized,
{
    let mut deepest: Option<(f32, Vec3)> = None;
    for point in footprint_points(*position, params.radius_xy, params.radius_z) {
        let Some(ground) = terrain.elevation_at(point.x, point.y) else {
            continue;
        };
        let depth = ground + params.clearance - point.z;
        if depth > 0.0 && deepest.is_none_or(|(d, _)| depth > d) {
            deepest = Some((depth, point));
        }
    }

    let Some((depth, point)) = deepest else {
        return TerrainCorrection::default();
    };

    let normal = terrain.normal_at(point.x, point.y);
    position.z += depth;

    let mut projected = false;
    if normal.z < params.steep_normal_z {
        let into = displacement.dot(normal);
        if into < 0.0 {
            *displacement -= normal * into;
            projected = true;
        }
    }

    log::trace!(
        "terrain correction {:.4} at {:?} n={:?} projected={}",
        depth,
        point,
        normal,
        projected
    );

    TerrainCorrection {
        applied: true,
        penetration: depth,
        contact_point: point,
        normal,
        projected,
    }
}
