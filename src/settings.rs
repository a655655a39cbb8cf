//! Collision tuning
//!
//! Loaded from a JSON file; missing fields fall back to defaults.

use std::io;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::bounds::BattlespaceBounds;
use crate::sim::controller::ControllerParams;
use crate::sim::mover::MoveParams;
use crate::sim::terrain_follow::TerrainFollowParams;

/// Every tunable of the movement and collision subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionSettings {
    // === Mover ===
    /// Skin distance kept between the agent and surfaces
    pub epsilon: f32,
    /// Swept iterations per move
    pub max_iters: u32,
    /// Minimum fraction consumed per hit
    pub min_t_floor: f32,
    /// Contact normals with z above this count as support
    pub support_normal_z: f32,
    /// Platform-top band for static depenetration
    pub top_tolerance: f32,
    /// Ignore obstacle Z faces (terrain following owns vertical motion)
    pub horizontal_only: bool,

    // === Broad-phase ===
    pub cell_size: f32,

    // === Agent ===
    pub radius_xy: f32,
    pub radius_z: f32,

    // === Terrain following ===
    pub steep_slope_normal_z: f32,
    pub ground_clearance: f32,

    // === Platform refinement ===
    /// Max upward push per second
    pub platform_push_rate: f32,
    /// Max downward settle per second
    pub platform_settle_rate: f32,
    /// Height above a platform's rest position inside which settling applies
    pub platform_hover_band: f32,

    // === Battlespace ===
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_iters: DEFAULT_MAX_ITERS,
            min_t_floor: MIN_T_FLOOR,
            support_normal_z: SUPPORT_NORMAL_Z,
            top_tolerance: TOP_TOLERANCE,
            horizontal_only: false,

            cell_size: DEFAULT_CELL_SIZE,

            radius_xy: AGENT_RADIUS_XY,
            radius_z: AGENT_RADIUS_Z,

            steep_slope_normal_z: STEEP_SLOPE_NORMAL_Z,
            ground_clearance: 0.0,

            platform_push_rate: PLATFORM_PUSH_RATE,
            platform_settle_rate: PLATFORM_SETTLE_RATE,
            platform_hover_band: PLATFORM_HOVER_BAND,

            bounds_min: Vec3::new(-240.0, -240.0, -20.0),
            bounds_max: Vec3::new(240.0, 240.0, 200.0),
        }
    }
}

/// Replace a non-positive value with its default
fn positive_or(name: &str, value: f32, default: f32) -> f32 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        log::warn!("Invalid {} ({}), using {}", name, value, default);
        default
    }
}

impl CollisionSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or malformed. The result is always validated.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Can't read settings {}: {}; using defaults", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_json(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings.validated()
            }
            Err(e) => {
                log::warn!("Malformed settings {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Copy with out-of-range values replaced by defaults
    pub fn validated(mut self) -> Self {
        let d = Self::default();
        self.epsilon = positive_or("epsilon", self.epsilon, d.epsilon);
        self.min_t_floor = positive_or("min_t_floor", self.min_t_floor, d.min_t_floor);
        self.cell_size = positive_or("cell_size", self.cell_size, d.cell_size);
        self.radius_xy = positive_or("radius_xy", self.radius_xy, d.radius_xy);
        self.radius_z = positive_or("radius_z", self.radius_z, d.radius_z);
        self.platform_push_rate =
            positive_or("platform_push_rate", self.platform_push_rate, d.platform_push_rate);
        self.platform_settle_rate = positive_or(
            "platform_settle_rate",
            self.platform_settle_rate,
            d.platform_settle_rate,
        );
        if self.max_iters == 0 {
            log::warn!("Invalid max_iters (0), using {}", d.max_iters);
            self.max_iters = d.max_iters;
        }
        if self.ground_clearance < 0.0 {
            log::warn!("Negative ground_clearance, using 0");
            self.ground_clearance = 0.0;
        }
        if self.platform_hover_band < 0.0 {
            log::warn!("Negative platform_hover_band, using {}", d.platform_hover_band);
            self.platform_hover_band = d.platform_hover_band;
        }
        self
    }

    pub fn move_params(&self, horizontal_only: bool) -> MoveParams {
        MoveParams {
            radius_xy: self.radius_xy,
            radius_z: self.radius_z,
            epsilon: self.epsilon,
            horizontal_only,
            max_iters: self.max_iters,
            min_t_floor: self.min_t_floor,
            support_normal_z: self.support_normal_z,
            top_tolerance: self.top_tolerance,
        }
    }

    pub fn terrain_follow_params(&self) -> TerrainFollowParams {
        TerrainFollowParams {
            radius_xy: self.radius_xy,
            radius_z: self.radius_z,
            clearance: self.ground_clearance,
            steep_normal_z: self.steep_slope_normal_z,
        }
    }

    pub fn controller_params(&self) -> ControllerParams {
        ControllerParams {
            movement: self.move_params(self.horizontal_only),
            terrain: self.terrain_follow_params(),
            platform_push_rate: self.platform_push_rate,
            platform_settle_rate: self.platform_settle_rate,
            platform_hover_band: self.platform_hover_band,
        }
    }

    pub fn bounds(&self) -> BattlespaceBounds {
        BattlespaceBounds::new(self.bounds_min, self.bounds_max)
    }
}
