//! Sortie - swept collision and terrain following for a flight vehicle
//!
//! Core modules:
//! - `sim`: Deterministic movement and collision (broad-phase, mover, terrain)
//! - `settings`: Data-driven collision tuning

pub mod settings;
pub mod sim;

pub use settings::CollisionSettings;

use glam::Vec3;

/// Collision configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Skin distance used to back the agent off contact surfaces
    pub const DEFAULT_EPSILON: f32 = 0.01;
    /// Maximum swept iterations per move call
    pub const DEFAULT_MAX_ITERS: u32 = 4;
    /// Minimum fraction consumed per hit (guarantees forward progress)
    pub const MIN_T_FLOOR: f32 = 1e-3;
    /// A contact normal with z above this counts as support
    pub const SUPPORT_NORMAL_Z: f32 = 0.95;
    /// Band below a platform top inside which depenetration only pushes up
    pub const TOP_TOLERANCE: f32 = 0.05;

    /// Remaining fraction below which the sweep stops
    pub const NEGLIGIBLE_FRACTION: f32 = 1e-4;
    /// Squared speed below which the rest of the move is applied unqueried
    pub const NEGLIGIBLE_SPEED_SQ: f32 = 1e-8;

    /// Broad-phase cell size (world units)
    pub const DEFAULT_CELL_SIZE: f32 = 20.0;

    /// Agent half-extents
    pub const AGENT_RADIUS_XY: f32 = 1.5;
    pub const AGENT_RADIUS_Z: f32 = 0.5;

    /// Terrain normals with z below this are steep (displacement gets projected)
    pub const STEEP_SLOPE_NORMAL_Z: f32 = 0.9;

    /// Platform refinement rates (world units per second)
    pub const PLATFORM_PUSH_RATE: f32 = 4.0;
    pub const PLATFORM_SETTLE_RATE: f32 = 1.0;
    /// Height above a platform rest position inside which settling applies
    pub const PLATFORM_HOVER_BAND: f32 = 0.25;
}

/// Drop the vertical component of a vector
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, 0.0)
}

/// Remove the into-surface component of `velocity` relative to `normal`.
///
/// `v -= n * min(0, v·n)`: motion away from or along the surface is kept.
#[inline]
pub fn clip_into_surface(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - normal * velocity.dot(normal).min(0.0)
}
