//! Deterministic movement and collision
//!
//! Everything the agent's per-tick movement needs lives here. This module
//! must stay pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (scenario generation)
//! - Stable iteration order (by obstacle ID)
//! - No rendering or platform dependencies

pub mod aabb;
pub mod agent;
pub mod bounds;
pub mod broadphase;
pub mod controller;
pub mod mover;
pub mod obstacle;
pub mod scenario;
pub mod terrain;
pub mod terrain_follow;
pub mod world;

pub use aabb::Aabb;
pub use agent::{AgentState, ControlInput};
pub use bounds::{BattlespaceBounds, BoundsHit};
pub use broadphase::BroadPhaseGrid;
pub use controller::{ControllerParams, MoveOutcome, MovementController};
pub use mover::{
    Candidate, CandidateQuery, Contact, ContactInfo, MoveParams, MoveScratch, SliceQuery,
    resolve_move, sweep_aabb,
};
pub use obstacle::{Obstacle, ObstacleId, ObstacleKind, ObstacleSet};
pub use scenario::{FlightStats, Scenario, generate};
pub use terrain::{HeightField, TerrainQuery, TerrainSample};
pub use terrain_follow::{TerrainCorrection, TerrainFollowParams, correct_for_terrain};
pub use world::{World, WorldQuery};
