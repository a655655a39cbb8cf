//! Seeded level generation and scripted flights
//!
//! Builds a rolling heightfield and an obstacle field (walls, pillars,
//! landing pads, a few patrolling pillars) from a seed, so demo runs and
//! determinism checks fly the same level every time.

use std::f32::consts::TAU;

use glam::{Quat, Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::aabb::Aabb;
use super::agent::{AgentState, ControlInput};
use super::controller::{MovementController, MoveOutcome};
use super::obstacle::{ObstacleId, ObstacleKind};
use super::terrain::HeightField;
use super::world::World;
use crate::settings::CollisionSettings;

/// Heightfield resolution and placement
const TERRAIN_SAMPLES: usize = 129;
const TERRAIN_SPACING: f32 = 4.0;
const TERRAIN_ORIGIN: f32 = -256.0;

const WALL_COUNT: usize = 10;
const PILLAR_COUNT: usize = 14;
const PAD_COUNT: usize = 6;
const PATROL_COUNT: usize = 3;

/// Obstacle centers keep this far from the spawn point (longer than any
/// wall half-length)
const SPAWN_CLEARANCE: f32 = 60.0;
/// Obstacles are sunk this far below the ground at their center
const FOOTING_DEPTH: f32 = 3.0;
/// Spawn height above the ground
const SPAWN_ALTITUDE: f32 = 30.0;

/// An obstacle oscillating along an axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patrol {
    pub id: ObstacleId,
    /// Unit direction of travel
    pub axis: Vec3,
    pub amplitude: f32,
    pub period_ticks: u32,
}

impl Patrol {
    /// Offset from the spawn position at `tick`
    pub fn offset(&self, tick: u64) -> Vec3 {
        let phase = (tick % self.period_ticks as u64) as f32 / self.period_ticks as f32;
        self.axis * self.amplitude * (phase * TAU).sin()
    }
}

/// Per-flight counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlightStats {
    pub ticks: u64,
    pub collisions: u32,
    pub support_ticks: u32,
    pub terrain_contacts: u32,
    pub slope_projections: u32,
    pub landings: u32,
    pub bounds_hits: u32,
}

impl FlightStats {
    pub fn record(&mut self, outcome: &MoveOutcome) {
        self.ticks += 1;
        self.collisions += outcome.contact.collided as u32;
        self.support_ticks += outcome.contact.has_support as u32;
        self.terrain_contacts += outcome.terrain.applied as u32;
        self.slope_projections += outcome.terrain.projected as u32;
        self.landings += outcome.just_landed as u32;
        self.bounds_hits += outcome.bounds_hit.any() as u32;
    }
}

/// A generated level plus the agent flying it
pub struct Scenario {
    pub seed: u64,
    pub world: World,
    pub patrols: Vec<Patrol>,
    pub agent: AgentState,
    tick: u64,
}

impl Scenario {
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Move patrols, steer the agent along the scripted path and advance it
    /// one tick.
    pub fn step(&mut self, controller: &mut MovementController, dt: f32) -> MoveOutcome {
        let tick = self.tick;
        for patrol in &self.patrols {
            let delta = patrol.offset(tick + 1) - patrol.offset(tick);
            self.world.translate_obstacle(patrol.id, delta);
        }

        self.agent.orientation = Quat::from_rotation_z(scripted_yaw(tick));
        let input = scripted_input(tick);
        let outcome = controller.step(&mut self.agent, &input, &mut self.world, dt);

        self.tick += 1;
        outcome
    }

    /// Fly `ticks` ticks and collect counters
    pub fn fly(&mut self, controller: &mut MovementController, ticks: u64, dt: f32) -> FlightStats {
        let mut stats = FlightStats::default();
        for _ in 0..ticks {
            let outcome = self.step(controller, dt);
            stats.record(&outcome);
        }
        stats
    }
}

/// Build the level for `seed`
pub fn generate(seed: u64, settings: &CollisionSettings) -> Scenario {
    let mut rng = Pcg32::seed_from_u64(seed);

    let terrain = rolling_terrain(&mut rng);
    let mut world = World::load(terrain, settings.bounds(), settings.cell_size);

    let mut items = Vec::with_capacity(WALL_COUNT + PILLAR_COUNT + PAD_COUNT);
    for _ in 0..WALL_COUNT {
        let center = site(&mut rng);
        let ground = ground_at(&world, center);
        let length = rng.random_range(30.0..80.0);
        let thickness = rng.random_range(2.0..4.0);
        let height = rng.random_range(20.0..60.0);
        let half = if rng.random_bool(0.5) {
            Vec2::new(length, thickness) * 0.5
        } else {
            Vec2::new(thickness, length) * 0.5
        };
        items.push((ObstacleKind::Solid, standing_box(center, half, ground, height)));
    }
    for _ in 0..PILLAR_COUNT {
        let center = site(&mut rng);
        let ground = ground_at(&world, center);
        let half = Vec2::splat(rng.random_range(2.0..4.0));
        let height = rng.random_range(30.0..90.0);
        items.push((ObstacleKind::Solid, standing_box(center, half, ground, height)));
    }
    for _ in 0..PAD_COUNT {
        let center = site(&mut rng);
        let ground = ground_at(&world, center);
        let height = rng.random_range(8.0..25.0);
        items.push((
            ObstacleKind::LandingPad,
            standing_box(center, Vec2::splat(8.0), ground, height),
        ));
    }
    world.spawn_batch(items);

    let mut patrols = Vec::with_capacity(PATROL_COUNT);
    for _ in 0..PATROL_COUNT {
        let center = site(&mut rng);
        let ground = ground_at(&world, center);
        let height = rng.random_range(40.0..80.0);
        let aabb = standing_box(center, Vec2::splat(3.0), ground, height);
        let id = world.spawn(ObstacleKind::Solid, aabb);
        let axis = if rng.random_bool(0.5) { Vec3::X } else { Vec3::Y };
        patrols.push(Patrol {
            id,
            axis,
            amplitude: rng.random_range(15.0..35.0),
            period_ticks: rng.random_range(240..600),
        });
    }

    let start = Vec3::new(0.0, 0.0, ground_at(&world, Vec2::ZERO) + SPAWN_ALTITUDE);
    let agent = AgentState::new(start, settings.radius_xy, settings.radius_z);

    log::info!(
        "Scenario {}: {} obstacles ({} patrolling), start {:?}",
        seed,
        world.obstacles().len(),
        patrols.len(),
        start
    );

    Scenario {
        seed,
        world,
        patrols,
        agent,
        tick: 0,
    }
}

/// Sum of a few randomly phased sine ridges
fn rolling_terrain(rng: &mut Pcg32) -> HeightField {
    let waves: Vec<(f32, f32, f32, f32)> = (0..4)
        .map(|_| {
            (
                rng.random_range(2.0..8.0),
                rng.random_range(0.01..0.04),
                rng.random_range(0.01..0.04),
                rng.random_range(0.0..TAU),
            )
        })
        .collect();

    HeightField::from_fn(
        TERRAIN_SAMPLES,
        TERRAIN_SAMPLES,
        Vec2::splat(TERRAIN_ORIGIN),
        TERRAIN_SPACING,
        |x, y| {
            waves
                .iter()
                .map(|&(amp, fx, fy, phase)| amp * (x * fx + phase).sin() * (y * fy - phase).cos())
                .sum()
        },
    )
}

/// Random obstacle site inside the playable area, away from the spawn point
fn site(rng: &mut Pcg32) -> Vec2 {
    let mut p = Vec2::new(rng.random_range(-200.0..200.0), rng.random_range(-200.0..200.0));
    if p.length() < SPAWN_CLEARANCE {
        p.x += if p.x < 0.0 { -SPAWN_CLEARANCE } else { SPAWN_CLEARANCE };
    }
    p
}

fn ground_at(world: &World, p: Vec2) -> f32 {
    world.terrain().elevation_at(p.x, p.y).unwrap_or(0.0)
}

/// Box standing on the ground at `center`, `height` tall above it
fn standing_box(center: Vec2, half: Vec2, ground: f32, height: f32) -> Aabb {
    Aabb::new(
        Vec3::new(center.x - half.x, center.y - half.y, ground - FOOTING_DEPTH),
        Vec3::new(center.x + half.x, center.y + half.y, ground + height),
    )
}

/// Heading for the scripted flight: a slow weave plus a steady turn
pub fn scripted_yaw(tick: u64) -> f32 {
    let t = tick as f32;
    0.002 * t + 0.35 * (t * TAU / 900.0).sin()
}

/// Scripted control input: cruise, descend, skim the ground, climb
pub fn scripted_input(tick: u64) -> ControlInput {
    let strafe = 4.0 * (tick as f32 * TAU / 420.0).sin();
    let (forward, up) = match (tick / 300) % 4 {
        0 => (30.0, 0.0),
        1 => (25.0, -12.0),
        2 => (20.0, -3.0),
        _ => (25.0, 14.0),
    };
    ControlInput::new(strafe, forward, up)
}
