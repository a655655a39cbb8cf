//! Per-tick movement controller
//!
//! Composes the pieces for one agent each tick:
//! 1. Control input -> desired displacement (agent basis)
//! 2. Terrain correction (lift out of ground, slope projection)
//! 3. Sweep-and-slide against the world's obstacles
//! 4. Platform refinement: bounded-rate push up onto a supporting top, and a
//!    slower settle down onto a platform the agent hovers just above
//! 5. Battlespace clamp
//!
//! The only state carried between ticks is the grounded/landed flags, used
//! to report landing edges.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;
use super::agent::{AgentState, ControlInput};
use super::bounds::BoundsHit;
use super::mover::{Candidate, CandidateQuery, ContactInfo, MoveParams, MoveScratch, resolve_move};
use super::obstacle::ObstacleId;
use super::terrain_follow::{TerrainCorrection, TerrainFollowParams, correct_for_terrain};
use super::world::World;
use crate::consts::*;

/// Controller tuning (radii are taken from the agent each tick)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerParams {
    pub movement: MoveParams,
    pub terrain: TerrainFollowParams,
    /// Max upward push per second onto a supporting platform
    pub platform_push_rate: f32,
    /// Max downward settle per second onto a platform below
    pub platform_settle_rate: f32,
    /// Height above the platform rest position inside which settling applies
    pub platform_hover_band: f32,
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            movement: MoveParams::default(),
            terrain: TerrainFollowParams::default(),
            platform_push_rate: PLATFORM_PUSH_RATE,
            platform_settle_rate: PLATFORM_SETTLE_RATE,
            platform_hover_band: PLATFORM_HOVER_BAND,
        }
    }
}

/// Everything that happened to the agent in one tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub contact: ContactInfo,
    pub terrain: TerrainCorrection,
    /// Vertical platform refinement applied (positive = pushed up)
    pub platform_adjust: f32,
    /// Platform the agent is resting on, if any
    pub platform: Option<ObstacleId>,
    /// Resting on terrain or a flat platform top
    pub grounded: bool,
    /// Resting on a landing surface
    pub landed: bool,
    /// `landed` became true this tick
    pub just_landed: bool,
    pub bounds_hit: BoundsHit,
}

/// Platform refinement result
#[derive(Debug, Clone, Copy, Default)]
struct PlatformRefinement {
    adjust: f32,
    resting_on: Option<ObstacleId>,
}

pub struct MovementController {
    params: ControllerParams,
    scratch: MoveScratch,
    probe: Vec<Candidate>,
    grounded: bool,
    landed: bool,
}

impl MovementController {
    pub fn new(params: ControllerParams) -> Self {
        Self {
            params,
            scratch: MoveScratch::new(),
            probe: Vec::new(),
            grounded: false,
            landed: false,
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_landed(&self) -> bool {
        self.landed
    }

    /// Advance the agent by one tick
    pub fn step(
        &mut self,
        agent: &mut AgentState,
        input: &ControlInput,
        world: &mut World,
        dt: f32,
    ) -> MoveOutcome {
        if dt <= 0.0 {
            return MoveOutcome {
                grounded: self.grounded,
                landed: self.landed,
                ..Default::default()
            };
        }

        let movement = MoveParams {
            radius_xy: agent.radius_xy,
            radius_z: agent.radius_z,
            ..self.params.movement
        };
        let follow = TerrainFollowParams {
            radius_xy: agent.radius_xy,
            radius_z: agent.radius_z,
            ..self.params.terrain
        };

        let mut displacement = input.displacement(agent, dt);
        let climbing = displacement.z > 0.0;
        let terrain = correct_for_terrain(
            world.terrain(),
            &mut agent.position,
            &mut displacement,
            &follow,
        );

        agent.velocity = displacement / dt;
        let contact = resolve_move(
            &mut agent.position,
            &mut agent.velocity,
            dt,
            &movement,
            &mut world.query(),
            &mut self.scratch,
        );

        let refinement = self.refine_platform(agent, climbing, world, &contact, &movement, dt);

        let bounds_hit = world.bounds().clamp(&mut agent.position, &mut agent.velocity);
        if bounds_hit.any() {
            log::debug!("Battlespace clamp at {:?}: {:?}", agent.position, bounds_hit);
        }

        let platform = refinement.resting_on;
        let grounded = terrain.applied || platform.is_some();
        let landed = platform
            .and_then(|id| world.obstacle(id))
            .is_some_and(|o| o.is_support_surface());
        let just_landed = landed && !self.landed;

        if just_landed {
            log::debug!("Landed on {:?} at {:?}", platform, agent.position);
        } else if self.landed && !landed {
            log::debug!("Lifted off at {:?}", agent.position);
        }
        self.grounded = grounded;
        self.landed = landed;

        MoveOutcome {
            contact,
            terrain,
            platform_adjust: refinement.adjust,
            platform,
            grounded,
            landed,
            just_landed,
            bounds_hit,
        }
    }

    /// Close residual penetration against a supporting top, or settle onto a
    /// platform hovered just above.
    fn refine_platform(
        &mut self,
        agent: &mut AgentState,
        climbing: bool,
        world: &mut World,
        contact: &ContactInfo,
        movement: &MoveParams,
        dt: f32,
    ) -> PlatformRefinement {
        if contact.is_flat_support(movement.support_normal_z) {
            let Some((id, top)) = contact
                .support_obstacle
                .and_then(|id| world.obstacle(id).map(|o| (id, o.aabb.max.z)))
            else {
                return PlatformRefinement::default();
            };
            let gap = top + agent.radius_z + movement.epsilon - agent.position.z;
            let mut adjust = 0.0;
            if gap > 0.0 {
                adjust = gap.min(self.params.platform_push_rate * dt);
                agent.position.z += adjust;
            }
            return PlatformRefinement {
                adjust,
                resting_on: Some(id),
            };
        }

        // Climbing away: don't pull the agent back down
        if climbing {
            return PlatformRefinement::default();
        }

        let band = self.params.platform_hover_band;
        let bottom = agent.position.z - agent.radius_z;
        let footprint = Aabb::new(
            Vec3::new(
                agent.position.x - agent.radius_xy,
                agent.position.y - agent.radius_xy,
                bottom - band - movement.epsilon,
            ),
            Vec3::new(
                agent.position.x + agent.radius_xy,
                agent.position.y + agent.radius_xy,
                bottom,
            ),
        );
        self.probe.clear();
        world.query().query_volume(&footprint, &mut self.probe);

        let mut best: Option<(f32, ObstacleId)> = None;
        for candidate in &self.probe {
            let b = candidate.aabb;
            let under = b.min.x < footprint.max.x
                && b.max.x > footprint.min.x
                && b.min.y < footprint.max.y
                && b.max.y > footprint.min.y;
            if !under {
                continue;
            }
            let gap = agent.position.z - (b.max.z + agent.radius_z + movement.epsilon);
            if gap < -movement.top_tolerance || gap > band {
                continue;
            }
            if best.is_none_or(|(top, _)| b.max.z > top) {
                best = Some((b.max.z, candidate.id));
            }
        }

        let Some((top, id)) = best else {
            return PlatformRefinement::default();
        };
        let gap = agent.position.z - (top + agent.radius_z + movement.epsilon);
        let mut adjust = 0.0;
        if gap > 0.0 {
            adjust = -gap.min(self.params.platform_settle_rate * dt);
            agent.position.z += adjust;
        }
        PlatformRefinement {
            adjust,
            // Still hovering above the resting tolerance
            resting_on: (gap + adjust <= movement.epsilon).then_some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::bounds::BattlespaceBounds;
    use crate::sim::obstacle::ObstacleKind;
    use crate::sim::terrain::HeightField;
    use glam::{Quat, Vec2};
    use std::f32::consts::FRAC_PI_2;

    fn flat_world(ground: f32) -> World {
        let terrain = HeightField::flat(32, 32, Vec2::splat(-160.0), 10.0, ground);
        let bounds = BattlespaceBounds::new(
            Vec3::new(-100.0, -100.0, -50.0),
            Vec3::new(100.0, 100.0, 100.0),
        );
        World::load(terrain, bounds, 20.0)
    }

    fn pad(world: &mut World, top: f32) -> ObstacleId {
        world.spawn(
            ObstacleKind::LandingPad,
            Aabb::new(Vec3::new(-10.0, -10.0, top - 1.0), Vec3::new(10.0, 10.0, top)),
        )
    }

    fn controller() -> MovementController {
        MovementController::new(ControllerParams::default())
    }

    #[test]
    fn test_descends_and_lands_on_pad() {
        let mut world = flat_world(-40.0);
        let pad_id = pad(&mut world, 5.0);
        let mut agent = AgentState::new(Vec3::new(0.0, 0.0, 8.0), 1.5, 0.5);
        let mut ctl = controller();
        let descend = ControlInput::new(0.0, 0.0, -6.0);

        let mut landed_ticks = Vec::new();
        for tick in 0..120 {
            let out = ctl.step(&mut agent, &descend, &mut world, SIM_DT);
            if out.just_landed {
                landed_ticks.push(tick);
                assert_eq!(out.platform, Some(pad_id));
            }
        }

        assert_eq!(landed_ticks.len(), 1);
        assert!(ctl.is_landed());
        assert!(ctl.is_grounded());
        assert!((agent.position.z - (5.5 + DEFAULT_EPSILON)).abs() < 1e-3);
    }

    #[test]
    fn test_hovering_just_above_pad_settles() {
        let mut world = flat_world(-40.0);
        pad(&mut world, 5.0);
        let rest = 5.5 + DEFAULT_EPSILON;
        let mut agent = AgentState::new(Vec3::new(0.0, 0.0, rest + 0.1), 1.5, 0.5);
        let mut ctl = controller();

        let first = ctl.step(&mut agent, &ControlInput::default(), &mut world, SIM_DT);
        assert!(first.platform_adjust < 0.0);
        assert!(-first.platform_adjust <= PLATFORM_SETTLE_RATE * SIM_DT + 1e-6);
        assert!(!first.landed);

        for _ in 0..30 {
            ctl.step(&mut agent, &ControlInput::default(), &mut world, SIM_DT);
        }
        assert!((agent.position.z - rest).abs() < 1e-3);
        assert!(ctl.is_landed());
    }

    #[test]
    fn test_climbing_does_not_settle() {
        let mut world = flat_world(-40.0);
        pad(&mut world, 5.0);
        let start = 5.5 + DEFAULT_EPSILON + 0.1;
        let mut agent = AgentState::new(Vec3::new(0.0, 0.0, start), 1.5, 0.5);
        let mut ctl = controller();

        let out = ctl.step(&mut agent, &ControlInput::new(0.0, 0.0, 3.0), &mut world, SIM_DT);
        assert_eq!(out.platform_adjust, 0.0);
        assert!(agent.position.z > start);
        assert!(!out.landed);
    }

    #[test]
    fn test_pitched_climb_does_not_settle() {
        let mut world = flat_world(-40.0);
        pad(&mut world, 5.0);
        let start = 5.5 + DEFAULT_EPSILON + 0.1;
        // Nose pitched straight up: local forward is world +Z
        let mut agent = AgentState::new(Vec3::new(0.0, 0.0, start), 1.5, 0.5);
        agent.orientation = Quat::from_rotation_x(FRAC_PI_2);
        let mut ctl = controller();

        let out = ctl.step(&mut agent, &ControlInput::new(0.0, 3.0, 0.0), &mut world, SIM_DT);

        assert_eq!(out.platform_adjust, 0.0);
        assert!((agent.position.z - (start + 3.0 * SIM_DT)).abs() < 1e-4);
    }

    #[test]
    fn test_pitched_level_flight_settles() {
        let mut world = flat_world(-40.0);
        pad(&mut world, 5.0);
        let start = 5.5 + DEFAULT_EPSILON + 0.1;
        // Local up points along world -Y and the slight reverse thrust
        // descends, so a positive local z is not a climb
        let mut agent = AgentState::new(Vec3::new(0.0, 0.0, start), 1.5, 0.5);
        agent.orientation = Quat::from_rotation_x(FRAC_PI_2);
        let mut ctl = controller();

        let out = ctl.step(&mut agent, &ControlInput::new(0.0, -0.5, 3.0), &mut world, SIM_DT);

        assert!(out.platform_adjust < 0.0);
        assert!(agent.position.z < start);
    }

    #[test]
    fn test_terrain_contact_grounds_agent() {
        let mut world = flat_world(0.0);
        let mut agent = AgentState::new(Vec3::new(0.0, 0.0, 0.3), 1.5, 0.5);
        let mut ctl = controller();

        let out = ctl.step(&mut agent, &ControlInput::new(0.0, 5.0, 0.0), &mut world, SIM_DT);

        assert!(out.terrain.applied);
        assert!(out.grounded);
        assert!(!out.landed);
        assert!(agent.position.z >= 0.5 - 1e-5);
    }

    #[test]
    fn test_wall_blocks_forward_flight() {
        let mut world = flat_world(-40.0);
        world.spawn(
            ObstacleKind::Solid,
            Aabb::new(Vec3::new(-50.0, 20.0, -40.0), Vec3::new(50.0, 22.0, 60.0)),
        );
        let mut agent = AgentState::new(Vec3::new(0.0, 0.0, 10.0), 1.5, 0.5);
        let mut ctl = controller();
        let forward = ControlInput::new(0.0, 40.0, 0.0);

        let mut blocked = false;
        for _ in 0..120 {
            let out = ctl.step(&mut agent, &forward, &mut world, SIM_DT);
            blocked |= out.contact.collided;
            assert!(agent.position.y <= 20.0 - 1.5);
        }
        assert!(blocked);
    }

    #[test]
    fn test_bounds_clamp_reported() {
        let mut world = flat_world(-40.0);
        let mut agent = AgentState::new(Vec3::new(99.5, 0.0, 10.0), 1.5, 0.5);
        let mut ctl = controller();

        let out = ctl.step(&mut agent, &ControlInput::new(60.0, 0.0, 0.0), &mut world, SIM_DT);
        assert!(out.bounds_hit.x);
        assert_eq!(agent.position.x, 100.0);
        assert_eq!(agent.velocity.x, 0.0);
    }

    #[test]
    fn test_zero_dt_keeps_flags() {
        let mut world = flat_world(-40.0);
        let mut agent = AgentState::new(Vec3::new(0.0, 0.0, 10.0), 1.5, 0.5);
        let mut ctl = controller();
        let before = agent;
        let out = ctl.step(&mut agent, &ControlInput::new(1.0, 1.0, 1.0), &mut world, 0.0);
        assert_eq!(agent, before);
        assert!(!out.contact.collided);
    }
}
