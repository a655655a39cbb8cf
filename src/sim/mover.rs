//! Sweep-and-slide mover
//!
//! Moves one agent by `velocity * dt` without ever leaving it inside an
//! active obstacle. The agent is an axis-aligned volume with half-extents
//! `(radius_xy, radius_xy, radius_z)`; every obstacle box is grown by those
//! half-extents so the agent can be swept as a point.
//!
//! Each call runs two phases:
//! 1. Static depenetration: one pass over obstacles overlapping the agent's
//!    current volume, pushing the agent out along the shallowest exit axis.
//! 2. Swept resolution: up to `max_iters` slab tests along the remaining
//!    displacement. On the earliest hit the into-surface velocity is removed
//!    (slide), the agent is advanced to the hit and backed off by `epsilon`,
//!    and the sweep continues with the slid velocity.
//!
//! Near-vertical normals the agent was moving into are reported as support.
//! Horizontal-only moves sweep the full box but report normals with Z
//! suppressed; a hit on a top or bottom face stops the move there.
//! Nothing persists between calls; scratch storage is owned by the caller.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;
use super::obstacle::ObstacleId;
use crate::{clip_into_surface, horizontal};
use crate::consts::*;

/// Delta components smaller than this are treated as parallel to a slab
const PARALLEL_EPS: f32 = 1e-8;

/// An obstacle handed to the mover by the query layer.
///
/// The query layer must already have dropped inactive obstacles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: ObstacleId,
    pub aabb: Aabb,
}

/// Source of candidate obstacles for a query volume
pub trait CandidateQuery {
    /// Append candidates that may overlap `volume`
    fn query_volume(&mut self, volume: &Aabb, out: &mut Vec<Candidate>);

    /// Append candidates that may touch the segment `p0 -> p1` grown by `radius`
    fn query_segment(&mut self, p0: Vec3, p1: Vec3, radius: f32, out: &mut Vec<Candidate>) {
        self.query_volume(&Aabb::from_segment(p0, p1, radius), out);
    }
}

impl<F> CandidateQuery for F
where
    F: FnMut(&Aabb, &mut Vec<Candidate>),
{
    fn query_volume(&mut self, volume: &Aabb, out: &mut Vec<Candidate>) {
        self(volume, out)
    }
}

/// Brute-force query over a fixed candidate list
#[derive(Debug, Clone, Copy)]
pub struct SliceQuery<'a>(pub &'a [Candidate]);

impl CandidateQuery for SliceQuery<'_> {
    fn query_volume(&mut self, volume: &Aabb, out: &mut Vec<Candidate>) {
        out.extend(self.0.iter().filter(|c| c.aabb.overlaps(volume)));
    }
}

/// Tuning for one move call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveParams {
    /// Horizontal half-extent of the agent
    pub radius_xy: f32,
    /// Vertical half-extent of the agent
    pub radius_z: f32,
    /// Skin distance kept between agent and surfaces
    pub epsilon: f32,
    /// Suppress Z in contact normals (vertical motion is governed by
    /// terrain following)
    pub horizontal_only: bool,
    pub max_iters: u32,
    /// Minimum fraction consumed per hit
    pub min_t_floor: f32,
    /// Normals with z above this count as support
    pub support_normal_z: f32,
    /// Band below an obstacle's true top in which only +Z exits are allowed
    pub top_tolerance: f32,
}

impl Default for MoveParams {
    fn default() -> Self {
        Self {
            radius_xy: AGENT_RADIUS_XY,
            radius_z: AGENT_RADIUS_Z,
            epsilon: DEFAULT_EPSILON,
            horizontal_only: false,
            max_iters: DEFAULT_MAX_ITERS,
            min_t_floor: MIN_T_FLOOR,
            support_normal_z: SUPPORT_NORMAL_Z,
            top_tolerance: TOP_TOLERANCE,
        }
    }
}

impl MoveParams {
    pub fn new(radius_xy: f32, radius_z: f32) -> Self {
        Self {
            radius_xy,
            radius_z,
            ..Default::default()
        }
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.radius_xy, self.radius_xy, self.radius_z)
    }

    #[inline]
    fn query_radius(&self) -> f32 {
        self.radius_xy.max(self.radius_z)
    }

    /// Contact normal for a hit face. Horizontal-only moves flatten it, so
    /// top and bottom faces come back as zero.
    #[inline]
    fn contact_normal(&self, face: Vec3) -> Vec3 {
        if self.horizontal_only {
            horizontal(face).normalize_or_zero()
        } else {
            face
        }
    }
}

/// A single resolved contact
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub obstacle: ObstacleId,
    /// Outward face normal
    pub normal: Vec3,
    /// Hit fraction along the displacement being swept (0 for depenetration)
    pub t: f32,
    /// `velocity · normal` before the slide step
    pub approach_speed: f32,
}

/// Result of one move call. Recomputed from scratch every call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub collided: bool,
    /// Normal of the last resolved contact
    pub normal: Vec3,
    pub obstacle: Option<ObstacleId>,
    pub has_support: bool,
    pub support_normal: Vec3,
    pub support_obstacle: Option<ObstacleId>,
}

impl ContactInfo {
    /// Resting on a flat surface (support normal steeper than `min_z`)
    pub fn is_flat_support(&self, min_z: f32) -> bool {
        self.has_support && self.support_normal.z > min_z
    }
}

/// Caller-owned buffers reused across move calls
#[derive(Debug, Clone, Default)]
pub struct MoveScratch {
    candidates: Vec<Candidate>,
    contacts: Vec<Contact>,
}

impl MoveScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every contact resolved by the most recent call, in order
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }
}

/// Move the agent by `velocity * dt`, resolving collisions against the
/// candidates `query` returns.
///
/// `position` and `velocity` are updated in place. `dt <= 0` is a no-op.
pub fn resolve_move<Q>(
    position: &mut Vec3,
    velocity: &mut Vec3,
    dt: f32,
    params: &MoveParams,
    query: &mut Q,
    scratch: &mut MoveScratch,
) -> ContactInfo
where
    Q: CandidateQuery + ?Sized,
{
    let mut info = ContactInfo::default();
    scratch.contacts.clear();
    if dt <= 0.0 {
        return info;
    }

    depenetrate(position, velocity, params, query, scratch, &mut info);
    sweep(position, velocity, dt, params, query, scratch, &mut info);
    info
}

/// One static pass pushing the agent out of every obstacle it starts inside
fn depenetrate<Q>(
    position: &mut Vec3,
    velocity: &mut Vec3,
    params: &MoveParams,
    query: &mut Q,
    scratch: &mut MoveScratch,
    info: &mut ContactInfo,
) where
    Q: CandidateQuery + ?Sized,
{
    let agent = Aabb::from_center_half_extents(*position, params.half_extents());
    scratch.candidates.clear();
    query.query_volume(&agent, &mut scratch.candidates);

    for i in 0..scratch.candidates.len() {
        let candidate = scratch.candidates[i];
        let inflated = candidate.aabb.inflated(params.radius_xy, params.radius_z);
        if !inflated.contains_strict(*position) {
            continue;
        }
        let (face, depth) = exit_axis(*position, &inflated, candidate.aabb.max.z, params);
        *position += face * (depth + params.epsilon);
        log::trace!(
            "depenetrate {:?}: pushed {:.4} along {:?}",
            candidate.id,
            depth + params.epsilon,
            face
        );
        let normal = params.contact_normal(face);
        apply_contact(velocity, normal, candidate.id, 0.0, params, info, &mut scratch.contacts);
    }
}

/// Iterative swept resolution over the remaining displacement
fn sweep<Q>(
    position: &mut Vec3,
    velocity: &mut Vec3,
    dt: f32,
    params: &MoveParams,
    query: &mut Q,
    scratch: &mut MoveScratch,
    info: &mut ContactInfo,
) where
    Q: CandidateQuery + ?Sized,
{
    let mut remaining = 1.0_f32;

    for iter in 0..params.max_iters {
        if remaining <= NEGLIGIBLE_FRACTION {
            break;
        }

        let start = *position;
        let delta = *velocity * dt * remaining;
        let end = start + delta;

        // Motion this slow stays inside the skin; apply it unqueried
        if velocity.length_squared() <= NEGLIGIBLE_SPEED_SQ {
            *position = end;
            break;
        }

        scratch.candidates.clear();
        query.query_segment(start, end, params.query_radius(), &mut scratch.candidates);

        let mut best: Option<(f32, Vec3, ObstacleId)> = None;
        for candidate in &scratch.candidates {
            // Skip the top we are resting on while above it. Slid velocity
            // has no Z left, so this only filters rounding re-hits.
            if info.support_obstacle == Some(candidate.id) && start.z > candidate.aabb.max.z {
                continue;
            }
            let inflated = candidate.aabb.inflated(params.radius_xy, params.radius_z);
            let hit = if inflated.contains_strict(start) {
                let (face, _) = exit_axis(start, &inflated, candidate.aabb.max.z, params);
                // Already separating along the exit axis
                (delta.dot(face) < 0.0).then_some((0.0, face))
            } else {
                sweep_aabb(start, delta, &inflated)
            };
            if let Some((t, face)) = hit {
                if best.is_none_or(|(best_t, _, _)| t < best_t) {
                    best = Some((t, face, candidate.id));
                }
            }
        }

        let Some((t, face, id)) = best else {
            *position = end;
            log::trace!("sweep iter {}: clear, moved {:?}", iter, delta);
            break;
        };

        *position = start + delta * t + face * params.epsilon;
        log::trace!(
            "sweep iter {}: {} candidates, hit {:?} at t={:.4} n={:?}",
            iter,
            scratch.candidates.len(),
            id,
            t,
            face
        );
        let normal = params.contact_normal(face);
        apply_contact(velocity, normal, id, t, params, info, &mut scratch.contacts);
        if normal == Vec3::ZERO {
            // Top or bottom face with Z suppressed: stop without sliding
            *velocity = Vec3::ZERO;
            break;
        }
        remaining *= 1.0 - t.max(params.min_t_floor);
    }
}

/// Slide the velocity along `normal` and fold the contact into `info`
fn apply_contact(
    velocity: &mut Vec3,
    normal: Vec3,
    obstacle: ObstacleId,
    t: f32,
    params: &MoveParams,
    info: &mut ContactInfo,
    contacts: &mut Vec<Contact>,
) {
    let approach_speed = velocity.dot(normal);
    *velocity = clip_into_surface(*velocity, normal);

    info.collided = true;
    info.normal = normal;
    info.obstacle = Some(obstacle);
    // Later contacts are closer to the final resting state
    if normal.z > params.support_normal_z && approach_speed < 0.0 {
        info.has_support = true;
        info.support_normal = normal;
        info.support_obstacle = Some(obstacle);
    }

    contacts.push(Contact {
        obstacle,
        normal,
        t,
        approach_speed,
    });
}

/// Shallowest exit face for a point inside `inflated`.
///
/// At or above the obstacle's true top (minus the tolerance band) only +Z is
/// eligible, so agents on a platform edge are lifted instead of shoved off.
fn exit_axis(point: Vec3, inflated: &Aabb, true_top: f32, params: &MoveParams) -> (Vec3, f32) {
    if point.z >= true_top - params.top_tolerance {
        return (Vec3::Z, inflated.max.z - point.z);
    }

    let axes = [
        (Vec3::NEG_X, point.x - inflated.min.x),
        (Vec3::X, inflated.max.x - point.x),
        (Vec3::NEG_Y, point.y - inflated.min.y),
        (Vec3::Y, inflated.max.y - point.y),
        (Vec3::NEG_Z, point.z - inflated.min.z),
        (Vec3::Z, inflated.max.z - point.z),
    ];

    let mut best = axes[0];
    for &axis in &axes[1..] {
        if axis.1 < best.1 {
            best = axis;
        }
    }
    best
}

/// Slab test of the segment `origin -> origin + delta` against `inflated`.
///
/// Returns the entry fraction in `[0, 1]` and the outward normal of the
/// entered face. The origin must not be strictly inside the box. Grazing
/// contacts (entry equals exit) and motion along a face do not count.
pub fn sweep_aabb(origin: Vec3, delta: Vec3, inflated: &Aabb) -> Option<(f32, Vec3)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let o = origin[axis];
        let d = delta[axis];
        let lo = inflated.min[axis];
        let hi = inflated.max[axis];

        if d.abs() < PARALLEL_EPS {
            if o <= lo || o >= hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let (near, far, sign) = if d > 0.0 {
            ((lo - o) * inv, (hi - o) * inv, -1.0)
        } else {
            ((hi - o) * inv, (lo - o) * inv, 1.0)
        };

        if near > t_enter {
            t_enter = near;
            normal = Vec3::ZERO;
            normal[axis] = sign;
        }
        t_exit = t_exit.min(far);
        if t_enter >= t_exit {
            return None;
        }
    }

    if t_enter < 0.0 || t_enter > 1.0 || t_exit <= 0.0 {
        return None;
    }
    Some((t_enter, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = DEFAULT_EPSILON;

    fn candidate(id: u32, min: Vec3, max: Vec3) -> Candidate {
        Candidate {
            id: ObstacleId(id),
            aabb: Aabb::new(min, max),
        }
    }

    fn run(
        position: &mut Vec3,
        velocity: &mut Vec3,
        dt: f32,
        params: &MoveParams,
        obstacles: &[Candidate],
    ) -> (ContactInfo, Vec<Contact>) {
        let mut scratch = MoveScratch::new();
        let info = resolve_move(
            position,
            velocity,
            dt,
            params,
            &mut SliceQuery(obstacles),
            &mut scratch,
        );
        (info, scratch.contacts().to_vec())
    }

    #[test]
    fn test_sweep_aabb_hits_near_face() {
        let b = Aabb::new(Vec3::new(5.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        let hit = sweep_aabb(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), &b);
        assert_eq!(hit, Some((0.5, Vec3::NEG_X)));
    }

    #[test]
    fn test_sweep_aabb_misses_short_and_parallel() {
        let b = Aabb::new(Vec3::new(5.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        assert!(sweep_aabb(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), &b).is_none());
        // Sliding along the top face
        let on_top = Vec3::new(4.0, 0.0, 1.0);
        assert!(sweep_aabb(on_top, Vec3::new(4.0, 0.0, 0.0), &b).is_none());
        // Moving away
        assert!(sweep_aabb(Vec3::ZERO, Vec3::new(-10.0, 0.0, 0.0), &b).is_none());
    }

    #[test]
    fn test_sweep_aabb_exits_before_entering() {
        // Climbs over the top before reaching the near X face
        let b = Aabb::new(Vec3::new(4.0, -50.0, -21.0), Vec3::new(7.0, 50.0, 10.0));
        let hit = sweep_aabb(Vec3::new(0.0, 0.0, 5.0), Vec3::new(10.0, 0.0, 20.0), &b);
        assert!(hit.is_none());
    }

    #[test]
    fn test_dt_zero_is_noop() {
        let mut pos = Vec3::new(1.0, 2.0, 3.0);
        let mut vel = Vec3::new(5.0, 0.0, 0.0);
        let wall = [candidate(1, Vec3::ZERO, Vec3::splat(10.0))];
        let (info, contacts) = run(&mut pos, &mut vel, 0.0, &MoveParams::default(), &wall);
        assert_eq!(pos, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(vel, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(info, ContactInfo::default());
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_lands_on_platform() {
        let mut pos = Vec3::new(0.0, 0.0, 10.0);
        let mut vel = Vec3::new(0.0, 0.0, -50.0);
        let params = MoveParams::new(1.0, 0.0);
        let platform = [candidate(
            1,
            Vec3::new(-10.0, -10.0, 0.0),
            Vec3::new(10.0, 10.0, 9.0),
        )];

        let (info, _) = run(&mut pos, &mut vel, 1.0, &params, &platform);

        assert!(info.collided);
        assert!(info.has_support);
        assert_eq!(info.support_normal, Vec3::Z);
        assert_eq!(info.support_obstacle, Some(ObstacleId(1)));
        assert!((pos.z - (9.0 + EPS)).abs() < 1e-4);
        assert!(vel.length() < 1e-6);
    }

    #[test]
    fn test_wall_slide_preserves_tangential_speed() {
        let mut pos = Vec3::ZERO;
        let mut vel = Vec3::new(10.0, 5.0, 0.0);
        let params = MoveParams::new(1.0, 1.0);
        let wall = [candidate(
            1,
            Vec3::new(5.0, -100.0, -10.0),
            Vec3::new(6.0, 100.0, 10.0),
        )];

        let (info, contacts) = run(&mut pos, &mut vel, 1.0, &params, &wall);

        assert!(info.collided);
        assert!(!info.has_support);
        assert_eq!(info.normal, Vec3::NEG_X);
        assert_eq!(contacts.len(), 1);
        assert!((vel - Vec3::new(0.0, 5.0, 0.0)).length() < 1e-5);
        assert!(pos.x <= 4.0 - EPS + 1e-4);
        // Hit at t=0.4, then slid the remaining 0.6 of the frame along Y
        assert!((pos.y - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_fast_agent_does_not_tunnel_thin_wall() {
        let mut pos = Vec3::ZERO;
        let mut vel = Vec3::new(5000.0, 0.0, 0.0);
        let params = MoveParams::new(0.5, 0.5);
        let wall = [candidate(
            1,
            Vec3::new(50.0, -10.0, -10.0),
            Vec3::new(50.1, 10.0, 10.0),
        )];

        run(&mut pos, &mut vel, 1.0 / 60.0, &params, &wall);

        assert!(pos.x < 49.5);
        assert!(vel.x.abs() < 1e-4);
    }

    #[test]
    fn test_corner_stops_both_components() {
        let mut pos = Vec3::ZERO;
        let mut vel = Vec3::new(10.0, 10.0, 0.0);
        let params = MoveParams::new(1.0, 1.0);
        let walls = [
            candidate(1, Vec3::new(5.0, -20.0, -5.0), Vec3::new(6.0, 20.0, 5.0)),
            candidate(2, Vec3::new(-20.0, 5.0, -5.0), Vec3::new(20.0, 6.0, 5.0)),
        ];

        let (_, contacts) = run(&mut pos, &mut vel, 1.0, &params, &walls);

        assert!(vel.dot(Vec3::NEG_X) >= -EPS);
        assert!(vel.dot(Vec3::NEG_Y) >= -EPS);
        assert!(pos.x <= 4.0 && pos.y <= 4.0);
        for c in &contacts {
            assert!(vel.dot(c.normal) >= -EPS);
        }
    }

    #[test]
    fn test_corner_with_open_edge_slides_along_it() {
        // Wall blocks X, floor below; Y is free
        let mut pos = Vec3::new(0.0, 0.0, 2.0);
        let mut vel = Vec3::new(10.0, 4.0, -10.0);
        let params = MoveParams::new(1.0, 1.0);
        let obstacles = [
            candidate(1, Vec3::new(5.0, -50.0, -5.0), Vec3::new(6.0, 50.0, 20.0)),
            candidate(2, Vec3::new(-50.0, -50.0, -5.0), Vec3::new(50.0, 50.0, 0.0)),
        ];

        let (info, _) = run(&mut pos, &mut vel, 1.0, &params, &obstacles);

        assert!(vel.x.abs() < 1e-5 && vel.z.abs() < 1e-5);
        assert!((vel.y - 4.0).abs() < 1e-5);
        assert!(info.has_support);
    }

    #[test]
    fn test_depenetrates_along_shallowest_axis() {
        // Agent center 0.5 inside the +X face of the inflated box
        let params = MoveParams::new(1.0, 1.0);
        let block = candidate(1, Vec3::new(-10.0, -10.0, -10.0), Vec3::new(0.0, 10.0, 10.0));
        let mut pos = Vec3::new(0.5, 0.0, 0.0);
        let mut vel = Vec3::ZERO;

        let (info, contacts) = run(&mut pos, &mut vel, 1.0 / 60.0, &params, &[block]);

        assert!(info.collided);
        assert_eq!(info.normal, Vec3::X);
        assert!((pos.x - (1.0 + EPS)).abs() < 1e-5);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].t, 0.0);

        let agent = Aabb::from_center_half_extents(pos, params.half_extents());
        assert!(agent.penetration_depth(&block.aabb) <= EPS);
    }

    #[test]
    fn test_depenetration_on_platform_top_only_lifts() {
        // Near the edge of a platform: lateral exit would be shallower
        let params = MoveParams::new(1.0, 0.5);
        let pad = candidate(1, Vec3::new(-10.0, -10.0, 0.0), Vec3::new(10.0, 10.0, 5.0));
        let mut pos = Vec3::new(10.8, 0.0, 5.2);
        let mut vel = Vec3::ZERO;

        let (info, _) = run(&mut pos, &mut vel, 1.0 / 60.0, &params, &[pad]);

        assert_eq!(info.normal, Vec3::Z);
        assert!((pos.x - 10.8).abs() < 1e-6);
        assert!((pos.z - (5.5 + EPS)).abs() < 1e-5);
    }

    #[test]
    fn test_resting_agent_reports_support_once_per_call() {
        let params = MoveParams::new(1.0, 0.5);
        let pad = candidate(1, Vec3::new(-50.0, -50.0, 0.0), Vec3::new(50.0, 50.0, 5.0));
        let mut pos = Vec3::new(0.0, 0.0, 5.5 + EPS);
        let mut vel = Vec3::new(6.0, 0.0, -9.8);

        let (info, contacts) = run(&mut pos, &mut vel, 1.0 / 30.0, &params, &[pad]);

        assert!(info.has_support);
        assert_eq!(contacts.len(), 1);
        assert!((vel - Vec3::new(6.0, 0.0, 0.0)).length() < 1e-5);
        assert!(pos.z >= 5.5);
        assert!(pos.x > 0.19);
    }

    #[test]
    fn test_horizontal_only_keeps_vertical_velocity() {
        let mut params = MoveParams::new(1.0, 1.0);
        params.horizontal_only = true;
        let wall = [candidate(
            1,
            Vec3::new(5.0, -20.0, -20.0),
            Vec3::new(6.0, 20.0, 20.0),
        )];
        let mut pos = Vec3::ZERO;
        let mut vel = Vec3::new(10.0, 0.0, -3.0);

        let (info, _) = run(&mut pos, &mut vel, 1.0, &params, &wall);

        assert_eq!(info.normal, Vec3::NEG_X);
        assert_eq!(info.normal.z, 0.0);
        assert!((vel.z + 3.0).abs() < 1e-6);
        assert!(!info.has_support);
    }

    #[test]
    fn test_horizontal_only_stops_on_top_face() {
        let mut params = MoveParams::new(1.0, 0.5);
        params.horizontal_only = true;
        let block = candidate(1, Vec3::new(-5.0, -5.0, 0.0), Vec3::new(5.0, 5.0, 9.0));
        let mut pos = Vec3::new(0.0, 0.0, 12.0);
        let mut vel = Vec3::new(0.0, 0.0, -6.0);

        let (info, contacts) = run(&mut pos, &mut vel, 1.0, &params, &[block]);

        assert!(info.collided);
        assert_eq!(info.normal, Vec3::ZERO);
        assert!(!info.has_support);
        assert_eq!(contacts.len(), 1);
        assert_eq!(vel, Vec3::ZERO);
        assert!((pos.z - (9.5 + EPS)).abs() < 1e-4);
        assert!(!block.aabb.inflated(1.0, 0.5).contains_strict(pos));
    }

    #[test]
    fn test_horizontal_only_clears_wall_top() {
        let mut params = MoveParams::new(1.0, 1.0);
        params.horizontal_only = true;
        let wall = [candidate(
            1,
            Vec3::new(5.0, -50.0, -20.0),
            Vec3::new(6.0, 50.0, 9.0),
        )];
        let mut pos = Vec3::new(0.0, 0.0, 5.0);
        let mut vel = Vec3::new(10.0, 0.0, 20.0);

        let (info, _) = run(&mut pos, &mut vel, 1.0, &params, &wall);

        assert!(!info.collided);
        assert!((pos - Vec3::new(10.0, 0.0, 25.0)).length() < 1e-4);
        assert_eq!(vel, Vec3::new(10.0, 0.0, 20.0));
    }

    #[test]
    fn test_horizontal_only_lifts_off_platform_edge() {
        let mut params = MoveParams::new(1.0, 0.5);
        params.horizontal_only = true;
        let pad = candidate(1, Vec3::new(-10.0, -10.0, 0.0), Vec3::new(10.0, 10.0, 5.0));
        let mut pos = Vec3::new(10.8, 0.0, 5.2);
        let mut vel = Vec3::ZERO;

        let (info, _) = run(&mut pos, &mut vel, 1.0 / 60.0, &params, &[pad]);

        assert!(info.collided);
        assert_eq!(info.normal, Vec3::ZERO);
        assert_eq!(pos.x, 10.8);
        assert!((pos.z - (5.5 + EPS)).abs() < 1e-5);
    }

    #[test]
    fn test_depenetrates_out_of_floor_and_wall() {
        let params = MoveParams::new(1.0, 1.0);
        let floor = candidate(1, Vec3::new(-20.0, -20.0, -10.0), Vec3::new(20.0, 20.0, 0.0));
        let wall = candidate(2, Vec3::new(2.0, -20.0, -10.0), Vec3::new(4.0, 20.0, 10.0));
        let mut pos = Vec3::new(1.5, 0.0, 0.6);
        let mut vel = Vec3::ZERO;

        let (_, contacts) = run(&mut pos, &mut vel, 1.0 / 60.0, &params, &[floor, wall]);

        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].normal, Vec3::Z);
        assert_eq!(contacts[1].normal, Vec3::NEG_X);
        let agent = Aabb::from_center_half_extents(pos, params.half_extents());
        assert!(agent.penetration_depth(&floor.aabb) <= EPS);
        assert!(agent.penetration_depth(&wall.aabb) <= EPS);
    }

    #[test]
    fn test_slow_free_flight_still_moves() {
        let mut pos = Vec3::ZERO;
        let mut vel = Vec3::new(5e-5, 0.0, 0.0);

        let (info, _) = run(&mut pos, &mut vel, 1.0, &MoveParams::default(), &[]);

        assert!(!info.collided);
        assert_eq!(pos, Vec3::new(5e-5, 0.0, 0.0));
    }

    #[test]
    fn test_iterations_are_bounded() {
        let mut params = MoveParams::new(0.5, 0.5);
        params.max_iters = 2;
        // Narrow zig-zag channel
        let walls: Vec<Candidate> = (0..10)
            .map(|i| {
                let x = 3.0 + i as f32 * 3.0;
                candidate(i + 1, Vec3::new(x, -0.2, -5.0), Vec3::new(x + 0.5, 0.2, 5.0))
            })
            .collect();
        let mut pos = Vec3::ZERO;
        let mut vel = Vec3::new(100.0, 0.0, 0.0);

        let (_, contacts) = run(&mut pos, &mut vel, 1.0, &params, &walls);
        assert!(contacts.len() <= 2);
    }

    proptest! {
        #[test]
        fn prop_no_candidates_moves_exactly(
            px in -100.0f32..100.0, py in -100.0f32..100.0, pz in -100.0f32..100.0,
            vx in -50.0f32..50.0, vy in -50.0f32..50.0, vz in -50.0f32..50.0,
            dt in 0.001f32..0.5,
        ) {
            let start = Vec3::new(px, py, pz);
            let v = Vec3::new(vx, vy, vz);
            let mut pos = start;
            let mut vel = v;
            let (info, _) = run(&mut pos, &mut vel, dt, &MoveParams::default(), &[]);
            prop_assert!(!info.collided);
            prop_assert_eq!(vel, v);
            prop_assert_eq!(pos, start + v * dt);
        }

        #[test]
        fn prop_no_residual_into_surface_velocity(
            boxes in prop::collection::vec(
                (-20.0f32..20.0, -20.0f32..20.0, -5.0f32..5.0, 0.5f32..8.0, 0.5f32..8.0, 0.5f32..8.0),
                1..8,
            ),
            vx in -80.0f32..80.0, vy in -80.0f32..80.0, vz in -80.0f32..80.0,
        ) {
            let obstacles: Vec<Candidate> = boxes
                .iter()
                .enumerate()
                .map(|(i, &(x, y, z, w, d, h))| {
                    candidate(i as u32 + 1, Vec3::new(x, y, z), Vec3::new(x + w, y + d, z + h))
                })
                .collect();
            let params = MoveParams::new(0.75, 0.5);
            let mut pos = Vec3::new(-30.0, -30.0, 0.0);
            let mut vel = Vec3::new(vx, vy, vz);

            let (_, contacts) = run(&mut pos, &mut vel, 1.0, &params, &obstacles);

            for c in &contacts {
                prop_assert!(vel.dot(c.normal) >= -params.epsilon);
            }
            prop_assert!(pos.is_finite());
            prop_assert!(vel.is_finite());
        }

        #[test]
        fn prop_horizontal_only_normals_stay_flat(
            boxes in prop::collection::vec(
                (-20.0f32..20.0, -20.0f32..20.0, -5.0f32..5.0, 0.5f32..8.0, 0.5f32..8.0, 0.5f32..8.0),
                1..8,
            ),
            vx in -80.0f32..80.0, vy in -80.0f32..80.0, vz in -80.0f32..80.0,
        ) {
            let obstacles: Vec<Candidate> = boxes
                .iter()
                .enumerate()
                .map(|(i, &(x, y, z, w, d, h))| {
                    candidate(i as u32 + 1, Vec3::new(x, y, z), Vec3::new(x + w, y + d, z + h))
                })
                .collect();
            let mut params = MoveParams::new(0.75, 0.5);
            params.horizontal_only = true;
            let mut pos = Vec3::new(-30.0, -30.0, 0.0);
            let mut vel = Vec3::new(vx, vy, vz);

            let (info, contacts) = run(&mut pos, &mut vel, 1.0, &params, &obstacles);

            prop_assert!(!info.has_support);
            for c in &contacts {
                prop_assert_eq!(c.normal.z, 0.0);
                prop_assert!(vel.dot(c.normal) >= -params.epsilon);
            }
            prop_assert!(pos.is_finite());
            prop_assert!(vel.is_finite());
        }

        #[test]
        fn prop_support_iff_flat_normal_approached(
            vx in -20.0f32..20.0, vy in -20.0f32..20.0, vz in -40.0f32..40.0,
        ) {
            let pad = [candidate(1, Vec3::new(-100.0, -100.0, -10.0), Vec3::new(100.0, 100.0, 0.0))];
            let params = MoveParams::new(1.0, 0.5);
            let mut pos = Vec3::new(0.0, 0.0, 3.0);
            let mut vel = Vec3::new(vx, vy, vz);

            let (info, contacts) = run(&mut pos, &mut vel, 1.0, &params, &pad);

            let expected = contacts
                .iter()
                .any(|c| c.normal.z > params.support_normal_z && c.approach_speed < 0.0);
            prop_assert_eq!(info.has_support, expected);
        }
    }
}
