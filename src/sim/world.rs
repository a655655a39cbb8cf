//! Per-level world: terrain, obstacles and the broad-phase over them
//!
//! Created on level load and consumed on unload. Obstacle edits go through
//! the world so the broad-phase registration always matches the current box.

use glam::Vec3;

use super::aabb::Aabb;
use super::bounds::BattlespaceBounds;
use super::broadphase::BroadPhaseGrid;
use super::mover::{Candidate, CandidateQuery};
use super::obstacle::{Obstacle, ObstacleId, ObstacleKind, ObstacleSet};
use super::terrain::HeightField;

pub struct World {
    terrain: HeightField,
    obstacles: ObstacleSet,
    grid: BroadPhaseGrid,
    bounds: BattlespaceBounds,
    /// Reused id buffer for broad-phase queries
    ids: Vec<ObstacleId>,
}

impl World {
    /// # Panics
    /// Panics if `cell_size` is not positive.
    pub fn load(terrain: HeightField, bounds: BattlespaceBounds, cell_size: f32) -> Self {
        log::info!(
            "World loaded: terrain {}x{} @ {}, broad-phase cell {}",
            terrain.cols(),
            terrain.rows(),
            terrain.spacing(),
            cell_size
        );
        Self {
            terrain,
            obstacles: ObstacleSet::new(),
            grid: BroadPhaseGrid::new(cell_size),
            bounds,
            ids: Vec::new(),
        }
    }

    /// Tear the level down
    pub fn unload(self) {
        log::info!("World unloaded ({} obstacles)", self.obstacles.len());
    }

    pub fn terrain(&self) -> &HeightField {
        &self.terrain
    }

    pub fn bounds(&self) -> &BattlespaceBounds {
        &self.bounds
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id)
    }

    pub fn broadphase(&self) -> &BroadPhaseGrid {
        &self.grid
    }

    pub fn spawn(&mut self, kind: ObstacleKind, aabb: Aabb) -> ObstacleId {
        let id = self.obstacles.spawn(kind, aabb);
        if let Some(o) = self.obstacles.get(id) {
            self.grid.upsert(o);
        }
        id
    }

    /// Spawn many obstacles, then rebuild the broad-phase once
    pub fn spawn_batch<I>(&mut self, items: I) -> Vec<ObstacleId>
    where
        I: IntoIterator<Item = (ObstacleKind, Aabb)>,
    {
        let ids: Vec<ObstacleId> = items
            .into_iter()
            .map(|(kind, aabb)| self.obstacles.spawn(kind, aabb))
            .collect();
        self.rebuild_broadphase();
        ids
    }

    pub fn despawn(&mut self, id: ObstacleId) -> bool {
        self.grid.remove(id);
        self.obstacles.despawn(id).is_some()
    }

    pub fn translate_obstacle(&mut self, id: ObstacleId, offset: Vec3) -> bool {
        match self.obstacles.translate(id, offset) {
            Some(o) => {
                self.grid.upsert(o);
                true
            }
            None => false,
        }
    }

    /// Inactive obstacles stay registered but are dropped by queries
    pub fn set_active(&mut self, id: ObstacleId, active: bool) -> bool {
        self.obstacles.set_active(id, active)
    }

    pub fn rebuild_broadphase(&mut self) {
        self.grid.rebuild(self.obstacles.iter());
    }

    /// Candidate source for the mover
    pub fn query(&mut self) -> WorldQuery<'_> {
        WorldQuery {
            grid: &mut self.grid,
            obstacles: &self.obstacles,
            ids: &mut self.ids,
        }
    }

    /// Active obstacles near the XY range `[min, max]`
    pub fn query_aabb(&mut self, min: Vec3, max: Vec3) -> Vec<Candidate> {
        let mut out = Vec::new();
        self.query().query_volume(&Aabb::new(min, max), &mut out);
        out
    }

    /// Active obstacles near the segment `p0 -> p1` grown by `radius`
    pub fn query_segment(&mut self, p0: Vec3, p1: Vec3, radius: f32) -> Vec<Candidate> {
        let mut out = Vec::new();
        self.query().query_segment(p0, p1, radius, &mut out);
        out
    }
}

/// Broad-phase backed candidate query. Drops inactive obstacles.
pub struct WorldQuery<'a> {
    grid: &'a mut BroadPhaseGrid,
    obstacles: &'a ObstacleSet,
    ids: &'a mut Vec<ObstacleId>,
}

impl WorldQuery<'_> {
    fn resolve(&self, out: &mut Vec<Candidate>) {
        out.extend(
            self.ids
                .iter()
                .filter_map(|&id| self.obstacles.get(id))
                .filter(|o| o.is_active())
                .map(|o| Candidate {
                    id: o.id,
                    aabb: o.aabb(),
                }),
        );
    }
}

impl CandidateQuery for WorldQuery<'_> {
    fn query_volume(&mut self, volume: &Aabb, out: &mut Vec<Candidate>) {
        self.ids.clear();
        self.grid
            .query_aabb_range_xy(volume.min, volume.max, &mut *self.ids);
        self.resolve(out);
    }

    fn query_segment(&mut self, p0: Vec3, p1: Vec3, radius: f32, out: &mut Vec<Candidate>) {
        self.ids.clear();
        self.grid
            .query_segment_range_xy(p0, p1, radius, &mut *self.ids);
        self.resolve(out);
    }
}
