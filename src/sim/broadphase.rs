//! Uniform-grid broad-phase for obstacle boxes
//!
//! Obstacles are hashed into square XY cells keyed by
//! `(floor(x / cell_size), floor(y / cell_size))`; an obstacle is listed in
//! every cell its box spans. Queries walk the covered cells and deduplicate
//! with a per-query generation stamp instead of a membership set.
//!
//! Results are conservative: every obstacle whose box overlaps the query
//! range in X/Y and whose Z extent meets the query's Z band (widened by one
//! cell size) is returned. Exact Z testing is left to the narrow phase.
//!
//! Large obstacles cost `area / cell_size²` cell entries.

use std::collections::HashMap;

use glam::Vec3;

use super::aabb::Aabb;
use super::obstacle::{Obstacle, ObstacleId};

type CellKey = (i32, i32);

/// Inclusive range of cell keys covered by a box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellSpan {
    min: CellKey,
    max: CellKey,
}

impl CellSpan {
    fn cells(self) -> impl Iterator<Item = CellKey> {
        (self.min.1..=self.max.1)
            .flat_map(move |cy| (self.min.0..=self.max.0).map(move |cx| (cx, cy)))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    aabb: Aabb,
    span: CellSpan,
    /// Generation of the last query that reported this obstacle
    stamp: u32,
}

/// Spatial hash over obstacle boxes. One per loaded level.
#[derive(Debug, Clone)]
pub struct BroadPhaseGrid {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<ObstacleId>>,
    entries: HashMap<ObstacleId, Entry>,
    generation: u32,
}

impl BroadPhaseGrid {
    /// # Panics
    /// Panics if `cell_size` is not positive.
    pub fn new(cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "broad-phase cell size must be positive");
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            entries: HashMap::new(),
            generation: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn cell_coord(&self, v: f32) -> i32 {
        (v * self.inv_cell_size).floor() as i32
    }

    fn span_of(&self, min: Vec3, max: Vec3) -> CellSpan {
        CellSpan {
            min: (self.cell_coord(min.x), self.cell_coord(min.y)),
            max: (self.cell_coord(max.x), self.cell_coord(max.y)),
        }
    }

    /// Register (or re-register) an obstacle under the cells of its current box
    pub fn upsert(&mut self, obstacle: &Obstacle) {
        self.remove(obstacle.id);
        let aabb = obstacle.aabb();
        let span = self.span_of(aabb.min, aabb.max);
        for key in span.cells() {
            self.cells.entry(key).or_default().push(obstacle.id);
        }
        self.entries.insert(
            obstacle.id,
            Entry {
                aabb,
                span,
                stamp: 0,
            },
        );
    }

    /// Unregister an obstacle. Returns false if it was not registered.
    pub fn remove(&mut self, id: ObstacleId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        for key in entry.span.cells() {
            if let Some(list) = self.cells.get_mut(&key) {
                list.retain(|&other| other != id);
                if list.is_empty() {
                    self.cells.remove(&key);
                }
            }
        }
        true
    }

    /// Clear and re-register everything in one pass
    pub fn rebuild<'a, I>(&mut self, obstacles: I)
    where
        I: IntoIterator<Item = &'a Obstacle>,
    {
        self.cells.clear();
        self.entries.clear();
        self.generation = 0;
        for obstacle in obstacles {
            let aabb = obstacle.aabb();
            let span = self.span_of(aabb.min, aabb.max);
            for key in span.cells() {
                self.cells.entry(key).or_default().push(obstacle.id);
            }
            self.entries.insert(
                obstacle.id,
                Entry {
                    aabb,
                    span,
                    stamp: 0,
                },
            );
        }
        log::info!(
            "Broad-phase rebuilt: {} obstacles in {} cells",
            self.entries.len(),
            self.cells.len()
        );
    }

    /// Start a new query generation, resetting stamps on wraparound
    fn next_generation(&mut self) -> u32 {
        if self.generation == u32::MAX {
            for entry in self.entries.values_mut() {
                entry.stamp = 0;
            }
            self.generation = 0;
        }
        self.generation += 1;
        self.generation
    }

    /// Append obstacles overlapping the XY range `[min, max]` to `out`.
    ///
    /// Obstacles are also filtered by a Z band: their Z extent must meet
    /// `[min.z - cell_size, max.z + cell_size]`. Appended ids are unique and
    /// sorted ascending.
    pub fn query_aabb_range_xy(&mut self, min: Vec3, max: Vec3, out: &mut Vec<ObstacleId>) {
        let generation = self.next_generation();
        let range = Aabb::new(min, max);
        let band_lo = range.min.z - self.cell_size;
        let band_hi = range.max.z + self.cell_size;
        let span = self.span_of(range.min, range.max);
        let start = out.len();

        for key in span.cells() {
            let Some(list) = self.cells.get(&key) else {
                continue;
            };
            for &id in list {
                let Some(entry) = self.entries.get_mut(&id) else {
                    continue;
                };
                if entry.stamp == generation {
                    continue;
                }
                entry.stamp = generation;
                if !entry.aabb.overlaps_xy(&range) {
                    continue;
                }
                if entry.aabb.max.z < band_lo || entry.aabb.min.z > band_hi {
                    continue;
                }
                out.push(id);
            }
        }

        out[start..].sort_unstable();
    }

    /// Same as [`query_aabb_range_xy`](Self::query_aabb_range_xy) over the
    /// bounding box of segment `p0 -> p1` grown by `radius`
    pub fn query_segment_range_xy(
        &mut self,
        p0: Vec3,
        p1: Vec3,
        radius: f32,
        out: &mut Vec<ObstacleId>,
    ) {
        let bounds = Aabb::from_segment(p0, p1, radius);
        self.query_aabb_range_xy(bounds.min, bounds.max, out);
    }

    /// Allocating convenience wrapper
    pub fn query_aabb(&mut self, min: Vec3, max: Vec3) -> Vec<ObstacleId> {
        let mut out = Vec::new();
        self.query_aabb_range_xy(min, max, &mut out);
        out
    }

    pub fn contains(&self, id: ObstacleId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of registered obstacles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total (cell, obstacle) registrations
    pub fn entry_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}
