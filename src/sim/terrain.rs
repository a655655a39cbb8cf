//! Heightfield terrain
//!
//! A uniform grid of elevation samples. Each cell is split along its
//! `(0,0)-(1,1)` diagonal into two triangles; elevation is interpolated
//! barycentrically inside the triangle containing the query point, so the
//! surface is continuous across the split. Normals come from central
//! differences of neighbouring samples.
//!
//! Point queries reserve a one-cell margin around the grid so every interior
//! sample has neighbours for normal estimation.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Terrain elevation/normal lookup used by terrain following
pub trait TerrainQuery {
    /// Elevation at world `(x, y)`, `None` outside the safe interior
    fn elevation_at(&self, x: f32, y: f32) -> Option<f32>;
    /// Unit surface normal at world `(x, y)`
    fn normal_at(&self, x: f32, y: f32) -> Vec3;
}

/// Height and normal at a query point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSample {
    pub height: f32,
    pub normal: Vec3,
}

/// Uniform elevation grid, row-major (`heights[row * cols + col]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightField {
    heights: Vec<f32>,
    cols: usize,
    rows: usize,
    /// World position of sample (0, 0)
    origin: Vec2,
    /// World distance between adjacent samples
    spacing: f32,
}

impl HeightField {
    /// # Panics
    /// Panics if the sample count doesn't match `cols * rows`, if the grid is
    /// smaller than 4x4 (no interior cells), or if `spacing` is not positive.
    pub fn new(heights: Vec<f32>, cols: usize, rows: usize, origin: Vec2, spacing: f32) -> Self {
        assert!(
            heights.len() == cols * rows,
            "heightfield has {} samples, expected {}x{}",
            heights.len(),
            cols,
            rows
        );
        assert!(cols >= 4 && rows >= 4, "heightfield needs at least 4x4 samples");
        assert!(spacing > 0.0, "heightfield spacing must be positive");
        Self {
            heights,
            cols,
            rows,
            origin,
            spacing,
        }
    }

    pub fn flat(cols: usize, rows: usize, origin: Vec2, spacing: f32, height: f32) -> Self {
        Self::new(vec![height; cols * rows], cols, rows, origin, spacing)
    }

    /// Build from a function of world `(x, y)`
    pub fn from_fn<F>(cols: usize, rows: usize, origin: Vec2, spacing: f32, f: F) -> Self
    where
        F: Fn(f32, f32) -> f32,
    {
        let mut heights = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let x = origin.x + col as f32 * spacing;
                let y = origin.y + row as f32 * spacing;
                heights.push(f(x, y));
            }
        }
        Self::new(heights, cols, rows, origin, spacing)
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// World-space XY extent covered by samples
    pub fn extent(&self) -> (Vec2, Vec2) {
        let far = Vec2::new(
            (self.cols - 1) as f32 * self.spacing,
            (self.rows - 1) as f32 * self.spacing,
        );
        (self.origin, self.origin + far)
    }

    #[inline]
    fn at(&self, col: usize, row: usize) -> f32 {
        self.heights[row * self.cols + col]
    }

    /// Grid-space coordinates of a world point
    #[inline]
    fn to_grid(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.origin.x) / self.spacing,
            (y - self.origin.y) / self.spacing,
        )
    }

    pub fn elevation_at(&self, x: f32, y: f32) -> Option<f32> {
        let (gx, gy) = self.to_grid(x, y);
        if !gx.is_finite() || !gy.is_finite() {
            return None;
        }
        let cx = gx.floor();
        let cy = gy.floor();
        // Cell (c, r) needs samples c-1..=c+2 for normals at its corners
        if cx < 1.0 || cy < 1.0 || cx > (self.cols - 3) as f32 || cy > (self.rows - 3) as f32 {
            return None;
        }
        let (c, r) = (cx as usize, cy as usize);
        let fx = gx - cx;
        let fy = gy - cy;

        let h00 = self.at(c, r);
        let h10 = self.at(c + 1, r);
        let h01 = self.at(c, r + 1);
        let h11 = self.at(c + 1, r + 1);

        let h = if fx >= fy {
            // Triangle (0,0) (1,0) (1,1)
            h00 + fx * (h10 - h00) + fy * (h11 - h10)
        } else {
            // Triangle (0,0) (0,1) (1,1)
            h00 + fy * (h01 - h00) + fx * (h11 - h01)
        };
        Some(h)
    }

    pub fn normal_at(&self, x: f32, y: f32) -> Vec3 {
        let (gx, gy) = self.to_grid(x, y);
        let col = clamp_index(gx, self.cols);
        let row = clamp_index(gy, self.rows);

        let two_h = 2.0 * self.spacing;
        let dzdx = (self.at(col + 1, row) - self.at(col - 1, row)) / two_h;
        let dzdy = (self.at(col, row + 1) - self.at(col, row - 1)) / two_h;
        Vec3::new(-dzdx, -dzdy, 1.0).normalize()
    }

    pub fn sample(&self, x: f32, y: f32) -> Option<TerrainSample> {
        let height = self.elevation_at(x, y)?;
        Some(TerrainSample {
            height,
            normal: self.normal_at(x, y),
        })
    }
}

/// Nearest sample index, clamped to `[1, len - 2]`
fn clamp_index(g: f32, len: usize) -> usize {
    let hi = (len - 2) as f32;
    let g = if g.is_finite() { g.round() } else { 1.0 };
    g.clamp(1.0, hi) as usize
}

impl TerrainQuery for HeightField {
    fn elevation_at(&self, x: f32, y: f32) -> Option<f32> {
        HeightField::elevation_at(self, x, y)
    }

    fn normal_at(&self, x: f32, y: f32) -> Vec3 {
        HeightField::normal_at(self, x, y)
    }
}
