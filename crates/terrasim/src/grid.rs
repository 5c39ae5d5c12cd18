//! Uniform 2D grid addressing, double-buffered fields and sampling.
//!
//! Every solver pass reads the `active` half of a [`GridBufferPair`] and writes
//! the `next` half. The pair only hands out both halves through
//! [`GridBufferPair::split`], so a pass can never read what it is writing.

use crate::constants::GHOST_CELLS;
use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

/// Grid dimensions and world scale.
///
/// Cells are row-major (`idx = z * width + x`) and cell centres sit at
/// `(x + 0.5) * cell_size` in world XZ.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridDims {
    pub width: usize,
    pub depth: usize,
    pub cell_size: f32,
}

impl GridDims {
    pub fn new(width: usize, depth: usize, cell_size: f32) -> Self {
        Self {
            width: width.max(1),
            depth: depth.max(1),
            cell_size,
        }
    }

    /// Cell index from (x, z) coordinates.
    #[inline]
    pub fn idx(&self, x: usize, z: usize) -> usize {
        z * self.width + x
    }

    /// (x, z) coordinates from a cell index.
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.depth
    }

    /// Neighbour index for a signed offset, `None` when it falls off the grid.
    #[inline]
    pub fn neighbor(&self, x: usize, z: usize, dx: i32, dz: i32) -> Option<usize> {
        let nx = x as i64 + dx as i64;
        let nz = z as i64 + dz as i64;
        if nx < 0 || nz < 0 || nx >= self.width as i64 || nz >= self.depth as i64 {
            return None;
        }
        Some(self.idx(nx as usize, nz as usize))
    }

    /// World XZ position of a cell centre.
    pub fn cell_center(&self, x: usize, z: usize) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) * self.cell_size,
            (z as f32 + 0.5) * self.cell_size,
        )
    }

    /// World XZ extent of the grid.
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.cell_size,
            self.depth as f32 * self.cell_size,
        )
    }

    /// Convert a world XZ position to continuous grid coordinates
    /// (cell centres at integers).
    pub fn world_to_grid(&self, world: Vec2) -> Vec2 {
        world / self.cell_size - Vec2::splat(0.5)
    }
}

/// A pair of same-shaped buffers with an O(1) role swap.
///
/// `active` holds the latest valid state. `next` is scratch until
/// [`swap`](Self::swap) promotes it.
#[derive(Clone, Debug)]
pub struct GridBufferPair<T> {
    active: Vec<T>,
    next: Vec<T>,
}

impl<T: Clone> GridBufferPair<T> {
    /// Create a pair with both buffers filled with `value`.
    pub fn new(len: usize, value: T) -> Self {
        Self {
            active: vec![value.clone(); len],
            next: vec![value; len],
        }
    }

    /// Create a pair whose active buffer is `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        let next = data.clone();
        Self { active: data, next }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Read-only view of the latest state.
    pub fn active(&self) -> &[T] {
        &self.active
    }

    /// Read `active`, write `next`.
    pub fn split(&mut self) -> (&[T], &mut [T]) {
        (&self.active, &mut self.next)
    }

    /// In-place access for per-cell writes that never read neighbours
    /// (brush application).
    pub(crate) fn active_mut(&mut self) -> &mut [T] {
        &mut self.active
    }

    /// Exchange the roles of `active` and `next`.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.active, &mut self.next);
    }

}

// =============================================================================
// SAMPLING
// =============================================================================

/// Clamp a grid position into the domain and weight it by how far it lies
/// inside the ghost margin: 1 within the grid, fading linearly to 0 at the
/// margin's outer edge. `None` beyond the margin or for an empty grid.
#[inline]
fn ghost_clamp(dims: GridDims, pos: Vec2) -> Option<(Vec2, f32)> {
    if !pos.is_finite() || dims.width == 0 || dims.depth == 0 {
        return None;
    }
    let max = Vec2::new((dims.width - 1) as f32, (dims.depth - 1) as f32);
    let clamped = pos.clamp(Vec2::ZERO, max);
    let outside = (pos - clamped).abs().max_element();
    if outside >= GHOST_CELLS {
        return None;
    }
    Some((clamped, 1.0 - outside / GHOST_CELLS))
}

/// The four cells surrounding a clamped position and the fractional offsets.
#[inline]
fn corners(dims: GridDims, p: Vec2) -> ([usize; 4], Vec2) {
    let x0 = p.x.floor() as usize;
    let z0 = p.y.floor() as usize;
    let x1 = (x0 + 1).min(dims.width - 1);
    let z1 = (z0 + 1).min(dims.depth - 1);
    let frac = Vec2::new(p.x - x0 as f32, p.y - z0 as f32);
    (
        [
            dims.idx(x0, z0),
            dims.idx(x1, z0),
            dims.idx(x0, z1),
            dims.idx(x1, z1),
        ],
        frac,
    )
}

/// Bilinear sample at a continuous grid position (cell centres at integers).
///
/// Positions within [`GHOST_CELLS`] of the border read the edge cells scaled
/// down linearly with distance, so inflow boundaries bring in less than the
/// edge holds; anything further out reads zero. Integer positions inside the
/// grid return the stored value exactly.
pub fn sample_bilinear(data: &[Vec4], dims: GridDims, pos: Vec2) -> Vec4 {
    let Some((p, fade)) = ghost_clamp(dims, pos) else {
        return Vec4::ZERO;
    };
    let ([a, b, c, d], f) = corners(dims, p);
    let top = data[a] + (data[b] - data[a]) * f.x;
    let bottom = data[c] + (data[d] - data[c]) * f.x;
    (top + (bottom - top) * f.y) * fade
}

/// Component-wise min and max of the four cells a bilinear sample at `pos`
/// would read, faded like the sample itself.
pub fn sample_min_max(data: &[Vec4], dims: GridDims, pos: Vec2) -> (Vec4, Vec4) {
    let Some((p, fade)) = ghost_clamp(dims, pos) else {
        return (Vec4::ZERO, Vec4::ZERO);
    };
    let ([a, b, c, d], _) = corners(dims, p);
    let min = data[a].min(data[b]).min(data[c]).min(data[d]);
    let max = data[a].max(data[b]).max(data[c]).max(data[d]);
    (min * fade, max * fade)
}

/// Bilinear sample of a scalar image in normalised `[0, 1]²` coordinates.
pub fn sample_scalar_uv(data: &[f32], width: usize, height: usize, uv: Vec2) -> f32 {
    if width == 0 || height == 0 || data.len() < width * height {
        return 0.0;
    }
    let max = Vec2::new((width - 1) as f32, (height - 1) as f32);
    let p = (uv * Vec2::new(width as f32, height as f32) - Vec2::splat(0.5)).clamp(Vec2::ZERO, max);
    let x0 = p.x.floor() as usize;
    let y0 = p.y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = p.x - x0 as f32;
    let fy = p.y - y0 as f32;
    let at = |x: usize, y: usize| data[y * width + x];
    let top = at(x0, y0) + (at(x1, y0) - at(x0, y0)) * fx;
    let bottom = at(x0, y1) + (at(x1, y1) - at(x0, y1)) * fx;
    top + (bottom - top) * fy
}
