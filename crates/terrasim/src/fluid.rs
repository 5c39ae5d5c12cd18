//! Hand-off from the external fluid solver.
//!
//! The fluid solver owns the dynamics. Each step it lends the terrain core a
//! velocity field and per-species fluid heights; the reaction engine writes
//! liquefaction, consumption and mixing results straight back into the same
//! [`FluidState`].

use crate::constants::{FLUID_EPSILON, MAX_FLUID_SPECIES};
use crate::grid::GridDims;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Resolution and scale of the fluid grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluidDescriptor {
    /// Cells along the fluid grid's longest axis.
    pub grid_resolution: f32,
    /// World XZ extent covered by the fluid grid.
    pub world_size: Vec2,
    /// Multiplier converting solver velocity units to grid units.
    pub velocity_scale: f32,
}

impl FluidDescriptor {
    /// A descriptor matching a terrain grid cell for cell.
    pub fn for_grid(dims: GridDims) -> Self {
        Self {
            grid_resolution: dims.width.max(dims.depth) as f32,
            world_size: dims.world_size(),
            velocity_scale: dims.width.max(dims.depth) as f32,
        }
    }

    /// `(velocity_scale / grid_resolution) / cell_size * dt * speed`.
    pub fn advect_scale(&self, cell_size: f32, dt: f32, speed: f32) -> f32 {
        if self.grid_resolution <= 0.0 || cell_size <= 0.0 {
            return 0.0;
        }
        (self.velocity_scale / self.grid_resolution) / cell_size * dt * speed
    }
}

/// Per-step fluid fields, one entry per terrain cell.
#[derive(Clone, Debug)]
pub struct FluidState {
    pub descriptor: FluidDescriptor,
    /// World-space XZ velocity.
    pub velocity: Vec<Vec2>,
    /// Fluid height per species (x = species 0, y = species 1).
    pub heights: Vec<Vec2>,
    /// Scalar acceleration constant (gravity) used by hydraulic erosion.
    pub acceleration: f32,
    /// Species taking part in mixing (0..=2).
    pub species_count: usize,
}

impl FluidState {
    /// Dry, still fluid over `dims`.
    pub fn new(dims: GridDims) -> Self {
        let n = dims.cell_count();
        Self {
            descriptor: FluidDescriptor::for_grid(dims),
            velocity: vec![Vec2::ZERO; n],
            heights: vec![Vec2::ZERO; n],
            acceleration: 9.81,
            species_count: 1,
        }
    }

    pub fn with_species(mut self, count: usize) -> Self {
        self.species_count = count.min(MAX_FLUID_SPECIES);
        self
    }

    /// Whether the fields cover exactly `cells` cells.
    pub fn matches(&self, cells: usize) -> bool {
        self.velocity.len() == cells && self.heights.len() == cells
    }

    /// Total fluid depth at a cell across species.
    #[inline]
    pub fn depth(&self, idx: usize) -> f32 {
        let h = self.heights[idx];
        h.x + h.y
    }

    #[inline]
    pub fn is_wet(&self, idx: usize) -> bool {
        self.depth(idx) > FLUID_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advect_scale_matching_grids() {
        let dims = GridDims::new(16, 16, 0.5);
        let d = FluidDescriptor::for_grid(dims);
        // velocity_scale == grid_resolution, so scale = dt * speed / cell_size
        let s = d.advect_scale(dims.cell_size, 0.1, 1.0);
        assert!((s - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_descriptor_serde_round_trip() {
        let d = FluidDescriptor::for_grid(GridDims::new(12, 8, 0.25));
        let json = serde_json::to_string(&d).unwrap();
        let back: FluidDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_depth_sums_species() {
        let dims = GridDims::new(2, 2, 1.0);
        let mut fluid = FluidState::new(dims).with_species(2);
        fluid.heights[3] = Vec2::new(0.25, 0.5);
        assert!((fluid.depth(3) - 0.75).abs() < 1e-6);
        assert!(fluid.is_wet(3));
        assert!(!fluid.is_wet(0));
        assert!(fluid.matches(4));
    }
}
