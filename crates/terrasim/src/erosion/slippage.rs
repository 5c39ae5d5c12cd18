//! Angle-of-repose slippage.
//!
//! Two passes per layer. Pass 1 reads heights and writes each cell's outflow
//! toward its four neighbours. Pass 2 reads heights and outflow and gathers:
//! every cell subtracts what it sends and adds what its neighbours send it.
//! Gathering keeps the pass free of write conflicts and the layer total
//! unchanged.

use crate::grid::GridDims;
use glam::Vec4;
use rayon::prelude::*;

/// Neighbour offsets in outflow channel order: +x, -x, +z, -z.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlippagePassParams {
    pub layer: usize,
    /// `tan(angle) * cell_size`.
    pub max_height_diff: f32,
    /// Fraction of half the steepest excess moved per pass.
    pub smoothness: f32,
}

/// Pass 1: outflow potential per cell. Returns the total volume scheduled
/// to move (in height units).
pub fn compute_outflow(
    dims: GridDims,
    heights: &[Vec4],
    params: SlippagePassParams,
    outflow: &mut [Vec4],
) -> f32 {
    outflow.par_iter_mut().enumerate().for_each(|(idx, out)| {
        let (x, z) = dims.coords(idx);
        let here = heights[idx];
        let surface = here.element_sum();

        let mut excess = [0.0_f32; 4];
        for (dir, &(dx, dz)) in DIRECTIONS.iter().enumerate() {
            if let Some(n) = dims.neighbor(x, z, dx, dz) {
                let diff = surface - heights[n].element_sum() - params.max_height_diff;
                excess[dir] = diff.max(0.0);
            }
        }

        let total: f32 = excess.iter().sum();
        let steepest = excess.iter().fold(0.0_f32, |a, &b| a.max(b));
        if total <= 0.0 {
            *out = Vec4::ZERO;
            return;
        }

        let potential = (0.5 * steepest * params.smoothness).min(here[params.layer]);
        *out = Vec4::from_array(excess) * (potential / total);
    });

    outflow.par_iter().map(|o| o.element_sum()).sum()
}

/// Pass 2: apply the outflow to the layer.
pub fn apply_outflow(
    dims: GridDims,
    heights: &[Vec4],
    outflow: &[Vec4],
    params: SlippagePassParams,
    dst: &mut [Vec4],
) {
    dst.par_iter_mut().enumerate().for_each(|(idx, out)| {
        let (x, z) = dims.coords(idx);
        let mut h = heights[idx];
        let mut delta = -outflow[idx].element_sum();

        // A neighbour at -x sends toward +x (channel 0), and so on.
        for (dir, &(dx, dz)) in DIRECTIONS.iter().enumerate() {
            if let Some(n) = dims.neighbor(x, z, dx, dz) {
                delta += outflow[n][dir ^ 1];
            }
        }

        h[params.layer] = (h[params.layer] + delta).max(0.0);
        *out = h;
    });
}
