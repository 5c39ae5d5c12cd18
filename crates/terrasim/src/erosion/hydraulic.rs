//! Fluid-driven erosion and deposition.
//!
//! Pass 1 turns bed slope and flow speed into an erosion rate per layer.
//! Pass 2 uses that rate as the sediment capacity of the flow: below capacity
//! terrain dissolves into sediment, above it sediment settles back onto the
//! layer. Layer 0 never erodes.

use crate::constants::{MAX_LAYERS, MIN_EROSION_SLOPE};
use crate::fluid::FluidState;
use crate::grid::GridDims;
use crate::settings::SimulationSettings;
use glam::{Vec2, Vec4};
use rayon::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HydraulicPassParams {
    /// 1.0 for layers that erode, 0.0 otherwise. Channel 0 is always 0.
    pub enabled: Vec4,
    pub dissolve_rate: Vec4,
    pub deposit_rate: Vec4,
    pub max_sediment: Vec4,
}

impl HydraulicPassParams {
    /// `None` when no layer above the base has hydraulic erosion enabled.
    pub fn from_settings(settings: &SimulationSettings) -> Option<Self> {
        let mut params = Self {
            enabled: Vec4::ZERO,
            dissolve_rate: Vec4::ZERO,
            deposit_rate: Vec4::ZERO,
            max_sediment: Vec4::ZERO,
        };
        for (l, layer) in settings.layers.iter().enumerate().take(MAX_LAYERS) {
            let e = &layer.erosion;
            params.dissolve_rate[l] = e.sediment_dissolve_rate;
            params.deposit_rate[l] = e.sediment_deposit_rate;
            params.max_sediment[l] = e.max_sediment;
            if l > 0 && e.hydraulic_enabled {
                params.enabled[l] = 1.0;
            }
        }
        (params.enabled != Vec4::ZERO).then_some(params)
    }
}

/// Volume moved by one application pass (height units).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HydraulicTotals {
    pub dissolved: f32,
    pub deposited: f32,
}

/// Surface slope magnitude from central differences (one-sided at borders).
fn surface_slope(dims: GridDims, heights: &[Vec4], x: usize, z: usize) -> f32 {
    let surface = |i: usize| heights[i].element_sum();
    let here = dims.idx(x, z);
    let axis = |lo: Option<usize>, hi: Option<usize>| -> f32 {
        let (a, b, span) = match (lo, hi) {
            (Some(a), Some(b)) => (a, b, 2.0),
            (None, Some(b)) => (here, b, 1.0),
            (Some(a), None) => (a, here, 1.0),
            (None, None) => return 0.0,
        };
        (surface(b) - surface(a)) / (span * dims.cell_size)
    };
    let gx = axis(dims.neighbor(x, z, -1, 0), dims.neighbor(x, z, 1, 0));
    let gz = axis(dims.neighbor(x, z, 0, -1), dims.neighbor(x, z, 0, 1));
    Vec2::new(gx, gz).length()
}

/// Pass 1: erosion rate per layer into `rates`.
pub fn compute_erosion_rate(
    dims: GridDims,
    heights: &[Vec4],
    fluid: &FluidState,
    params: &HydraulicPassParams,
    rates: &mut [Vec4],
) {
    rates.par_iter_mut().enumerate().for_each(|(idx, rate)| {
        if !fluid.is_wet(idx) {
            *rate = Vec4::ZERO;
            return;
        }
        let (x, z) = dims.coords(idx);
        let slope = surface_slope(dims, heights, x, z).max(MIN_EROSION_SLOPE);
        let drive = slope * fluid.acceleration * fluid.velocity[idx].length();
        *rate = Vec4::splat(drive).min(params.dissolve_rate) * params.enabled;
    });
}

/// Pass 2: dissolve toward capacity or deposit the surplus.
pub fn apply_erosion(
    heights: &[Vec4],
    sediment: &[Vec4],
    rates: &[Vec4],
    params: &HydraulicPassParams,
    dt: f32,
    heights_out: &mut [Vec4],
    sediment_out: &mut [Vec4],
) -> HydraulicTotals {
    let moved = heights_out
        .par_iter_mut()
        .zip(sediment_out.par_iter_mut())
        .enumerate()
        .map(|(idx, (h_out, s_out))| {
            let mut h = heights[idx];
            let mut s = sediment[idx];
            let mut moved = Vec2::ZERO;

            for l in 1..MAX_LAYERS {
                if params.enabled[l] == 0.0 {
                    continue;
                }
                let rate = rates[idx][l];
                let dissolve_rate = params.dissolve_rate[l];
                let cap = params.max_sediment[l].max(0.0);
                let capacity = if dissolve_rate.abs() > f32::EPSILON {
                    params.max_sediment[l] * rate / dissolve_rate
                } else {
                    0.0
                };

                if s[l] < capacity {
                    let amount = (rate * dt).min(h[l]).min(capacity - s[l]);
                    h[l] -= amount;
                    s[l] += amount;
                    moved.x += amount;
                } else {
                    let amount = (s[l] - capacity).min(params.deposit_rate[l] * dt);
                    h[l] += amount;
                    s[l] -= amount;
                    moved.y += amount;
                }
                h[l] = h[l].max(0.0);
                s[l] = s[l].max(0.0).min(cap);
            }

            *h_out = h;
            *s_out = s;
            moved
        })
        .reduce(|| Vec2::ZERO, |a, b| a + b);

    HydraulicTotals {
        dissolved: moved.x,
        deposited: moved.y,
    }
}
