//! Slippage, hydraulic erosion and sediment advection.
//!
//! [`ErosionEngine`] holds the typed per-pass parameters resolved from
//! [`SimulationSettings`] and runs each pass against a [`TerrainState`],
//! swapping the touched buffer pairs after every pass.

pub mod advection;
pub mod hydraulic;
pub mod slippage;

pub use advection::AdvectionPassParams;
pub use hydraulic::{HydraulicPassParams, HydraulicTotals};
pub use slippage::SlippagePassParams;

use crate::fluid::FluidState;
use crate::settings::{AdvectionSettings, SimulationSettings};
use crate::terrain::TerrainState;

pub struct ErosionEngine {
    slippage: Vec<SlippagePassParams>,
    hydraulic: Option<HydraulicPassParams>,
    advection: AdvectionSettings,
}

impl ErosionEngine {
    pub fn new(settings: &SimulationSettings, cell_size: f32) -> Self {
        let slippage = settings
            .layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.erosion.slippage_enabled)
            .map(|(l, layer)| SlippagePassParams {
                layer: l,
                max_height_diff: layer.erosion.max_height_diff(cell_size),
                smoothness: layer.erosion.slope_smoothness,
            })
            .collect();

        Self {
            slippage,
            hydraulic: HydraulicPassParams::from_settings(settings),
            advection: settings.advection.clone(),
        }
    }

    pub fn has_slippage(&self) -> bool {
        !self.slippage.is_empty()
    }

    pub fn has_hydraulic(&self) -> bool {
        self.hydraulic.is_some()
    }

    /// Slippage for every enabled layer, bottom-most first. Returns the
    /// volume moved (height units).
    pub fn run_slippage(&self, terrain: &mut TerrainState) -> f32 {
        let dims = terrain.dims;
        let mut moved = 0.0;
        for &params in &self.slippage {
            {
                let heights = terrain.height.active();
                let (_, outflow) = terrain.outflow.split();
                moved += slippage::compute_outflow(dims, heights, params, outflow);
            }
            terrain.outflow.swap();

            let outflow = terrain.outflow.active();
            let (heights, next) = terrain.height.split();
            slippage::apply_outflow(dims, heights, outflow, params, next);
            terrain.height.swap();
        }
        moved
    }

    /// Hydraulic erosion for all enabled layers.
    pub fn run_hydraulic(&self, terrain: &mut TerrainState, fluid: &FluidState, dt: f32) -> HydraulicTotals {
        let Some(params) = &self.hydraulic else {
            return HydraulicTotals::default();
        };
        let dims = terrain.dims;
        {
            let heights = terrain.height.active();
            let (_, rates) = terrain.outflow.split();
            hydraulic::compute_erosion_rate(dims, heights, fluid, params, rates);
        }
        terrain.outflow.swap();

        let totals = {
            let rates = terrain.outflow.active();
            let (heights, heights_next) = terrain.height.split();
            let (sediment, sediment_next) = terrain.sediment.split();
            hydraulic::apply_erosion(heights, sediment, rates, params, dt, heights_next, sediment_next)
        };
        terrain.height.swap();
        terrain.sediment.swap();
        totals
    }

    /// Carry sediment along the fluid velocity. Skipped unless some layer
    /// erodes hydraulically.
    pub fn run_advection(&self, terrain: &mut TerrainState, fluid: &FluidState, dt: f32) {
        if self.hydraulic.is_none() {
            return;
        }
        let dims = terrain.dims;
        let params = AdvectionPassParams {
            precision: self.advection.precision,
            scale: fluid.descriptor.advect_scale(
                dims.cell_size,
                dt,
                self.advection.sediment_advection_speed,
            ),
        };

        let mut forward = std::mem::take(&mut terrain.advect_forward);
        let mut backward = std::mem::take(&mut terrain.advect_backward);
        {
            let (src, dst) = terrain.sediment.split();
            advection::transport(dims, src, &fluid.velocity, params, &mut forward, &mut backward, dst);
        }
        terrain.advect_forward = forward;
        terrain.advect_backward = backward;
        terrain.sediment.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridDims;
    use glam::Vec4;

    #[test]
    fn test_slippage_only_for_enabled_layers() {
        let mut settings = SimulationSettings::with_layers(3);
        settings.layers[2].erosion.slippage_enabled = true;
        let engine = ErosionEngine::new(&settings, 1.0);
        assert_eq!(engine.slippage.len(), 1);
        assert_eq!(engine.slippage[0].layer, 2);
        assert!(!engine.has_hydraulic());
    }

    #[test]
    fn test_run_slippage_swaps_into_active() {
        let dims = GridDims::new(3, 1, 1.0);
        let mut settings = SimulationSettings::with_layers(1);
        settings.layers[0].erosion.slippage_enabled = true;
        settings.layers[0].erosion.slippage_angle = 0.0;
        settings.layers[0].erosion.slope_smoothness = 1.0;
        let engine = ErosionEngine::new(&settings, dims.cell_size);

        let mut terrain = TerrainState::from_heights(
            dims,
            1,
            vec![Vec4::ZERO, Vec4::new(4.0, 0.0, 0.0, 0.0), Vec4::ZERO],
        );
        let moved = engine.run_slippage(&mut terrain);
        assert!((moved - 2.0).abs() < 1e-6);
        assert_eq!(terrain.heights()[1].x, 2.0);
        assert_eq!(terrain.heights()[0].x, 1.0);
    }
}
