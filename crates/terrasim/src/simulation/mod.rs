//! Step-driven terrain/sediment co-simulation.
//!
//! Per substep, in order:
//! 1. Registry modifiers write into the active buffers.
//! 2. Slippage per enabled layer.
//! 3. Hydraulic erosion.
//! 4. Sediment advection.
//! 5. Reactions, writing heights, splat and fluid.
//!
//! Every pass reads `active`, writes `next`, then swaps. Passes 3-5 need the
//! fluid hand-off and are skipped for the step when its size does not match
//! the grid.

mod modify;

use crate::capabilities::{BrushWriteStrategy, Capabilities};
use crate::erosion::ErosionEngine;
use crate::error::SettingsResult;
use crate::fluid::FluidState;
use crate::grid::GridDims;
use crate::modifiers::{Modifier, ModifierRegistry};
use crate::reaction::ReactionEngine;
use crate::settings::SimulationSettings;
use crate::terrain::TerrainState;
use glam::Vec4;

/// What a call to [`TerrainSimulation::step`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepReport {
    pub substeps: u32,
    /// Height moved by slippage.
    pub slipped: f32,
    /// Height dissolved into sediment.
    pub dissolved: f32,
    /// Sediment settled back onto layers.
    pub deposited: f32,
    pub liquified: f32,
    pub contact_dissolved: f32,
    /// Cell-substeps where fluid mixing fired.
    pub mixing_cells: usize,
    /// Solid deposited by mixing.
    pub mixed_solid: f32,
    /// Sum of the mixing emission hook.
    pub emission: f32,
    /// Fluid-dependent passes were skipped (size mismatch).
    pub fluid_passes_skipped: bool,
}

pub struct TerrainSimulation {
    settings: SimulationSettings,
    capabilities: Capabilities,
    strategy: BrushWriteStrategy,
    terrain: TerrainState,
    erosion: ErosionEngine,
    reactions: Option<ReactionEngine>,
    /// Per-layer sediment cap, used when clamping brush and flush writes.
    max_sediment: Vec4,
    frame: u64,
}

impl TerrainSimulation {
    /// Flat, empty terrain.
    pub fn new(dims: GridDims, settings: SimulationSettings, capabilities: Capabilities) -> SettingsResult<Self> {
        let terrain = TerrainState::new(dims, settings.layer_count);
        Self::from_terrain(terrain, settings, capabilities)
    }

    /// Start from existing terrain (its layer count is taken from `settings`).
    pub fn from_terrain(
        terrain: TerrainState,
        settings: SimulationSettings,
        capabilities: Capabilities,
    ) -> SettingsResult<Self> {
        settings.validate()?;

        let terrain = if terrain.layer_count == settings.layer_count {
            terrain
        } else {
            let dims = terrain.dims;
            TerrainState::from_heights(dims, settings.layer_count, terrain.heights().to_vec())
        };

        let mut max_sediment = Vec4::ZERO;
        for (l, layer) in settings.layers.iter().enumerate() {
            max_sediment[l] = layer.erosion.max_sediment;
        }

        let erosion = ErosionEngine::new(&settings, terrain.dims.cell_size);
        let reactions = ReactionEngine::new(&settings);
        let strategy = capabilities.write_strategy();

        log::info!(
            "Terrain simulation {}x{} (cell {:.3}), {} layer(s), writes {:?}, reactions {}",
            terrain.dims.width,
            terrain.dims.depth,
            terrain.dims.cell_size,
            settings.layer_count,
            strategy,
            if reactions.is_some() { "on" } else { "off" },
        );

        Ok(Self {
            settings,
            capabilities,
            strategy,
            terrain,
            erosion,
            reactions,
            max_sediment,
            frame: 0,
        })
    }

    pub fn dims(&self) -> GridDims {
        self.terrain.dims
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn terrain(&self) -> &TerrainState {
        &self.terrain
    }

    /// Advance by `dt`, split into `substeps` (at least one).
    pub fn step(
        &mut self,
        dt: f32,
        substeps: u32,
        fluid: &mut FluidState,
        modifiers: &ModifierRegistry,
    ) -> StepReport {
        self.flush_modifications();

        let substeps = substeps.max(1);
        let sub_dt = dt / substeps as f32;
        let mut report = StepReport {
            substeps,
            ..Default::default()
        };

        let fluid_ok = fluid.matches(self.terrain.dims.cell_count());
        if !fluid_ok {
            log::error!(
                "Fluid size mismatch: {} velocity / {} height cells for a {}-cell grid",
                fluid.velocity.len(),
                fluid.heights.len(),
                self.terrain.dims.cell_count()
            );
            report.fluid_passes_skipped = true;
        }

        for _ in 0..substeps {
            self.apply_registry(modifiers, sub_dt);
            self.flush_modifications();

            if self.erosion.has_slippage() {
                report.slipped += self.erosion.run_slippage(&mut self.terrain);
            }

            if !fluid_ok {
                continue;
            }

            let hydraulic = self.erosion.run_hydraulic(&mut self.terrain, fluid, sub_dt);
            report.dissolved += hydraulic.dissolved;
            report.deposited += hydraulic.deposited;

            self.erosion.run_advection(&mut self.terrain, fluid, sub_dt);

            if let Some(engine) = &self.reactions {
                let totals = {
                    let (heights, heights_next) = self.terrain.height.split();
                    let (splat, splat_next) = self.terrain.splat.split();
                    engine.apply(heights, splat, fluid, sub_dt, heights_next, splat_next)
                };
                self.terrain.height.swap();
                self.terrain.splat.swap();

                report.liquified += totals.liquified;
                report.contact_dissolved += totals.contact_dissolved;
                report.mixing_cells += totals.mixing_cells;
                report.mixed_solid += totals.deposited;
                report.emission += totals.emission;
            }
        }

        self.frame += 1;
        log::debug!("Step {}: {:?}", self.frame, report);
        report
    }

    fn apply_registry(&mut self, modifiers: &ModifierRegistry, dt: f32) {
        for (_, modifier) in modifiers.iter() {
            match modifier {
                Modifier::Height(edit) => self.apply_height_edit(edit, dt),
                Modifier::Sediment(edit) => self.apply_sediment_edit(edit, dt),
                Modifier::Splat(edit) => self.apply_splat_edit(edit),
            }
        }
    }

    /// Combine pending accumulated writes. Returns false when none were
    /// pending (always the case with additive blending available).
    pub fn flush_modifications(&mut self) -> bool {
        self.terrain.flush_accumulation(self.max_sediment)
    }

    // =========================================================================
    // EXPORTS
    // =========================================================================

    /// Layer heights, one `Vec4` per cell. Writes routed through the
    /// accumulation fallback show up after the next flush.
    pub fn heights(&self) -> &[Vec4] {
        self.terrain.heights()
    }

    pub fn splatmap(&self) -> &[Vec4] {
        self.terrain.splat()
    }

    pub fn sediment(&self) -> &[Vec4] {
        self.terrain.sediment()
    }

    /// Summed layer height per cell.
    pub fn surface_heights(&self) -> Vec<f32> {
        self.terrain.surface_heights()
    }

    /// Raw bytes of [`heights`](Self::heights) for GPU upload.
    pub fn height_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.terrain.heights())
    }

    /// Raw bytes of [`splatmap`](Self::splatmap) for GPU upload.
    pub fn splat_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.terrain.splat())
    }

    /// World-space volume of one layer.
    pub fn total_layer_volume(&self, layer: usize) -> f32 {
        self.terrain.total_layer_volume(layer)
    }

    /// World-space suspended sediment of one layer.
    pub fn total_sediment(&self, layer: usize) -> f32 {
        self.terrain.total_sediment(layer)
    }
}
