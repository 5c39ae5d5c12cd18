//! Phase transitions between terrain layers and fluid species.
//!
//! Each cell is evaluated independently in a fixed order: liquify, then
//! contact (per layer, per species), then fluid mixing. Presence checks read
//! the cell as it was on entry; every amount is limited by the running value,
//! so nothing goes negative.

use crate::constants::{FLUID_EPSILON, HEIGHT_EPSILON, MAX_FLUID_SPECIES, MAX_LAYERS};
use crate::fluid::FluidState;
use crate::settings::{FluidMixingSettings, LayerMask, SimulationSettings, TerraformSettings};
use crate::splat::SplatmapPainter;
use glam::{Vec2, Vec4};
use rayon::prelude::*;
use std::ops::Add;

/// Result of reacting one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellReaction {
    pub heights: Vec4,
    pub fluid: Vec2,
    pub splat: Vec4,
    pub liquified: f32,
    pub contact_dissolved: f32,
    pub mixed: bool,
    pub deposited: f32,
    pub emission: f32,
}

/// Reaction volumes summed over the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReactionTotals {
    pub liquified: f32,
    pub contact_dissolved: f32,
    pub mixing_cells: usize,
    pub deposited: f32,
    pub emission: f32,
}

impl Add for ReactionTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            liquified: self.liquified + rhs.liquified,
            contact_dissolved: self.contact_dissolved + rhs.contact_dissolved,
            mixing_cells: self.mixing_cells + rhs.mixing_cells,
            deposited: self.deposited + rhs.deposited,
            emission: self.emission + rhs.emission,
        }
    }
}

impl From<&CellReaction> for ReactionTotals {
    fn from(r: &CellReaction) -> Self {
        Self {
            liquified: r.liquified,
            contact_dissolved: r.contact_dissolved,
            mixing_cells: r.mixed as usize,
            deposited: r.deposited,
            emission: r.emission,
        }
    }
}

/// Per-layer liquify/contact rules plus global mixing.
pub struct ReactionEngine {
    layers: Vec<TerraformSettings>,
    mixing: FluidMixingSettings,
    /// Active-layer bits, used to drop mask targets beyond `layer_count`.
    valid_layers: LayerMask,
}

impl ReactionEngine {
    /// `None` unless reactions are switched on and some rule is enabled.
    pub fn new(settings: &SimulationSettings) -> Option<Self> {
        if !settings.needs_reactions() {
            return None;
        }
        let count = settings.layer_count.min(MAX_LAYERS);
        Some(Self {
            layers: settings.layers.iter().take(count).cloned().collect(),
            mixing: settings.mixing.clone(),
            valid_layers: LayerMask((1u8 << count) - 1),
        })
    }

    fn targets(&self, mask: LayerMask) -> Vec4 {
        LayerMask(mask.0 & self.valid_layers.0).normalized()
    }

    /// React one cell. `species_count` gates mixing only; contact rules fire
    /// for any species present.
    pub fn react_cell(&self, heights: Vec4, splat: Vec4, fluid: Vec2, species_count: usize, dt: f32) -> CellReaction {
        let entry_h = heights;
        let entry_f = fluid;
        let species_count = species_count.min(MAX_FLUID_SPECIES);

        let mut r = CellReaction {
            heights,
            fluid,
            splat,
            liquified: 0.0,
            contact_dissolved: 0.0,
            mixed: false,
            deposited: 0.0,
            emission: 0.0,
        };

        for (l, layer) in self.layers.iter().enumerate() {
            if !layer.liquify_enabled || layer.liquify_fluid >= MAX_FLUID_SPECIES {
                continue;
            }
            let amount = (layer.liquify_rate * dt).min(r.heights[l]);
            r.heights[l] -= amount;
            r.fluid[layer.liquify_fluid] += amount * layer.liquify_amount;
            r.liquified += amount;
        }

        for (l, layer) in self.layers.iter().enumerate() {
            if entry_h[l] <= HEIGHT_EPSILON {
                continue;
            }
            for (k, contact) in layer.contact.iter().enumerate() {
                if !contact.enabled || entry_f[k] <= FLUID_EPSILON {
                    continue;
                }
                let dissolve = (contact.terrain_dissolve_amount * contact.conversion_rate * dt).min(r.heights[l]);
                let consume = (contact.fluid_consumption_amount * contact.conversion_rate * dt).min(r.fluid[k]);
                r.heights[l] -= dissolve;
                r.fluid[k] -= consume;
                r.heights += self.targets(contact.convert_to_terrain_layer)
                    * (dissolve * contact.convert_to_terrain_volume);
                if let Some(target) = contact.convert_to_fluid_layer.filter(|&t| t < MAX_FLUID_SPECIES) {
                    r.fluid[target] += dissolve * contact.convert_to_fluid_volume;
                }
                if dissolve > 0.0 {
                    if let Some(channel) = contact.convert_to_splat_channel {
                        r.splat = SplatmapPainter::one_hot(channel);
                    }
                }
                r.contact_dissolved += dissolve;
            }
        }

        let m = &self.mixing;
        if m.enabled && species_count >= 2 && entry_f.x > FLUID_EPSILON && entry_f.y > FLUID_EPSILON {
            let mix = (m.fluid_mix_rate * dt).min(r.fluid.x).min(r.fluid.y);
            r.fluid -= Vec2::splat(mix);
            let solid = (m.deposit_rate * dt).min(2.0 * mix) * m.fluid_mix_scale;
            r.heights += self.targets(m.deposit_terrain_layers) * solid;
            if let Some(channel) = m.deposit_terrain_splat {
                r.splat = SplatmapPainter::one_hot(channel);
            }
            r.mixed = true;
            r.deposited = solid;
            r.emission = solid * m.emission_rate;
        }

        r.heights = r.heights.max(Vec4::ZERO);
        r.fluid = r.fluid.max(Vec2::ZERO);
        r
    }

    /// React every cell: read `heights`/`splat`, write the `_out` buffers and
    /// the fluid heights in place.
    pub fn apply(
        &self,
        heights: &[Vec4],
        splat: &[Vec4],
        fluid: &mut FluidState,
        dt: f32,
        heights_out: &mut [Vec4],
        splat_out: &mut [Vec4],
    ) -> ReactionTotals {
        let species_count = fluid.species_count;
        heights_out
            .par_iter_mut()
            .zip(splat_out.par_iter_mut())
            .zip(fluid.heights.par_iter_mut())
            .enumerate()
            .map(|(idx, ((h_out, s_out), f))| {
                let r = self.react_cell(heights[idx], splat[idx], *f, species_count, dt);
                *h_out = r.heights;
                *s_out = r.splat;
                *f = r.fluid;
                ReactionTotals::from(&r)
            })
            .reduce(ReactionTotals::default, |a, b| a + b)
    }
}
