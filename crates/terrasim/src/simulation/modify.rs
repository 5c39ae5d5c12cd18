//! Brush-driven mutation entry points.
//!
//! With terraforming unsupported every call here is a no-op. Without additive
//! blending, `Add` height/sediment writes go to the accumulation buffers and
//! are combined before the next non-additive write or step.

use super::TerrainSimulation;
use crate::brush::{blend, BlendOp, BrushImage, HeightSpace, ModifierBrush};
use crate::capabilities::BrushWriteStrategy;
use crate::modifiers::{HeightEdit, SedimentEdit, SplatEdit};
use crate::splat::SplatmapPainter;
use glam::{Quat, Vec2};

impl TerrainSimulation {
    fn writes_enabled(&self, what: &str) -> bool {
        if self.strategy == BrushWriteStrategy::Disabled {
            log::trace!("Ignoring {what}: terraforming unsupported");
            return false;
        }
        true
    }

    /// Apply a height edit once. `dt` scales `Add` edits only.
    pub fn apply_height_edit(&mut self, edit: &HeightEdit, dt: f32) {
        if !self.writes_enabled("height edit") || edit.layer >= self.terrain.layer_count {
            return;
        }
        let Some(footprint) = edit.brush.footprint(self.terrain.dims) else {
            return;
        };
        let layer = edit.layer;

        match (edit.op, self.strategy) {
            (BlendOp::Add, BrushWriteStrategy::Accumulate) => {
                let amount = edit.strength * dt;
                for (idx, w) in footprint.cells() {
                    self.terrain.height_accum[idx][layer] += w * amount;
                }
                self.terrain.accum_pending = true;
            }
            (BlendOp::Add, _) => {
                let amount = edit.strength * dt;
                let heights = self.terrain.height.active_mut();
                for (idx, w) in footprint.cells() {
                    let h = &mut heights[idx][layer];
                    *h = blend(BlendOp::Add, *h, amount, w).max(0.0);
                }
            }
            (op, _) => {
                self.flush_modifications();
                let heights = self.terrain.height.active_mut();
                for (idx, w) in footprint.cells() {
                    let cell = heights[idx];
                    let target = match edit.space {
                        HeightSpace::Relative => edit.strength,
                        HeightSpace::Absolute => edit.strength - (cell.element_sum() - cell[layer]),
                    };
                    heights[idx][layer] = blend(op, cell[layer], target, w).max(0.0);
                }
            }
        }

        if let (0, Some(channel)) = (layer, edit.splat_channel) {
            SplatmapPainter::paint_footprint(self.terrain.splat.active_mut(), &footprint, channel, edit.op);
        }
    }

    /// Apply a sediment edit once. Results are clamped to the layer's
    /// `[0, max_sediment]`.
    pub fn apply_sediment_edit(&mut self, edit: &SedimentEdit, dt: f32) {
        if !self.writes_enabled("sediment edit") || edit.layer >= self.terrain.layer_count {
            return;
        }
        let Some(footprint) = edit.brush.footprint(self.terrain.dims) else {
            return;
        };
        let layer = edit.layer;
        let cap = self.max_sediment[layer].max(0.0);

        if edit.op == BlendOp::Add && self.strategy == BrushWriteStrategy::Accumulate {
            let amount = edit.strength * dt;
            for (idx, w) in footprint.cells() {
                self.terrain.sediment_accum[idx][layer] += w * amount;
            }
            self.terrain.accum_pending = true;
            return;
        }
        if edit.op != BlendOp::Add {
            self.flush_modifications();
        }

        let value = if edit.op == BlendOp::Add {
            edit.strength * dt
        } else {
            edit.strength
        };
        let sediment = self.terrain.sediment.active_mut();
        for (idx, w) in footprint.cells() {
            let s = &mut sediment[idx][layer];
            *s = blend(edit.op, *s, value, w).max(0.0).min(cap);
        }
    }

    /// Paint or erase the splat field (layer 0 materials).
    pub fn apply_splat_edit(&mut self, edit: &SplatEdit) {
        if !self.writes_enabled("splat edit") {
            return;
        }
        let Some(footprint) = edit.brush.footprint(self.terrain.dims) else {
            return;
        };
        let splat = self.terrain.splat.active_mut();
        if edit.subtract {
            SplatmapPainter::erase_footprint(splat, &footprint, edit.channel);
        } else {
            SplatmapPainter::paint_footprint(splat, &footprint, edit.channel, edit.op);
        }
    }

    // =========================================================================
    // SHAPE SHORTHANDS
    // =========================================================================

    /// Raise (or with a negative rate, lower) a layer under a circle.
    #[allow(clippy::too_many_arguments)]
    pub fn add_height_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        rate: f32,
        falloff: f32,
        layer: usize,
        splat_channel: Option<usize>,
        dt: f32,
    ) {
        let brush = ModifierBrush::circle(center, radius).with_falloff(falloff);
        let mut edit = HeightEdit::add(brush, layer, rate);
        edit.splat_channel = splat_channel;
        self.apply_height_edit(&edit, dt);
    }

    /// Drive a layer toward `target` under a rotated box.
    #[allow(clippy::too_many_arguments)]
    pub fn set_height_box(
        &mut self,
        center: Vec2,
        size: Vec2,
        rotation: Quat,
        target: f32,
        falloff: f32,
        layer: usize,
        space: HeightSpace,
    ) {
        let brush = ModifierBrush::rect(center, size)
            .with_rotation(rotation)
            .with_falloff(falloff);
        self.apply_height_edit(&HeightEdit::set(brush, layer, target, space), 0.0);
    }

    /// Paint a splat channel from an image stamp.
    pub fn paint_splat_image(&mut self, center: Vec2, size: Vec2, rotation: Quat, image: BrushImage, op: BlendOp, channel: usize) {
        let brush = ModifierBrush::image(center, size, image).with_rotation(rotation);
        self.apply_splat_edit(&SplatEdit::paint(brush, op, channel));
    }

    /// Erase a splat channel under a circle.
    pub fn sub_splat_circle(&mut self, center: Vec2, radius: f32, falloff: f32, channel: usize) {
        let brush = ModifierBrush::circle(center, radius).with_falloff(falloff);
        self.apply_splat_edit(&SplatEdit::subtract(brush, channel));
    }

    /// Erase a splat channel from an image stamp.
    pub fn sub_splat_image(&mut self, center: Vec2, size: Vec2, rotation: Quat, image: BrushImage, channel: usize) {
        let brush = ModifierBrush::image(center, size, image).with_rotation(rotation);
        self.apply_splat_edit(&SplatEdit::subtract(brush, channel));
    }
}
