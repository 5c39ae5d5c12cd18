//! Terrain layer, sediment and splat storage.
//!
//! All per-cell fields are `Vec4`: channel `n` of `height` and `sediment` is
//! layer `n`, channel `n` of `splat` is material `n`. Channels at or beyond
//! `layer_count` stay zero.

use crate::constants::MAX_LAYERS;
use crate::grid::{GridBufferPair, GridDims};
use glam::Vec4;
use rayon::prelude::*;

pub struct TerrainState {
    pub dims: GridDims,
    pub layer_count: usize,

    pub(crate) height: GridBufferPair<Vec4>,
    pub(crate) sediment: GridBufferPair<Vec4>,
    pub(crate) splat: GridBufferPair<Vec4>,
    /// Per-pass transfer potentials (slippage: +x, -x, +z, -z; hydraulic:
    /// erosion rate per layer).
    pub(crate) outflow: GridBufferPair<Vec4>,

    /// Pending additive height writes (accumulation fallback).
    pub(crate) height_accum: Vec<Vec4>,
    /// Pending additive sediment writes (accumulation fallback).
    pub(crate) sediment_accum: Vec<Vec4>,
    pub(crate) accum_pending: bool,

    /// MacCormack intermediates.
    pub(crate) advect_forward: Vec<Vec4>,
    pub(crate) advect_backward: Vec<Vec4>,
}

impl TerrainState {
    /// Flat, empty terrain.
    pub fn new(dims: GridDims, layer_count: usize) -> Self {
        Self::from_heights(dims, layer_count, vec![Vec4::ZERO; dims.cell_count()])
    }

    /// Terrain with the given layer heights. Missing cells are zero, extra
    /// cells are dropped, negative and inactive channels are cleared.
    pub fn from_heights(dims: GridDims, layer_count: usize, mut heights: Vec<Vec4>) -> Self {
        let n = dims.cell_count();
        let layer_count = layer_count.clamp(1, MAX_LAYERS);
        heights.resize(n, Vec4::ZERO);
        let mask = Self::channel_mask(layer_count);
        for h in heights.iter_mut() {
            *h = h.max(Vec4::ZERO) * mask;
        }

        Self {
            dims,
            layer_count,
            height: GridBufferPair::from_vec(heights),
            sediment: GridBufferPair::new(n, Vec4::ZERO),
            splat: GridBufferPair::new(n, Vec4::X),
            outflow: GridBufferPair::new(n, Vec4::ZERO),
            height_accum: vec![Vec4::ZERO; n],
            sediment_accum: vec![Vec4::ZERO; n],
            accum_pending: false,
            advect_forward: vec![Vec4::ZERO; n],
            advect_backward: vec![Vec4::ZERO; n],
        }
    }

    /// 1.0 in each active channel, 0.0 elsewhere.
    pub fn channel_mask(layer_count: usize) -> Vec4 {
        let mut mask = Vec4::ZERO;
        for l in 0..layer_count.min(MAX_LAYERS) {
            mask[l] = 1.0;
        }
        mask
    }

    pub fn heights(&self) -> &[Vec4] {
        self.height.active()
    }

    pub fn sediment(&self) -> &[Vec4] {
        self.sediment.active()
    }

    pub fn splat(&self) -> &[Vec4] {
        self.splat.active()
    }

    /// Summed layer height at a cell.
    #[inline]
    pub fn surface_height(&self, idx: usize) -> f32 {
        self.height.active()[idx].element_sum()
    }

    pub fn surface_heights(&self) -> Vec<f32> {
        self.height.active().par_iter().map(|h| h.element_sum()).collect()
    }

    pub fn total_layer_volume(&self, layer: usize) -> f32 {
        if layer >= MAX_LAYERS {
            return 0.0;
        }
        let area = self.dims.cell_size * self.dims.cell_size;
        self.height.active().par_iter().map(|h| h[layer]).sum::<f32>() * area
    }

    pub fn total_sediment(&self, layer: usize) -> f32 {
        if layer >= MAX_LAYERS {
            return 0.0;
        }
        let area = self.dims.cell_size * self.dims.cell_size;
        self.sediment.active().par_iter().map(|s| s[layer]).sum::<f32>() * area
    }

    /// Combine pending additive writes into the active buffers.
    ///
    /// Returns false when nothing was pending.
    pub(crate) fn flush_accumulation(&mut self, max_sediment: Vec4) -> bool {
        if !self.accum_pending {
            return false;
        }
        let mask = Self::channel_mask(self.layer_count);
        let cap = max_sediment.max(Vec4::ZERO);

        self.height
            .active_mut()
            .par_iter_mut()
            .zip(self.height_accum.par_iter_mut())
            .for_each(|(h, acc)| {
                *h = (*h + *acc * mask).max(Vec4::ZERO);
                *acc = Vec4::ZERO;
            });
        self.sediment
            .active_mut()
            .par_iter_mut()
            .zip(self.sediment_accum.par_iter_mut())
            .for_each(|(s, acc)| {
                *s = (*s + *acc * mask).clamp(Vec4::ZERO, cap);
                *acc = Vec4::ZERO;
            });

        self.accum_pending = false;
        true
    }
}
