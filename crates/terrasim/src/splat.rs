//! Splatmap painting.
//!
//! Only layer 0 carries splat data. Brush paints keep the strongest weight for
//! `Add` and overwrite for the other ops; erasing lowers a channel by the brush
//! weight. Reactions paint one-hot. Weights are never renormalised across
//! channels.

use crate::brush::{BlendOp, BrushFootprint};
use crate::constants::SPLAT_CHANNELS;
use glam::Vec4;

/// Stateless paint rules for the splat field.
pub struct SplatmapPainter;

impl SplatmapPainter {
    /// One-hot weight vector for `channel`. Zero for an invalid channel.
    pub fn one_hot(channel: usize) -> Vec4 {
        let mut v = Vec4::ZERO;
        if channel < SPLAT_CHANNELS {
            v[channel] = 1.0;
        }
        v
    }

    /// Paint one cell with a brush weight.
    #[inline]
    pub fn paint(splat: &mut Vec4, channel: usize, weight: f32, op: BlendOp) {
        if channel >= SPLAT_CHANNELS || weight <= 0.0 {
            return;
        }
        splat[channel] = match op {
            BlendOp::Add => splat[channel].max(weight),
            BlendOp::Set | BlendOp::Min | BlendOp::Max => weight,
        };
    }

    /// Lower one channel of a cell by a brush weight, never below zero.
    #[inline]
    pub fn erase(splat: &mut Vec4, channel: usize, weight: f32) {
        if channel >= SPLAT_CHANNELS || weight <= 0.0 {
            return;
        }
        splat[channel] = (splat[channel] - weight).max(0.0);
    }

    pub fn erase_footprint(splat: &mut [Vec4], footprint: &BrushFootprint, channel: usize) {
        for (idx, weight) in footprint.cells() {
            Self::erase(&mut splat[idx], channel, weight);
        }
    }

    /// Paint every weighted cell of a footprint.
    pub fn paint_footprint(splat: &mut [Vec4], footprint: &BrushFootprint, channel: usize, op: BlendOp) {
        for (idx, weight) in footprint.cells() {
            Self::paint(&mut splat[idx], channel, weight, op);
        }
    }
}
