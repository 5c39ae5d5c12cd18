//! Numeric limits shared by the terrain passes.
//!
//! ## Channel Conventions
//!
//! Terrain layers, per-layer sediment and splat weights are all packed into a
//! `Vec4` per cell. Channel 0 is the bottom-most (bedrock-like) layer and is
//! also the only layer that carries splat data. Fluid species are packed into
//! a `Vec2`.

/// Maximum number of stacked terrain layers (channels of a `Vec4`).
pub const MAX_LAYERS: usize = 4;

/// Maximum number of fluid species taking part in contact/mixing reactions.
pub const MAX_FLUID_SPECIES: usize = 2;

/// Number of splat weight channels.
pub const SPLAT_CHANNELS: usize = 4;

// =============================================================================
// CLAMPS
// =============================================================================

/// Slippage angles are clamped below 90 degrees so `tan()` stays finite.
pub const MAX_SLIPPAGE_ANGLE_DEG: f32 = 89.9;

/// Smallest falloff exponent accepted by the brush evaluator.
pub const MIN_FALLOFF: f32 = 1e-3;

/// Floor on the bed slope used by hydraulic erosion so flat, fast channels
/// still erode.
pub const MIN_EROSION_SLOPE: f32 = 0.01;

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Heights below this are treated as an empty layer.
pub const HEIGHT_EPSILON: f32 = 1e-6;

/// Fluid heights below this are treated as dry.
pub const FLUID_EPSILON: f32 = 1e-4;

/// Ghost margin (in cells) around the grid for advection sampling.
/// Samples further out than this read zero and their mass leaves the domain.
pub const GHOST_CELLS: f32 = 1.0;
