//! Layered terrain and sediment co-simulation on a uniform 2D grid.
//!
//! Up to four stacked terrain layers erode under slope (slippage) and flowing
//! fluid (hydraulic erosion), carry suspended sediment along the fluid
//! velocity, and exchange mass with up to two fluid species through
//! liquefaction, contact and mixing reactions. External brushes edit heights,
//! sediment and the splatmap.
//!
//! The fluid dynamics live elsewhere: each step borrows a [`FluidState`]
//! describing velocity and per-species fluid heights.
//!
//! # Example
//!
//! ```
//! use terrasim::{
//!     Capabilities, FluidState, GridDims, HeightEdit, ModifierBrush, ModifierRegistry,
//!     SimulationSettings, TerrainSimulation,
//! };
//! use glam::Vec2;
//!
//! let dims = GridDims::new(32, 32, 1.0);
//! let mut settings = SimulationSettings::with_layers(2);
//! settings.layers[1].erosion.slippage_enabled = true;
//!
//! let mut sim = TerrainSimulation::new(dims, settings, Capabilities::default()).unwrap();
//! let mut fluid = FluidState::new(dims);
//!
//! let mut modifiers = ModifierRegistry::new();
//! let brush = ModifierBrush::circle(Vec2::new(16.0, 16.0), 4.0).with_falloff(2.0);
//! modifiers.add(HeightEdit::add(brush, 1, 5.0));
//!
//! let report = sim.step(1.0 / 30.0, 2, &mut fluid, &modifiers);
//! assert_eq!(report.substeps, 2);
//! assert!(sim.total_layer_volume(1) > 0.0);
//! ```

pub mod brush;
pub mod capabilities;
pub mod constants;
pub mod erosion;
pub mod error;
pub mod fluid;
pub mod grid;
pub mod modifiers;
pub mod reaction;
pub mod serde_utils;
pub mod settings;
pub mod simulation;
pub mod splat;
pub mod terrain;

pub use brush::{blend, BlendOp, BrushFootprint, BrushImage, BrushShape, CellRect, HeightSpace, ModifierBrush};
pub use capabilities::{BrushWriteStrategy, Capabilities};
pub use erosion::ErosionEngine;
pub use error::{SettingsError, SettingsResult};
pub use fluid::{FluidDescriptor, FluidState};
pub use glam::{Quat, Vec2, Vec3, Vec4};
pub use grid::{GridBufferPair, GridDims};
pub use modifiers::{HeightEdit, Modifier, ModifierId, ModifierRegistry, SedimentEdit, SplatEdit};
pub use reaction::{CellReaction, ReactionEngine, ReactionTotals};
pub use settings::{
    AdvectionPrecision, AdvectionSettings, ErosionSettings, FluidContactReaction, FluidMixingSettings, LayerMask,
    SettingsWarning, SimulationSettings, TerraformSettings,
};
pub use simulation::{StepReport, TerrainSimulation};
pub use splat::SplatmapPainter;
pub use terrain::TerrainState;
