//! Per-layer erosion and terraform configuration.
//!
//! Plain data: nothing here changes during a step. [`TerraformSettings`]
//! embeds [`ErosionSettings`] by composition, so a layer can carry erosion
//! parameters with or without reaction rules attached.

use crate::constants::{MAX_FLUID_SPECIES, MAX_LAYERS, MAX_SLIPPAGE_ANGLE_DEG, SPLAT_CHANNELS};
use crate::error::{SettingsError, SettingsResult};
use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Bit mask over terrain layers (bit `n` = layer `n`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u8);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const LAYER_0: Self = Self(1 << 0);
    pub const LAYER_1: Self = Self(1 << 1);
    pub const LAYER_2: Self = Self(1 << 2);
    pub const LAYER_3: Self = Self(1 << 3);

    pub fn single(layer: usize) -> Self {
        if layer < MAX_LAYERS {
            Self(1 << layer)
        } else {
            Self::NONE
        }
    }

    pub fn with(self, layer: usize) -> Self {
        Self(self.0 | Self::single(layer).0)
    }

    pub fn contains(self, layer: usize) -> bool {
        layer < MAX_LAYERS && self.0 & (1 << layer) != 0
    }

    /// Number of valid layers in the mask.
    pub fn count(self) -> usize {
        (self.0 & 0b1111).count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.count() == 0
    }

    pub fn layers(self) -> impl Iterator<Item = usize> {
        (0..MAX_LAYERS).filter(move |&l| self.contains(l))
    }

    /// Even split across the set layers; all zero for an empty mask.
    pub fn normalized(self) -> Vec4 {
        let n = self.count();
        if n == 0 {
            return Vec4::ZERO;
        }
        let share = 1.0 / n as f32;
        let mut weights = Vec4::ZERO;
        for layer in self.layers() {
            weights[layer] = share;
        }
        weights
    }
}

/// Slippage and hydraulic erosion parameters for one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionSettings {
    /// Enable angle-of-repose redistribution.
    pub slippage_enabled: bool,
    /// Angle of repose (degrees). Clamped below 90.
    pub slippage_angle: f32,
    /// Fraction of the excess slope moved per pass (0-1).
    pub slope_smoothness: f32,
    /// Enable fluid-driven erosion (never applied to layer 0).
    pub hydraulic_enabled: bool,
    /// Sediment capacity per cell (height units).
    pub max_sediment: f32,
    /// Rate at which terrain dissolves into sediment (height/s).
    pub sediment_dissolve_rate: f32,
    /// Rate at which sediment settles back onto the layer (height/s).
    pub sediment_deposit_rate: f32,
}

impl Default for ErosionSettings {
    fn default() -> Self {
        Self {
            slippage_enabled: false,
            slippage_angle: 45.0,
            slope_smoothness: 0.5,
            hydraulic_enabled: false,
            max_sediment: 1.0,
            sediment_dissolve_rate: 0.1,
            sediment_deposit_rate: 0.1,
        }
    }
}

impl ErosionSettings {
    /// Largest height difference to a 4-neighbour the slope can hold.
    pub fn max_height_diff(&self, cell_size: f32) -> f32 {
        let angle = self.slippage_angle.min(MAX_SLIPPAGE_ANGLE_DEG).max(0.0);
        angle.to_radians().tan() * cell_size
    }
}

/// What happens when a layer and one fluid species share a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidContactReaction {
    pub enabled: bool,
    /// Global multiplier on both dissolve and consumption (1/s).
    pub conversion_rate: f32,
    /// Terrain height dissolved per unit of conversion.
    pub terrain_dissolve_amount: f32,
    /// Fluid height consumed per unit of conversion.
    pub fluid_consumption_amount: f32,
    /// Layers receiving the dissolved volume (split evenly).
    pub convert_to_terrain_layer: LayerMask,
    /// Splat channel painted where the reaction fires.
    pub convert_to_splat_channel: Option<usize>,
    /// Volume ratio dissolved terrain → target terrain.
    pub convert_to_terrain_volume: f32,
    /// Fluid species receiving the dissolved volume.
    pub convert_to_fluid_layer: Option<usize>,
    /// Volume ratio dissolved terrain → target fluid.
    pub convert_to_fluid_volume: f32,
}

impl Default for FluidContactReaction {
    fn default() -> Self {
        Self {
            enabled: false,
            conversion_rate: 1.0,
            terrain_dissolve_amount: 1.0,
            fluid_consumption_amount: 0.0,
            convert_to_terrain_layer: LayerMask::NONE,
            convert_to_splat_channel: None,
            convert_to_terrain_volume: 1.0,
            convert_to_fluid_layer: None,
            convert_to_fluid_volume: 1.0,
        }
    }
}

/// Erosion settings plus phase-transition rules for one layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformSettings {
    #[serde(flatten)]
    pub erosion: ErosionSettings,
    /// Turn this layer into fluid over time.
    pub liquify_enabled: bool,
    /// Fluid species produced by liquefaction.
    pub liquify_fluid: usize,
    /// Terrain height liquified per second.
    pub liquify_rate: f32,
    /// Fluid volume produced per unit of terrain.
    pub liquify_amount: f32,
    /// One contact rule per fluid species.
    pub contact: [FluidContactReaction; MAX_FLUID_SPECIES],
}

impl TerraformSettings {
    pub fn from_erosion(erosion: ErosionSettings) -> Self {
        Self {
            erosion,
            ..Default::default()
        }
    }

    pub fn has_reactions(&self) -> bool {
        self.liquify_enabled || self.contact.iter().any(|c| c.enabled)
    }
}

/// Fluid-fluid mixing into solid terrain (global, not per layer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidMixingSettings {
    pub enabled: bool,
    /// Fluid height consumed from each species per second.
    pub fluid_mix_rate: f32,
    /// Upper bound on solid deposited per second.
    pub deposit_rate: f32,
    /// Solid volume per unit of mixed fluid.
    pub fluid_mix_scale: f32,
    /// Layers receiving the solid (split evenly).
    pub deposit_terrain_layers: LayerMask,
    /// Splat channel painted where mixing happens.
    pub deposit_terrain_splat: Option<usize>,
    /// Emission hook value produced per unit of deposited solid.
    pub emission_rate: f32,
}

impl Default for FluidMixingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            fluid_mix_rate: 0.1,
            deposit_rate: 0.1,
            fluid_mix_scale: 1.0,
            deposit_terrain_layers: LayerMask::LAYER_0,
            deposit_terrain_splat: None,
            emission_rate: 0.0,
        }
    }
}

/// Sediment transport path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvectionPrecision {
    /// Single backward sample.
    #[default]
    Fast,
    /// Forward/backward pair with error correction and a monotonicity clamp.
    MacCormack,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvectionSettings {
    pub precision: AdvectionPrecision,
    pub sediment_advection_speed: f32,
}

impl Default for AdvectionSettings {
    fn default() -> Self {
        Self {
            precision: AdvectionPrecision::Fast,
            sediment_advection_speed: 1.0,
        }
    }
}

/// Full configuration of a terrain simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of active terrain layers (1-4).
    pub layer_count: usize,
    /// One entry per active layer, bottom-most first.
    pub layers: Vec<TerraformSettings>,
    /// Attach the reaction engine (liquify / contact / mixing).
    pub reactions_enabled: bool,
    pub mixing: FluidMixingSettings,
    pub advection: AdvectionSettings,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self::with_layers(1)
    }
}

/// Accepted but suspicious configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsWarning {
    /// A rate or ratio is negative. Behaviour follows the formulas literally.
    NegativeRate { field: String, value: f32 },
    /// A layer mask names layers beyond `layer_count`; those bits are ignored.
    MaskBeyondLayers { field: String, mask: u8 },
}

impl fmt::Display for SettingsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsWarning::NegativeRate { field, value } => {
                write!(f, "{field} is negative ({value}); applied as configured")
            }
            SettingsWarning::MaskBeyondLayers { field, mask } => {
                write!(f, "{field} mask {mask:#06b} names layers that are not active")
            }
        }
    }
}

impl SimulationSettings {
    /// Default settings for `count` layers.
    pub fn with_layers(count: usize) -> Self {
        Self {
            layer_count: count,
            layers: vec![TerraformSettings::default(); count],
            reactions_enabled: false,
            mixing: FluidMixingSettings::default(),
            advection: AdvectionSettings::default(),
        }
    }

    /// Whether any layer needs the reaction engine.
    pub fn needs_reactions(&self) -> bool {
        self.reactions_enabled
            && (self.mixing.enabled || self.layers.iter().any(TerraformSettings::has_reactions))
    }

    /// Check structure and flag suspicious values.
    ///
    /// Structural problems are errors. Negative rates are only warned about:
    /// they are applied as written, never clamped.
    pub fn validate(&self) -> SettingsResult<Vec<SettingsWarning>> {
        if self.layer_count == 0 || self.layer_count > MAX_LAYERS {
            return Err(SettingsError::InvalidLayerCount {
                count: self.layer_count,
            });
        }
        if self.layers.len() != self.layer_count {
            return Err(SettingsError::LayerSettingsMismatch {
                expected: self.layer_count,
                found: self.layers.len(),
            });
        }

        let mut warnings = Vec::new();
        let valid_bits = (1u8 << self.layer_count) - 1;
        let check_rate = |field: String, value: f32, warnings: &mut Vec<SettingsWarning>| {
            if value < 0.0 {
                warnings.push(SettingsWarning::NegativeRate { field, value });
            }
        };
        let check_mask = |field: String, mask: LayerMask, warnings: &mut Vec<SettingsWarning>| {
            if mask.0 & !valid_bits != 0 {
                warnings.push(SettingsWarning::MaskBeyondLayers { field, mask: mask.0 });
            }
        };
        let check_channel = |field: String, channel: Option<usize>| -> SettingsResult<()> {
            match channel {
                Some(channel) if channel >= SPLAT_CHANNELS => {
                    Err(SettingsError::InvalidChannel { field, channel })
                }
                _ => Ok(()),
            }
        };
        let check_species = |field: String, species: Option<usize>| -> SettingsResult<()> {
            match species {
                Some(species) if species >= MAX_FLUID_SPECIES => {
                    Err(SettingsError::InvalidSpecies { field, species })
                }
                _ => Ok(()),
            }
        };

        for (l, layer) in self.layers.iter().enumerate() {
            let e = &layer.erosion;
            check_rate(format!("layers[{l}].slope_smoothness"), e.slope_smoothness, &mut warnings);
            check_rate(format!("layers[{l}].max_sediment"), e.max_sediment, &mut warnings);
            check_rate(
                format!("layers[{l}].sediment_dissolve_rate"),
                e.sediment_dissolve_rate,
                &mut warnings,
            );
            check_rate(
                format!("layers[{l}].sediment_deposit_rate"),
                e.sediment_deposit_rate,
                &mut warnings,
            );
            check_rate(format!("layers[{l}].liquify_rate"), layer.liquify_rate, &mut warnings);
            check_rate(format!("layers[{l}].liquify_amount"), layer.liquify_amount, &mut warnings);
            check_species(format!("layers[{l}].liquify_fluid"), Some(layer.liquify_fluid))?;

            for (k, reaction) in layer.contact.iter().enumerate() {
                let prefix = format!("layers[{l}].contact[{k}]");
                check_rate(format!("{prefix}.conversion_rate"), reaction.conversion_rate, &mut warnings);
                check_rate(
                    format!("{prefix}.terrain_dissolve_amount"),
                    reaction.terrain_dissolve_amount,
                    &mut warnings,
                );
                check_rate(
                    format!("{prefix}.fluid_consumption_amount"),
                    reaction.fluid_consumption_amount,
                    &mut warnings,
                );
                check_rate(
                    format!("{prefix}.convert_to_terrain_volume"),
                    reaction.convert_to_terrain_volume,
                    &mut warnings,
                );
                check_rate(
                    format!("{prefix}.convert_to_fluid_volume"),
                    reaction.convert_to_fluid_volume,
                    &mut warnings,
                );
                check_mask(
                    format!("{prefix}.convert_to_terrain_layer"),
                    reaction.convert_to_terrain_layer,
                    &mut warnings,
                );
                check_channel(
                    format!("{prefix}.convert_to_splat_channel"),
                    reaction.convert_to_splat_channel,
                )?;
                check_species(
                    format!("{prefix}.convert_to_fluid_layer"),
                    reaction.convert_to_fluid_layer,
                )?;
            }
        }

        let m = &self.mixing;
        check_rate("mixing.fluid_mix_rate".into(), m.fluid_mix_rate, &mut warnings);
        check_rate("mixing.deposit_rate".into(), m.deposit_rate, &mut warnings);
        check_rate("mixing.fluid_mix_scale".into(), m.fluid_mix_scale, &mut warnings);
        check_rate("mixing.emission_rate".into(), m.emission_rate, &mut warnings);
        check_mask(
            "mixing.deposit_terrain_layers".into(),
            m.deposit_terrain_layers,
            &mut warnings,
        );
        check_channel("mixing.deposit_terrain_splat".into(), m.deposit_terrain_splat)?;
        check_rate(
            "advection.sediment_advection_speed".into(),
            self.advection.sediment_advection_speed,
            &mut warnings,
        );

        for warning in &warnings {
            log::warn!("{warning}");
        }
        Ok(warnings)
    }

    pub fn from_json_str(json: &str) -> SettingsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> SettingsResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Save settings to a JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load settings from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save settings to a YAML file.
    pub fn save_yaml(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load settings from a YAML file.
    pub fn load_yaml(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }
}
