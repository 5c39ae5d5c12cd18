//! Configuration errors.
//!
//! Simulation passes never fail; only loading and validating settings does.

use crate::constants::{MAX_FLUID_SPECIES, MAX_LAYERS, SPLAT_CHANNELS};

/// Errors raised while loading or validating [`SimulationSettings`](crate::SimulationSettings).
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read or write settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML settings: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("layer count must be between 1 and {max}, got {count}", max = MAX_LAYERS)]
    InvalidLayerCount { count: usize },

    #[error("expected settings for {expected} layers, found {found}")]
    LayerSettingsMismatch { expected: usize, found: usize },

    #[error("{field} references splat channel {channel}, only {max} exist", max = SPLAT_CHANNELS)]
    InvalidChannel { field: String, channel: usize },

    #[error("{field} references fluid species {species}, only {max} exist", max = MAX_FLUID_SPECIES)]
    InvalidSpecies { field: String, species: usize },
}

pub type SettingsResult<T> = Result<T, SettingsError>;
