//! End-to-end stepping: no-op idempotence, hydraulic erosion invariants,
//! configuration I/O and render hand-off.

use proptest::prelude::*;
use terrasim::{
    AdvectionPrecision, Capabilities, FluidState, GridDims, ModifierRegistry, SettingsError, SimulationSettings,
    TerrainSimulation, TerrainState, Vec2, Vec4,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Two-layer settings with hydraulic erosion on layer 1.
fn hydraulic_settings(max_sediment: f32, precision: AdvectionPrecision) -> SimulationSettings {
    let mut settings = SimulationSettings::with_layers(2);
    let e = &mut settings.layers[1].erosion;
    e.hydraulic_enabled = true;
    e.max_sediment = max_sediment;
    e.sediment_dissolve_rate = 0.5;
    e.sediment_deposit_rate = 0.2;
    settings.advection.precision = precision;
    settings
}

/// A sloped valley: bedrock rises along x, soft layer on top.
fn valley_terrain(dims: GridDims) -> TerrainState {
    let heights = (0..dims.cell_count())
        .map(|i| {
            let (x, z) = dims.coords(i);
            let valley = (z as f32 - dims.depth as f32 * 0.5).abs() * 0.2;
            Vec4::new(1.0 + x as f32 * 0.1 + valley, 2.0, 0.0, 0.0)
        })
        .collect();
    TerrainState::from_heights(dims, 2, heights)
}

/// Water flowing downhill (-x) along the valley.
fn river(dims: GridDims, speed: f32) -> FluidState {
    let mut fluid = FluidState::new(dims);
    for i in 0..dims.cell_count() {
        let (_, z) = dims.coords(i);
        if (z as f32 - dims.depth as f32 * 0.5).abs() < 3.0 {
            fluid.heights[i] = Vec2::new(0.5, 0.0);
            fluid.velocity[i] = Vec2::new(-speed, 0.1 * speed);
        }
    }
    fluid
}

fn write_temp(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("terrasim_{}_{}", std::process::id(), name))
}

// =============================================================================
// NO-OP STEP
// =============================================================================

#[test]
fn test_step_with_everything_disabled_leaves_terrain_unchanged() {
    let dims = GridDims::new(16, 12, 0.5);
    let mut sim = TerrainSimulation::from_terrain(
        valley_terrain(dims),
        SimulationSettings::with_layers(2),
        Capabilities::default(),
    )
    .unwrap();
    let heights = sim.heights().to_vec();
    let splat = sim.splatmap().to_vec();

    let mut fluid = river(dims, 4.0);
    for _ in 0..5 {
        let report = sim.step(0.1, 3, &mut fluid, &ModifierRegistry::new());
        assert_eq!(report.slipped, 0.0);
        assert_eq!(report.dissolved, 0.0);
    }

    assert_eq!(sim.heights(), heights.as_slice());
    assert_eq!(sim.splatmap(), splat.as_slice());
    assert_eq!(sim.frame(), 5);
}

// =============================================================================
// HYDRAULIC EROSION
// =============================================================================

#[test]
fn test_river_erodes_soft_layer_not_bedrock() {
    let dims = GridDims::new(24, 16, 1.0);
    let terrain = valley_terrain(dims);
    let bedrock = terrain.total_layer_volume(0);
    let mut sim =
        TerrainSimulation::from_terrain(terrain, hydraulic_settings(1.0, AdvectionPrecision::Fast), Capabilities::default())
            .unwrap();
    let soft = sim.total_layer_volume(1);

    let mut fluid = river(dims, 2.0);
    let mut report_total = 0.0;
    for _ in 0..10 {
        report_total += sim.step(0.1, 1, &mut fluid, &ModifierRegistry::new()).dissolved;
    }

    assert!(report_total > 0.0);
    assert!(sim.total_layer_volume(1) < soft);
    assert!(sim.total_sediment(1) > 0.0);
    assert!((sim.total_layer_volume(0) - bedrock).abs() < 1e-3);
    // Dry banks never erode.
    assert_eq!(sim.heights()[dims.idx(5, 0)].y, 2.0);
}

#[test]
fn test_sediment_settles_when_flow_stops() {
    let dims = GridDims::new(16, 16, 1.0);
    let mut sim = TerrainSimulation::from_terrain(
        valley_terrain(dims),
        hydraulic_settings(1.0, AdvectionPrecision::MacCormack),
        Capabilities::default(),
    )
    .unwrap();

    let mut flowing = river(dims, 3.0);
    for _ in 0..5 {
        sim.step(0.1, 1, &mut flowing, &ModifierRegistry::new());
    }
    let suspended = sim.total_sediment(1);
    assert!(suspended > 0.0);

    let mut still = FluidState::new(dims);
    let report = sim.step(0.5, 1, &mut still, &ModifierRegistry::new());
    assert!(report.deposited > 0.0);
    assert!(sim.total_sediment(1) < suspended);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Sediment stays within [0, max_sediment] whatever the flow.
    #[test]
    fn test_sediment_clamped_to_capacity(
        max_sediment in 0.01f32..2.0,
        speed in 0.0f32..20.0,
        dt in 0.01f32..1.0,
        maccormack in any::<bool>(),
    ) {
        let dims = GridDims::new(12, 12, 1.0);
        let precision = if maccormack { AdvectionPrecision::MacCormack } else { AdvectionPrecision::Fast };
        let mut sim = TerrainSimulation::from_terrain(
            valley_terrain(dims),
            hydraulic_settings(max_sediment, precision),
            Capabilities::default(),
        ).unwrap();

        let mut fluid = river(dims, speed);
        for _ in 0..4 {
            sim.step(dt, 2, &mut fluid, &ModifierRegistry::new());
            for s in sim.sediment() {
                prop_assert!(s.y >= 0.0 && s.y <= max_sediment + 1e-6, "sediment {} > {}", s.y, max_sediment);
            }
            for h in sim.heights() {
                prop_assert!(h.y >= 0.0 && h.is_finite());
            }
        }
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_settings_json_round_trip_through_file() {
    let mut settings = hydraulic_settings(0.7, AdvectionPrecision::MacCormack);
    settings.reactions_enabled = true;
    settings.layers[0].contact[1].enabled = true;
    settings.layers[0].contact[1].convert_to_splat_channel = Some(3);

    let path = write_temp("settings.json");
    settings.save_json(&path).unwrap();
    let loaded = SimulationSettings::load_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, settings);
}

#[test]
fn test_settings_yaml_round_trip_through_file() {
    let mut settings = SimulationSettings::with_layers(3);
    settings.layers[2].erosion.slippage_enabled = true;
    settings.layers[2].erosion.slippage_angle = 33.0;
    settings.mixing.enabled = true;

    let path = write_temp("settings.yaml");
    settings.save_yaml(&path).unwrap();
    let loaded = SimulationSettings::load_yaml(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, settings);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = SimulationSettings::load_json(write_temp("does_not_exist.json"));
    assert!(matches!(result, Err(SettingsError::Io(_))));
}

#[test]
fn test_invalid_settings_rejected_at_construction() {
    let dims = GridDims::new(4, 4, 1.0);
    let mut settings = SimulationSettings::with_layers(2);
    settings.layers[1].contact[0].convert_to_fluid_layer = Some(5);
    let result = TerrainSimulation::new(dims, settings, Capabilities::default());
    assert!(matches!(result, Err(SettingsError::InvalidSpecies { species: 5, .. })));

    let bad = SimulationSettings::from_yaml_str("layer_count: [1, 2]");
    assert!(matches!(bad, Err(SettingsError::Yaml(_))));
}

#[test]
fn test_negative_rates_accepted_with_warning() {
    let dims = GridDims::new(4, 4, 1.0);
    let mut settings = SimulationSettings::with_layers(1);
    settings.layers[0].erosion.sediment_deposit_rate = -1.0;
    assert_eq!(settings.validate().unwrap().len(), 1);
    assert!(TerrainSimulation::new(dims, settings, Capabilities::default()).is_ok());
}

// =============================================================================
// RENDER HAND-OFF
// =============================================================================

#[test]
fn test_byte_views_cover_whole_grid() {
    let dims = GridDims::new(7, 5, 1.0);
    let sim = TerrainSimulation::from_terrain(valley_terrain(dims), SimulationSettings::with_layers(2), Capabilities::default())
        .unwrap();
    assert_eq!(sim.height_bytes().len(), 35 * 16);
    assert_eq!(sim.splat_bytes().len(), 35 * 16);

    let surface = sim.surface_heights();
    for (s, h) in surface.iter().zip(sim.heights()) {
        assert!((*s - (h.x + h.y + h.z + h.w)).abs() < 1e-6);
    }
}

#[test]
fn test_layer_count_taken_from_settings() {
    let dims = GridDims::new(4, 4, 1.0);
    let terrain = TerrainState::from_heights(dims, 4, vec![Vec4::ONE; 16]);
    let sim = TerrainSimulation::from_terrain(terrain, SimulationSettings::with_layers(2), Capabilities::default()).unwrap();
    assert!(sim.heights().iter().all(|h| *h == Vec4::new(1.0, 1.0, 0.0, 0.0)));
}
