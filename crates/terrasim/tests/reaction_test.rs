//! Liquify, contact and mixing reactions driven through `TerrainSimulation::step`.

use terrasim::{
    Capabilities, FluidState, GridDims, LayerMask, ModifierRegistry, SimulationSettings, TerrainSimulation,
    TerrainState, Vec2, Vec4,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn sim_with(dims: GridDims, settings: SimulationSettings, cell: Vec4) -> TerrainSimulation {
    let layers = settings.layer_count;
    let terrain = TerrainState::from_heights(dims, layers, vec![cell; dims.cell_count()]);
    TerrainSimulation::from_terrain(terrain, settings, Capabilities::default()).unwrap()
}

fn wet_fluid(dims: GridDims, heights: Vec2, species: usize) -> FluidState {
    let mut fluid = FluidState::new(dims).with_species(species);
    fluid.heights.fill(heights);
    fluid
}

// =============================================================================
// CONTACT
// =============================================================================

#[test]
fn test_contact_converts_layer_into_target_layer() {
    let dims = GridDims::new(4, 4, 1.0);
    let mut settings = SimulationSettings::with_layers(3);
    settings.reactions_enabled = true;
    let contact = &mut settings.layers[1].contact[0];
    contact.enabled = true;
    contact.conversion_rate = 0.25;
    contact.terrain_dissolve_amount = 1.0;
    contact.fluid_consumption_amount = 0.0;
    contact.convert_to_terrain_layer = LayerMask::LAYER_2;
    contact.convert_to_terrain_volume = 1.0;

    let mut sim = sim_with(dims, settings, Vec4::new(0.0, 5.0, 0.0, 0.0));
    let mut fluid = wet_fluid(dims, Vec2::new(1.0, 0.0), 1);

    let report = sim.step(1.0, 1, &mut fluid, &ModifierRegistry::new());

    for h in sim.heights() {
        assert!((h.y - 4.75).abs() < 1e-6, "layer 1: {}", h.y);
        assert!((h.z - 0.25).abs() < 1e-6, "layer 2: {}", h.z);
    }
    assert!(fluid.heights.iter().all(|f| *f == Vec2::new(1.0, 0.0)));
    assert!((report.contact_dissolved - 0.25 * 16.0).abs() < 1e-4);
}

#[test]
fn test_contact_consumes_fluid_and_paints_splat() {
    let dims = GridDims::new(2, 2, 1.0);
    let mut settings = SimulationSettings::with_layers(1);
    settings.reactions_enabled = true;
    let contact = &mut settings.layers[0].contact[1];
    contact.enabled = true;
    contact.conversion_rate = 1.0;
    contact.terrain_dissolve_amount = 0.1;
    contact.fluid_consumption_amount = 0.4;
    contact.convert_to_fluid_layer = Some(0);
    contact.convert_to_fluid_volume = 2.0;
    contact.convert_to_splat_channel = Some(2);

    let mut sim = sim_with(dims, settings, Vec4::new(1.0, 0.0, 0.0, 0.0));
    let mut fluid = wet_fluid(dims, Vec2::new(0.0, 0.3), 2);

    sim.step(1.0, 1, &mut fluid, &ModifierRegistry::new());

    assert!((sim.heights()[0].x - 0.9).abs() < 1e-6);
    // consumption limited by the 0.3 present; dissolved 0.1 becomes 0.2 of species 0
    assert!(fluid.heights[0].y.abs() < 1e-6);
    assert!((fluid.heights[0].x - 0.2).abs() < 1e-6);
    assert_eq!(sim.splatmap()[0], Vec4::new(0.0, 0.0, 1.0, 0.0));
}

#[test]
fn test_contact_with_second_species_on_single_species_fluid() {
    let dims = GridDims::new(2, 2, 1.0);
    let mut settings = SimulationSettings::with_layers(2);
    settings.reactions_enabled = true;
    let contact = &mut settings.layers[0].contact[1];
    contact.enabled = true;
    contact.conversion_rate = 1.0;
    contact.terrain_dissolve_amount = 1.0;
    contact.convert_to_terrain_layer = LayerMask::LAYER_1;

    let mut sim = sim_with(dims, settings, Vec4::new(5.0, 0.0, 0.0, 0.0));
    // Species count stays at the default of one; only species 1 is present.
    let mut fluid = wet_fluid(dims, Vec2::new(0.0, 1.0), 1);
    assert_eq!(fluid.species_count, 1);

    let report = sim.step(1.0, 1, &mut fluid, &ModifierRegistry::new());

    for h in sim.heights() {
        assert!((h.x - 4.0).abs() < 1e-6, "layer 0: {}", h.x);
        assert!((h.y - 1.0).abs() < 1e-6, "layer 1: {}", h.y);
    }
    assert!((report.contact_dissolved - 4.0).abs() < 1e-4);
}

#[test]
fn test_dry_cells_do_not_react() {
    let dims = GridDims::new(3, 1, 1.0);
    let mut settings = SimulationSettings::with_layers(2);
    settings.reactions_enabled = true;
    settings.layers[1].contact[0].enabled = true;
    settings.layers[1].contact[0].convert_to_terrain_layer = LayerMask::LAYER_0;

    let mut sim = sim_with(dims, settings, Vec4::new(0.0, 2.0, 0.0, 0.0));
    let mut fluid = FluidState::new(dims);
    fluid.heights[1] = Vec2::new(1.0, 0.0);

    sim.step(0.5, 1, &mut fluid, &ModifierRegistry::new());

    assert_eq!(sim.heights()[0].y, 2.0);
    assert_eq!(sim.heights()[2].y, 2.0);
    assert!(sim.heights()[1].y < 2.0);
    assert!(sim.heights()[1].x > 0.0);
}

// =============================================================================
// LIQUIFY
// =============================================================================

#[test]
fn test_liquify_conserves_scaled_volume_across_substeps() {
    let dims = GridDims::new(4, 4, 1.0);
    let mut settings = SimulationSettings::with_layers(2);
    settings.reactions_enabled = true;
    settings.layers[1].liquify_enabled = true;
    settings.layers[1].liquify_fluid = 0;
    settings.layers[1].liquify_rate = 0.2;
    settings.layers[1].liquify_amount = 3.0;

    let mut sim = sim_with(dims, settings, Vec4::new(1.0, 1.0, 0.0, 0.0));
    let mut fluid = FluidState::new(dims);

    let report = sim.step(1.0, 4, &mut fluid, &ModifierRegistry::new());

    assert_eq!(report.substeps, 4);
    for (h, f) in sim.heights().iter().zip(&fluid.heights) {
        assert!((h.y - 0.8).abs() < 1e-5);
        assert!((f.x - 0.6).abs() < 1e-5);
    }
    assert!((report.liquified - 0.2 * 16.0).abs() < 1e-4);
}

#[test]
fn test_liquify_stops_when_layer_exhausted() {
    let dims = GridDims::new(2, 1, 1.0);
    let mut settings = SimulationSettings::with_layers(1);
    settings.reactions_enabled = true;
    settings.layers[0].liquify_enabled = true;
    settings.layers[0].liquify_rate = 10.0;
    settings.layers[0].liquify_amount = 1.0;

    let mut sim = sim_with(dims, settings, Vec4::new(0.5, 0.0, 0.0, 0.0));
    let mut fluid = FluidState::new(dims);
    sim.step(1.0, 1, &mut fluid, &ModifierRegistry::new());

    assert_eq!(sim.heights()[0].x, 0.0);
    assert!((fluid.heights[0].x - 0.5).abs() < 1e-6);
}

// =============================================================================
// MIXING
// =============================================================================

#[test]
fn test_mixing_needs_two_species() {
    let dims = GridDims::new(2, 2, 1.0);
    let mut settings = SimulationSettings::with_layers(2);
    settings.reactions_enabled = true;
    settings.mixing.enabled = true;
    settings.mixing.fluid_mix_rate = 0.5;
    settings.mixing.deposit_rate = 0.5;
    settings.mixing.deposit_terrain_layers = LayerMask::LAYER_0.with(1);
    settings.mixing.deposit_terrain_splat = Some(3);
    settings.mixing.emission_rate = 2.0;

    let mut sim = sim_with(dims, settings.clone(), Vec4::ZERO);
    let mut single = wet_fluid(dims, Vec2::new(1.0, 1.0), 1);
    let report = sim.step(1.0, 1, &mut single, &ModifierRegistry::new());
    assert_eq!(report.mixing_cells, 0);

    let mut sim = sim_with(dims, settings, Vec4::ZERO);
    let mut both = wet_fluid(dims, Vec2::new(1.0, 1.0), 2);
    let report = sim.step(1.0, 1, &mut both, &ModifierRegistry::new());

    assert_eq!(report.mixing_cells, 4);
    // mix = 0.5 of each; solid = min(0.5, 1.0) = 0.5 split over two layers
    assert_eq!(sim.heights()[0], Vec4::new(0.25, 0.25, 0.0, 0.0));
    assert_eq!(both.heights[0], Vec2::new(0.5, 0.5));
    assert_eq!(sim.splatmap()[0], Vec4::W);
    assert!((report.emission - 4.0 * 0.5 * 2.0).abs() < 1e-5);
}

#[test]
fn test_fluid_size_mismatch_skips_reactions() {
    let dims = GridDims::new(4, 4, 1.0);
    let mut settings = SimulationSettings::with_layers(1);
    settings.reactions_enabled = true;
    settings.layers[0].liquify_enabled = true;
    settings.layers[0].liquify_rate = 1.0;

    let mut sim = sim_with(dims, settings, Vec4::X);
    let mut fluid = FluidState::new(GridDims::new(3, 3, 1.0));
    let report = sim.step(1.0, 1, &mut fluid, &ModifierRegistry::new());

    assert!(report.fluid_passes_skipped);
    assert!(sim.heights().iter().all(|h| h.x == 1.0));
}
