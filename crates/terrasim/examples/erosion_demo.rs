//! Erosion demo: a river cuts through a soft layer while a lava flow
//! solidifies where it meets the water.
//!
//! Run with: `RUST_LOG=debug cargo run -p terrasim --example erosion_demo [settings.yaml]`

use terrasim::{
    AdvectionPrecision, BrushShape, Capabilities, FluidState, GridDims, HeightEdit, HeightSpace, LayerMask,
    ModifierBrush, ModifierRegistry, SimulationSettings, TerrainSimulation, TerrainState, Vec2, Vec3, Vec4,
};

const WIDTH: usize = 96;
const DEPTH: usize = 64;
const CELL_SIZE: f32 = 0.5;
const STEPS: usize = 120;
const DT: f32 = 1.0 / 30.0;

fn default_settings() -> SimulationSettings {
    let mut settings = SimulationSettings::with_layers(3);
    settings.reactions_enabled = true;
    settings.advection.precision = AdvectionPrecision::MacCormack;

    // Layer 1: loose sand that slumps and washes away.
    let sand = &mut settings.layers[1];
    sand.erosion.slippage_enabled = true;
    sand.erosion.slippage_angle = 35.0;
    sand.erosion.hydraulic_enabled = true;
    sand.erosion.max_sediment = 0.4;
    sand.erosion.sediment_dissolve_rate = 0.3;
    sand.erosion.sediment_deposit_rate = 0.1;

    // Layer 2: cooled lava rock; water quenches it into sand.
    let rock = &mut settings.layers[2];
    rock.contact[0].enabled = true;
    rock.contact[0].conversion_rate = 0.2;
    rock.contact[0].convert_to_terrain_layer = LayerMask::LAYER_1;
    rock.contact[0].convert_to_splat_channel = Some(2);

    // Water + lava mixing deposits rock.
    settings.mixing.enabled = true;
    settings.mixing.fluid_mix_rate = 0.05;
    settings.mixing.deposit_rate = 0.05;
    settings.mixing.deposit_terrain_layers = LayerMask::LAYER_2;
    settings.mixing.deposit_terrain_splat = Some(3);
    settings.mixing.emission_rate = 10.0;

    settings
}

fn initial_terrain(dims: GridDims) -> TerrainState {
    let heights = (0..dims.cell_count())
        .map(|i| {
            let (x, z) = dims.coords(i);
            let bedrock = 2.0 + x as f32 * 0.02;
            let sand = 1.0 + ((x as f32 * 0.2).sin() * (z as f32 * 0.15).cos()).abs();
            Vec4::new(bedrock, sand, 0.0, 0.0)
        })
        .collect();
    TerrainState::from_heights(dims, 3, heights)
}

/// Water down the middle of the map, flowing toward -x; lava pooled upstream.
fn initial_fluid(dims: GridDims) -> FluidState {
    let mut fluid = FluidState::new(dims).with_species(2);
    let mid = dims.depth as f32 * 0.5;
    for i in 0..dims.cell_count() {
        let (x, z) = dims.coords(i);
        let from_center = (z as f32 - mid).abs();
        if from_center < 6.0 {
            fluid.heights[i].x = 0.4;
            fluid.velocity[i] = Vec2::new(-1.5, (mid - z as f32) * 0.05);
        }
        if x > dims.width * 3 / 4 && from_center < 10.0 {
            fluid.heights[i].y = 0.2;
        }
    }
    fluid
}

fn main() {
    env_logger::init();

    let settings = match std::env::args().nth(1) {
        Some(path) if path.ends_with(".json") => SimulationSettings::load_json(&path),
        Some(path) => SimulationSettings::load_yaml(&path),
        None => Ok(default_settings()),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    let dims = GridDims::new(WIDTH, DEPTH, CELL_SIZE);
    let mut sim = match TerrainSimulation::from_terrain(initial_terrain(dims), settings, Capabilities::default()) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Invalid settings: {e}");
            std::process::exit(1);
        }
    };
    let mut fluid = initial_fluid(dims);

    // A boulder dropped into the river and a levee along the north bank.
    let mut modifiers = ModifierRegistry::new();
    let boulder = ModifierBrush::volume(
        BrushShape::Sphere,
        Vec3::new(20.0, 4.0, dims.world_size().y * 0.5),
        Vec3::splat(3.0),
    )
    .with_falloff(4.0);
    modifiers.add(HeightEdit::add(boulder, 2, 0.5));
    let levee = ModifierBrush::rect(
        Vec2::new(dims.world_size().x * 0.5, dims.world_size().y * 0.5 + 5.0),
        Vec2::new(30.0, 1.5),
    )
    .with_falloff(2.0);
    sim.apply_height_edit(&HeightEdit::max(levee, 1, 4.5, HeightSpace::Absolute).with_splat(1), 0.0);

    let sand_before = sim.total_layer_volume(1);
    let mut emission = 0.0;
    for step in 0..STEPS {
        let report = sim.step(DT, 2, &mut fluid, &modifiers);
        emission += report.emission;
        if step % 30 == 0 {
            log::info!(
                "step {step}: dissolved {:.4}, deposited {:.4}, slipped {:.4}, mixing cells {}",
                report.dissolved,
                report.deposited,
                report.slipped,
                report.mixing_cells
            );
        }
    }

    log::info!(
        "sand {:.2} -> {:.2}, suspended {:.3}, rock {:.3}, emission {:.2}",
        sand_before,
        sim.total_layer_volume(1),
        sim.total_sediment(1),
        sim.total_layer_volume(2),
        emission
    );
    println!("{} bytes of height data ready for upload", sim.height_bytes().len());
}
