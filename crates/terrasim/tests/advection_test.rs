//! Sediment advection: identity at rest, transport direction, boundary loss,
//! and the MacCormack path against the fast path.

use terrasim::erosion::advection::{transport, AdvectionPassParams};
use terrasim::{
    AdvectionPrecision, Capabilities, FluidState, GridDims, ModifierRegistry, SedimentEdit, SimulationSettings,
    TerrainSimulation, Vec2, Vec4,
};
use terrasim::{BlendOp, ModifierBrush, TerrainState};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn run(dims: GridDims, src: &[Vec4], velocity: Vec2, scale: f32, precision: AdvectionPrecision) -> Vec<Vec4> {
    let n = dims.cell_count();
    let velocity = vec![velocity; n];
    let mut forward = vec![Vec4::ZERO; n];
    let mut backward = vec![Vec4::ZERO; n];
    let mut dst = vec![Vec4::ZERO; n];
    transport(
        dims,
        src,
        &velocity,
        AdvectionPassParams { precision, scale },
        &mut forward,
        &mut backward,
        &mut dst,
    );
    dst
}

/// Deterministic, non-trivial sediment field.
fn patterned_field(dims: GridDims) -> Vec<Vec4> {
    (0..dims.cell_count())
        .map(|i| {
            let f = i as f32;
            Vec4::new((f * 0.37).sin().abs(), (f * 0.11).cos().abs(), f % 3.0, 0.0)
        })
        .collect()
}

fn total(field: &[Vec4]) -> f32 {
    field.iter().map(|v| v.element_sum()).sum()
}

// =============================================================================
// IDENTITY
// =============================================================================

#[test]
fn test_zero_velocity_is_identity_fast() {
    let dims = GridDims::new(12, 9, 0.5);
    let src = patterned_field(dims);
    let out = run(dims, &src, Vec2::ZERO, 1.0, AdvectionPrecision::Fast);
    assert_eq!(out, src);
}

#[test]
fn test_zero_velocity_is_identity_maccormack() {
    let dims = GridDims::new(12, 9, 0.5);
    let src = patterned_field(dims);
    let out = run(dims, &src, Vec2::ZERO, 1.0, AdvectionPrecision::MacCormack);
    for (a, b) in out.iter().zip(&src) {
        assert!((*a - *b).abs().max_element() < 1e-6, "{a:?} != {b:?}");
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

#[test]
fn test_sediment_moves_downstream() {
    let dims = GridDims::new(10, 10, 1.0);
    let mut src = vec![Vec4::ZERO; 100];
    src[dims.idx(3, 5)] = Vec4::Y;

    for precision in [AdvectionPrecision::Fast, AdvectionPrecision::MacCormack] {
        let out = run(dims, &src, Vec2::new(0.0, 2.0), 1.0, precision);
        assert!(out[dims.idx(3, 7)].y > 0.99, "{precision:?}");
        assert_eq!(out[dims.idx(3, 5)].y, 0.0, "{precision:?}");
    }
}

#[test]
fn test_mass_carried_off_grid_is_lost() {
    let dims = GridDims::new(6, 1, 1.0);
    let mut src = vec![Vec4::ZERO; 6];
    src[5] = Vec4::X;
    let out = run(dims, &src, Vec2::new(3.0, 0.0), 1.0, AdvectionPrecision::Fast);
    assert!(total(&out) < total(&src));
}

#[test]
fn test_inflow_edge_does_not_create_mass() {
    let dims = GridDims::new(6, 1, 1.0);
    let mut src = vec![Vec4::ZERO; 6];
    src[0] = Vec4::X;
    for precision in [AdvectionPrecision::Fast, AdvectionPrecision::MacCormack] {
        let out = run(dims, &src, Vec2::new(0.5, 0.0), 1.0, precision);
        assert!(total(&out) <= total(&src) + 1e-6, "{precision:?}: {}", total(&out));
        assert!((out[0].x - 0.5).abs() < 1e-6, "{precision:?}: {}", out[0].x);
    }
}

#[test]
fn test_maccormack_less_diffusive_than_fast() {
    let dims = GridDims::new(32, 1, 1.0);
    let mut src = vec![Vec4::ZERO; 32];
    src[10] = Vec4::X;

    let fast = run(dims, &src, Vec2::new(0.5, 0.0), 1.0, AdvectionPrecision::Fast);
    let mc = run(dims, &src, Vec2::new(0.5, 0.0), 1.0, AdvectionPrecision::MacCormack);

    let peak = |f: &[Vec4]| f.iter().map(|v| v.x).fold(0.0_f32, f32::max);
    assert!(peak(&mc) > peak(&fast), "mc {} vs fast {}", peak(&mc), peak(&fast));
    assert!(mc.iter().all(|v| v.x >= 0.0 && v.x <= 1.0));
}

// =============================================================================
// THROUGH THE SIMULATION
// =============================================================================

#[test]
fn test_advection_skipped_without_hydraulic_layers() {
    let dims = GridDims::new(8, 8, 1.0);
    let settings = SimulationSettings::with_layers(2);
    let terrain = TerrainState::from_heights(dims, 2, vec![Vec4::new(1.0, 1.0, 0.0, 0.0); 64]);
    let mut sim = TerrainSimulation::from_terrain(terrain, settings, Capabilities::default()).unwrap();

    let brush = ModifierBrush::circle(Vec2::new(4.0, 4.0), 2.0);
    sim.apply_sediment_edit(
        &SedimentEdit {
            brush,
            op: BlendOp::Set,
            layer: 1,
            strength: 0.5,
        },
        0.0,
    );
    let before = sim.sediment().to_vec();

    let mut fluid = FluidState::new(dims);
    fluid.velocity.fill(Vec2::new(3.0, 0.0));
    fluid.heights.fill(Vec2::new(1.0, 0.0));
    sim.step(0.5, 1, &mut fluid, &ModifierRegistry::new());

    assert_eq!(sim.sediment(), before.as_slice());
}
