//! Short end-to-end run over terrain: the Schär mountain configuration at
//! coarse resolution exercises the terrain-following metric, the no-flow
//! boundary condition on a sloped surface and the Rayleigh sponge inside
//! the implicit column solve.

use hevi_rs::column::ColumnBasis;
use hevi_rs::equations::var;
use hevi_rs::{
    CartesianGrid, EquationSet, GridDescriptor, HeviIntegrator, HorizontalDynamics,
    HorizontalDynamicsConfig, PhysicalConstants, ScharMountainTest, TimeScheme,
    TimestepOptions, UniformStretch, VerticalDynamics, ACTIVE_SLOT,
};

fn build_mountain_grid() -> (CartesianGrid, ScharMountainTest) {
    let test = ScharMountainTest::default();
    let desc = GridDescriptor::periodic_box(test.domain(), 8, 1, 8, 4, 1);
    let mut grid = CartesianGrid::new(
        desc,
        PhysicalConstants::earth(),
        EquationSet::new(3, 0).unwrap(),
        Box::new(UniformStretch),
        HeviIntegrator::required_slots(TimeScheme::Ark2),
    )
    .unwrap();
    grid.evaluate_test_case(&test, 0.0, ACTIVE_SLOT).unwrap();
    (grid, test)
}

#[test]
fn test_rayleigh_strength_sampled_on_both_locations() {
    let (grid, test) = build_mountain_grid();
    let patch = &grid.patches[0];
    assert!(patch.has_rayleigh);

    let n_lvl = grid.n_levels();
    let n_int = grid.n_interfaces();
    let i = patch.bx.a_interior_begin();
    let j = patch.bx.b_interior_begin();

    // Zero below the sponge, positive and increasing inside it
    assert_eq!(patch.rayleigh_node.get(0, i, j), 0.0);
    assert_eq!(patch.rayleigh_edge.get(0, i, j), 0.0);
    let top_node = patch.rayleigh_node.get(n_lvl - 1, i, j);
    let top_edge = patch.rayleigh_edge.get(n_int - 1, i, j);
    assert!(top_node > 0.0, "sponge inactive on levels");
    assert!(
        (top_edge - test.rayleigh_strength).abs() < 1e-12,
        "peak sponge strength {top_edge}"
    );
}

#[test]
fn test_no_flow_follows_the_terrain_slope() {
    let (mut grid, _) = build_mountain_grid();
    // Re-impose the boundary condition and verify the contravariant
    // normal flow vanishes: ρw = ρu ∂_a z + ρv ∂_b z at the ground
    grid.apply_boundary_conditions(ACTIVE_SLOT);
    for patch in &grid.patches {
        for i in patch.bx.a_interior_begin()..patch.bx.a_interior_end() {
            for j in patch.bx.b_interior_begin()..patch.bx.b_interior_end() {
                let ru = patch.state[ACTIVE_SLOT].node.comp(var::U).get(0, i, j);
                let rv = patch.state[ACTIVE_SLOT].node.comp(var::V).get(0, i, j);
                let rw = patch.state[ACTIVE_SLOT].edge.comp(var::W).get(0, i, j);
                let da_z = patch.deriv_z_edge.get(0, i, j, 0);
                let db_z = patch.deriv_z_edge.get(0, i, j, 1);
                let normal_flow = rw - ru * da_z - rv * db_z;
                assert!(
                    normal_flow.abs() < 1e-12 * (1.0 + rw.abs()),
                    "normal flow {normal_flow:.3e} at ({i}, {j})"
                );
            }
        }
    }
}

#[test]
fn test_mountain_short_run_is_stable() {
    let (mut grid, _) = build_mountain_grid();

    let mass_before = grid.global_integral(ACTIVE_SLOT, var::R, ColumnBasis::Interfaces);

    let horizontal = HorizontalDynamics::new(HorizontalDynamicsConfig {
        nu_scalar: 1.0e-4,
        nu_div: 1.0e-4,
        reference_length: 1.0e5,
    });
    let integrator = HeviIntegrator::new(
        TimestepOptions::new(TimeScheme::Ark2, 0.2),
        horizontal,
        VerticalDynamics::default(),
    );
    integrator.run(&mut grid, 0.0, 0.4).unwrap();

    for patch in &grid.patches {
        for c in 0..5 {
            for v in patch.state[ACTIVE_SLOT].edge.comp(c).as_slice() {
                assert!(v.is_finite(), "component {c}: non-finite edge value");
            }
            for v in patch.state[ACTIVE_SLOT].node.comp(c).as_slice() {
                assert!(v.is_finite(), "component {c}: non-finite node value");
            }
        }
        // Density stays positive over the terrain
        for i in patch.bx.a_interior_begin()..patch.bx.a_interior_end() {
            for j in patch.bx.b_interior_begin()..patch.bx.b_interior_end() {
                for k in 0..grid.n_interfaces() {
                    assert!(
                        patch.state[ACTIVE_SLOT].edge.comp(var::R).get(k, i, j) > 0.0,
                        "density non-positive at k={k}"
                    );
                }
            }
        }
    }

    let mass_after = grid.global_integral(ACTIVE_SLOT, var::R, ColumnBasis::Interfaces);
    assert!(
        ((mass_after - mass_before) / mass_before).abs() < 1e-4,
        "mass drifted: {mass_before} -> {mass_after}"
    );
}
