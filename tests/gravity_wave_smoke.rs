//! Short end-to-end run of the inertia-gravity wave channel, plus
//! coverage of the three vertical staggering modes and the covariant
//! velocity form.

use hevi_rs::column::ColumnBasis;
use hevi_rs::equations::var;
use hevi_rs::{
    CartesianGrid, EquationSet, GridDescriptor, HeviIntegrator, HorizontalDynamics,
    InertiaGravityWaveTest, PhysicalConstants, TimeScheme, TimestepOptions, UniformStretch,
    VelocityForm, VerticalDynamics, VerticalStaggering, ACTIVE_SLOT,
};

fn build_wave_grid(
    staggering: VerticalStaggering,
    velocity_form: VelocityForm,
) -> CartesianGrid {
    let test = InertiaGravityWaveTest::default();
    let mut desc = GridDescriptor::periodic_box(test.domain(), 8, 1, 10, 4, 1);
    desc.staggering = staggering;
    desc.velocity_form = velocity_form;
    let mut grid = CartesianGrid::new(
        desc,
        PhysicalConstants::earth(),
        EquationSet::new(3, 0).unwrap(),
        Box::new(UniformStretch),
        HeviIntegrator::required_slots(TimeScheme::Ark2),
    )
    .unwrap();
    grid.evaluate_test_case(&test, 0.0, ACTIVE_SLOT).unwrap();
    grid
}

fn rho_location(staggering: VerticalStaggering) -> ColumnBasis {
    staggering.location(var::R)
}

#[test]
fn test_stratified_channel_short_run() {
    let mut grid = build_wave_grid(
        VerticalStaggering::CharneyPhillips,
        VelocityForm::Contravariant,
    );

    let loc = rho_location(VerticalStaggering::CharneyPhillips);
    let mass_before = grid.global_integral(ACTIVE_SLOT, var::R, loc);

    let integrator = HeviIntegrator::new(
        TimestepOptions::new(TimeScheme::Ark2, 1.0),
        HorizontalDynamics::default(),
        VerticalDynamics::default(),
    );
    integrator.run(&mut grid, 0.0, 3.0).unwrap();

    let mass_after = grid.global_integral(ACTIVE_SLOT, var::R, loc);
    assert!(
        ((mass_after - mass_before) / mass_before).abs() < 1e-6,
        "mass drifted: {mass_before} -> {mass_after}"
    );

    // The balanced background launches only a weak transient: vertical
    // momentum stays far below the buoyancy-oscillation scale
    for patch in &grid.patches {
        for v in patch.state[ACTIVE_SLOT].edge.comp(var::W).as_slice() {
            assert!(v.is_finite() && v.abs() < 1.0, "vertical momentum {v}");
        }
        // The mean flow survives advection through the periodic seam
        for i in patch.bx.a_interior_begin()..patch.bx.a_interior_end() {
            for j in patch.bx.b_interior_begin()..patch.bx.b_interior_end() {
                let ru = patch.state[ACTIVE_SLOT].node.comp(var::U).get(0, i, j);
                let rho = patch.ref_state.node.comp(var::R).get(0, i, j);
                let u = ru / rho;
                assert!(
                    (u - 20.0).abs() < 1.0,
                    "mean flow disturbed: u = {u} at ({i}, {j})"
                );
            }
        }
    }
}

#[test]
fn test_all_staggering_modes_step() {
    for staggering in [
        VerticalStaggering::Levels,
        VerticalStaggering::Interfaces,
        VerticalStaggering::CharneyPhillips,
    ] {
        let mut grid = build_wave_grid(staggering, VelocityForm::Contravariant);
        let integrator = HeviIntegrator::new(
            TimestepOptions::new(TimeScheme::Ark2, 0.5),
            HorizontalDynamics::default(),
            VerticalDynamics::default(),
        );
        integrator.run(&mut grid, 0.0, 0.5).unwrap();

        for patch in &grid.patches {
            for c in 0..5 {
                let field = match staggering.location(c) {
                    ColumnBasis::Levels => patch.state[ACTIVE_SLOT].node.comp(c),
                    ColumnBasis::Interfaces => patch.state[ACTIVE_SLOT].edge.comp(c),
                };
                for v in field.as_slice() {
                    assert!(v.is_finite(), "{staggering:?}: non-finite component {c}");
                }
            }
        }
    }
}

#[test]
fn test_covariant_no_flow_contract() {
    // Both velocity representations must leave zero flow through the
    // ground: u^ξ = g^{ξa} u_a + g^{ξb} u_b + g^{ξξ} w ∂_ξz = 0
    let mut grid = build_wave_grid(
        VerticalStaggering::CharneyPhillips,
        VelocityForm::Covariant,
    );
    grid.apply_boundary_conditions(ACTIVE_SLOT);

    for patch in &grid.patches {
        for i in patch.bx.a_interior_begin()..patch.bx.a_interior_end() {
            for j in patch.bx.b_interior_begin()..patch.bx.b_interior_end() {
                let ru = patch.state[ACTIVE_SLOT].node.comp(var::U).get(0, i, j);
                let rv = patch.state[ACTIVE_SLOT].node.comp(var::V).get(0, i, j);
                let rw = patch.state[ACTIVE_SLOT].edge.comp(var::W).get(0, i, j);
                let gxa = patch.contra_xi_edge.get(0, i, j, 0);
                let gxb = patch.contra_xi_edge.get(0, i, j, 1);
                let gxx = patch.contra_xi_edge.get(0, i, j, 2);
                let dx_z = patch.deriv_z_edge.get(0, i, j, 2);

                let normal_flow = gxa * ru + gxb * rv + gxx * rw * dx_z;
                assert!(
                    normal_flow.abs() < 1e-12 * (1.0 + ru.abs()),
                    "covariant normal flow {normal_flow:.3e} at ({i}, {j})"
                );
            }
        }
    }
}
