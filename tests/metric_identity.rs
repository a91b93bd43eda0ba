//! Geometric-term invariants: metric inverse identity and the Jacobian of
//! the flat-topography box.

use hevi_rs::{
    CartesianGrid, EquationSet, GridDescriptor, PhysicalConstants, ScharMountainTest,
    ThermalBubbleTest, UniformStretch,
};

fn build_grid(bounds: [f64; 6], res: (usize, usize, usize)) -> CartesianGrid {
    let desc = GridDescriptor::periodic_box(bounds, res.0, res.1, res.2, 4, 2);
    CartesianGrid::new(
        desc,
        PhysicalConstants::earth(),
        EquationSet::new(3, 0).unwrap(),
        Box::new(UniformStretch),
        4,
    )
    .unwrap()
}

#[test]
fn test_flat_box_metric_is_identity_and_jacobian_uniform() {
    let test = ThermalBubbleTest::default();
    let mut grid = build_grid(test.domain(), (6, 2, 4));
    grid.evaluate_test_case(&test, 0.0, 0).unwrap();

    let z_top = grid.z_top();
    let n_lvl = grid.n_levels();

    for patch in &grid.patches {
        for k in 0..n_lvl {
            for i in patch.bx.a_interior_begin()..patch.bx.a_interior_end() {
                for j in patch.bx.b_interior_begin()..patch.bx.b_interior_end() {
                    // With flat topography the metric rows reduce to the
                    // identity exactly
                    let rows = [
                        [
                            patch.contra_a_node.get(k, i, j, 0),
                            patch.contra_a_node.get(k, i, j, 1),
                            patch.contra_a_node.get(k, i, j, 2),
                        ],
                        [
                            patch.contra_b_node.get(k, i, j, 0),
                            patch.contra_b_node.get(k, i, j, 1),
                            patch.contra_b_node.get(k, i, j, 2),
                        ],
                        [
                            patch.contra_xi_node.get(k, i, j, 0),
                            patch.contra_xi_node.get(k, i, j, 1),
                            patch.contra_xi_node.get(k, i, j, 2),
                        ],
                    ];
                    let gxx = 1.0 / (z_top * z_top);
                    let expected = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, gxx]];
                    for (r, row) in rows.iter().enumerate() {
                        for (c, &v) in row.iter().enumerate() {
                            assert!(
                                (v - expected[r][c]).abs() < 1e-14 * (1.0 + gxx),
                                "metric ({r},{c}) at k={k}: {v}"
                            );
                        }
                    }

                    // J = Δz/Δξ = z_top on the unit reference interval
                    let jac = patch.jacobian_node.get(k, i, j);
                    assert!(
                        (jac - z_top).abs() < 1e-14 * z_top,
                        "Jacobian at k={k}: {jac}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_metric_inverse_identity_with_terrain() {
    let test = ScharMountainTest::default();
    let mut grid = build_grid(test.domain(), (10, 1, 6));
    grid.evaluate_test_case(&test, 0.0, 0).unwrap();

    let n_lvl = grid.n_levels();

    for patch in &grid.patches {
        for k in 0..n_lvl {
            for i in patch.bx.a_interior_begin()..patch.bx.a_interior_end() {
                for j in patch.bx.b_interior_begin()..patch.bx.b_interior_end() {
                    let contra = [
                        [
                            patch.contra_a_node.get(k, i, j, 0),
                            patch.contra_a_node.get(k, i, j, 1),
                            patch.contra_a_node.get(k, i, j, 2),
                        ],
                        [
                            patch.contra_b_node.get(k, i, j, 0),
                            patch.contra_b_node.get(k, i, j, 1),
                            patch.contra_b_node.get(k, i, j, 2),
                        ],
                        [
                            patch.contra_xi_node.get(k, i, j, 0),
                            patch.contra_xi_node.get(k, i, j, 1),
                            patch.contra_xi_node.get(k, i, j, 2),
                        ],
                    ];
                    let cov = [
                        [
                            patch.cov_a_node.get(k, i, j, 0),
                            patch.cov_a_node.get(k, i, j, 1),
                            patch.cov_a_node.get(k, i, j, 2),
                        ],
                        [
                            patch.cov_b_node.get(k, i, j, 0),
                            patch.cov_b_node.get(k, i, j, 1),
                            patch.cov_b_node.get(k, i, j, 2),
                        ],
                        [
                            patch.cov_xi_node.get(k, i, j, 0),
                            patch.cov_xi_node.get(k, i, j, 1),
                            patch.cov_xi_node.get(k, i, j, 2),
                        ],
                    ];

                    for r in 0..3 {
                        for c in 0..3 {
                            let mut prod = 0.0;
                            for s in 0..3 {
                                prod += contra[r][s] * cov[s][c];
                            }
                            let expected = if r == c { 1.0 } else { 0.0 };
                            assert!(
                                (prod - expected).abs() < 1e-10,
                                "(g^ g)_({r},{c}) = {prod} at k={k}, i={i}, j={j}"
                            );
                        }
                    }

                    // Positivity invariants
                    assert!(patch.jacobian_node.get(k, i, j) > 0.0);
                    assert!(patch.deriv_z_node.get(k, i, j, 2) > 0.0);
                }
            }
        }
    }
}

#[test]
fn test_topography_above_cap_is_rejected() {
    // A mountain taller than z_top must fail at initialization
    let mut test = ScharMountainTest::default();
    test.h_0 = 30_000.0;
    let mut grid = build_grid(test.domain(), (10, 1, 6));
    let err = grid.evaluate_test_case(&test, 0.0, 0).unwrap_err();
    assert_eq!(err.category(), hevi_rs::ErrorCategory::Configuration);
}
