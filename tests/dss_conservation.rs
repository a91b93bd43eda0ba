//! Direct stiffness summation across patch seams: conservation of the
//! J-weighted integrals and idempotency.

use hevi_rs::column::ColumnBasis;
use hevi_rs::{
    CartesianGrid, EquationSet, GridDescriptor, PhysicalConstants, ThermalBubbleTest,
    UniformStretch,
};

fn build_two_patch_grid() -> CartesianGrid {
    let test = ThermalBubbleTest::default();
    let mut desc = GridDescriptor::periodic_box(test.domain(), 8, 2, 6, 4, 1);
    desc.patches_a = 2;
    let mut grid = CartesianGrid::new(
        desc,
        PhysicalConstants::earth(),
        EquationSet::new(3, 0).unwrap(),
        Box::new(UniformStretch),
        4,
    )
    .unwrap();
    grid.evaluate_test_case(&test, 0.0, 0).unwrap();
    grid
}

/// Roughen the field so element-boundary copies genuinely disagree before
/// DSS is applied.
fn perturb_state(grid: &mut CartesianGrid, slot: usize) {
    for patch in &mut grid.patches {
        let (n_k, n_a, n_b) = patch.state[slot].node.comp(0).dims();
        for c in 0..5 {
            let field = patch.state[slot].node.comp_mut(c);
            for k in 0..n_k {
                for i in 0..n_a {
                    for j in 0..n_b {
                        let bump = ((i * 7 + j * 3 + k * 11 + c) % 13) as f64 * 1.0e-3;
                        field.add(k, i, j, bump);
                    }
                }
            }
        }
    }
}

#[test]
fn test_dss_preserves_weighted_integrals() {
    let mut grid = build_two_patch_grid();
    perturb_state(&mut grid, 0);
    grid.exchange_halos(0).unwrap();

    let before: Vec<f64> = (0..5)
        .map(|c| grid.global_integral(0, c, ColumnBasis::Levels))
        .collect();

    grid.apply_dss(0);

    for (c, &b) in before.iter().enumerate() {
        let after = grid.global_integral(0, c, ColumnBasis::Levels);
        let scale = b.abs().max(1.0);
        assert!(
            ((after - b) / scale).abs() < 1e-13,
            "component {c}: integral {b} -> {after}"
        );
    }
}

#[test]
fn test_dss_is_idempotent() {
    let mut grid = build_two_patch_grid();
    perturb_state(&mut grid, 0);

    grid.exchange_halos(0).unwrap();
    grid.apply_dss(0);

    // Snapshot after the first application
    let snapshot: Vec<Vec<f64>> = grid
        .patches
        .iter()
        .map(|p| p.state[0].node.comp(2).as_slice().to_vec())
        .collect();

    grid.exchange_halos(0).unwrap();
    grid.apply_dss(0);

    for (p, patch) in grid.patches.iter().enumerate() {
        let now = patch.state[0].node.comp(2).as_slice();
        for (idx, (&a, &b)) in snapshot[p].iter().zip(now.iter()).enumerate() {
            assert!(
                a == b,
                "patch {p}, value {idx}: second DSS changed {a} to {b}"
            );
        }
    }
}

#[test]
fn test_dss_makes_seam_values_agree() {
    let mut grid = build_two_patch_grid();
    perturb_state(&mut grid, 0);
    grid.exchange_halos(0).unwrap();
    grid.apply_dss(0);
    grid.exchange_halos(0).unwrap();

    // After DSS + exchange, the first interior node of a patch carries the
    // same value as the coincident node in its halo copy of the neighbor
    for patch in &grid.patches {
        let field = patch.state[0].node.comp(2);
        let (n_k, _, _) = field.dims();
        let i_in = patch.bx.a_interior_begin();
        let i_halo = i_in - 1;
        for k in 0..n_k {
            for j in patch.bx.b_interior_begin()..patch.bx.b_interior_end() {
                let a = field.get(k, i_in, j);
                let b = field.get(k, i_halo, j);
                assert!(
                    (a - b).abs() < 1e-14 * a.abs().max(1.0),
                    "seam mismatch at k={k}, j={j}: {a} vs {b}"
                );
            }
        }
    }
}
