//! Column operator round trip: interpolate levels → interfaces, then
//! differentiate interfaces → levels, and recover the analytic derivative
//! of a smooth field.

use hevi_rs::column::{diff_interface, interp, ColumnBasis};
use hevi_rs::grid::VerticalCoordinate;
use std::f64::consts::PI;

#[test]
fn test_roundtrip_recovers_derivative_of_sine() {
    // Vertical order 4; the resolution is chosen so the interpolation
    // error bound sits below the 1e-8 acceptance threshold
    let order = 4;
    let nfe = 700;
    let vc = VerticalCoordinate::uniform(nfe, order);

    let op_interp = interp(
        ColumnBasis::Levels,
        order,
        &vc.reta_node,
        &vc.reta_edge,
        &vc.reta_edge,
        false,
    )
    .unwrap();
    let op_diff = diff_interface(
        ColumnBasis::Interfaces,
        order,
        &vc.reta_node,
        &vc.reta_edge,
        &vc.reta_node,
        false,
    )
    .unwrap();

    let input: Vec<f64> = vc.reta_node.iter().map(|&x| (PI * x).sin()).collect();
    let on_edges = op_interp.apply_vec(&input);
    let deriv = op_diff.apply_vec(&on_edges);

    let mut max_err: f64 = 0.0;
    for (k, &d) in deriv.iter().enumerate() {
        let exact = PI * (PI * vc.reta_node[k]).cos();
        max_err = max_err.max((d - exact).abs());
    }
    assert!(
        max_err < 1.0e-8,
        "round-trip derivative error {max_err:.3e} exceeds 1e-8"
    );
}

#[test]
fn test_composed_operator_matches_sequential_application() {
    let order = 3;
    let nfe = 12;
    let vc = VerticalCoordinate::uniform(nfe, order);

    let op_interp = interp(
        ColumnBasis::Levels,
        order,
        &vc.reta_node,
        &vc.reta_edge,
        &vc.reta_edge,
        false,
    )
    .unwrap();
    let op_diff = diff_interface(
        ColumnBasis::Interfaces,
        order,
        &vc.reta_node,
        &vc.reta_edge,
        &vc.reta_node,
        false,
    )
    .unwrap();
    let composed = op_diff.compose_with(&op_interp);

    let input: Vec<f64> = vc
        .reta_node
        .iter()
        .map(|&x| 0.3 + x * x * (1.0 - x))
        .collect();

    let sequential = op_diff.apply_vec(&op_interp.apply_vec(&input));
    let direct = composed.apply_vec(&input);

    for (k, (&a, &b)) in sequential.iter().zip(direct.iter()).enumerate() {
        assert!(
            (a - b).abs() < 1e-12,
            "row {k}: sequential {a} vs composed {b}"
        );
    }
    assert!(composed.bandwidth() <= 2 * (order + 1) + order);
}

#[test]
fn test_roundtrip_exact_on_polynomials_in_space() {
    // Degree ≤ order-1 data lies in the discontinuous space: the round
    // trip reproduces its derivative to roundoff
    let order = 4;
    let vc = VerticalCoordinate::uniform(10, order);

    let op_interp = interp(
        ColumnBasis::Levels,
        order,
        &vc.reta_node,
        &vc.reta_edge,
        &vc.reta_edge,
        false,
    )
    .unwrap();
    let op_diff = diff_interface(
        ColumnBasis::Interfaces,
        order,
        &vc.reta_node,
        &vc.reta_edge,
        &vc.reta_node,
        false,
    )
    .unwrap();

    let input: Vec<f64> = vc
        .reta_node
        .iter()
        .map(|&x| 1.0 - 2.0 * x + 3.0 * x * x * x)
        .collect();
    let deriv = op_diff.apply_vec(&op_interp.apply_vec(&input));

    for (k, &d) in deriv.iter().enumerate() {
        let exact = -2.0 + 9.0 * vc.reta_node[k] * vc.reta_node[k];
        assert!((d - exact).abs() < 1e-9, "row {k}: {d} vs {exact}");
    }
}
