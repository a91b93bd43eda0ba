//! Interpolation operator between vertical representations.

use super::fem::{edge_blend_weights, locate_element, validate_column_shapes, PARAM_EPS};
use super::operator::{ColumnBasis, ColumnOperator};
use crate::error::Result;
use crate::polynomial::lagrange_interp_coeffs;

/// Build the interpolation operator from `source` values to the output
/// coordinates `reta_out`.
///
/// For a continuous (interface) source, each output row interpolates
/// through the `order + 1` interface points of the containing element;
/// outputs coinciding with an interface copy the shared value directly.
/// For a discontinuous (level) source, each row interpolates through the
/// `order` level points of the containing element; outputs on an internal
/// element boundary average the two one-sided interpolants with
/// error-minimizing weights. With `zero_boundaries`, rows at the global
/// bottom (REta = 0) and top (REta = 1) are left zero.
pub fn interp(
    source: ColumnBasis,
    order: usize,
    reta_node: &[f64],
    reta_edge: &[f64],
    reta_out: &[f64],
    zero_boundaries: bool,
) -> Result<ColumnOperator> {
    let nfe = validate_column_shapes(order, reta_node, reta_edge)?;
    let n_out = reta_out.len();

    let n_in = match source {
        ColumnBasis::Interfaces => reta_node.len() + 1,
        ColumnBasis::Levels => reta_node.len(),
    };
    let mut op = ColumnOperator::zeros(n_in, n_out);

    // Skip rows pinned to zero at the domain boundaries
    let mut l_begin = 0;
    let mut l_end = n_out;
    if zero_boundaries && reta_out[0].abs() < PARAM_EPS {
        l_begin = 1;
    }
    if zero_boundaries && (reta_out[n_out - 1] - 1.0).abs() < PARAM_EPS {
        l_end = n_out - 1;
    }

    for l in l_begin..l_end {
        let (a, on_edge) = locate_element(reta_edge, order, nfe, reta_out[l]);

        match source {
            ColumnBasis::Interfaces => {
                if on_edge {
                    // The continuous basis owns the shared edge value
                    *op.coeff_mut(l, (a + 1) * order) = 1.0;
                    op.set_row_support(l, (a + 1) * order, (a + 1) * order + 1);
                } else {
                    let pts = &reta_edge[a * order..(a + 1) * order + 1];
                    let coeffs = lagrange_interp_coeffs(pts, reta_out[l]);
                    for (k, &c) in coeffs.iter().enumerate() {
                        *op.coeff_mut(l, a * order + k) = c;
                    }
                    op.set_row_support(l, a * order, (a + 1) * order + 1);
                }
            }

            ColumnBasis::Levels => {
                // With a single node per element the in-element interpolant
                // is O(Δ); widen the stencil at the domain boundaries
                if order == 1 && l == 0 && nfe > 1 {
                    let pts = &reta_node[a..a + 2];
                    let coeffs = lagrange_interp_coeffs(pts, reta_out[l]);
                    for (k, &c) in coeffs.iter().enumerate() {
                        *op.coeff_mut(l, a + k) = c;
                    }
                    op.set_row_support(l, a, a + 2);
                } else if order == 1 && l == n_out - 1 && nfe > 1 {
                    let pts = &reta_node[a - 1..a + 1];
                    let coeffs = lagrange_interp_coeffs(pts, reta_out[l]);
                    for (k, &c) in coeffs.iter().enumerate() {
                        *op.coeff_mut(l, a - 1 + k) = c;
                    }
                    op.set_row_support(l, a - 1, a + 1);
                } else {
                    let pts = &reta_node[a * order..(a + 1) * order];
                    let coeffs = lagrange_interp_coeffs(pts, reta_out[l]);
                    for (k, &c) in coeffs.iter().enumerate() {
                        *op.coeff_mut(l, a * order + k) = c;
                    }
                    op.set_row_support(l, a * order, (a + 1) * order);
                }

                // On an internal edge, blend the left and right one-sided
                // interpolants to minimize the interpolation error. This
                // does not guarantee minimum error under sub-element
                // stretching of REta.
                if on_edge {
                    let delta_l = reta_edge[(a + 1) * order] - reta_edge[a * order];
                    let delta_r = reta_edge[(a + 2) * order] - reta_edge[(a + 1) * order];
                    let (w_l, w_r) = edge_blend_weights(delta_l, delta_r, order);

                    let pts_r = &reta_node[(a + 1) * order..(a + 2) * order];
                    let coeffs_r = lagrange_interp_coeffs(pts_r, reta_out[l]);

                    for k in a * order..(a + 1) * order {
                        *op.coeff_mut(l, k) *= w_l;
                    }
                    for (k, &c) in coeffs_r.iter().enumerate() {
                        *op.coeff_mut(l, (a + 1) * order + k) = w_r * c;
                    }
                    op.set_row_support(l, a * order, (a + 2) * order);
                }
            }
        }
    }

    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VerticalCoordinate;

    const TOL: f64 = 1e-12;

    fn uniform_column(nfe: usize, order: usize) -> (Vec<f64>, Vec<f64>) {
        let vc = VerticalCoordinate::uniform(nfe, order);
        (vc.reta_node.clone(), vc.reta_edge.clone())
    }

    #[test]
    fn test_rows_sum_to_one() {
        for order in [1, 2, 4] {
            let (node, edge) = uniform_column(6, order);
            let op = interp(ColumnBasis::Levels, order, &node, &edge, &edge, false).unwrap();
            for l in 0..op.n_out() {
                let sum: f64 = (0..op.n_in()).map(|k| op.coeff(l, k)).sum();
                assert!(
                    (sum - 1.0).abs() < TOL,
                    "order {order}, row {l}: sum = {sum}"
                );
            }
        }
    }

    #[test]
    fn test_reproduces_output_coordinate() {
        // Interpolating the identity ordinate returns the output coordinate
        let order = 3;
        let (node, edge) = uniform_column(5, order);
        let op = interp(ColumnBasis::Levels, order, &node, &edge, &edge, false).unwrap();
        let out = op.apply_vec(&node);
        for (l, (&got, &want)) in out.iter().zip(edge.iter()).enumerate() {
            // Edge blending is error-weighted, not exact for generic data,
            // but the identity is linear and reproduced exactly
            assert!((got - want).abs() < 1e-10, "row {l}: {got} vs {want}");
        }
    }

    #[test]
    fn test_interfaces_source_is_cardinal_on_edges() {
        let order = 2;
        let (node, edge) = uniform_column(4, order);
        let op = interp(ColumnBasis::Interfaces, order, &node, &edge, &node, false).unwrap();
        // Apply to interface identity ordinate: recover node positions
        let out = op.apply_vec(&edge);
        for (l, (&got, &want)) in out.iter().zip(node.iter()).enumerate() {
            assert!((got - want).abs() < TOL, "row {l}: {got} vs {want}");
        }
    }

    #[test]
    fn test_zero_boundaries_leaves_end_rows_empty() {
        let order = 2;
        let (node, edge) = uniform_column(4, order);
        let op = interp(ColumnBasis::Levels, order, &node, &edge, &edge, true).unwrap();
        assert_eq!(op.row_support(0), (0, 0));
        assert_eq!(op.row_support(op.n_out() - 1), (0, 0));

        let out = op.apply_vec(&vec![1.0; node.len()]);
        assert_eq!(out[0], 0.0);
        assert_eq!(*out.last().unwrap(), 0.0);
    }

    #[test]
    fn test_bandwidth_bound() {
        for order in [1, 2, 3, 4] {
            let (node, edge) = uniform_column(6, order);
            let op = interp(ColumnBasis::Levels, order, &node, &edge, &edge, false).unwrap();
            assert!(
                op.bandwidth() <= 2 * (order + 1),
                "order {order}: bandwidth {}",
                op.bandwidth()
            );
        }
    }

    #[test]
    fn test_shape_validation() {
        let (node, edge) = uniform_column(4, 2);
        assert!(interp(ColumnBasis::Levels, 3, &node, &edge, &edge, false).is_err());
        assert!(interp(ColumnBasis::Levels, 2, &node, &node, &edge, false).is_err());
    }
}
