//! First-derivative column operators.
//!
//! Two constructions are provided for the level/interface pair:
//! - the **interface method**, which differentiates a single polynomial
//!   through the `order + 1` interface points of the containing element and
//!   blends one-sided derivatives at internal element boundaries;
//! - the **flux-correction method**, which augments the local
//!   (discontinuous) derivative with correction terms proportional to the
//!   jumps between edge-extrapolated and shared edge values, yielding a
//!   continuous first derivative on the discontinuous basis.
//!
//! A third constructor differentiates a continuous GLL-node basis in place,
//! used when all variables are collocated on interfaces.

use super::fem::{edge_blend_weights, locate_element, validate_column_shapes};
use super::interp::interp;
use super::operator::{ColumnBasis, ColumnOperator};
use crate::error::{ModelError, Result};
use crate::polynomial::{
    flux_correction_derivative, lagrange_diff_coeffs, lagrange_interp_coeffs,
};

/// Build the interface-method derivative operator mapping `source` values
/// to d/dREta at the output coordinates.
///
/// The derivative is always formed on the continuous interface basis; when
/// the source representation is levels, the operator is composed with the
/// level→interface interpolation operator so that the result maps node
/// columns directly.
pub fn diff_interface(
    source: ColumnBasis,
    order: usize,
    reta_node: &[f64],
    reta_edge: &[f64],
    reta_out: &[f64],
    zero_boundaries: bool,
) -> Result<ColumnOperator> {
    let nfe = validate_column_shapes(order, reta_node, reta_edge)?;
    let n_out = reta_out.len();

    let mut op = ColumnOperator::zeros(reta_node.len() + 1, n_out);

    for l in 0..n_out {
        let (a, on_edge) = locate_element(reta_edge, order, nfe, reta_out[l]);

        let pts = &reta_edge[a * order..(a + 1) * order + 1];
        let coeffs = lagrange_diff_coeffs(pts, reta_out[l]);
        for (k, &c) in coeffs.iter().enumerate() {
            *op.coeff_mut(l, a * order + k) = c;
        }

        if !on_edge {
            op.set_row_support(l, a * order, (a + 1) * order + 1);
        } else {
            // Blend the left and right one-sided derivatives at the shared
            // interface, weighting each side by the other side's error
            let delta_l = reta_edge[(a + 1) * order] - reta_edge[a * order];
            let delta_r = reta_edge[(a + 2) * order] - reta_edge[(a + 1) * order];
            let (w_l, w_r) = edge_blend_weights(delta_l, delta_r, order);

            let pts_r = &reta_edge[(a + 1) * order..(a + 2) * order + 1];
            let coeffs_r = lagrange_diff_coeffs(pts_r, reta_out[l]);

            for k in 0..=order {
                *op.coeff_mut(l, a * order + k) *= w_l;
            }
            for (k, &c) in coeffs_r.iter().enumerate() {
                *op.coeff_mut(l, (a + 1) * order + k) += w_r * c;
            }
            op.set_row_support(l, a * order, (a + 2) * order + 1);
        }
    }

    if source == ColumnBasis::Levels {
        let op_interp = interp(
            ColumnBasis::Levels,
            order,
            reta_node,
            reta_edge,
            reta_edge,
            zero_boundaries,
        )?;
        return Ok(op.compose_with(&op_interp));
    }

    Ok(op)
}

/// Build the flux-correction derivative operator on the discontinuous
/// (level) basis.
///
/// Each output row evaluates the local strong derivative scaled by the
/// element width, adds the left- and right-edge corrections
/// ½ g'(ξ) · (ū − û) formed with the type-2 (right Radau) correction
/// family of order `order + 1`, then divides by the element width. Shared
/// edge values ū average the two one-sided extrapolations at internal
/// edges; at the domain top and bottom the jump is taken against the
/// interior side unless `zero_boundaries` is set or only one element
/// exists.
pub fn diff_flux_correction(
    order: usize,
    reta_node: &[f64],
    reta_edge: &[f64],
    reta_out: &[f64],
    zero_boundaries: bool,
) -> Result<ColumnOperator> {
    let nfe = validate_column_shapes(order, reta_node, reta_edge)?;
    let n_in = reta_node.len();
    let n_out = reta_out.len();

    let mut op = ColumnOperator::zeros(n_in, n_out);

    for l in 0..n_out {
        let (a, on_edge) = locate_element(reta_edge, order, nfe, reta_out[l]);

        if reta_out[l] < reta_edge[0] || reta_out[l] > reta_edge[n_in] {
            return Err(ModelError::Mesh(format!(
                "derivative output coordinate {} outside the column [{}, {}]",
                reta_out[l], reta_edge[0], reta_edge[n_in]
            )));
        }

        let delta = reta_edge[(a + 1) * order] - reta_edge[a * order];

        // Local strong derivative, pre-scaled by the element width so the
        // correction terms are formed in the reference coordinate
        let local = lagrange_diff_coeffs(
            &reta_node[a * order..(a + 1) * order],
            reta_out[l],
        );
        for (k, &c) in local.iter().enumerate() {
            *op.coeff_mut(l, a * order + k) = c;
        }

        if on_edge {
            let local_r = lagrange_diff_coeffs(
                &reta_node[(a + 1) * order..(a + 2) * order],
                reta_out[l],
            );
            for (k, &c) in local_r.iter().enumerate() {
                *op.coeff_mut(l, (a + 1) * order + k) = c;
            }
            for k in 0..n_in {
                *op.coeff_mut(l, k) *= 0.5 * delta;
            }
        } else {
            for k in 0..n_in {
                *op.coeff_mut(l, k) *= delta;
            }
        }

        // Correction-function derivatives at this point, in the element
        // reference coordinate (ξ from the left edge, 1-ξ from the right)
        let xi_r = (reta_out[l] - reta_edge[a * order]) / delta;
        let deriv_r = flux_correction_derivative(order, xi_r);
        let deriv_l = -flux_correction_derivative(order, 1.0 - xi_r);

        // Extrapolation coefficients of the local and neighbor elements to
        // the element edges
        let interp_lr = lagrange_interp_coeffs(
            &reta_node[a * order..(a + 1) * order],
            reta_edge[a * order],
        );
        let interp_rl = lagrange_interp_coeffs(
            &reta_node[a * order..(a + 1) * order],
            reta_edge[(a + 1) * order],
        );
        let interp_ll = if a != 0 {
            lagrange_interp_coeffs(
                &reta_node[(a - 1) * order..a * order],
                reta_edge[a * order],
            )
        } else {
            Vec::new()
        };
        let interp_rr = if a != nfe - 1 {
            lagrange_interp_coeffs(
                &reta_node[(a + 1) * order..(a + 2) * order],
                reta_edge[(a + 1) * order],
            )
        } else {
            Vec::new()
        };

        // Left-edge correction
        if a != 0 {
            if !on_edge {
                for k in 0..order {
                    *op.coeff_mut(l, (a - 1) * order + k) += 0.5 * deriv_l * interp_ll[k];
                }
            }
            for k in 0..order {
                *op.coeff_mut(l, a * order + k) -= 0.5 * deriv_l * interp_lr[k];
            }
        } else if !zero_boundaries && nfe != 1 {
            for k in 0..order {
                *op.coeff_mut(l, a * order + k) += 0.5 * deriv_l * interp_rl[k];
                *op.coeff_mut(l, (a + 1) * order + k) -= 0.5 * deriv_l * interp_rr[k];
            }
        }

        // Right-edge correction
        if a != nfe - 1 {
            for k in 0..order {
                *op.coeff_mut(l, (a + 1) * order + k) += 0.5 * deriv_r * interp_rr[k];
                *op.coeff_mut(l, a * order + k) -= 0.5 * deriv_r * interp_rl[k];
            }
        } else if !zero_boundaries && nfe != 1 {
            for k in 0..order {
                *op.coeff_mut(l, a * order + k) += 0.5 * deriv_r * interp_lr[k];
                *op.coeff_mut(l, (a - 1) * order + k) -= 0.5 * deriv_r * interp_ll[k];
            }
        }

        // Restore units
        for k in 0..n_in {
            *op.coeff_mut(l, k) /= delta;
        }

        let begin = if a != 0 { (a - 1) * order } else { a * order };
        let end = if a != nfe - 1 {
            (a + 2) * order
        } else {
            (a + 1) * order
        };
        op.set_row_support(l, begin, end);
    }

    Ok(op)
}

/// Build the derivative operator on a continuous GLL-node basis.
///
/// `n_pts` is the number of points per finite element; elements share their
/// endpoint values, so `points.len() = nfe · (n_pts - 1) + 1`. One-sided
/// derivatives are blended at internal element boundaries with the same
/// error weighting as the interface method.
pub fn diff_gll(n_pts: usize, points: &[f64], reta_out: &[f64]) -> Result<ColumnOperator> {
    if points.is_empty() {
        return Err(ModelError::Configuration(
            "column requires at least one point".into(),
        ));
    }
    if n_pts < 2 || (points.len() - 1) % (n_pts - 1) != 0 {
        return Err(ModelError::Configuration(format!(
            "point count {} does not tile elements of {} shared points",
            points.len(),
            n_pts
        )));
    }
    let stride = n_pts - 1;
    let nfe = (points.len() - 1) / stride;
    let n_out = reta_out.len();

    let mut op = ColumnOperator::zeros(points.len(), n_out);

    for l in 0..n_out {
        let (a, on_edge) = locate_element(points, stride, nfe, reta_out[l]);

        let pts = &points[a * stride..a * stride + n_pts];
        let coeffs = lagrange_diff_coeffs(pts, reta_out[l]);
        for (k, &c) in coeffs.iter().enumerate() {
            *op.coeff_mut(l, a * stride + k) = c;
        }

        if !on_edge {
            op.set_row_support(l, a * stride, (a + 1) * stride + 1);
        } else {
            let delta_l = points[(a + 1) * stride] - points[a * stride];
            let delta_r = points[(a + 2) * stride] - points[(a + 1) * stride];
            let (w_l, w_r) = edge_blend_weights(delta_l, delta_r, stride);

            let pts_r = &points[(a + 1) * stride..(a + 1) * stride + n_pts];
            let coeffs_r = lagrange_diff_coeffs(pts_r, reta_out[l]);

            for k in 0..n_pts {
                *op.coeff_mut(l, a * stride + k) *= w_l;
            }
            for (k, &c) in coeffs_r.iter().enumerate() {
                *op.coeff_mut(l, (a + 1) * stride + k) += w_r * c;
            }
            op.set_row_support(l, a * stride, (a + 2) * stride + 1);
        }
    }

    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VerticalCoordinate;
    use std::f64::consts::PI;

    fn uniform_column(nfe: usize, order: usize) -> (Vec<f64>, Vec<f64>) {
        let vc = VerticalCoordinate::uniform(nfe, order);
        (vc.reta_node.clone(), vc.reta_edge.clone())
    }

    #[test]
    fn test_interface_method_annihilates_constants() {
        for order in [1, 2, 4] {
            let (node, edge) = uniform_column(5, order);
            let op = diff_interface(ColumnBasis::Interfaces, order, &node, &edge, &node, false)
                .unwrap();
            let out = op.apply_vec(&vec![3.5; edge.len()]);
            for (l, &d) in out.iter().enumerate() {
                assert!(d.abs() < 1e-12, "order {order}, row {l}: {d}");
            }
        }
    }

    #[test]
    fn test_interface_method_exact_on_affine() {
        let order = 3;
        let (node, edge) = uniform_column(4, order);
        let input: Vec<f64> = edge.iter().map(|&x| 2.0 - 5.0 * x).collect();
        let op =
            diff_interface(ColumnBasis::Interfaces, order, &node, &edge, &edge, false).unwrap();
        let out = op.apply_vec(&input);
        for (l, &d) in out.iter().enumerate() {
            assert!((d + 5.0).abs() < 1e-10, "row {l}: {d}");
        }
    }

    #[test]
    fn test_node_source_composes_with_interp() {
        let order = 4;
        let (node, edge) = uniform_column(8, order);
        let op = diff_interface(ColumnBasis::Levels, order, &node, &edge, &node, false).unwrap();
        assert_eq!(op.n_in(), node.len());
        assert_eq!(op.n_out(), node.len());

        // Smooth field: derivative accurate to high order
        let input: Vec<f64> = node.iter().map(|&x| (PI * x).sin()).collect();
        let out = op.apply_vec(&input);
        for (l, &d) in out.iter().enumerate() {
            let exact = PI * (PI * node[l]).cos();
            assert!((d - exact).abs() < 5e-3, "row {l}: {d} vs {exact}");
        }
    }

    #[test]
    fn test_flux_correction_annihilates_constants() {
        for order in [1, 2, 3, 4] {
            let (node, edge) = uniform_column(6, order);
            let op = diff_flux_correction(order, &node, &edge, &node, false).unwrap();
            let out = op.apply_vec(&vec![-2.25; node.len()]);
            for (l, &d) in out.iter().enumerate() {
                assert!(d.abs() < 1e-12, "order {order}, row {l}: {d}");
            }
        }
    }

    #[test]
    fn test_flux_correction_exact_on_affine() {
        // Affine data extrapolates consistently from both sides, so the
        // jump corrections vanish and the local derivative is exact
        for order in [2, 3, 4] {
            let (node, edge) = uniform_column(5, order);
            let input: Vec<f64> = node.iter().map(|&x| 1.0 + 4.0 * x).collect();
            let op = diff_flux_correction(order, &node, &edge, &node, false).unwrap();
            let out = op.apply_vec(&input);
            for (l, &d) in out.iter().enumerate() {
                assert!((d - 4.0).abs() < 1e-10, "order {order}, row {l}: {d}");
            }
        }
    }

    #[test]
    fn test_flux_correction_order_one_is_centered_difference() {
        // One node per element: interior rows reduce to (u_{a+1} - u_{a-1})/2Δ
        let (node, edge) = uniform_column(8, 1);
        let op = diff_flux_correction(1, &node, &edge, &node, false).unwrap();
        let delta = 1.0 / 8.0;
        let input: Vec<f64> = node.iter().map(|&x| x * x).collect();
        let out = op.apply_vec(&input);
        for l in 1..7 {
            let expected = (input[l + 1] - input[l - 1]) / (2.0 * delta);
            assert!((out[l] - expected).abs() < 1e-12, "row {l}");
        }
    }

    #[test]
    fn test_gll_derivative_exact_on_polynomials() {
        let n_pts = 4;
        let vc = VerticalCoordinate::uniform(5, n_pts - 1);
        let points = vc.reta_edge.clone();
        let input: Vec<f64> = points.iter().map(|&x| x * x * x).collect();
        let op = diff_gll(n_pts, &points, &points).unwrap();
        let out = op.apply_vec(&input);
        for (l, &d) in out.iter().enumerate() {
            let exact = 3.0 * points[l] * points[l];
            assert!((d - exact).abs() < 1e-9, "row {l}: {d} vs {exact}");
        }
    }

    #[test]
    fn test_bandwidth_bound() {
        for order in [2, 3, 4] {
            let (node, edge) = uniform_column(7, order);
            let op = diff_flux_correction(order, &node, &edge, &node, false).unwrap();
            assert!(op.bandwidth() <= 2 * (order + 1), "order {order}");
            let op = diff_interface(ColumnBasis::Levels, order, &node, &edge, &node, false)
                .unwrap();
            assert!(op.bandwidth() <= 2 * (order + 1), "order {order}");
        }
    }
}
