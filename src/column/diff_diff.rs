//! Second-derivative column operator on a continuous GLL-node basis.
//!
//! Assembled element by element from the GLL mass/stiffness identity
//! D² = -M⁻¹ (Dᵀ M D), with the shared-interface mass weight doubled on
//! contact nodes and one-sided flux terms ±D/W added at the global top
//! and bottom so that the operator is exact on polynomials spanning the
//! element.

use super::operator::ColumnOperator;
use crate::error::{ModelError, Result};
use crate::polynomial::{gauss_lobatto_points, lagrange_diff_coeffs};

/// Build the second-derivative operator on a continuous GLL-node basis.
///
/// `n_pts` is the number of points per finite element; elements share
/// endpoint values so `points.len() = nfe · (n_pts - 1) + 1`. The result
/// is square.
pub fn diff_diff_gll(n_pts: usize, points: &[f64]) -> Result<ColumnOperator> {
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
    let n = points.len();

    let mut op = ColumnOperator::zeros(n, n);

    for a in 0..nfe {
        let elem = &points[a * stride..a * stride + n_pts];
        let (_, w) = gauss_lobatto_points(n_pts, elem[0], elem[n_pts - 1]);

        // Local differentiation coefficients: row s holds L'_i(x_s)
        let local_diff: Vec<Vec<f64>> = (0..n_pts)
            .map(|s| lagrange_diff_coeffs(elem, elem[s]))
            .collect();

        for j in 0..n_pts {
            let jx = a * stride + j;

            // Contact nodes carry the mass of both adjacent elements
            let mut w_local = w[j];
            if j == 0 && a != 0 {
                w_local *= 2.0;
            }
            if j == n_pts - 1 && a != nfe - 1 {
                w_local *= 2.0;
            }

            for i in 0..n_pts {
                let ix = a * stride + i;
                let mut sum = 0.0;
                for s in 0..n_pts {
                    sum -= local_diff[s][j] * local_diff[s][i] * w[s] / w_local;
                }
                *op.coeff_mut(jx, ix) += sum;
            }
            op.widen_row_support(jx, a * stride, a * stride + n_pts);
        }

        // One-sided flux terms at the domain boundaries
        if a == 0 {
            for i in 0..n_pts {
                *op.coeff_mut(0, i) -= local_diff[0][i] / w[0];
            }
        }
        if a == nfe - 1 {
            for i in 0..n_pts {
                *op.coeff_mut(n - 1, a * stride + i) +=
                    local_diff[n_pts - 1][i] / w[n_pts - 1];
            }
        }
    }

    Ok(op)
}
