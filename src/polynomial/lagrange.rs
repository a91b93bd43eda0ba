//! Lagrange interpolation and derivative coefficients.
//!
//! Given sample points x_0..x_{n-1}, the interpolation coefficients at x*
//! are the values L_i(x*) of the cardinal basis, so that
//! p(x*) = Σ L_i(x*) f_i. Interpolation uses the barycentric form for
//! stability; Σ L_i(x*) = 1 by construction. Derivative coefficients
//! satisfy Σ L'_i(x*) = 0.

/// Tolerance below which x* is treated as coincident with a sample point.
const NODE_EPS: f64 = 1e-14;

/// Barycentric weights w_i = 1 / Π_{j≠i} (x_i - x_j).
fn barycentric_weights(points: &[f64]) -> Vec<f64> {
    let n = points.len();
    let mut w = vec![1.0; n];
    for i in 0..n {
        for j in 0..n {
            if j != i {
                w[i] /= points[i] - points[j];
            }
        }
    }
    w
}

/// Lagrange interpolation coefficients L_i(x) at an arbitrary point.
///
/// The coefficients sum to 1. If `x` coincides with a sample point the
/// result is the corresponding cardinal vector.
pub fn lagrange_interp_coeffs(points: &[f64], x: f64) -> Vec<f64> {
    let n = points.len();
    debug_assert!(n > 0, "at least one sample point required");

    // Exact hit on a node short-circuits the barycentric form
    for (i, &xi) in points.iter().enumerate() {
        if (x - xi).abs() < NODE_EPS {
            let mut coeffs = vec![0.0; n];
            coeffs[i] = 1.0;
            return coeffs;
        }
    }

    let w = barycentric_weights(points);
    let terms: Vec<f64> = (0..n).map(|i| w[i] / (x - points[i])).collect();
    let denom: f64 = terms.iter().sum();

    terms.iter().map(|t| t / denom).collect()
}

/// Derivative coefficients L'_i(x) of the Lagrange interpolant.
///
/// Direct product-rule evaluation:
/// L'_i(x) = Σ_{m≠i} (1/(x_i - x_m)) Π_{j≠i,m} (x - x_j)/(x_i - x_j).
/// The coefficients sum to 0 for any x.
pub fn lagrange_diff_coeffs(points: &[f64], x: f64) -> Vec<f64> {
    let n = points.len();
    debug_assert!(n > 0, "at least one sample point required");

    let mut coeffs = vec![0.0; n];
    for i in 0..n {
        let mut sum = 0.0;
        for m in 0..n {
            if m == i {
                continue;
            }
            let mut term = 1.0 / (points[i] - points[m]);
            for j in 0..n {
                if j != i && j != m {
                    term *= (x - points[j]) / (points[i] - points[j]);
                }
            }
            sum += term;
        }
        coeffs[i] = sum;
    }
    coeffs
}
