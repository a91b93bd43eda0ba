//! Flux-correction functions for the discontinuous vertical basis.
//!
//! The flux-correction derivative operator recovers a continuous first
//! derivative on the discontinuous (level) basis by adding a correction
//! term proportional to the jump between the locally extrapolated edge
//! value and the shared edge flux. The correction function used here is
//! the right Radau polynomial of the requested order, mapped onto the
//! element reference coordinate ξ ∈ [0, 1] and normalized so that
//! g(0) = 0 and g(1) = 1: the correction acts at the right element edge
//! and vanishes at the left. The left-edge correction is the mirror
//! g(1 - ξ) with the sign of the derivative flipped.

use super::legendre::{legendre, legendre_derivative};

/// Value of the right-edge correction function g(ξ) of the given order.
///
/// g(ξ) = R_m(1 - 2ξ) where R_m(x) = (-1)^m (P_m(x) - P_{m-1}(x)) / 2 is
/// the right Radau polynomial of degree m, so g(0) = 0 and g(1) = 1.
pub fn flux_correction_value(order: usize, xi: f64) -> f64 {
    debug_assert!(order >= 1, "correction order must be at least 1");

    let x = 1.0 - 2.0 * xi;
    let sign = if order % 2 == 0 { 1.0 } else { -1.0 };
    sign * (legendre(order, x) - legendre(order - 1, x)) / 2.0
}

/// Derivative g'(ξ) of the right-edge correction function.
pub fn flux_correction_derivative(order: usize, xi: f64) -> f64 {
    debug_assert!(order >= 1, "correction order must be at least 1");

    let x = 1.0 - 2.0 * xi;
    let sign = if order % 2 == 0 { 1.0 } else { -1.0 };
    // Chain rule: d/dξ = -2 d/dx
    -sign * (legendre_derivative(order, x) - legendre_derivative(order - 1, x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_values() {
        for order in 1..=8 {
            let g0 = flux_correction_value(order, 0.0);
            let g1 = flux_correction_value(order, 1.0);
            assert!(g0.abs() < 1e-14, "order {order}: g(0) = {g0}");
            assert!((g1 - 1.0).abs() < 1e-14, "order {order}: g(1) = {g1}");
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let h = 1e-7;
        for order in 1..=6 {
            for &xi in &[0.1, 0.35, 0.5, 0.72, 0.9] {
                let fd = (flux_correction_value(order, xi + h)
                    - flux_correction_value(order, xi - h))
                    / (2.0 * h);
                let exact = flux_correction_derivative(order, xi);
                assert!(
                    (fd - exact).abs() < 1e-5,
                    "order {order}, xi {xi}: fd={fd}, exact={exact}"
                );
            }
        }
    }

    #[test]
    fn test_order_one_is_linear_ramp() {
        // R_1(x) = (1 - x)/2, so g(ξ) = ξ and g' = 1
        for &xi in &[0.0, 0.3, 1.0] {
            assert!((flux_correction_value(1, xi) - xi).abs() < 1e-14);
            assert!((flux_correction_derivative(1, xi) - 1.0).abs() < 1e-14);
        }
    }
}
