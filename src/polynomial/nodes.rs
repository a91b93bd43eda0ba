//! Quadrature points and weights on an arbitrary interval.
//!
//! Two families are used by the vertical discretization:
//! - Gauss-Lobatto-Legendre (GLL): n points including both endpoints; the
//!   continuous (interface) basis and the horizontal spectral elements.
//! - Gauss-Legendre: n interior points; the discontinuous (level) basis.
//!
//! Points are found by Newton iteration from Chebyshev initial guesses and
//! then mapped affinely from [-1, 1] to the requested interval. Weights are
//! scaled so that they sum to the interval length.

use super::legendre::{legendre, legendre_and_derivative};
use std::f64::consts::PI;

/// Map reference points/weights from [-1, 1] onto [x0, x1].
fn map_to_interval(points: &mut [f64], weights: &mut [f64], x0: f64, x1: f64) {
    let half = 0.5 * (x1 - x0);
    let mid = 0.5 * (x1 + x0);
    for p in points.iter_mut() {
        *p = mid + half * *p;
    }
    for w in weights.iter_mut() {
        *w *= half;
    }
}

/// Gauss-Lobatto-Legendre points and weights.
///
/// Returns `n_pts` points on [x0, x1] including both endpoints, with
/// weights summing to `x1 - x0`. Requires `n_pts >= 2`; orders 2..=8 are
/// the supported range of the dynamical core, larger values still converge.
///
/// Interior points are the roots of P'_{n-1}; the Newton update uses the
/// identity d/dx[(1-x²)P'_N] = -N(N+1) P_N.
pub fn gauss_lobatto_points(n_pts: usize, x0: f64, x1: f64) -> (Vec<f64>, Vec<f64>) {
    assert!(n_pts >= 2, "GLL rule requires at least 2 points");

    let n = n_pts - 1;

    // Chebyshev-Lobatto initial guesses
    let mut points: Vec<f64> = (0..=n)
        .map(|j| -(PI * j as f64 / n as f64).cos())
        .collect();

    points[0] = -1.0;
    points[n] = 1.0;

    for p in points.iter_mut().take(n).skip(1) {
        let mut x = *p;
        for _ in 0..100 {
            let (p_n, dp_n) = legendre_and_derivative(n, x);
            let update = (1.0 - x * x) * dp_n / (n as f64 * (n + 1) as f64 * p_n);
            x += update;
            if update.abs() < 1e-15 {
                break;
            }
        }
        *p = x;
    }

    // w_j = 2 / (N(N+1) P_N(x_j)²)
    let denom = (n * (n + 1)) as f64;
    let mut weights: Vec<f64> = points
        .iter()
        .map(|&x| {
            let p_n = legendre(n, x);
            2.0 / (denom * p_n * p_n)
        })
        .collect();

    map_to_interval(&mut points, &mut weights, x0, x1);
    (points, weights)
}

/// Gauss-Legendre points and weights.
///
/// Returns `n_pts` interior points on [x0, x1] (the roots of P_{n_pts}),
/// with weights summing to `x1 - x0`. Requires `n_pts >= 1`; a single
/// point is the interval midpoint with full weight.
pub fn gauss_points(n_pts: usize, x0: f64, x1: f64) -> (Vec<f64>, Vec<f64>) {
    assert!(n_pts >= 1, "Gauss rule requires at least 1 point");

    let n = n_pts;
    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    for i in 0..n {
        // Standard initial guess for the i-th root of P_n
        let mut x = -(PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();

        let mut dp = 0.0;
        for _ in 0..100 {
            let (p, dpx) = legendre_and_derivative(n, x);
            dp = dpx;
            let update = p / dp;
            x -= update;
            if update.abs() < 1e-15 {
                break;
            }
        }

        points.push(x);
        // w_i = 2 / ((1 - x²) P'_n(x)²)
        weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }

    map_to_interval(&mut points, &mut weights, x0, x1);
    (points, weights)
}
