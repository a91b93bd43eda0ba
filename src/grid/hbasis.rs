//! Horizontal spectral-element basis.
//!
//! One GLL element in each horizontal direction carries `p_h` nodes on the
//! reference interval [0, 1]. The derivative matrix is stored unscaled;
//! callers divide by the physical element width.

use crate::polynomial::{gauss_lobatto_points, lagrange_diff_coeffs};
use faer::Mat;

/// Nodes, weights and the spectral derivative matrix of one horizontal
/// element on the reference interval [0, 1].
#[derive(Clone, Debug)]
pub struct HorizontalBasis {
    /// Horizontal order p_h (nodes per element edge).
    pub order: usize,
    /// GLL node positions on [0, 1].
    pub nodes: Vec<f64>,
    /// GLL weights on [0, 1]; sum to 1.
    pub weights: Vec<f64>,
    /// Derivative matrix: `dx[(s, i)]` is the derivative of cardinal
    /// function `s` at node `i`, so (du/dα)_i = Σ_s dx[(s,i)] u_s / Δα.
    pub dx: Mat<f64>,
}

impl HorizontalBasis {
    pub fn new(order: usize) -> Self {
        let (nodes, weights) = gauss_lobatto_points(order, 0.0, 1.0);

        let mut dx = Mat::zeros(order, order);
        for i in 0..order {
            let coeffs = lagrange_diff_coeffs(&nodes, nodes[i]);
            for s in 0..order {
                dx[(s, i)] = coeffs[s];
            }
        }

        Self {
            order,
            nodes,
            weights,
            dx,
        }
    }
}
