//! Polynomial and quadrature kernels.
//!
//! This module provides the pure-function building blocks of the
//! discretization:
//! - Legendre polynomials and their derivatives
//! - Gauss-Lobatto-Legendre and Gauss-Legendre points/weights on an
//!   arbitrary interval
//! - Lagrange interpolation and derivative coefficients at arbitrary points
//! - Flux-correction function derivatives (right Radau family)

mod flux_correction;
mod lagrange;
mod legendre;
mod nodes;

pub use flux_correction::{flux_correction_derivative, flux_correction_value};
pub use lagrange::{lagrange_diff_coeffs, lagrange_interp_coeffs};
pub use legendre::{legendre, legendre_and_derivative, legendre_derivative};
pub use nodes::{gauss_lobatto_points, gauss_points};
