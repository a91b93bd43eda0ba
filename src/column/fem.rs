//! Shared helpers for the finite-element column constructors.

use crate::error::{ModelError, Result};

/// Tolerance for locating output points relative to finite-element edges.
pub(crate) const PARAM_EPS: f64 = 1.0e-12;

/// Locate the finite element containing `x`.
///
/// `coords[(a + 1) * stride]` is the right boundary of element `a`.
/// Returns `(a, on_edge)` where `on_edge` is set when `x` coincides
/// (within 2ε) with an internal element boundary; the global top and
/// bottom never count as internal edges.
pub(crate) fn locate_element(coords: &[f64], stride: usize, nfe: usize, x: f64) -> (usize, bool) {
    let mut a = 0;
    while a < nfe - 1 {
        let next_edge = coords[(a + 1) * stride] - PARAM_EPS;
        if x < next_edge {
            break;
        }
        if x < next_edge + 2.0 * PARAM_EPS {
            return (a, true);
        }
        a += 1;
    }
    (a, false)
}

/// Error-minimizing blend weights for a point sitting on the boundary
/// between elements of widths `delta_l` and `delta_r`, for a basis of the
/// given order. The one-sided error scales as Δ^order, so each side is
/// weighted by the other side's error.
pub(crate) fn edge_blend_weights(delta_l: f64, delta_r: f64, order: usize) -> (f64, f64) {
    let err_l = delta_l.powi(order as i32);
    let err_r = delta_r.powi(order as i32);
    (err_r / (err_l + err_r), err_l / (err_l + err_r))
}

/// Validate level/interface column shapes for vertical order `order` and
/// return the finite-element count.
pub(crate) fn validate_column_shapes(
    order: usize,
    reta_node: &[f64],
    reta_edge: &[f64],
) -> Result<usize> {
    if reta_node.is_empty() {
        return Err(ModelError::Configuration(
            "column requires at least one level".into(),
        ));
    }
    if reta_edge.len() != reta_node.len() + 1 {
        return Err(ModelError::Configuration(format!(
            "level/interface coordinate mismatch: {} levels, {} interfaces",
            reta_node.len(),
            reta_edge.len()
        )));
    }
    if reta_node.len() % order != 0 {
        return Err(ModelError::Configuration(format!(
            "level count {} is not a multiple of the vertical order {}",
            reta_node.len(),
            order
        )));
    }
    Ok(reta_node.len() / order)
}
