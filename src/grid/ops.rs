//! Precomputed column operator set for one grid.

use super::vertical::VerticalCoordinate;
use crate::column::{
    diff_diff_gll, diff_flux_correction, diff_gll, diff_interface, interp, ColumnBasis,
    ColumnOperator,
};
use crate::error::Result;

/// The column operators shared by every column of a grid.
///
/// Constructed once after the vertical coordinate is fixed; immutable and
/// safe to read concurrently afterwards.
#[derive(Clone, Debug)]
pub struct ColumnOperators {
    /// Interpolation levels → interfaces.
    pub interp_n2e: ColumnOperator,
    /// Interpolation interfaces → levels.
    pub interp_e2n: ColumnOperator,
    /// Flux-correction first derivative, levels → levels.
    pub diff_n2n: ColumnOperator,
    /// Interface-method first derivative, levels → interfaces.
    pub diff_n2e: ColumnOperator,
    /// Interface-method first derivative, interfaces → levels.
    pub diff_e2n: ColumnOperator,
    /// First derivative on the continuous GLL basis, interfaces →
    /// interfaces.
    pub diff_e2e: ColumnOperator,
    /// Second derivative on the continuous GLL basis, interfaces →
    /// interfaces.
    pub diff_diff_e2e: ColumnOperator,
}

impl ColumnOperators {
    pub fn new(vc: &VerticalCoordinate) -> Result<Self> {
        let order = vc.order;
        let node = &vc.reta_node;
        let edge = &vc.reta_edge;

        Ok(Self {
            interp_n2e: interp(ColumnBasis::Levels, order, node, edge, edge, false)?,
            interp_e2n: interp(ColumnBasis::Interfaces, order, node, edge, node, false)?,
            diff_n2n: diff_flux_correction(order, node, edge, node, false)?,
            diff_n2e: diff_interface(ColumnBasis::Levels, order, node, edge, edge, false)?,
            diff_e2n: diff_interface(ColumnBasis::Interfaces, order, node, edge, node, false)?,
            diff_e2e: diff_gll(order + 1, edge, edge)?,
            diff_diff_e2e: diff_diff_gll(order + 1, edge)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        let vc = VerticalCoordinate::uniform(6, 3);
        let ops = ColumnOperators::new(&vc).unwrap();
        let (n, e) = (vc.n_levels(), vc.n_interfaces());

        assert_eq!((ops.interp_n2e.n_in(), ops.interp_n2e.n_out()), (n, e));
        assert_eq!((ops.interp_e2n.n_in(), ops.interp_e2n.n_out()), (e, n));
        assert_eq!((ops.diff_n2n.n_in(), ops.diff_n2n.n_out()), (n, n));
        assert_eq!((ops.diff_n2e.n_in(), ops.diff_n2e.n_out()), (n, e));
        assert_eq!((ops.diff_e2n.n_in(), ops.diff_e2n.n_out()), (e, n));
        assert_eq!((ops.diff_e2e.n_in(), ops.diff_e2e.n_out()), (e, e));
        assert_eq!((ops.diff_diff_e2e.n_in(), ops.diff_diff_e2e.n_out()), (e, e));
    }

    #[test]
    fn test_derivatives_annihilate_constants() {
        let vc = VerticalCoordinate::uniform(4, 2);
        let ops = ColumnOperators::new(&vc).unwrap();
        let ones_n = vec![1.0; vc.n_levels()];
        let ones_e = vec![1.0; vc.n_interfaces()];

        for d in ops.diff_n2n.apply_vec(&ones_n) {
            assert!(d.abs() < 1e-12);
        }
        for d in ops.diff_n2e.apply_vec(&ones_n) {
            assert!(d.abs() < 1e-12);
        }
        for d in ops.diff_e2n.apply_vec(&ones_e) {
            assert!(d.abs() < 1e-12);
        }
        for d in ops.diff_e2e.apply_vec(&ones_e) {
            assert!(d.abs() < 1e-12);
        }
    }
}
