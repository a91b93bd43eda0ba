//! Linear column operators for the vertical finite-element discretization.
//!
//! A column operator is a banded linear map from one vertical column of
//! values to another. Columns live on one of two bases:
//! - **Levels** (nodes): the discontinuous basis, `p` Gauss points per
//!   finite element, `N_v · p` values per column.
//! - **Interfaces** (edges): the continuous basis, `p + 1` Gauss-Lobatto
//!   points per finite element shared at element boundaries,
//!   `N_v · p + 1` values per column.
//!
//! Operators are built once at grid initialization and are immutable and
//! freely shareable afterwards. Compositions (for example differentiating
//! node data by interpolating to interfaces first) are formed as dense
//! products over the union of row supports.

mod diff;
mod diff_diff;
mod fem;
mod interp;
mod operator;

pub use diff::{diff_flux_correction, diff_gll, diff_interface};
pub use diff_diff::diff_diff_gll;
pub use interp::interp;
pub use operator::{ColumnBasis, ColumnOperator};
