//! Grid and grid-patch layer.
//!
//! The grid owns all per-DOF arrays through its patch arena and
//! coordinates topography evaluation, geometric-term construction,
//! test-case initialization, halo exchange, direct stiffness summation and
//! boundary conditions. Patches are addressed by index; shared immutable
//! context (vertical coordinate, horizontal basis, column operators,
//! physical constants) lives on the grid and is passed by reference.

mod exchange;
mod fields;
#[allow(clippy::module_inception)]
mod grid;
mod hbasis;
mod ops;
mod patch;
mod state;
mod vertical;

pub use exchange::{HaloExchange, LocalExchange};
pub use fields::{Field2, Field3, Field4, TensorField3};
pub use grid::{CartesianGrid, GridContext, GridDescriptor};
pub use hbasis::HorizontalBasis;
pub use ops::ColumnOperators;
pub use patch::GridPatch;
pub use state::{StateData, VelocityForm, VerticalStaggering};
pub use vertical::{TanhStretch, UniformStretch, VerticalCoordinate, VerticalStretch};
