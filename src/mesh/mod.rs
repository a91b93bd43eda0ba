//! Horizontal mesh building blocks: patch index boxes and connectivity.
//!
//! The horizontal domain is partitioned into rectangular patches. Each
//! patch owns a tensor-product GLL element mesh with a halo ring of
//! elements on every side; neighbors are described by a [`Direction`] and
//! the orientation flags needed for velocity components crossing the seam.
//! The Cartesian specialization uses identity mappings throughout; the
//! flags exist so the same machinery can serve mapped (cubed-sphere style)
//! grids.

mod connectivity;
mod patch_box;

pub use connectivity::{Direction, GridKind, LateralBoundary, NeighborSpec, PatchConnectivity};
pub use patch_box::PatchBox;
