//! # hevi-rs
//!
//! A non-hydrostatic atmospheric dynamical core solving the compressible
//! Euler equations on a Cartesian box: continuous spectral elements in the
//! horizontal, high-order finite elements in the vertical, both on
//! Gauss-Lobatto-Legendre nodes over a terrain-following coordinate.
//!
//! The crate provides:
//! - Quadrature and polynomial kernels (GLL/Gauss points, Lagrange
//!   interpolation and derivatives, flux-correction functions)
//! - Banded linear column operators between level and interface bases
//! - A patch/grid data model with halos, halo exchange, direct stiffness
//!   summation and rigid lid/ground boundary conditions
//! - Terrain-following metric tensors (Gal-Chen and Somerville)
//! - Explicit horizontal dynamics with hyperviscosity
//! - Implicit vertical dynamics solved per column by JFNK
//!   (finite-difference Jacobian-vector products + preconditioned GMRES)
//! - HEVI IMEX time stepping (Strang, ARK2, ARK3, ARK4)
//! - Test-case hooks with three canonical benchmarks and in-memory output
//!   records

pub mod column;
pub mod dynamics;
pub mod equations;
pub mod error;
pub mod grid;
pub mod mesh;
pub mod output;
pub mod physics;
pub mod polynomial;
pub mod solver;
pub mod testcase;
pub mod time;

// Core types
pub use column::{ColumnBasis, ColumnOperator};
pub use equations::EquationSet;
pub use error::{ErrorCategory, ModelError, Result};
pub use physics::PhysicalConstants;

// Grid layer
pub use grid::{
    CartesianGrid, GridDescriptor, GridPatch, StateData, TanhStretch, UniformStretch,
    VelocityForm, VerticalCoordinate, VerticalStaggering, VerticalStretch,
};
pub use mesh::{Direction, GridKind, LateralBoundary, NeighborSpec, PatchBox, PatchConnectivity};

// Dynamics and solvers
pub use dynamics::{HorizontalDynamics, HorizontalDynamicsConfig, VerticalDynamics};
pub use solver::{ColumnPreconditioner, GmresOptions, SolverOptions};
pub use time::{HeviIntegrator, TimeScheme, TimestepOptions, ACTIVE_SLOT};

// Test cases and output
pub use output::{OutputFrame, OutputSampler, OutputVariable};
pub use testcase::{
    InertiaGravityWaveTest, ScharMountainTest, TestCase, ThermalBubbleTest,
};
