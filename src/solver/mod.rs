//! Column-local nonlinear solver: JFNK with right-preconditioned GMRES.

mod gmres;
mod jfnk;

pub use gmres::{gmres_solve, GmresOptions, GmresResult};
pub use jfnk::{jfnk_solve, ColumnPreconditioner, NewtonStats, SolverOptions};
