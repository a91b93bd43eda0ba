//! HEVI time integration: IMEX Butcher tableaux and the step driver.

mod integrator;
mod tableau;

pub use integrator::{HeviIntegrator, TimestepOptions, ACTIVE_SLOT};
pub use tableau::{ImexTableau, TimeScheme};
