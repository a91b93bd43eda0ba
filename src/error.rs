//! Structured errors for the dynamical core.
//!
//! Every failure carries a stable category tag and a free-form message.
//! Configuration, geometry and mesh errors are fatal at construction time;
//! solver errors may be recoverable (the time integrator can halve the step
//! and retry from the last accepted state).

use thiserror::Error;

/// Stable category tag attached to every [`ModelError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid resolution/order combination, topography exceeding the model
    /// top, dimensionality mismatch, bad scheme parameters.
    Configuration,
    /// Non-positive metric Jacobian or a failed normalized-area identity.
    Geometry,
    /// JFNK non-convergence or GMRES breakdown.
    Solver,
    /// Interpolation point outside the patch domain, element-index overflow.
    Mesh,
    /// Surfaced unchanged from output collaborators.
    Io,
}

/// Error type for grid construction, geometry evaluation and time stepping.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Invalid model configuration (fatal at construction).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad metric terms, usually a bad stretch or bad topography (fatal).
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Generic solver failure (GMRES breakdown, bad solver options).
    #[error("solver error: {0}")]
    Solver(String),

    /// Per-column JFNK non-convergence. Recoverable: the step driver may
    /// halve the timestep and retry from the saved active state.
    #[error(
        "column ({ia}, {ib}) failed to converge after {iterations} Newton \
         iterations (residual {residual:.3e})"
    )]
    NonConvergence {
        /// Patch-local alpha index of the failing column.
        ia: usize,
        /// Patch-local beta index of the failing column.
        ib: usize,
        /// Newton iterations performed before giving up.
        iterations: usize,
        /// Final nonlinear residual norm.
        residual: f64,
    },

    /// Out-of-domain interpolation point or index overflow (fatal).
    #[error("mesh error: {0}")]
    Mesh(String),

    /// I/O error from an output collaborator.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// The stable category tag for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ModelError::Configuration(_) => ErrorCategory::Configuration,
            ModelError::Geometry(_) => ErrorCategory::Geometry,
            ModelError::Solver(_) | ModelError::NonConvergence { .. } => ErrorCategory::Solver,
            ModelError::Mesh(_) => ErrorCategory::Mesh,
            ModelError::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether the step driver is permitted to retry with a smaller Δt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ModelError::NonConvergence { .. })
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let e = ModelError::Configuration("bad order".into());
        assert_eq!(e.category(), ErrorCategory::Configuration);
        assert!(!e.is_recoverable());

        let e = ModelError::NonConvergence {
            ia: 3,
            ib: 7,
            iterations: 50,
            residual: 1.0e-2,
        };
        assert_eq!(e.category(), ErrorCategory::Solver);
        assert!(e.is_recoverable());
    }

    #[test]
    fn test_messages_carry_context() {
        let e = ModelError::Geometry("metric Jacobian non-positive at k=0".into());
        let msg = format!("{e}");
        assert!(msg.contains("geometry error"), "got: {msg}");
        assert!(msg.contains("Jacobian"), "got: {msg}");
    }
}
