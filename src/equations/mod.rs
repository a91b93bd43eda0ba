//! Equation set for the compressible Euler equations.
//!
//! Variable layout, primitive/conservative conversion, and the equation of
//! state in the θ-π (potential temperature / Exner pressure) form used by
//! the dynamics:
//!
//! - p = p₀ (R_d ρθ / p₀)^{c_p/c_v}
//! - c_p θ dπ = dp / ρ
//!
//! The prognostic state is conservative: (ρu, ρv, ρθ, ρw, ρ).

use crate::error::{ModelError, Result};
use crate::physics::PhysicalConstants;

/// Component indices of the prognostic state vector.
pub mod var {
    /// Alpha-direction momentum ρu.
    pub const U: usize = 0;
    /// Beta-direction momentum ρv.
    pub const V: usize = 1;
    /// Potential temperature density ρθ.
    pub const T: usize = 2;
    /// Vertical momentum ρw.
    pub const W: usize = 3;
    /// Density ρ.
    pub const R: usize = 4;
}

/// Number of prognostic components.
pub const N_COMPONENTS: usize = 5;

/// The compressible Euler equation set.
#[derive(Clone, Copy, Debug)]
pub struct EquationSet {
    dimensionality: usize,
    n_tracers: usize,
}

impl EquationSet {
    /// Create an equation set; `dimensionality` is 3 for the full box or
    /// 2 for an xz slice.
    pub fn new(dimensionality: usize, n_tracers: usize) -> Result<Self> {
        if dimensionality != 2 && dimensionality != 3 {
            return Err(ModelError::Configuration(format!(
                "dimensionality must be 2 or 3, got {dimensionality}"
            )));
        }
        Ok(Self {
            dimensionality,
            n_tracers,
        })
    }

    /// Spatial dimensionality (2 = xz slice, 3 = full box).
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    /// Number of prognostic components.
    pub fn components(&self) -> usize {
        N_COMPONENTS
    }

    /// Number of advected tracers.
    pub fn tracers(&self) -> usize {
        self.n_tracers
    }

    /// Convert a pointwise primitive state (u, v, θ, w, ρ) to the
    /// conservative prognostic form (ρu, ρv, ρθ, ρw, ρ) in place.
    pub fn primitive_to_conservative(&self, state: &mut [f64]) {
        debug_assert_eq!(state.len(), N_COMPONENTS);
        let rho = state[var::R];
        state[var::U] *= rho;
        state[var::V] *= rho;
        state[var::T] *= rho;
        state[var::W] *= rho;
    }

    /// Convert a pointwise conservative state back to primitive form in
    /// place.
    pub fn conservative_to_primitive(&self, state: &mut [f64]) {
        debug_assert_eq!(state.len(), N_COMPONENTS);
        let rho = state[var::R];
        state[var::U] /= rho;
        state[var::V] /= rho;
        state[var::T] /= rho;
        state[var::W] /= rho;
    }

    /// Pressure from the equation of state, p = p₀ (R_d ρθ / p₀)^{c_p/c_v}.
    #[inline]
    pub fn pressure(&self, phys: &PhysicalConstants, rho_theta: f64) -> f64 {
        phys.p0 * (phys.r_d * rho_theta / phys.p0).powf(phys.c_p / phys.c_v)
    }

    /// Exner pressure π = (p / p₀)^{R_d/c_p}.
    #[inline]
    pub fn exner(&self, phys: &PhysicalConstants, pressure: f64) -> f64 {
        (pressure / phys.p0).powf(phys.kappa())
    }

    /// Squared speed of sound,
    /// c² = (c_p R_d θ / c_v) · (p/p₀)^{R_d/c_p - 1}.
    #[inline]
    pub fn sound_speed_squared(&self, phys: &PhysicalConstants, theta: f64, pressure: f64) -> f64 {
        phys.c_p * phys.r_d * theta / phys.c_v * (pressure / phys.p0).powf(phys.kappa() - 1.0)
    }
}
