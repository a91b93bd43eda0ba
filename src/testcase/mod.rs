//! Test-case initialization callbacks.
//!
//! A test case supplies the pure-function hooks the dynamical core needs
//! to build a runnable configuration: topography, model cap height, the
//! pointwise initial state, an optional hydrostatically balanced reference
//! state and an optional Rayleigh damping profile. Three canonical
//! non-hydrostatic benchmarks ship with the crate.

mod gravity_wave;
mod schar_mountain;
mod thermal_bubble;

pub use gravity_wave::InertiaGravityWaveTest;
pub use schar_mountain::ScharMountainTest;
pub use thermal_bubble::ThermalBubbleTest;

use crate::physics::PhysicalConstants;

/// Initialization hooks required by the integrator.
///
/// All hooks are pure functions of their arguments. `state` buffers hold
/// the five primitive components (u, v, θ, w, ρ); the grid converts to the
/// conservative prognostic form.
pub trait TestCase: Send + Sync {
    /// Number of advected tracers.
    fn get_tracer_count(&self) -> usize {
        0
    }

    /// Model cap height z_top (positive).
    fn get_ztop(&self) -> f64;

    /// Whether a time-independent reference state is available.
    fn has_reference_state(&self) -> bool;

    /// Populate the reference state at one point: hydrostatically balanced
    /// density and potential temperature with zero velocities.
    fn evaluate_reference_state(
        &self,
        phys: &PhysicalConstants,
        z: f64,
        x: f64,
        y: f64,
        state: &mut [f64],
    );

    /// Topography height z_s at (x, y); non-negative and below z_top.
    fn evaluate_topography(&self, phys: &PhysicalConstants, x: f64, y: f64) -> f64;

    /// Initial-condition sampler at one point and time.
    #[allow(clippy::too_many_arguments)]
    fn evaluate_pointwise_state(
        &self,
        phys: &PhysicalConstants,
        time: f64,
        z: f64,
        x: f64,
        y: f64,
        state: &mut [f64],
        tracers: &mut [f64],
    );

    /// Whether Rayleigh friction is active.
    fn has_rayleigh_friction(&self) -> bool {
        false
    }

    /// Rayleigh damping strength σ(z, x, y) ≥ 0 (1/s).
    fn evaluate_rayleigh_strength(&self, _z: f64, _x: f64, _y: f64) -> f64 {
        0.0
    }
}

/// Hydrostatically balanced state for a constant-θ̄ atmosphere: the Exner
/// pressure decreases linearly with height and
/// ρ = p₀/(R_d θ̄) · π^{c_v/R_d}.
pub(crate) fn isentropic_density(phys: &PhysicalConstants, theta_bar: f64, z: f64) -> f64 {
    let exner = 1.0 - phys.g / (phys.c_p * theta_bar) * z;
    phys.p0 / (phys.r_d * theta_bar) * exner.powf(phys.c_v / phys.r_d)
}
