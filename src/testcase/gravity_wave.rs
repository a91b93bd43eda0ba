//! Inertia-gravity wave (Skamarock and Klemp 1994).
//!
//! A small potential temperature perturbation in a uniformly stratified
//! channel with mean flow radiates gravity waves; the linear analytic
//! solution makes this the standard accuracy benchmark for
//! non-hydrostatic cores.

use super::TestCase;
use crate::equations::var;
use crate::physics::PhysicalConstants;
use std::f64::consts::PI;

/// Inertia-gravity wave in a 300 km × 10 km channel.
#[derive(Clone, Copy, Debug)]
pub struct InertiaGravityWaveTest {
    /// Surface potential temperature (K).
    pub theta_0: f64,
    /// Brunt-Väisälä frequency (1/s).
    pub n_freq: f64,
    /// Mean flow (m/s).
    pub u_mean: f64,
    /// Perturbation amplitude (K).
    pub delta_theta: f64,
    /// Perturbation half-width (m).
    pub half_width: f64,
    /// Perturbation center x (m).
    pub x_c: f64,
    /// Model cap (m).
    pub z_top: f64,
}

impl Default for InertiaGravityWaveTest {
    fn default() -> Self {
        Self {
            theta_0: 300.0,
            n_freq: 0.01,
            u_mean: 20.0,
            delta_theta: 0.01,
            half_width: 5000.0,
            x_c: 100_000.0,
            z_top: 10_000.0,
        }
    }
}

impl InertiaGravityWaveTest {
    /// Domain bounds of the standard configuration.
    pub fn domain(&self) -> [f64; 6] {
        [0.0, 300_000.0, -1000.0, 1000.0, 0.0, self.z_top]
    }

    /// Background potential temperature θ̄(z) = θ₀ exp(N² z / g).
    pub fn theta_background(&self, phys: &PhysicalConstants, z: f64) -> f64 {
        self.theta_0 * (self.n_freq * self.n_freq * z / phys.g).exp()
    }

    /// Background density from the N²-stratified Exner pressure.
    pub fn rho_background(&self, phys: &PhysicalConstants, z: f64) -> f64 {
        let n2 = self.n_freq * self.n_freq;
        let exner =
            1.0 + phys.g * phys.g / (phys.c_p * self.theta_0 * n2) * ((-n2 * z / phys.g).exp() - 1.0);
        let theta = self.theta_background(phys, z);
        phys.p0 / (phys.r_d * theta) * exner.powf(phys.c_v / phys.r_d)
    }

    /// Potential temperature perturbation.
    pub fn theta_prime(&self, x: f64, z: f64) -> f64 {
        let shape = 1.0 + ((x - self.x_c) / self.half_width).powi(2);
        self.delta_theta * (PI * z / self.z_top).sin() / shape
    }
}

impl TestCase for InertiaGravityWaveTest {
    fn get_ztop(&self) -> f64 {
        self.z_top
    }

    fn has_reference_state(&self) -> bool {
        true
    }

    fn evaluate_reference_state(
        &self,
        phys: &PhysicalConstants,
        z: f64,
        _x: f64,
        _y: f64,
        state: &mut [f64],
    ) {
        state[var::U] = 0.0;
        state[var::V] = 0.0;
        state[var::T] = self.theta_background(phys, z);
        state[var::W] = 0.0;
        state[var::R] = self.rho_background(phys, z);
    }

    fn evaluate_topography(&self, _phys: &PhysicalConstants, _x: f64, _y: f64) -> f64 {
        0.0
    }

    fn evaluate_pointwise_state(
        &self,
        phys: &PhysicalConstants,
        _time: f64,
        z: f64,
        x: f64,
        _y: f64,
        state: &mut [f64],
        _tracers: &mut [f64],
    ) {
        state[var::U] = self.u_mean;
        state[var::V] = 0.0;
        state[var::T] = self.theta_background(phys, z) + self.theta_prime(x, z);
        state[var::W] = 0.0;
        state[var::R] = self.rho_background(phys, z);
    }
}
