//! Schär mountain wave (Schär et al. 2002).
//!
//! Uniform stratified flow over a five-peaked mountain generates a
//! steady mountain-wave pattern with both large-scale and small-scale
//! vertical wavelengths; a Rayleigh sponge near the model top absorbs
//! upward-propagating waves so no spurious reflections contaminate the
//! solution below.

use super::TestCase;
use crate::equations::var;
use crate::physics::PhysicalConstants;
use std::f64::consts::PI;

/// Schär mountain-wave test case.
#[derive(Clone, Copy, Debug)]
pub struct ScharMountainTest {
    /// Mountain height (m).
    pub h_0: f64,
    /// Mountain half-width (m).
    pub a_c: f64,
    /// Ridge wavelength (m).
    pub lambda_c: f64,
    /// Mean flow (m/s).
    pub u_mean: f64,
    /// Surface potential temperature (K).
    pub theta_0: f64,
    /// Brunt-Väisälä frequency (1/s).
    pub n_freq: f64,
    /// Model cap (m).
    pub z_top: f64,
    /// Bottom of the Rayleigh sponge (m).
    pub z_rayleigh: f64,
    /// Peak sponge strength (1/s).
    pub rayleigh_strength: f64,
}

impl Default for ScharMountainTest {
    fn default() -> Self {
        Self {
            h_0: 250.0,
            a_c: 5000.0,
            lambda_c: 4000.0,
            u_mean: 10.0,
            theta_0: 280.0,
            n_freq: 0.01,
            z_top: 21_000.0,
            z_rayleigh: 13_000.0,
            rayleigh_strength: 0.02,
        }
    }
}

impl ScharMountainTest {
    /// Domain bounds of the standard configuration.
    pub fn domain(&self) -> [f64; 6] {
        [-25_000.0, 25_000.0, -1000.0, 1000.0, 0.0, self.z_top]
    }

    fn theta_background(&self, phys: &PhysicalConstants, z: f64) -> f64 {
        self.theta_0 * (self.n_freq * self.n_freq * z / phys.g).exp()
    }

    fn rho_background(&self, phys: &PhysicalConstants, z: f64) -> f64 {
        let n2 = self.n_freq * self.n_freq;
        let exner =
            1.0 + phys.g * phys.g / (phys.c_p * self.theta_0 * n2) * ((-n2 * z / phys.g).exp() - 1.0);
        let theta = self.theta_background(phys, z);
        phys.p0 / (phys.r_d * theta) * exner.powf(phys.c_v / phys.r_d)
    }
}

impl TestCase for ScharMountainTest {
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

    fn evaluate_topography(&self, _phys: &PhysicalConstants, x: f64, _y: f64) -> f64 {
        // h(x) = h₀ exp(-(x/a)²) cos²(πx/λ)
        let envelope = (-(x / self.a_c).powi(2)).exp();
        let ridge = (PI * x / self.lambda_c).cos();
        self.h_0 * envelope * ridge * ridge
    }

    fn evaluate_pointwise_state(
        &self,
        phys: &PhysicalConstants,
        _time: f64,
        z: f64,
        _x: f64,
        _y: f64,
        state: &mut [f64],
        _tracers: &mut [f64],
    ) {
        state[var::U] = self.u_mean;
        state[var::V] = 0.0;
        state[var::T] = self.theta_background(phys, z);
        state[var::W] = 0.0;
        state[var::R] = self.rho_background(phys, z);
    }

    fn has_rayleigh_friction(&self) -> bool {
        true
    }

    fn evaluate_rayleigh_strength(&self, z: f64, _x: f64, _y: f64) -> f64 {
        if z <= self.z_rayleigh {
            return 0.0;
        }
        let xi = (z - self.z_rayleigh) / (self.z_top - self.z_rayleigh);
        let s = (0.5 * PI * xi).sin();
        self.rayleigh_strength * s * s
    }
}
