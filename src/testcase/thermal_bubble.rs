//! Thermal rising bubble (Giraldo et al. 2007).
//!
//! A cosine-shaped potential temperature perturbation in a neutrally
//! stratified (constant θ̄) atmosphere rises and deforms into a mushroom
//! shape. The solution stays symmetric about the bubble axis.

use super::{isentropic_density, TestCase};
use crate::equations::var;
use crate::physics::PhysicalConstants;
use std::f64::consts::PI;

/// Thermal rising bubble test case on a 1 km³ box.
#[derive(Clone, Copy, Debug)]
pub struct ThermalBubbleTest {
    /// Background potential temperature (K).
    pub theta_bar: f64,
    /// Perturbation amplitude (K).
    pub theta_c: f64,
    /// Bubble radius (m).
    pub r_c: f64,
    /// Bubble center x (m).
    pub x_c: f64,
    /// Bubble center height (m).
    pub z_c: f64,
    /// Model cap (m).
    pub z_top: f64,
}

impl Default for ThermalBubbleTest {
    fn default() -> Self {
        Self {
            theta_bar: 300.0,
            theta_c: 0.5,
            r_c: 250.0,
            x_c: 500.0,
            z_c: 350.0,
            z_top: 1000.0,
        }
    }
}

impl ThermalBubbleTest {
    /// Domain bounds (x, y, z) of the standard configuration.
    pub fn domain(&self) -> [f64; 6] {
        [0.0, 1000.0, -1000.0, 1000.0, 0.0, self.z_top]
    }

    /// Potential temperature perturbation at (x, z).
    pub fn theta_prime(&self, x: f64, z: f64) -> f64 {
        let r = ((x - self.x_c).powi(2) + (z - self.z_c).powi(2)).sqrt();
        if r <= self.r_c {
            0.5 * self.theta_c * (1.0 + (PI * r / self.r_c).cos())
        } else {
            0.0
        }
    }
}

impl TestCase for ThermalBubbleTest {
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
        state[var::T] = self.theta_bar;
        state[var::W] = 0.0;
        state[var::R] = isentropic_density(phys, self.theta_bar, z);
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
        state[var::U] = 0.0;
        state[var::V] = 0.0;
        state[var::T] = self.theta_bar + self.theta_prime(x, z);
        state[var::W] = 0.0;
        // Density in balance with the unperturbed background
        state[var::R] = isentropic_density(phys, self.theta_bar, z);
    }
}
