//! The HEVI step driver.
//!
//! Orchestrates the explicit horizontal operator and the implicit
//! per-column vertical solve across named state slots. Each stage is
//! followed by the synchronization sequence halo exchange → DSS →
//! boundary conditions; the "active" slot holds the accepted state at the
//! end of every step.

use super::tableau::{ImexTableau, TimeScheme};
use crate::dynamics::{HorizontalDynamics, VerticalDynamics};
use crate::error::Result;
use crate::grid::CartesianGrid;

/// Slot holding the accepted state.
pub const ACTIVE_SLOT: usize = 0;
/// Slot accumulating the running stage state.
const STAGE_SLOT: usize = 1;
/// Scratch slot used by the hyperviscosity exchange.
const SCRATCH_SLOT: usize = 2;
/// First tendency slot; explicit tendencies first, then implicit.
const TEND_BASE: usize = 3;

/// Step driver controls.
#[derive(Clone, Copy, Debug)]
pub struct TimestepOptions {
    /// Time integration scheme.
    pub scheme: TimeScheme,
    /// Nominal timestep (s).
    pub dt: f64,
    /// Retry a failed step with Δt/2 instead of aborting.
    pub enable_dt_retry: bool,
    /// Maximum Δt halvings per step.
    pub max_dt_retries: usize,
}

impl TimestepOptions {
    pub fn new(scheme: TimeScheme, dt: f64) -> Self {
        Self {
            scheme,
            dt,
            enable_dt_retry: true,
            max_dt_retries: 3,
        }
    }
}

/// The HEVI IMEX integrator.
pub struct HeviIntegrator {
    opts: TimestepOptions,
    tableau: Option<ImexTableau>,
    horizontal: HorizontalDynamics,
    vertical: VerticalDynamics,
}

impl HeviIntegrator {
    pub fn new(
        opts: TimestepOptions,
        horizontal: HorizontalDynamics,
        vertical: VerticalDynamics,
    ) -> Self {
        Self {
            tableau: ImexTableau::for_scheme(opts.scheme),
            opts,
            horizontal,
            vertical,
        }
    }

    /// State slots the grid must allocate for a scheme.
    pub fn required_slots(scheme: TimeScheme) -> usize {
        match ImexTableau::for_scheme(scheme) {
            // active + stage + scratch + s explicit + s implicit
            Some(tab) => TEND_BASE + 2 * tab.stages,
            // active + stage + scratch + tendency + RK base state
            None => 5,
        }
    }

    /// Step options.
    pub fn options(&self) -> &TimestepOptions {
        &self.opts
    }

    /// Advance from `t` to `t_end`, retrying failed steps with Δt/2 when
    /// enabled. Returns the reached time (= `t_end` on success).
    pub fn run(&self, grid: &mut CartesianGrid, t: f64, t_end: f64) -> Result<f64> {
        let mut time = t;
        while time < t_end - 1.0e-12 * t_end.abs().max(1.0) {
            let dt_step = self.opts.dt.min(t_end - time);
            let mut attempt = dt_step;
            let mut retries = 0;
            loop {
                match self.step(grid, time, attempt) {
                    Ok(()) => {
                        time += attempt;
                        break;
                    }
                    Err(err)
                        if err.is_recoverable()
                            && self.opts.enable_dt_retry
                            && retries < self.opts.max_dt_retries =>
                    {
                        attempt *= 0.5;
                        retries += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(time)
    }

    /// Advance the active state by one step of size `dt`.
    ///
    /// On failure the active slot is untouched, so the step can be
    /// retried with a smaller Δt.
    pub fn step(&self, grid: &mut CartesianGrid, _t: f64, dt: f64) -> Result<()> {
        match &self.tableau {
            Some(tableau) => self.step_ark(grid, dt, tableau),
            None => self.step_strang(grid, dt),
        }
    }

    /// One IMEX ARK step across the paired tableaux.
    fn step_ark(&self, grid: &mut CartesianGrid, dt: f64, tab: &ImexTableau) -> Result<()> {
        let s = tab.stages;
        let ex_slot = |i: usize| TEND_BASE + i;
        let im_slot = |i: usize| TEND_BASE + s + i;

        // Stage 0 tendencies from the active state
        self.explicit_tendency(grid, ACTIVE_SLOT, ex_slot(0))?;
        if tab.needs_first_implicit_tendency() {
            self.implicit_tendency(grid, ACTIVE_SLOT, im_slot(0));
        } else {
            slot_fill(grid, im_slot(0), 0.0);
        }

        for i in 1..s {
            // y* = y0 + Δt Σ_{j<i} (a_ex[i][j] F_ex_j + a_im[i][j] F_im_j)
            slot_copy(grid, STAGE_SLOT, ACTIVE_SLOT);
            for j in 0..i {
                if tab.a_ex[i][j] != 0.0 {
                    slot_axpy(grid, STAGE_SLOT, dt * tab.a_ex[i][j], ex_slot(j));
                }
                if tab.a_im[i][j] != 0.0 {
                    slot_axpy(grid, STAGE_SLOT, dt * tab.a_im[i][j], im_slot(j));
                }
            }

            let gamma = tab.a_im[i][i];
            if gamma != 0.0 {
                // Keep y* in the implicit tendency slot, solve in place,
                // then recover F_im_i = (y_i - y*)/(Δt γ)
                slot_copy(grid, im_slot(i), STAGE_SLOT);
                self.implicit_solve(grid, STAGE_SLOT, dt * gamma)?;
                slot_scale(grid, im_slot(i), -1.0 / (dt * gamma));
                slot_axpy(grid, im_slot(i), 1.0 / (dt * gamma), STAGE_SLOT);
            } else {
                self.implicit_tendency(grid, STAGE_SLOT, im_slot(i));
            }

            grid.synchronize(STAGE_SLOT)?;

            if i + 1 < s || tab.b_ex[i] != 0.0 {
                self.explicit_tendency(grid, STAGE_SLOT, ex_slot(i))?;
            } else {
                slot_fill(grid, ex_slot(i), 0.0);
            }
        }

        // y_{n+1} = y0 + Δt Σ_j (b_ex_j F_ex_j + b_im_j F_im_j)
        slot_copy(grid, STAGE_SLOT, ACTIVE_SLOT);
        for j in 0..s {
            if tab.b_ex[j] != 0.0 {
                slot_axpy(grid, STAGE_SLOT, dt * tab.b_ex[j], ex_slot(j));
            }
            if tab.b_im[j] != 0.0 {
                slot_axpy(grid, STAGE_SLOT, dt * tab.b_im[j], im_slot(j));
            }
        }
        grid.synchronize(STAGE_SLOT)?;
        slot_copy(grid, ACTIVE_SLOT, STAGE_SLOT);
        Ok(())
    }

    /// Strang splitting: implicit half step, explicit SSP-RK3 full step,
    /// implicit half step.
    fn step_strang(&self, grid: &mut CartesianGrid, dt: f64) -> Result<()> {
        const BASE_SLOT: usize = 4;
        let tend = TEND_BASE;

        slot_copy(grid, STAGE_SLOT, ACTIVE_SLOT);
        self.implicit_solve(grid, STAGE_SLOT, 0.5 * dt)?;
        grid.synchronize(STAGE_SLOT)?;

        // SSP-RK3 (Shu-Osher form) on the horizontal operator
        slot_copy(grid, BASE_SLOT, STAGE_SLOT);

        self.explicit_tendency(grid, STAGE_SLOT, tend)?;
        slot_axpy(grid, STAGE_SLOT, dt, tend);
        grid.synchronize(STAGE_SLOT)?;

        self.explicit_tendency(grid, STAGE_SLOT, tend)?;
        slot_axpy(grid, STAGE_SLOT, dt, tend);
        slot_scale(grid, STAGE_SLOT, 0.25);
        slot_axpy(grid, STAGE_SLOT, 0.75, BASE_SLOT);
        grid.synchronize(STAGE_SLOT)?;

        self.explicit_tendency(grid, STAGE_SLOT, tend)?;
        slot_axpy(grid, STAGE_SLOT, dt, tend);
        slot_scale(grid, STAGE_SLOT, 2.0 / 3.0);
        slot_axpy(grid, STAGE_SLOT, 1.0 / 3.0, BASE_SLOT);
        grid.synchronize(STAGE_SLOT)?;

        self.implicit_solve(grid, STAGE_SLOT, 0.5 * dt)?;
        grid.synchronize(STAGE_SLOT)?;

        slot_copy(grid, ACTIVE_SLOT, STAGE_SLOT);
        Ok(())
    }

    /// Horizontal tendency of `state` into `tend`, hyperviscosity
    /// included.
    fn explicit_tendency(
        &self,
        grid: &mut CartesianGrid,
        state: usize,
        tend: usize,
    ) -> Result<()> {
        {
            let (ctx, patches) = grid.split_context();
            for patch in patches.iter_mut() {
                self.horizontal.compute_tendency(&ctx, patch, state, tend);
            }
        }
        self.horizontal
            .apply_hyperviscosity(grid, state, tend, SCRATCH_SLOT)
    }

    /// Vertical tendency of `state` into `tend` (explicit evaluation).
    fn implicit_tendency(&self, grid: &mut CartesianGrid, state: usize, tend: usize) {
        let (ctx, patches) = grid.split_context();
        for patch in patches.iter_mut() {
            self.vertical.evaluate_tendency(&ctx, patch, state, tend);
        }
    }

    /// Solve the implicit column problem in place on `slot` with
    /// effective step `dt_gamma`.
    fn implicit_solve(&self, grid: &mut CartesianGrid, slot: usize, dt_gamma: f64) -> Result<()> {
        let (ctx, patches) = grid.split_context();
        for patch in patches.iter_mut() {
            self.vertical
                .solve_columns(&ctx, patch, slot, slot, dt_gamma)?;
        }
        Ok(())
    }
}

/// dst ← src over every patch.
fn slot_copy(grid: &mut CartesianGrid, dst: usize, src: usize) {
    if dst == src {
        return;
    }
    for patch in &mut grid.patches {
        let (s, d) = if src < dst {
            let (l, r) = patch.state.split_at_mut(dst);
            (&l[src], &mut r[0])
        } else {
            let (l, r) = patch.state.split_at_mut(src);
            (&r[0], &mut l[dst])
        };
        d.copy_from(s);
    }
}

/// dst ← dst + c·src over every patch.
fn slot_axpy(grid: &mut CartesianGrid, dst: usize, c: f64, src: usize) {
    for patch in &mut grid.patches {
        let (s, d) = if src < dst {
            let (l, r) = patch.state.split_at_mut(dst);
            (&l[src], &mut r[0])
        } else {
            let (l, r) = patch.state.split_at_mut(src);
            (&r[0], &mut l[dst])
        };
        d.axpy(c, s);
    }
}

/// slot ← c·slot over every patch.
fn slot_scale(grid: &mut CartesianGrid, slot: usize, c: f64) {
    for patch in &mut grid.patches {
        patch.state[slot].scale(c);
    }
}

/// slot ← value everywhere.
fn slot_fill(grid: &mut CartesianGrid, slot: usize, value: f64) {
    for patch in &mut grid.patches {
        patch.state[slot].fill(value);
    }
}
