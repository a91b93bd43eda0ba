//! Implicit vertical dynamics.
//!
//! Per column, assembles the vertical tendency F(q): flux-form vertical
//! transport with the staggering-appropriate column derivative operator
//! (flux correction on the discontinuous basis, interface method on the
//! continuous one), the pressure-gradient/buoyancy coupling of θ, w and
//! ρ, and Rayleigh relaxation toward the reference state. An implicit
//! Runge-Kutta stage solves R(q) = q - q* - Δt·γ·F(q) = 0 column by
//! column with JFNK.

use crate::column::{ColumnBasis, ColumnOperator};
use crate::equations::var;
use crate::error::{ModelError, Result};
use crate::grid::{GridContext, GridPatch, VerticalStaggering};
use crate::solver::{jfnk_solve, SolverOptions};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Packing of one column's unknowns into a flat vector.
///
/// Components are stored contiguously in variable order, each at its
/// authoritative vertical location.
#[derive(Clone, Copy, Debug)]
pub struct ColumnLayout {
    offsets: [usize; 5],
    sizes: [usize; 5],
    /// Total unknowns per column.
    pub total: usize,
}

impl ColumnLayout {
    pub fn new(staggering: VerticalStaggering, n_lvl: usize, n_int: usize) -> Self {
        let mut offsets = [0usize; 5];
        let mut sizes = [0usize; 5];
        let mut total = 0;
        for c in 0..5 {
            let size = match staggering.location(c) {
                ColumnBasis::Levels => n_lvl,
                ColumnBasis::Interfaces => n_int,
            };
            offsets[c] = total;
            sizes[c] = size;
            total += size;
        }
        Self {
            offsets,
            sizes,
            total,
        }
    }

    /// Slice of component `c` within a packed column vector.
    #[inline]
    pub fn slice<'a>(&self, q: &'a [f64], c: usize) -> &'a [f64] {
        &q[self.offsets[c]..self.offsets[c] + self.sizes[c]]
    }

    /// Mutable slice of component `c`.
    #[inline]
    pub fn slice_mut<'a>(&self, q: &'a mut [f64], c: usize) -> &'a mut [f64] {
        &mut q[self.offsets[c]..self.offsets[c] + self.sizes[c]]
    }
}

/// Geometry, damping and reference data of one column, gathered once per
/// solve.
#[derive(Clone, Debug)]
struct ColumnData {
    // At the u/v/θ location
    daz_1: Vec<f64>,
    dbz_1: Vec<f64>,
    dxz_1: Vec<f64>,
    jac_1: Vec<f64>,
    // At the w/ρ location
    daz_2: Vec<f64>,
    dbz_2: Vec<f64>,
    dxz_2: Vec<f64>,
    jac_2: Vec<f64>,
    rayleigh_1: Vec<f64>,
    rayleigh_2: Vec<f64>,
    q_ref: Vec<f64>,
    has_rayleigh: bool,
}

/// The implicit vertical operator.
#[derive(Clone, Debug)]
pub struct VerticalDynamics {
    /// Nonlinear solver controls for the column problems.
    pub solver: SolverOptions,
}

impl Default for VerticalDynamics {
    fn default() -> Self {
        Self {
            solver: SolverOptions::default(),
        }
    }
}

impl VerticalDynamics {
    pub fn new(solver: SolverOptions) -> Self {
        Self { solver }
    }

    /// Evaluate the vertical tendency F(q) of `in_slot` into `out_slot`
    /// over the patch interior (explicit evaluation, no solve).
    pub fn evaluate_tendency(
        &self,
        ctx: &GridContext<'_>,
        patch: &mut GridPatch,
        in_slot: usize,
        out_slot: usize,
    ) {
        let layout = ColumnLayout::new(
            ctx.staggering,
            ctx.vertical.n_levels(),
            ctx.vertical.n_interfaces(),
        );

        let (ai0, ai1) = (patch.bx.a_interior_begin(), patch.bx.a_interior_end());
        let (bi0, bi1) = (patch.bx.b_interior_begin(), patch.bx.b_interior_end());

        patch.state[out_slot].fill(0.0);

        let mut q = vec![0.0; layout.total];
        let mut f = vec![0.0; layout.total];

        for i in ai0..ai1 {
            for j in bi0..bi1 {
                let data = gather_column(ctx, patch, &layout, i, j);
                gather_state(ctx, patch, &layout, in_slot, i, j, &mut q);
                column_tendency(ctx, &layout, &data, &q, &mut f);
                scatter_state(ctx, patch, &layout, out_slot, i, j, &f);
            }
        }
    }

    /// Solve the implicit column problem R(q) = q - q* - Δt·γ·F(q) = 0
    /// for every interior column, reading q* from `qstar_slot` and writing
    /// the solution into `out_slot`.
    ///
    /// A non-converged column aborts the stage with a recoverable
    /// [`ModelError::NonConvergence`] so the driver may halve Δt and
    /// retry.
    pub fn solve_columns(
        &self,
        ctx: &GridContext<'_>,
        patch: &mut GridPatch,
        qstar_slot: usize,
        out_slot: usize,
        dt_gamma: f64,
    ) -> Result<()> {
        let layout = ColumnLayout::new(
            ctx.staggering,
            ctx.vertical.n_levels(),
            ctx.vertical.n_interfaces(),
        );

        let (ai0, ai1) = (patch.bx.a_interior_begin(), patch.bx.a_interior_end());
        let (bi0, bi1) = (patch.bx.b_interior_begin(), patch.bx.b_interior_end());

        let columns: Vec<(usize, usize)> = (ai0..ai1)
            .flat_map(|i| (bi0..bi1).map(move |j| (i, j)))
            .collect();

        let solve_one = |&(i, j): &(usize, usize)| -> Result<(usize, usize, Vec<f64>)> {
            let data = gather_column(ctx, patch, &layout, i, j);
            let mut qstar = vec![0.0; layout.total];
            gather_state(ctx, patch, &layout, qstar_slot, i, j, &mut qstar);

            let mut q = qstar.clone();
            let mut f = vec![0.0; layout.total];

            let residual = |qv: &[f64], out: &mut [f64]| {
                // The tendency lands in `out`, then R = q - q* - Δt·γ·F(q)
                column_tendency(ctx, &layout, &data, qv, out);
                for k in 0..qv.len() {
                    out[k] = qv[k] - qstar[k] - dt_gamma * out[k];
                }
            };

            match jfnk_solve(residual, &mut q, &self.solver) {
                Ok(_) => Ok((i, j, q)),
                Err(_) => {
                    // Recompute the final residual norm for the report
                    column_tendency(ctx, &layout, &data, &q, &mut f);
                    let res_norm: f64 = q
                        .iter()
                        .zip(qstar.iter())
                        .zip(f.iter())
                        .map(|((qi, qs), fi)| {
                            let r = qi - qs - dt_gamma * fi;
                            r * r
                        })
                        .sum::<f64>()
                        .sqrt();
                    Err(ModelError::NonConvergence {
                        ia: i,
                        ib: j,
                        iterations: self.solver.max_iterations,
                        residual: res_norm,
                    })
                }
            }
        };

        #[cfg(feature = "parallel")]
        let solved: Result<Vec<(usize, usize, Vec<f64>)>> =
            columns.par_iter().map(solve_one).collect();
        #[cfg(not(feature = "parallel"))]
        let solved: Result<Vec<(usize, usize, Vec<f64>)>> =
            columns.iter().map(solve_one).collect();

        for (i, j, q) in solved? {
            scatter_state(ctx, patch, &layout, out_slot, i, j, &q);
        }

        Ok(())
    }
}

/// Gather geometry, Rayleigh strengths and the reference state of one
/// column.
fn gather_column(
    ctx: &GridContext<'_>,
    patch: &GridPatch,
    layout: &ColumnLayout,
    i: usize,
    j: usize,
) -> ColumnData {
    let n_lvl = ctx.vertical.n_levels();
    let n_int = ctx.vertical.n_interfaces();

    let gather_loc = |loc: ColumnBasis| -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let (n_k, deriv, jac, ray) = match loc {
            ColumnBasis::Levels => (
                n_lvl,
                &patch.deriv_z_node,
                &patch.jacobian_node,
                &patch.rayleigh_node,
            ),
            ColumnBasis::Interfaces => (
                n_int,
                &patch.deriv_z_edge,
                &patch.jacobian_edge,
                &patch.rayleigh_edge,
            ),
        };
        let mut daz = vec![0.0; n_k];
        let mut dbz = vec![0.0; n_k];
        let mut dxz = vec![0.0; n_k];
        let mut jc = vec![0.0; n_k];
        let mut ry = vec![0.0; n_k];
        for k in 0..n_k {
            daz[k] = deriv.get(k, i, j, 0);
            dbz[k] = deriv.get(k, i, j, 1);
            dxz[k] = deriv.get(k, i, j, 2);
            jc[k] = jac.get(k, i, j);
            ry[k] = ray.get(k, i, j);
        }
        (daz, dbz, dxz, jc, ry)
    };

    let loc1 = ctx.staggering.location(var::U);
    let loc2 = ctx.staggering.location(var::W);
    let (daz_1, dbz_1, dxz_1, jac_1, rayleigh_1) = gather_loc(loc1);
    let (daz_2, dbz_2, dxz_2, jac_2, rayleigh_2) = gather_loc(loc2);

    let mut q_ref = vec![0.0; layout.total];
    if patch.has_ref_state {
        for c in 0..5 {
            let field = match ctx.staggering.location(c) {
                ColumnBasis::Levels => patch.ref_state.node.comp(c),
                ColumnBasis::Interfaces => patch.ref_state.edge.comp(c),
            };
            field.column(i, j, layout.slice_mut(&mut q_ref, c));
        }
    }

    ColumnData {
        daz_1,
        dbz_1,
        dxz_1,
        jac_1,
        daz_2,
        dbz_2,
        dxz_2,
        jac_2,
        rayleigh_1,
        rayleigh_2,
        q_ref,
        has_rayleigh: patch.has_rayleigh,
    }
}

/// Pack the authoritative state of one column.
fn gather_state(
    ctx: &GridContext<'_>,
    patch: &GridPatch,
    layout: &ColumnLayout,
    slot: usize,
    i: usize,
    j: usize,
    q: &mut [f64],
) {
    for c in 0..5 {
        let field = match ctx.staggering.location(c) {
            ColumnBasis::Levels => patch.state[slot].node.comp(c),
            ColumnBasis::Interfaces => patch.state[slot].edge.comp(c),
        };
        field.column(i, j, layout.slice_mut(q, c));
    }
}

/// Scatter a packed column into the authoritative state fields.
fn scatter_state(
    ctx: &GridContext<'_>,
    patch: &mut GridPatch,
    layout: &ColumnLayout,
    slot: usize,
    i: usize,
    j: usize,
    q: &[f64],
) {
    for c in 0..5 {
        let field = match ctx.staggering.location(c) {
            ColumnBasis::Levels => patch.state[slot].node.comp_mut(c),
            ColumnBasis::Interfaces => patch.state[slot].edge.comp_mut(c),
        };
        field.set_column(i, j, layout.slice(q, c));
    }
}

/// Move a column between vertical locations with the grid operators.
fn move_column(op: &ColumnOperator, input: &[f64]) -> Vec<f64> {
    op.apply_vec(input)
}

/// The vertical tendency F(q) of one packed column.
///
/// u, v and θ always share one location (group 1); w and ρ share another
/// (group 2). Transport uses the flux form -(1/J)·∂_ξ(J q u^ξ) with
/// u^ξ = (w - u ∂_a z - v ∂_b z)/∂_ξ z.
fn column_tendency(
    ctx: &GridContext<'_>,
    layout: &ColumnLayout,
    data: &ColumnData,
    q: &[f64],
    out: &mut [f64],
) {
    let ops = ctx.ops;
    let loc1 = ctx.staggering.location(var::U);
    let loc2 = ctx.staggering.location(var::W);
    let same_loc = loc1 == loc2;

    let ru = layout.slice(q, var::U);
    let rv = layout.slice(q, var::V);
    let rt = layout.slice(q, var::T);
    let rw = layout.slice(q, var::W);
    let rho = layout.slice(q, var::R);

    let s1 = ru.len();
    let s2 = rw.len();

    // Density and vertical momentum collocated with group 1
    let (rho_1, rw_1) = if same_loc {
        (rho.to_vec(), rw.to_vec())
    } else {
        (
            move_column(&ops.interp_e2n, rho),
            move_column(&ops.interp_e2n, rw),
        )
    };
    // Horizontal momenta and ρθ collocated with group 2
    let (ru_2, rv_2, rt_2) = if same_loc {
        (ru.to_vec(), rv.to_vec(), rt.to_vec())
    } else {
        (
            move_column(&ops.interp_n2e, ru),
            move_column(&ops.interp_n2e, rv),
            move_column(&ops.interp_n2e, rt),
        )
    };
    let rho_2 = rho;

    // Contravariant vertical velocity at both locations
    let mut uxi_1 = vec![0.0; s1];
    for k in 0..s1 {
        let inv_rho = 1.0 / rho_1[k];
        uxi_1[k] = (rw_1[k] * inv_rho
            - ru[k] * inv_rho * data.daz_1[k]
            - rv[k] * inv_rho * data.dbz_1[k])
            / data.dxz_1[k];
    }
    let mut uxi_2 = vec![0.0; s2];
    for k in 0..s2 {
        let inv_rho = 1.0 / rho_2[k];
        uxi_2[k] = (rw[k] * inv_rho
            - ru_2[k] * inv_rho * data.daz_2[k]
            - rv_2[k] * inv_rho * data.dbz_2[k])
            / data.dxz_2[k];
    }

    let diff_1 = match loc1 {
        ColumnBasis::Levels => &ops.diff_n2n,
        ColumnBasis::Interfaces => &ops.diff_e2e,
    };
    let diff_2 = match loc2 {
        ColumnBasis::Levels => &ops.diff_n2n,
        ColumnBasis::Interfaces => &ops.diff_e2e,
    };

    // Flux-form vertical transport of every component at its location
    let mut flux = vec![0.0; s1.max(s2)];
    let mut dflux = vec![0.0; s1.max(s2)];

    for c in [var::U, var::V, var::T] {
        let qc = layout.slice(q, c);
        for k in 0..s1 {
            flux[k] = data.jac_1[k] * qc[k] * uxi_1[k];
        }
        diff_1.apply(&flux[..s1], &mut dflux[..s1]);
        let fc = layout.slice_mut(out, c);
        for k in 0..s1 {
            fc[k] = -dflux[k] / data.jac_1[k];
        }
    }

    for c in [var::W, var::R] {
        let qc = layout.slice(q, c);
        for k in 0..s2 {
            flux[k] = data.jac_2[k] * qc[k] * uxi_2[k];
        }
        diff_2.apply(&flux[..s2], &mut dflux[..s2]);
        let fc = layout.slice_mut(out, c);
        for k in 0..s2 {
            fc[k] = -dflux[k] / data.jac_2[k];
        }
    }

    // Pressure gradient and buoyancy in the w equation:
    // F(ρw) += -c_p ρθ (∂_ξ π)/(∂_ξ z) - ρ g at the w location
    let mut pi_1 = vec![0.0; s1];
    for k in 0..s1 {
        pi_1[k] = ctx
            .eqs
            .exner(ctx.phys, ctx.eqs.pressure(ctx.phys, rt[k]));
    }
    let dpi_2 = match (loc1, loc2) {
        (ColumnBasis::Levels, ColumnBasis::Interfaces) => move_column(&ops.diff_n2e, &pi_1),
        (ColumnBasis::Levels, ColumnBasis::Levels) => move_column(&ops.diff_n2n, &pi_1),
        (ColumnBasis::Interfaces, ColumnBasis::Interfaces) => move_column(&ops.diff_e2e, &pi_1),
        (ColumnBasis::Interfaces, ColumnBasis::Levels) => move_column(&ops.diff_e2n, &pi_1),
    };

    {
        let fw = layout.slice_mut(out, var::W);
        for k in 0..s2 {
            fw[k] += -ctx.phys.c_p * rt_2[k] * dpi_2[k] / data.dxz_2[k]
                - rho_2[k] * ctx.phys.g;
        }
        // The ground and lid rows are boundary-condition rows
        fw[0] = 0.0;
        fw[s2 - 1] = 0.0;
    }

    // Rayleigh relaxation toward the reference state
    if data.has_rayleigh {
        for c in 0..5 {
            let sigma = match ctx.staggering.location(c) {
                ColumnBasis::Levels => &data.rayleigh_1,
                ColumnBasis::Interfaces => &data.rayleigh_2,
            };
            let q_ref = layout.slice(&data.q_ref, c);
            let qc = layout.slice(q, c);
            let fc = layout.slice_mut(out, c);
            for k in 0..fc.len() {
                fc[k] -= sigma[k] * (qc[k] - q_ref[k]);
            }
        }
    }
}
