//! Jacobian-free Newton-Krylov for the column-local implicit problem.
//!
//! Newton iterations with finite-difference Jacobian-vector products,
//! GMRES for the linear correction (right-preconditioned by an LU
//! factorization of the finite-difference column Jacobian), and an
//! optional backtracking line search.

use super::gmres::{gmres_solve, GmresOptions};
use crate::error::{ModelError, Result};
use faer::linalg::solvers::Solve;
use faer::Mat;

/// Nonlinear solver controls.
#[derive(Clone, Copy, Debug)]
pub struct SolverOptions {
    /// Nonlinear residual tolerance (on the l2 norm).
    pub tol: f64,
    /// Maximum Newton iterations.
    pub max_iterations: usize,
    /// GMRES controls for the linear corrections.
    pub gmres: GmresOptions,
    /// Enable backtracking line search.
    pub line_search: bool,
    /// Preconditioning of the linear systems.
    pub preconditioner: ColumnPreconditioner,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tol: 1.0e-10,
            max_iterations: 25,
            gmres: GmresOptions::default(),
            line_search: true,
            preconditioner: ColumnPreconditioner::BlockJacobian,
        }
    }
}

/// Right preconditioner for the column Jacobian systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnPreconditioner {
    /// No preconditioning.
    Identity,
    /// LU of the finite-difference column Jacobian, rebuilt once per
    /// Newton iteration. The column residual has banded block structure,
    /// so the factorization is cheap at column sizes.
    BlockJacobian,
}

/// Convergence metadata of one column solve.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewtonStats {
    /// Newton iterations performed.
    pub newton_iterations: usize,
    /// Total residual evaluations (including perturbed ones).
    pub residual_evaluations: usize,
    /// Final nonlinear residual norm.
    pub residual_norm: f64,
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Solve R(q) = 0 in place.
///
/// `residual(q, out)` evaluates the column residual. On non-convergence
/// the error is `Solver`-category and recoverable only if the caller maps
/// it to a column: the vertical dynamics layer attaches column indices.
pub fn jfnk_solve<F>(mut residual: F, q: &mut [f64], opts: &SolverOptions) -> Result<NewtonStats>
where
    F: FnMut(&[f64], &mut [f64]),
{
    let n = q.len();
    let mut stats = NewtonStats::default();

    let mut r = vec![0.0; n];
    let mut r_trial = vec![0.0; n];
    let mut scratch = vec![0.0; n];

    residual(q, &mut r);
    stats.residual_evaluations += 1;
    let mut r_norm = norm(&r);

    // Scale-aware absolute tolerance: columns holding density carry O(1)
    // values while momenta can be O(10²)
    let q_scale = 1.0 + norm(q);
    let tol = opts.tol * q_scale;

    for iteration in 0..opts.max_iterations {
        if r_norm <= tol {
            stats.newton_iterations = iteration;
            stats.residual_norm = r_norm;
            return Ok(stats);
        }

        // Optional right preconditioner from the finite-difference
        // column Jacobian
        let lu = match opts.preconditioner {
            ColumnPreconditioner::Identity => None,
            ColumnPreconditioner::BlockJacobian => {
                let mut jac = Mat::zeros(n, n);
                let fd_eps = (f64::EPSILON).sqrt() * q_scale;
                for col in 0..n {
                    let saved = q[col];
                    q[col] = saved + fd_eps;
                    residual(q, &mut scratch);
                    stats.residual_evaluations += 1;
                    q[col] = saved;
                    for row in 0..n {
                        jac[(row, col)] = (scratch[row] - r[row]) / fd_eps;
                    }
                }
                Some(jac.as_ref().full_piv_lu())
            }
        };

        // Newton correction: J δ = -r, J·v by finite differences
        let rhs: Vec<f64> = r.iter().map(|x| -x).collect();
        let mut delta = vec![0.0; n];
        {
            let q_base: Vec<f64> = q.to_vec();
            let mut evals = 0usize;
            let matvec = |v: &[f64], out: &mut [f64]| {
                // Right preconditioning: apply M⁻¹ first, then J
                let z: Vec<f64> = match &lu {
                    None => v.to_vec(),
                    Some(lu) => {
                        let mut col = Mat::zeros(n, 1);
                        for (i, &vi) in v.iter().enumerate() {
                            col[(i, 0)] = vi;
                        }
                        let sol = lu.solve(&col);
                        (0..n).map(|i| sol[(i, 0)]).collect()
                    }
                };

                let v_norm = norm(&z);
                if v_norm == 0.0 {
                    out.fill(0.0);
                    return;
                }
                let eps = (f64::EPSILON).sqrt() * q_scale / v_norm;
                let mut q_pert = q_base.clone();
                for (qp, zi) in q_pert.iter_mut().zip(z.iter()) {
                    *qp += eps * zi;
                }
                let mut r_pert = vec![0.0; n];
                residual(&q_pert, &mut r_pert);
                evals += 1;
                for ((o, rp), r0) in out.iter_mut().zip(r_pert.iter()).zip(r.iter()) {
                    *o = (rp - r0) / eps;
                }
            };

            gmres_solve(matvec, &rhs, &mut delta, &opts.gmres)?;
            stats.residual_evaluations += evals;
        }

        // Undo the right preconditioning to recover the physical correction
        if let Some(lu) = &lu {
            let mut col = Mat::zeros(n, 1);
            for (i, &di) in delta.iter().enumerate() {
                col[(i, 0)] = di;
            }
            let sol = lu.solve(&col);
            for (i, d) in delta.iter_mut().enumerate() {
                *d = sol[(i, 0)];
            }
        }

        // Backtracking line search on the residual norm
        let mut step = 1.0;
        let mut accepted = false;
        for _ in 0..8 {
            let q_trial: Vec<f64> = q
                .iter()
                .zip(delta.iter())
                .map(|(qi, di)| qi + step * di)
                .collect();
            residual(&q_trial, &mut r_trial);
            stats.residual_evaluations += 1;
            let trial_norm = norm(&r_trial);

            if trial_norm < r_norm || !opts.line_search {
                q.copy_from_slice(&q_trial);
                std::mem::swap(&mut r, &mut r_trial);
                r_norm = trial_norm;
                accepted = true;
                break;
            }
            step *= 0.5;
        }

        if !accepted {
            stats.newton_iterations = iteration + 1;
            stats.residual_norm = r_norm;
            return Err(ModelError::Solver(format!(
                "Newton line search failed to reduce the residual ({r_norm:.3e})"
            )));
        }
    }

    if r_norm <= tol {
        stats.newton_iterations = opts.max_iterations;
        stats.residual_norm = r_norm;
        return Ok(stats);
    }

    Err(ModelError::Solver(format!(
        "Newton failed to converge in {} iterations (residual {r_norm:.3e})",
        opts.max_iterations
    )))
}
