//! Restarted GMRES with Givens rotations.
//!
//! Solves A x = b for the column-local Jacobian systems. The operator is
//! supplied as a matrix-vector closure so the Newton layer can use
//! finite-difference Jacobian-vector products; right preconditioning is
//! applied by the caller wrapping the closure.

use crate::error::{ModelError, Result};

/// GMRES controls.
#[derive(Clone, Copy, Debug)]
pub struct GmresOptions {
    /// Relative residual tolerance.
    pub tol: f64,
    /// Krylov dimension before a restart.
    pub restart: usize,
    /// Maximum restarts.
    pub max_restarts: usize,
}

impl Default for GmresOptions {
    fn default() -> Self {
        Self {
            tol: 1.0e-8,
            restart: 30,
            max_restarts: 4,
        }
    }
}

/// Converged solution metadata.
#[derive(Clone, Copy, Debug)]
pub struct GmresResult {
    /// Total matrix-vector products performed.
    pub iterations: usize,
    /// Final relative residual.
    pub relative_residual: f64,
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Solve A x = b with the operator given as `matvec(v, out)`.
///
/// `x` holds the initial guess on entry and the solution on exit.
/// Breakdown (a vanishing new Krylov direction with a non-converged
/// residual) and stagnation after the restart budget surface as
/// `Solver` errors.
pub fn gmres_solve<F>(
    mut matvec: F,
    b: &[f64],
    x: &mut [f64],
    opts: &GmresOptions,
) -> Result<GmresResult>
where
    F: FnMut(&[f64], &mut [f64]),
{
    let n = b.len();
    let m = opts.restart.min(n);
    let b_norm = norm(b);
    if b_norm == 0.0 {
        x.fill(0.0);
        return Ok(GmresResult {
            iterations: 0,
            relative_residual: 0.0,
        });
    }

    let mut total_iters = 0;
    let mut scratch = vec![0.0; n];

    for _restart in 0..=opts.max_restarts {
        // Residual of the current iterate
        matvec(x, &mut scratch);
        let mut r: Vec<f64> = b.iter().zip(scratch.iter()).map(|(bi, ax)| bi - ax).collect();
        let r_norm = norm(&r);
        if r_norm / b_norm < opts.tol {
            return Ok(GmresResult {
                iterations: total_iters,
                relative_residual: r_norm / b_norm,
            });
        }

        // Arnoldi basis and the Hessenberg least-squares system reduced by
        // Givens rotations
        let mut basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        for v in r.iter_mut() {
            *v /= r_norm;
        }
        basis.push(r);

        let mut h = vec![vec![0.0; m]; m + 1];
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];
        let mut g = vec![0.0; m + 1];
        g[0] = r_norm;

        let mut k_used = 0;

        for k in 0..m {
            matvec(&basis[k], &mut scratch);
            total_iters += 1;

            let mut w = scratch.clone();
            // Modified Gram-Schmidt
            for (i, v) in basis.iter().enumerate() {
                h[i][k] = dot(&w, v);
                for (wj, vj) in w.iter_mut().zip(v.iter()) {
                    *wj -= h[i][k] * vj;
                }
            }
            h[k + 1][k] = norm(&w);

            let happy = h[k + 1][k] < 1.0e-14 * b_norm;
            if !happy {
                for wj in w.iter_mut() {
                    *wj /= h[k + 1][k];
                }
                basis.push(w);
            }

            // Apply the accumulated rotations to the new column, then form
            // the rotation eliminating the subdiagonal
            for i in 0..k {
                let temp = cs[i] * h[i][k] + sn[i] * h[i + 1][k];
                h[i + 1][k] = -sn[i] * h[i][k] + cs[i] * h[i + 1][k];
                h[i][k] = temp;
            }
            let denom = (h[k][k] * h[k][k] + h[k + 1][k] * h[k + 1][k]).sqrt();
            if denom < 1.0e-300 {
                return Err(ModelError::Solver(
                    "GMRES breakdown: vanishing Hessenberg column".into(),
                ));
            }
            cs[k] = h[k][k] / denom;
            sn[k] = h[k + 1][k] / denom;
            h[k][k] = denom;
            h[k + 1][k] = 0.0;

            g[k + 1] = -sn[k] * g[k];
            g[k] *= cs[k];
            k_used = k + 1;

            let rel = g[k + 1].abs() / b_norm;
            if rel < opts.tol || happy {
                break;
            }
        }

        // Back-substitute for the Krylov coefficients and update x
        let mut y = vec![0.0; k_used];
        for i in (0..k_used).rev() {
            let mut sum = g[i];
            for j in (i + 1)..k_used {
                sum -= h[i][j] * y[j];
            }
            y[i] = sum / h[i][i];
        }
        for (i, &yi) in y.iter().enumerate() {
            for (xj, vj) in x.iter_mut().zip(basis[i].iter()) {
                *xj += yi * vj;
            }
        }

        matvec(x, &mut scratch);
        let rel = norm(
            &b.iter()
                .zip(scratch.iter())
                .map(|(bi, ax)| bi - ax)
                .collect::<Vec<f64>>(),
        ) / b_norm;
        if rel < opts.tol {
            return Ok(GmresResult {
                iterations: total_iters,
                relative_residual: rel,
            });
        }
    }

    Err(ModelError::Solver(format!(
        "GMRES stagnated after {} matrix-vector products",
        total_iters
    )))
}
