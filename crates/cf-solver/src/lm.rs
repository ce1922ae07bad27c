//! Levenberg–Marquardt least-squares iteration with box projection.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Levenberg–Marquardt configuration.
#[derive(Clone, Debug)]
pub struct LmConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: f64,
    /// Relative step size below which the iteration is considered stalled
    pub step_tol: f64,
    /// Starting damping factor
    pub initial_damping: f64,
    /// Damping multiplier after a rejected step
    pub damping_increase: f64,
    /// Damping multiplier after an accepted step
    pub damping_decrease: f64,
    /// Damping above which the iteration gives up
    pub max_damping: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            abs_tol: 1e-10,
            step_tol: 1e-14,
            initial_damping: 1e-3,
            damping_increase: 10.0,
            damping_decrease: 0.25,
            max_damping: 1e12,
        }
    }
}

/// Why the iteration stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LmTermination {
    /// Residual norm fell below `abs_tol`
    Converged,
    /// Step or damping limits reached with a nonzero residual
    Stalled,
    MaxIterations,
}

/// Iteration result.
#[derive(Clone, Debug)]
pub struct LmResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Final residual norm
    pub residual_norm: f64,
    /// Number of iterations
    pub iterations: usize,
    pub termination: LmTermination,
}

impl LmResult {
    pub fn converged(&self) -> bool {
        self.termination == LmTermination::Converged
    }
}

/// Element-wise box `[lower, upper]` for the decision vector.
#[derive(Clone, Debug)]
pub struct BoxBounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl BoxBounds {
    pub fn project(&self, x: &mut DVector<f64>) {
        for i in 0..x.len() {
            x[i] = x[i].max(self.lower[i]).min(self.upper[i]);
        }
    }
}

/// Solve `(JᵀJ + λ·D) dx = -Jᵀr`, Cholesky first and LU when that fails.
fn damped_step(jac: &DMatrix<f64>, r: &DVector<f64>, damping: f64) -> Option<DVector<f64>> {
    let jt = jac.transpose();
    let mut a = &jt * jac;
    let g = -(&jt * r);
    for i in 0..a.nrows() {
        let d = a[(i, i)].max(1e-12);
        a[(i, i)] += damping * d;
    }
    match a.clone().cholesky() {
        Some(chol) => Some(chol.solve(&g)),
        None => a.lu().solve(&g),
    }
}

/// Minimize ½‖r(x)‖² from `x0`, keeping `x` inside `bounds`.
///
/// `model` returns the residual and its Jacobian at a point; `residual_fn`
/// evaluates the residual alone for trial steps. A non-finite trial residual
/// counts as a rejected step.
pub fn levenberg_marquardt<F, M>(
    x0: DVector<f64>,
    residual_fn: F,
    model: M,
    bounds: &BoxBounds,
    config: &LmConfig,
) -> SolverResult<LmResult>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    M: Fn(&DVector<f64>) -> SolverResult<(DVector<f64>, DMatrix<f64>)>,
{
    let mut x = x0;
    bounds.project(&mut x);
    let mut r_norm = residual_fn(&x)?.norm();
    if !r_norm.is_finite() {
        return Err(SolverError::Numeric {
            what: "Non-finite residual at starting point".to_string(),
        });
    }
    let mut damping = config.initial_damping;

    for iter in 0..config.max_iterations {
        if r_norm <= config.abs_tol {
            return Ok(LmResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                termination: LmTermination::Converged,
            });
        }

        let (r, jac) = model(&x)?;
        debug!(iter, residual_norm = r_norm, damping, "lm iteration");

        let accepted = loop {
            let Some(dx) = damped_step(&jac, &r, damping) else {
                damping *= config.damping_increase;
                if damping > config.max_damping {
                    break None;
                }
                continue;
            };
            let mut x_new = &x + &dx;
            bounds.project(&mut x_new);
            let r_new_norm = residual_fn(&x_new)?.norm();
            if r_new_norm.is_finite() && r_new_norm < r_norm {
                damping = (damping * config.damping_decrease).max(1e-15);
                break Some((x_new, r_new_norm));
            }
            damping *= config.damping_increase;
            if damping > config.max_damping {
                break None;
            }
        };

        let Some((x_new, r_new_norm)) = accepted else {
            return Ok(LmResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                termination: LmTermination::Stalled,
            });
        };

        let step = (&x_new - &x).norm();
        x = x_new;
        r_norm = r_new_norm;
        if r_norm > config.abs_tol && step <= config.step_tol * (x.norm() + config.step_tol) {
            return Ok(LmResult {
                x,
                residual_norm: r_norm,
                iterations: iter + 1,
                termination: LmTermination::Stalled,
            });
        }
    }

    let termination = if r_norm <= config.abs_tol {
        LmTermination::Converged
    } else {
        LmTermination::MaxIterations
    };
    Ok(LmResult {
        x,
        residual_norm: r_norm,
        iterations: config.max_iterations,
        termination,
    })
}
