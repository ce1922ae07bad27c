//! High-level operating-point solve API.

use crate::error::{SolverError, SolverResult};
use crate::initialization::InitializationStrategy;
use crate::jacobian::{dual_jacobian, finite_difference_jacobian};
use crate::lm::{LmConfig, LmResult, levenberg_marquardt};
use crate::problem::OperatingPointProblem;
use cf_components::{BoundTable, Mode, PenaltyWeights, StageChain, StageResult};
use nalgebra::DVector;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// How the residual Jacobian is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum JacobianMethod {
    /// Forward-mode dual numbers, one pass per decision variable.
    #[default]
    Automatic,
    /// Forward differences on the scaled decision vector.
    FiniteDifference,
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum iterations per start
    pub max_iterations: usize,
    /// Allowed |p_out − target| (MPa)
    pub target_tol: f64,
    /// Allowed normalized bound violation
    pub constraint_tol: f64,
    pub jacobian: JacobianMethod,
    /// Relative step for finite differences
    pub fd_epsilon: f64,
    pub strategy: InitializationStrategy,
    /// Starts tried in order when `strategy` does not converge
    pub fallback_strategies: Vec<InitializationStrategy>,
    /// Weights of the reported objective
    pub weights: PenaltyWeights,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            target_tol: 1e-3,
            constraint_tol: 1e-6,
            jacobian: JacobianMethod::Automatic,
            fd_epsilon: 1e-7,
            strategy: InitializationStrategy::Midpoint,
            fallback_strategies: vec![InitializationStrategy::Nominal],
            weights: PenaltyWeights::default(),
        }
    }
}

impl SolverConfig {
    fn lm_config(&self) -> LmConfig {
        LmConfig {
            max_iterations: self.max_iterations,
            ..LmConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Converged,
    NoFeasiblePoint,
}

/// Operating point found by the solver, or the best attempt when none is feasible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveResult {
    pub rows: Vec<StageResult>,
    /// First-stage suction pressure (MPa)
    pub suction_pressure: f64,
    /// Stage speeds (rpm)
    pub speeds: Vec<f64>,
    pub status: SolveStatus,
    pub success: bool,
    pub iterations: usize,
    /// Norm of the scaled residual vector
    pub residual_norm: f64,
    /// |p_out − target| (MPa)
    pub target_residual: f64,
    /// Largest normalized bound violation, final discharge window included
    pub max_violation: f64,
    pub objective: f64,
    pub strategy: InitializationStrategy,
}

impl SolveResult {
    /// Final-stage discharge pressure (MPa).
    pub fn discharge_pressure(&self) -> f64 {
        self.rows.last().map(|r| r.discharge_pressure).unwrap_or(0.0)
    }
}

/// Searches suction pressure and stage speeds that meet a mode's target.
#[derive(Debug, Clone)]
pub struct OperatingPointSolver {
    chain: StageChain,
    config: SolverConfig,
}

impl OperatingPointSolver {
    pub fn new(chain: StageChain, config: SolverConfig) -> Self {
        Self { chain, config }
    }

    pub fn chain(&self) -> &StageChain {
        &self.chain
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve one mode.
    ///
    /// The configured strategy is tried first, then each fallback in order;
    /// the first start that converges wins.
    ///
    /// # Errors
    ///
    /// - [`SolverError::NoFeasiblePoint`] with the best attempt if no start
    ///   converges to a feasible point
    /// - [`SolverError::ProblemSetup`] or [`SolverError::Component`] for an
    ///   invalid mode or a bound table that does not match the chain
    pub fn solve(&self, mode: &Mode, bounds: &BoundTable) -> SolverResult<SolveResult> {
        mode.validate()?;
        let problem = OperatingPointProblem::new(&self.chain, mode, bounds)?;

        let strategies = std::iter::once(self.config.strategy).chain(
            self.config
                .fallback_strategies
                .iter()
                .copied()
                .filter(|s| *s != self.config.strategy),
        );

        let mut best: Option<SolveResult> = None;
        for strategy in strategies {
            let attempt = match self.attempt(&problem, mode, bounds, strategy) {
                Ok(attempt) => attempt,
                Err(SolverError::Numeric { what }) => {
                    warn!(strategy = strategy.as_str(), %what, "start rejected");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if attempt.success {
                info!(
                    strategy = strategy.as_str(),
                    iterations = attempt.iterations,
                    suction_pressure = attempt.suction_pressure,
                    discharge_pressure = attempt.discharge_pressure(),
                    "operating point converged"
                );
                return Ok(attempt);
            }
            warn!(
                strategy = strategy.as_str(),
                target_residual = attempt.target_residual,
                max_violation = attempt.max_violation,
                "start did not converge"
            );
            let better = best
                .as_ref()
                .is_none_or(|b| attempt.residual_norm < b.residual_norm);
            if better {
                best = Some(attempt);
            }
        }

        match best {
            Some(best) => {
                warn!(
                    target = mode.target_discharge_pressure(),
                    residual_norm = best.residual_norm,
                    "no feasible operating point"
                );
                Err(SolverError::NoFeasiblePoint {
                    best: Box::new(best),
                })
            }
            None => Err(SolverError::Numeric {
                what: "every start produced a non-finite residual".to_string(),
            }),
        }
    }

    /// Solve independent modes in parallel.
    pub fn solve_batch(&self, modes: &[Mode], bounds: &BoundTable) -> Vec<SolverResult<SolveResult>> {
        modes.par_iter().map(|m| self.solve(m, bounds)).collect()
    }

    fn attempt(
        &self,
        problem: &OperatingPointProblem<'_>,
        mode: &Mode,
        bounds: &BoundTable,
        strategy: InitializationStrategy,
    ) -> SolverResult<SolveResult> {
        let (p0, speeds0) = strategy.initial_guess(&self.chain, mode)?;
        debug!(strategy = strategy.as_str(), p0, ?speeds0, "starting point");
        let x0 = problem.scale(p0, &speeds0);

        let residual_fn = |x: &DVector<f64>| problem.residual_vector(x);
        let lm = match self.config.jacobian {
            JacobianMethod::Automatic => levenberg_marquardt(
                x0,
                residual_fn,
                |x| dual_jacobian(x, |xd| problem.residuals(xd)),
                &problem.box_bounds(),
                &self.config.lm_config(),
            )?,
            JacobianMethod::FiniteDifference => levenberg_marquardt(
                x0,
                residual_fn,
                |x| {
                    let r = problem.residual_vector(x)?;
                    let j = finite_difference_jacobian(x, residual_fn, self.config.fd_epsilon)?;
                    Ok((r, j))
                },
                &problem.box_bounds(),
                &self.config.lm_config(),
            )?,
        };

        self.report(problem, mode, bounds, strategy, &lm)
    }

    fn report(
        &self,
        problem: &OperatingPointProblem<'_>,
        mode: &Mode,
        bounds: &BoundTable,
        strategy: InitializationStrategy,
        lm: &LmResult,
    ) -> SolverResult<SolveResult> {
        let (p, speeds) = problem.unscale(lm.x.as_slice());
        let scored = self.chain.evaluate_chain_with_bounds(
            &mode.with_suction_pressure(p),
            &speeds,
            bounds,
            &self.config.weights,
        )?;
        let p_out = scored
            .rows
            .last()
            .map(|r| r.discharge_pressure)
            .unwrap_or(0.0);
        let max_violation = scored
            .max_violation()
            .max(problem.final_bound().violation(p_out));
        let success = scored.target_residual <= self.config.target_tol
            && max_violation <= self.config.constraint_tol;

        Ok(SolveResult {
            rows: scored.rows,
            suction_pressure: p,
            speeds,
            status: if success {
                SolveStatus::Converged
            } else {
                SolveStatus::NoFeasiblePoint
            },
            success,
            iterations: lm.iterations,
            residual_norm: lm.residual_norm,
            target_residual: scored.target_residual,
            max_violation,
            objective: scored.objective,
            strategy,
        })
    }
}
