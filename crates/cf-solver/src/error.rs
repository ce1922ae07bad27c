//! Error types for solver operations.

use crate::solve::SolveResult;
use cf_components::ComponentError;
use cf_core::error::CoreError;
use thiserror::Error;

/// Errors that can occur while searching for an operating point.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    /// No start converged to a point meeting the target inside all bounds.
    /// `best` is the closest attempt, with `success == false`.
    #[error(
        "No feasible operating point: target residual {:.4e} MPa, max violation {:.4e}",
        best.target_residual,
        best.max_violation
    )]
    NoFeasiblePoint { best: Box<SolveResult> },

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Numeric error: {0}")]
    Core(#[from] CoreError),

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
