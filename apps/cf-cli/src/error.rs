//! Error type for the command-line front end.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to load station {path}: {source}")]
    Load {
        path: PathBuf,
        source: cf_project::ProjectError,
    },

    #[error("Station error: {0}")]
    Project(#[from] cf_project::ProjectError),

    #[error("Component error: {0}")]
    Component(#[from] cf_components::ComponentError),

    #[error("Solver error: {0}")]
    Solver(#[from] cf_solver::SolverError),

    #[error("{failed} of {total} modes without a feasible point")]
    Infeasible { failed: usize, total: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
