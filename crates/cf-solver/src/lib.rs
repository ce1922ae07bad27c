//! Operating-point solver for compressor stations.
//!
//! Given a [`StageChain`](cf_components::StageChain), a [`Mode`](cf_components::Mode)
//! and a [`BoundTable`](cf_components::BoundTable), the solver searches the first-stage
//! suction pressure and every stage speed so that the last stage delivers the
//! target discharge pressure while every stage stays inside its bounds.
//!
//! The search is a Levenberg–Marquardt iteration on a residual vector whose
//! zeros are exactly the feasible operating points. Jacobians come from
//! forward-mode dual numbers threaded through the same stage formulas used for
//! reporting.

pub mod error;
pub mod initialization;
pub mod jacobian;
pub mod lm;
pub mod problem;
pub mod solve;

pub use error::{SolverError, SolverResult};
pub use initialization::InitializationStrategy;
pub use lm::{LmConfig, LmResult, LmTermination};
pub use problem::OperatingPointProblem;
pub use solve::{JacobianMethod, OperatingPointSolver, SolveResult, SolveStatus, SolverConfig};
