//! cf-core: stable foundation for centriflow.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - scalar (the `Scalar` abstraction shared by f64 and dual-number evaluation)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod scalar;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use scalar::*;
