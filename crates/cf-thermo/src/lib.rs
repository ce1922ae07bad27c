//! cf-thermo: gas-dynamic primitives for centrifugal compressor stages.
//!
//! Provides:
//! - Real-gas compressibility (simplified corresponding-states correlation)
//! - Circumferential speed, flow and head coefficient conversions
//! - Commercial-to-suction volumetric flow conversion
//! - Polytropic compression ratio and shaft power
//!
//! All formulas on the solver path are generic over [`cf_core::Scalar`], so the
//! same code yields values (`f64`) and exact derivatives (`Dual64`). Arguments
//! that would push a formula outside its domain (zero speed, negative pressure,
//! vanishing efficiency) are floored at the formula boundary instead of
//! producing NaN.
//!
//! Working units: MPa, K, J/(kg·K), m, rpm, mln std m³/day, m³/min, J/kg, kW.
//!
//! # Example
//!
//! ```
//! use cf_thermo::{compression_ratio, compressibility_factor, CriticalPoint};
//!
//! let z = compressibility_factor(3.0_f64, 288.0, CriticalPoint::default());
//! assert!(z > 0.9 && z < 1.0);
//!
//! let ratio = compression_ratio(3.0_f64, 30_000.0, 500.0, 288.0, 1.31, 0.82);
//! assert!(ratio > 1.0);
//! ```

pub mod conditions;
pub mod formulas;

pub use conditions::{CriticalPoint, ReferenceConditions};
pub use formulas::*;
