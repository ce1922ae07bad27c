//! cf-components: stage performance maps and multi-stage chains.
//!
//! A [`StageMap`] reduces vendor/test samples of one centrifugal compressor
//! stage to flow/head coefficient fits. A [`StageChain`] connects stage maps in
//! series, carrying pressure through intercoolers and splitting flow over
//! parallel units. [`BoundTable`] describes the safety envelope each stage must
//! stay inside.
//!
//! Every state computation is generic over [`cf_core::Scalar`], so the same
//! code yields plain values for reports and dual numbers for the solver.
//!
//! # Example
//!
//! ```
//! use cf_components::{
//!     DimensionlessPoint, Mode, StageChain, StageParams, stage_map_from_points,
//! };
//! use cf_thermo::ReferenceConditions;
//! use std::sync::Arc;
//!
//! let params = StageParams {
//!     name: "stage-1".into(),
//!     gas_constant: 500.0,
//!     suction_temperature: 288.0,
//!     k: 1.31,
//!     diameter: 0.6,
//!     nominal_speed: 6000.0,
//!     nominal_power: 16000.0,
//!     nominal_ratio: 1.3,
//!     nominal_discharge_pressure: 4.5,
//!     reference: ReferenceConditions::default(),
//! };
//! let points = (0..9)
//!     .map(|i| {
//!         let phi = 0.04 + 0.005 * i as f64;
//!         DimensionlessPoint {
//!             flow_coefficient: phi,
//!             head_coefficient: 0.9 - 30.0 * (phi - 0.06).powi(2),
//!             efficiency: 0.82 - 60.0 * (phi - 0.06).powi(2),
//!         }
//!     })
//!     .collect();
//! let map = Arc::new(stage_map_from_points(params, points, 4).unwrap());
//!
//! let chain = StageChain::single(map);
//! let mode = Mode::new(8.5, 3.0, 3.8);
//! let rows = chain.evaluate_chain(&mode, &[6000.0]).unwrap();
//! println!("discharge: {:.3} MPa", rows[0].discharge_pressure);
//! ```

pub mod band;
pub mod bounds;
pub mod chain;
pub mod error;
pub mod fit;
pub mod golden;
pub mod mode;
pub mod stage;

// Re-exports
pub use band::{
    ChartPoint, DEFAULT_PER_SIDE, DEFAULT_SPEED_FRACTIONS, EfficiencyBand, IsoEfficiencyLine,
    SpeedLine, iso_efficiency_lines,
};
pub use bounds::{BoundSpec, BoundTable, BoundedQuantity, StageBounds, StageViolations};
pub use chain::{
    ChainConfig, ChainPenalty, ChainStage, DEFAULT_DEPENDENT_SAMPLES, PenaltyWeights,
    PropagatedStage, StageChain,
};
pub use error::{ComponentError, ComponentResult};
pub use fit::Polynomial;
pub use mode::{FlowDemand, Mode};
pub use stage::{
    DEFAULT_DEGREE, DimensionlessPoint, SamplePoint, SpeedBounds, StageMap, StageParams,
    StageResult, StageState, build_stage_map, derive_dimensionless, stage_map_from_points,
};
