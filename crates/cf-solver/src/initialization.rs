//! Starting points for the operating-point search.
//!
//! The residual system usually has many roots (suction pressure and speeds
//! trade off against each other), so the start decides which feasible point is
//! found. Each strategy is deterministic.

use crate::error::SolverResult;
use cf_components::{Mode, StageChain};
use cf_thermo::MIN_PRESSURE;
use serde::Serialize;

/// Initialization strategy for the operating-point search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum InitializationStrategy {
    /// Suction pressure at half the target; each speed at the middle of its
    /// speed window at that pressure.
    #[default]
    Midpoint,

    /// Every stage at nominal speed; suction pressure back-calculated from the
    /// target through the nominal compression ratios and intercooler drops.
    Nominal,
}

impl InitializationStrategy {
    /// Convert strategy to human-readable name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            InitializationStrategy::Midpoint => "Midpoint",
            InitializationStrategy::Nominal => "Nominal",
        }
    }

    /// Starting suction pressure (MPa) and speeds (rpm).
    pub fn initial_guess(&self, chain: &StageChain, mode: &Mode) -> SolverResult<(f64, Vec<f64>)> {
        let target = mode.target_discharge_pressure();
        match self {
            InitializationStrategy::Midpoint => {
                let p0 = 0.5 * target;
                let windows = chain.freq_bounds_all(&mode.with_suction_pressure(p0))?;
                Ok((p0, windows.iter().map(|w| w.midpoint()).collect()))
            }
            InitializationStrategy::Nominal => {
                let drop = chain.config().intercooler_drop;
                let mut p = target;
                for (i, stage) in chain.stages().iter().enumerate().rev() {
                    p /= stage.map.params().nominal_ratio;
                    if i > 0 {
                        p += drop;
                    }
                }
                let speeds = chain
                    .stages()
                    .iter()
                    .map(|s| s.map.params().nominal_speed)
                    .collect();
                Ok((p.clamp(MIN_PRESSURE, target), speeds))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cf_components::{
        ChainConfig, DimensionlessPoint, StageParams, stage_map_from_points,
    };
    use cf_thermo::ReferenceConditions;
    use std::sync::Arc;

    fn chain(n: usize) -> StageChain {
        let params = StageParams {
            name: "init".into(),
            gas_constant: 500.0,
            suction_temperature: 288.0,
            k: 1.31,
            diameter: 0.6,
            nominal_speed: 6000.0,
            nominal_power: 16000.0,
            nominal_ratio: 1.5,
            nominal_discharge_pressure: 7.5,
            reference: ReferenceConditions::default(),
        };
        let points: Vec<DimensionlessPoint> = (0..9)
            .map(|i| {
                let phi = 0.04 + 0.005 * i as f64;
                DimensionlessPoint {
                    flow_coefficient: phi,
                    head_coefficient: 0.9 - 30.0 * (phi - 0.06).powi(2),
                    efficiency: 0.82 - 60.0 * (phi - 0.06).powi(2),
                }
            })
            .collect();
        let map = Arc::new(stage_map_from_points(params, points, 4).unwrap());
        StageChain::new(vec![(map, 1); n], ChainConfig::default()).unwrap()
    }

    #[test]
    fn default_is_midpoint() {
        assert_eq!(InitializationStrategy::default(), InitializationStrategy::Midpoint);
        assert_eq!(InitializationStrategy::Nominal.as_str(), "Nominal");
    }

    #[test]
    fn midpoint_sits_inside_speed_windows() {
        let chain = chain(2);
        let mode = Mode::new(8.5, 3.0, 6.0);
        let (p0, speeds) = InitializationStrategy::Midpoint
            .initial_guess(&chain, &mode)
            .unwrap();
        assert_relative_eq!(p0, 3.0);
        let windows = chain.freq_bounds_all(&mode).unwrap();
        for (n, w) in speeds.iter().zip(&windows) {
            assert!(*n > w.lower() && *n < w.upper());
        }
    }

    #[test]
    fn nominal_walks_back_through_ratios() {
        let chain = chain(2);
        let mode = Mode::new(8.5, 3.0, 6.75);
        let (p0, speeds) = InitializationStrategy::Nominal
            .initial_guess(&chain, &mode)
            .unwrap();
        // 6.75 / 1.5 = 4.5; + 0.06 = 4.56; / 1.5 = 3.04
        assert_relative_eq!(p0, 3.04, epsilon = 1e-12);
        assert_eq!(speeds, vec![6000.0, 6000.0]);
    }
}
