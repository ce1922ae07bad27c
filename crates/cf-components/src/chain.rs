//! Stages connected in series, each possibly split over identical parallel units.

use crate::bounds::{BoundTable, StageViolations};
use crate::error::{ComponentError, ComponentResult};
use crate::mode::Mode;
use crate::stage::{SpeedBounds, StageMap, StageResult, StageState};
use cf_core::{Scalar, floor_at, linspace};
use cf_thermo::{MIN_PRESSURE, volumetric_flow_from_mass_flow};
use serde::Serialize;
use std::sync::Arc;

/// First-stage speeds swept by [`StageChain::dependent_speed_bounds`] by default.
pub const DEFAULT_DEPENDENT_SAMPLES: usize = 50;

/// Chain-wide settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChainConfig {
    /// Pressure lost in the intercooler between consecutive stages (MPa)
    pub intercooler_drop: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            intercooler_drop: 0.06,
        }
    }
}

/// A stage map and the number of identical units sharing the stage flow.
#[derive(Clone, Debug)]
pub struct ChainStage {
    pub map: Arc<StageMap>,
    pub parallel_units: usize,
}

/// Weights of the scalar objective built from a penalty evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PenaltyWeights {
    pub penalty: f64,
    pub target: f64,
    /// Power (kW) that contributes one unit to the objective
    pub power_normalization: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            penalty: 1.0,
            target: 1.0,
            power_normalization: 7000.0,
        }
    }
}

/// Chain rows with their bound violations folded into one objective.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainPenalty {
    pub rows: Vec<StageResult>,
    pub violations: Vec<StageViolations>,
    /// Mean of the nonzero normalized violations, 0 if there are none
    pub penalty: f64,
    /// |final discharge − target| (MPa)
    pub target_residual: f64,
    /// Σ power / power_normalization
    pub power_term: f64,
    pub objective: f64,
}

impl ChainPenalty {
    pub fn max_violation(&self) -> f64 {
        self.violations
            .iter()
            .map(StageViolations::max)
            .fold(0.0, f64::max)
    }
}

/// One stage of a propagated chain.
#[derive(Clone, Copy, Debug)]
pub struct PropagatedStage<D> {
    /// Commercial flow through one unit
    pub flow: f64,
    pub suction_pressure: D,
    pub state: StageState<D>,
}

/// Ordered series of stages.
#[derive(Clone, Debug)]
pub struct StageChain {
    stages: Vec<ChainStage>,
    config: ChainConfig,
}

impl StageChain {
    /// # Errors
    ///
    /// [`ComponentError::EmptyChain`] without stages, [`ComponentError::InvalidArg`]
    /// for a zero unit count or a negative intercooler drop.
    pub fn new(
        stages: impl IntoIterator<Item = (Arc<StageMap>, usize)>,
        config: ChainConfig,
    ) -> ComponentResult<Self> {
        let stages: Vec<ChainStage> = stages
            .into_iter()
            .map(|(map, parallel_units)| ChainStage {
                map,
                parallel_units,
            })
            .collect();
        if stages.is_empty() {
            return Err(ComponentError::EmptyChain);
        }
        if stages.iter().any(|s| s.parallel_units == 0) {
            return Err(ComponentError::InvalidArg {
                what: "parallel unit count must be at least 1",
            });
        }
        if !(config.intercooler_drop.is_finite() && config.intercooler_drop >= 0.0) {
            return Err(ComponentError::InvalidArg {
                what: "intercooler drop must be non-negative",
            });
        }
        Ok(Self { stages, config })
    }

    /// Chain of a single stage with one unit.
    pub fn single(map: Arc<StageMap>) -> Self {
        Self {
            stages: vec![ChainStage {
                map,
                parallel_units: 1,
            }],
            config: ChainConfig::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[ChainStage] {
        &self.stages
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Flow through one unit of stage `index`.
    pub fn unit_flow(&self, mode: &Mode, index: usize) -> ComponentResult<f64> {
        let stage = self.stages.get(index).ok_or(ComponentError::IndexOutOfRange {
            what: "chain stage",
            index,
            len: self.stages.len(),
        })?;
        Ok(mode.stage_flow(index)? / stage.parallel_units as f64)
    }

    fn check_flow_demand(&self, mode: &Mode) -> ComponentResult<()> {
        match mode.flow().stage_count() {
            Some(n) if n != self.stages.len() => Err(ComponentError::StageCountMismatch {
                what: "per-stage flow",
                expected: self.stages.len(),
                got: n,
            }),
            _ => Ok(()),
        }
    }

    fn next_suction<D: Scalar>(&self, discharge: D) -> D {
        floor_at(discharge - self.config.intercooler_drop, MIN_PRESSURE)
    }

    /// Speed window of every stage.
    ///
    /// Two pressure branches are carried through the chain: the bound placing
    /// each stage at its maximum sampled φ feeds the next stage's
    /// `at_max_flow_coefficient`, and likewise for the minimum.
    pub fn freq_bounds_all(&self, mode: &Mode) -> ComponentResult<Vec<SpeedBounds>> {
        self.check_flow_demand(mode)?;
        let volume_rate = |flow: f64, p: f64| suction_volume_rate(mode, flow, p);

        let mut p_max_branch = mode.suction_pressure();
        let mut p_min_branch = mode.suction_pressure();
        let mut out = Vec::with_capacity(self.stages.len());
        for (i, stage) in self.stages.iter().enumerate() {
            let flow = self.unit_flow(mode, i)?;
            let at_max = stage
                .map
                .speed_bounds_for_volume_rate(volume_rate(flow, p_max_branch))
                .at_max_flow_coefficient;
            let at_min = stage
                .map
                .speed_bounds_for_volume_rate(volume_rate(flow, p_min_branch))
                .at_min_flow_coefficient;
            out.push(SpeedBounds {
                at_max_flow_coefficient: at_max,
                at_min_flow_coefficient: at_min,
            });

            let high = stage.map.state_at(mode, flow, p_max_branch, at_max);
            let low = stage.map.state_at(mode, flow, p_min_branch, at_min);
            p_max_branch = self.next_suction(high.discharge_pressure);
            p_min_branch = self.next_suction(low.discharge_pressure);
        }
        Ok(out)
    }

    /// Speed windows the second stage can use while the first stage sweeps
    /// `first` in `samples` evenly spaced speeds.
    ///
    /// Each entry pairs a first-stage speed with the window of stage two at the
    /// suction pressure that speed produces (discharge minus intercooler drop).
    pub fn dependent_speed_bounds(
        &self,
        mode: &Mode,
        first: &SpeedBounds,
        samples: usize,
    ) -> ComponentResult<Vec<(f64, SpeedBounds)>> {
        if self.stages.len() < 2 {
            return Err(ComponentError::InvalidArg {
                what: "dependent speed bounds need at least two stages",
            });
        }
        self.check_flow_demand(mode)?;
        let lead = &self.stages[0];
        let next = &self.stages[1];
        let lead_flow = self.unit_flow(mode, 0)?;
        let next_flow = self.unit_flow(mode, 1)?;

        Ok(linspace(first.lower(), first.upper(), samples)
            .into_iter()
            .map(|speed| {
                let state = lead.map.state_at(mode, lead_flow, mode.suction_pressure(), speed);
                let suction = self.next_suction(state.discharge_pressure);
                let window = next
                    .map
                    .speed_bounds_for_volume_rate(suction_volume_rate(mode, next_flow, suction));
                (speed, window)
            })
            .collect())
    }

    /// Propagate `suction_pressure` through the chain at `speeds`.
    ///
    /// Generic over [`Scalar`]: with dual numbers the returned states carry the
    /// derivative of every quantity along the seeded direction.
    pub fn propagate<D: Scalar>(
        &self,
        mode: &Mode,
        suction_pressure: D,
        speeds: &[D],
    ) -> ComponentResult<Vec<PropagatedStage<D>>> {
        if speeds.len() != self.stages.len() {
            return Err(ComponentError::StageCountMismatch {
                what: "speeds",
                expected: self.stages.len(),
                got: speeds.len(),
            });
        }
        self.check_flow_demand(mode)?;

        let mut p = suction_pressure;
        let mut out = Vec::with_capacity(self.stages.len());
        for (i, (stage, &speed)) in self.stages.iter().zip(speeds).enumerate() {
            let flow = self.unit_flow(mode, i)?;
            let state = stage.map.state_at(mode, flow, p, speed);
            out.push(PropagatedStage {
                flow,
                suction_pressure: p,
                state,
            });
            p = self.next_suction(state.discharge_pressure);
        }
        Ok(out)
    }

    /// Evaluate every stage at explicit speeds, starting from the mode's
    /// suction pressure.
    pub fn evaluate_chain(&self, mode: &Mode, speeds: &[f64]) -> ComponentResult<Vec<StageResult>> {
        let stages = self.propagate(mode, mode.suction_pressure(), speeds)?;
        Ok(self
            .stages
            .iter()
            .zip(stages.iter().zip(speeds))
            .map(|(stage, (s, &speed))| {
                let mut row = stage
                    .map
                    .result_row(mode, s.flow, s.suction_pressure, speed, &s.state);
                row.parallel_units = stage.parallel_units;
                row
            })
            .collect())
    }

    /// Evaluate the chain and score it against `bounds`.
    pub fn evaluate_chain_with_bounds(
        &self,
        mode: &Mode,
        speeds: &[f64],
        bounds: &BoundTable,
        weights: &PenaltyWeights,
    ) -> ComponentResult<ChainPenalty> {
        if bounds.len() != self.stages.len() {
            return Err(ComponentError::StageCountMismatch {
                what: "bound table",
                expected: self.stages.len(),
                got: bounds.len(),
            });
        }
        let rows = self.evaluate_chain(mode, speeds)?;
        let violations: Vec<StageViolations> = rows
            .iter()
            .zip(bounds.stages())
            .map(|(row, b)| StageViolations::from_row(row, b))
            .collect();

        let nonzero: Vec<f64> = violations
            .iter()
            .flat_map(|v| v.values().iter().copied())
            .filter(|v| *v > 0.0)
            .collect();
        let penalty = if nonzero.is_empty() {
            0.0
        } else {
            nonzero.iter().sum::<f64>() / nonzero.len() as f64
        };
        let target_residual = rows
            .last()
            .map(|r| (r.discharge_pressure - mode.target_discharge_pressure()).abs())
            .unwrap_or(0.0);
        let power_term = rows.iter().map(|r| r.power).sum::<f64>() / weights.power_normalization;
        let objective =
            penalty * weights.penalty + target_residual * weights.target + power_term;

        Ok(ChainPenalty {
            rows,
            violations,
            penalty,
            target_residual,
            power_term,
            objective,
        })
    }
}

/// Suction volume rate (m³/min) of a commercial flow at pressure `p`.
fn suction_volume_rate(mode: &Mode, flow: f64, p: f64) -> f64 {
    let reference = mode.reference();
    volumetric_flow_from_mass_flow(
        flow,
        p,
        mode.suction_temperature(),
        mode.gas_constant(),
        reference.pressure,
        reference.temperature,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{DimensionlessPoint, StageParams, stage_map_from_points};
    use approx::assert_relative_eq;
    use cf_thermo::ReferenceConditions;

    fn map(name: &str) -> Arc<StageMap> {
        let params = StageParams {
            name: name.into(),
            gas_constant: 500.0,
            suction_temperature: 288.0,
            k: 1.31,
            diameter: 0.6,
            nominal_speed: 6000.0,
            nominal_power: 16000.0,
            nominal_ratio: 1.3,
            nominal_discharge_pressure: 7.5,
            reference: ReferenceConditions::default(),
        };
        let points = (0..9)
            .map(|i| {
                let phi = 0.04 + 0.005 * i as f64;
                DimensionlessPoint {
                    flow_coefficient: phi,
                    head_coefficient: 0.9 - 30.0 * (phi - 0.06).powi(2),
                    efficiency: 0.82 - 60.0 * (phi - 0.06).powi(2),
                }
            })
            .collect();
        Arc::new(stage_map_from_points(params, points, 4).unwrap())
    }

    #[test]
    fn rejects_empty_and_zero_units() {
        let empty: Vec<(Arc<StageMap>, usize)> = Vec::new();
        assert_eq!(
            StageChain::new(empty, ChainConfig::default()).unwrap_err(),
            ComponentError::EmptyChain
        );
        assert!(StageChain::new([(map("a"), 0)], ChainConfig::default()).is_err());
    }

    #[test]
    fn speed_count_mismatch() {
        let chain = StageChain::new([(map("a"), 1), (map("b"), 1)], ChainConfig::default()).unwrap();
        let mode = Mode::new(8.5, 3.0, 5.0);
        let err = chain.evaluate_chain(&mode, &[6000.0]).unwrap_err();
        assert_eq!(
            err,
            ComponentError::StageCountMismatch {
                what: "speeds",
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn per_stage_flow_length_must_match() {
        let chain = StageChain::single(map("a"));
        let mode = Mode::new(vec![8.5, 8.0], 3.0, 3.8);
        assert!(matches!(
            chain.freq_bounds_all(&mode),
            Err(ComponentError::StageCountMismatch { .. })
        ));
    }

    #[test]
    fn parallel_units_split_flow() {
        let chain = StageChain::new([(map("a"), 2)], ChainConfig::default()).unwrap();
        let rows = chain.evaluate_chain(&Mode::new(17.0, 3.0, 3.8), &[6000.0]).unwrap();
        assert_eq!(rows[0].parallel_units, 2);
        assert_relative_eq!(rows[0].flow, 8.5);
        let single = map("a").evaluate(&Mode::new(8.5, 3.0, 3.8), 6000.0);
        assert_relative_eq!(rows[0].compression_ratio, single.compression_ratio, epsilon = 1e-12);
    }

    #[test]
    fn penalty_is_zero_inside_bounds() {
        let chain = StageChain::single(map("a"));
        let mode = Mode::new(8.5, 3.0, 3.8);
        let mut b = crate::bounds::StageBounds::default();
        b.power.min = 0.0;
        let table = BoundTable::uniform(1, b).unwrap();
        let scored = chain
            .evaluate_chain_with_bounds(&mode, &[6000.0], &table, &PenaltyWeights::default())
            .unwrap();
        assert_eq!(scored.penalty, 0.0);
        assert_eq!(scored.max_violation(), 0.0);
        let row = &scored.rows[0];
        assert_relative_eq!(scored.power_term, row.power / 7000.0);
        assert_relative_eq!(
            scored.objective,
            (row.discharge_pressure - 3.8).abs() + row.power / 7000.0,
            epsilon = 1e-12
        );
    }
}
