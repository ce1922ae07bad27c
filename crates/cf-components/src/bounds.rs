//! Safety envelopes for each stage and their normalized violations.

use crate::error::{ComponentError, ComponentResult};
use crate::stage::{StageParams, StageResult, StageState};
use cf_core::Scalar;
use serde::Serialize;
use std::fmt;

/// Quantities constrained on every stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BoundedQuantity {
    Power,
    CompressionRatio,
    SurgeMargin,
    SpeedRatio,
    DischargePressure,
}

impl BoundedQuantity {
    pub const ALL: [BoundedQuantity; 5] = [
        BoundedQuantity::Power,
        BoundedQuantity::CompressionRatio,
        BoundedQuantity::SurgeMargin,
        BoundedQuantity::SpeedRatio,
        BoundedQuantity::DischargePressure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BoundedQuantity::Power => "power",
            BoundedQuantity::CompressionRatio => "compression_ratio",
            BoundedQuantity::SurgeMargin => "surge_margin",
            BoundedQuantity::SpeedRatio => "speed_ratio",
            BoundedQuantity::DischargePressure => "discharge_pressure",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BoundedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admissible range of one quantity and the scale its violation is measured in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundSpec {
    pub max: f64,
    pub min: f64,
    pub scale: f64,
}

impl BoundSpec {
    pub fn new(max: f64, min: f64, scale: f64) -> Self {
        Self { max, min, scale }
    }

    pub fn validate(&self) -> ComponentResult<()> {
        if !(self.max.is_finite() && self.min.is_finite()) || self.max < self.min {
            return Err(ComponentError::InvalidArg {
                what: "bound max must be finite and not below min",
            });
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ComponentError::InvalidArg {
                what: "bound scale must be positive",
            });
        }
        Ok(())
    }

    /// Distance outside `[min, max]` in units of `scale`; zero inside.
    pub fn violation<D: Scalar>(&self, value: D) -> D {
        let v = value.re();
        if v < self.min {
            (value - self.min) * (-1.0 / self.scale)
        } else if v > self.max {
            (value - self.max) * (1.0 / self.scale)
        } else {
            D::from(0.0)
        }
    }
}

/// Bound set for one stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StageBounds {
    pub power: BoundSpec,
    pub compression_ratio: BoundSpec,
    pub surge_margin: BoundSpec,
    pub speed_ratio: BoundSpec,
    pub discharge_pressure: BoundSpec,
}

impl Default for StageBounds {
    fn default() -> Self {
        Self {
            power: BoundSpec::new(16_000.0, 7_000.0, 200.0),
            compression_ratio: BoundSpec::new(3.0, 1.0, 0.01),
            surge_margin: BoundSpec::new(100.0, 0.0, 1.0),
            speed_ratio: BoundSpec::new(1.05, 0.7, 0.01),
            discharge_pressure: BoundSpec::new(7.5, 0.1, 0.1),
        }
    }
}

impl StageBounds {
    /// Defaults with the power ceiling and discharge ceiling taken from the
    /// stage nameplate.
    pub fn for_stage(params: &StageParams) -> Self {
        let base = Self::default();
        Self {
            power: BoundSpec::new(
                params.nominal_power,
                base.power.min.min(params.nominal_power),
                base.power.scale,
            ),
            discharge_pressure: BoundSpec::new(
                params.nominal_discharge_pressure,
                base.discharge_pressure.min,
                base.discharge_pressure.scale,
            ),
            ..base
        }
    }

    pub fn get(&self, quantity: BoundedQuantity) -> &BoundSpec {
        match quantity {
            BoundedQuantity::Power => &self.power,
            BoundedQuantity::CompressionRatio => &self.compression_ratio,
            BoundedQuantity::SurgeMargin => &self.surge_margin,
            BoundedQuantity::SpeedRatio => &self.speed_ratio,
            BoundedQuantity::DischargePressure => &self.discharge_pressure,
        }
    }

    pub fn get_mut(&mut self, quantity: BoundedQuantity) -> &mut BoundSpec {
        match quantity {
            BoundedQuantity::Power => &mut self.power,
            BoundedQuantity::CompressionRatio => &mut self.compression_ratio,
            BoundedQuantity::SurgeMargin => &mut self.surge_margin,
            BoundedQuantity::SpeedRatio => &mut self.speed_ratio,
            BoundedQuantity::DischargePressure => &mut self.discharge_pressure,
        }
    }

    pub fn validate(&self) -> ComponentResult<()> {
        BoundedQuantity::ALL
            .iter()
            .try_for_each(|&q| self.get(q).validate())
    }

    /// Normalized violations of a stage state, indexed like [`BoundedQuantity::ALL`].
    pub fn violations<D: Scalar>(&self, state: &StageState<D>) -> [D; 5] {
        BoundedQuantity::ALL.map(|q| self.get(q).violation(state_quantity(state, q)))
    }
}

fn state_quantity<D: Scalar>(state: &StageState<D>, quantity: BoundedQuantity) -> D {
    match quantity {
        BoundedQuantity::Power => state.power,
        BoundedQuantity::CompressionRatio => state.compression_ratio,
        BoundedQuantity::SurgeMargin => state.surge_margin,
        BoundedQuantity::SpeedRatio => state.speed_ratio,
        BoundedQuantity::DischargePressure => state.discharge_pressure,
    }
}

impl StageResult {
    /// Value of a bounded quantity in this row.
    pub fn quantity(&self, quantity: BoundedQuantity) -> f64 {
        match quantity {
            BoundedQuantity::Power => self.power,
            BoundedQuantity::CompressionRatio => self.compression_ratio,
            BoundedQuantity::SurgeMargin => self.surge_margin,
            BoundedQuantity::SpeedRatio => self.speed_ratio,
            BoundedQuantity::DischargePressure => self.discharge_pressure,
        }
    }
}

/// Per-stage bound sets, in chain order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundTable {
    stages: Vec<StageBounds>,
}

impl BoundTable {
    pub fn new(stages: Vec<StageBounds>) -> ComponentResult<Self> {
        for s in &stages {
            s.validate()?;
        }
        Ok(Self { stages })
    }

    /// Same bounds on `n` stages.
    pub fn uniform(n: usize, bounds: StageBounds) -> ComponentResult<Self> {
        Self::new(vec![bounds; n])
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[StageBounds] {
        &self.stages
    }

    pub fn stage(&self, index: usize) -> ComponentResult<&StageBounds> {
        self.stages.get(index).ok_or(ComponentError::IndexOutOfRange {
            what: "bound table",
            index,
            len: self.stages.len(),
        })
    }

    /// Discharge-pressure ceiling of the last stage.
    pub fn final_discharge_ceiling(&self) -> Option<f64> {
        self.stages.last().map(|s| s.discharge_pressure.max)
    }
}

/// Normalized violations of one stage, indexed by [`BoundedQuantity`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StageViolations {
    values: [f64; 5],
}

impl StageViolations {
    pub fn from_row(row: &StageResult, bounds: &StageBounds) -> Self {
        Self {
            values: BoundedQuantity::ALL.map(|q| bounds.get(q).violation(row.quantity(q))),
        }
    }

    pub fn get(&self, quantity: BoundedQuantity) -> f64 {
        self.values[quantity.index()]
    }

    pub fn values(&self) -> &[f64; 5] {
        &self.values
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Quantities with a nonzero violation.
    pub fn violated(&self) -> impl Iterator<Item = (BoundedQuantity, f64)> + '_ {
        BoundedQuantity::ALL
            .iter()
            .map(|&q| (q, self.get(q)))
            .filter(|(_, v)| *v > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cf_core::{derivative, seeded};

    #[test]
    fn violation_is_zero_inside_and_scaled_outside() {
        let spec = BoundSpec::new(3.0, 1.0, 0.01);
        assert_eq!(spec.violation(2.0_f64), 0.0);
        assert_eq!(spec.violation(1.0_f64), 0.0);
        assert_relative_eq!(spec.violation(3.05_f64), 5.0, epsilon = 1e-9);
        assert_relative_eq!(spec.violation(0.98_f64), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn violation_derivative_points_outward() {
        let spec = BoundSpec::new(3.0, 1.0, 0.5);
        assert_relative_eq!(derivative(spec.violation(seeded(4.0))), 2.0);
        assert_relative_eq!(derivative(spec.violation(seeded(0.0))), -2.0);
        assert_eq!(derivative(spec.violation(seeded(2.0))), 0.0);
    }

    #[test]
    fn defaults_follow_station_table() {
        let b = StageBounds::default();
        assert_eq!(b.get(BoundedQuantity::Power), &BoundSpec::new(16_000.0, 7_000.0, 200.0));
        assert_eq!(b.get(BoundedQuantity::SpeedRatio), &BoundSpec::new(1.05, 0.7, 0.01));
        assert!(b.validate().is_ok());
    }

    #[test]
    fn invalid_specs_rejected() {
        assert!(BoundSpec::new(1.0, 2.0, 1.0).validate().is_err());
        assert!(BoundSpec::new(2.0, 1.0, 0.0).validate().is_err());
        let mut b = StageBounds::default();
        b.get_mut(BoundedQuantity::SurgeMargin).scale = -1.0;
        assert!(BoundTable::new(vec![b]).is_err());
    }

    #[test]
    fn table_lookup() {
        let table = BoundTable::uniform(2, StageBounds::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.stage(1).is_ok());
        assert!(matches!(
            table.stage(2),
            Err(ComponentError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
        assert_eq!(table.final_discharge_ceiling(), Some(7.5));
    }
}
