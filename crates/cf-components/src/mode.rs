//! Process request: what flow the station must move and at what pressures.

use crate::error::{ComponentError, ComponentResult};
use cf_thermo::ReferenceConditions;

/// Default polytropic exponent of pipeline natural gas.
pub const DEFAULT_K: f64 = 1.31;

/// Default suction temperature (K).
pub const DEFAULT_SUCTION_TEMPERATURE: f64 = 288.0;

/// Default specific gas constant, J/(kg·K) (molar mass near 16.6 g/mol).
pub const DEFAULT_GAS_CONSTANT: f64 = 500.0;

/// Commercial flow demand (mln std m³/day).
#[derive(Clone, Debug, PartialEq)]
pub enum FlowDemand {
    /// Same station flow through every stage.
    Uniform(f64),
    /// One flow per stage, in chain order.
    PerStage(Vec<f64>),
}

impl FlowDemand {
    /// Flow entering stage `index`, before division among parallel units.
    pub fn for_stage(&self, index: usize) -> Option<f64> {
        match self {
            FlowDemand::Uniform(q) => Some(*q),
            FlowDemand::PerStage(qs) => qs.get(index).copied(),
        }
    }

    /// Number of stages this demand describes, `None` for a uniform demand.
    pub fn stage_count(&self) -> Option<usize> {
        match self {
            FlowDemand::Uniform(_) => None,
            FlowDemand::PerStage(qs) => Some(qs.len()),
        }
    }
}

impl From<f64> for FlowDemand {
    fn from(q: f64) -> Self {
        FlowDemand::Uniform(q)
    }
}

impl From<Vec<f64>> for FlowDemand {
    fn from(qs: Vec<f64>) -> Self {
        FlowDemand::PerStage(qs)
    }
}

/// Operating request for a station.
///
/// A `Mode` is a value: overrides produce a modified copy and never touch the
/// original, so one request can be shared by concurrent solves.
#[derive(Clone, Debug, PartialEq)]
pub struct Mode {
    flow: FlowDemand,
    suction_pressure: f64,
    suction_temperature: f64,
    target_discharge_pressure: f64,
    reference: ReferenceConditions,
    gas_constant: f64,
    k: f64,
}

impl Mode {
    /// Request with default gas properties and reference conditions.
    pub fn new(
        flow: impl Into<FlowDemand>,
        suction_pressure: f64,
        target_discharge_pressure: f64,
    ) -> Self {
        Self {
            flow: flow.into(),
            suction_pressure,
            suction_temperature: DEFAULT_SUCTION_TEMPERATURE,
            target_discharge_pressure,
            reference: ReferenceConditions::default(),
            gas_constant: DEFAULT_GAS_CONSTANT,
            k: DEFAULT_K,
        }
    }

    pub fn flow(&self) -> &FlowDemand {
        &self.flow
    }

    /// Suction pressure of the first stage (MPa).
    pub fn suction_pressure(&self) -> f64 {
        self.suction_pressure
    }

    /// Suction temperature (K), applied to every stage.
    pub fn suction_temperature(&self) -> f64 {
        self.suction_temperature
    }

    /// Demanded discharge pressure of the last stage (MPa).
    pub fn target_discharge_pressure(&self) -> f64 {
        self.target_discharge_pressure
    }

    pub fn reference(&self) -> ReferenceConditions {
        self.reference
    }

    pub fn gas_constant(&self) -> f64 {
        self.gas_constant
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn with_flow(&self, flow: impl Into<FlowDemand>) -> Self {
        Self {
            flow: flow.into(),
            ..self.clone()
        }
    }

    pub fn with_suction_pressure(&self, suction_pressure: f64) -> Self {
        Self {
            suction_pressure,
            ..self.clone()
        }
    }

    pub fn with_suction_temperature(&self, suction_temperature: f64) -> Self {
        Self {
            suction_temperature,
            ..self.clone()
        }
    }

    pub fn with_target_discharge_pressure(&self, target_discharge_pressure: f64) -> Self {
        Self {
            target_discharge_pressure,
            ..self.clone()
        }
    }

    pub fn with_reference(&self, reference: ReferenceConditions) -> Self {
        Self {
            reference,
            ..self.clone()
        }
    }

    /// Copy with gas constant R (J/(kg·K)) and polytropic exponent k.
    pub fn with_gas(&self, gas_constant: f64, k: f64) -> Self {
        Self {
            gas_constant,
            k,
            ..self.clone()
        }
    }

    /// Flow into stage `index`, before division among parallel units.
    pub fn stage_flow(&self, index: usize) -> ComponentResult<f64> {
        self.flow.for_stage(index).ok_or(ComponentError::IndexOutOfRange {
            what: "per-stage flow",
            index,
            len: self.flow.stage_count().unwrap_or(0),
        })
    }

    /// Check that every scalar is finite and physically meaningful.
    pub fn validate(&self) -> ComponentResult<()> {
        let flows_ok = match &self.flow {
            FlowDemand::Uniform(q) => q.is_finite() && *q > 0.0,
            FlowDemand::PerStage(qs) => {
                !qs.is_empty() && qs.iter().all(|q| q.is_finite() && *q > 0.0)
            }
        };
        if !flows_ok {
            return Err(ComponentError::InvalidArg {
                what: "flow must be finite and positive",
            });
        }
        let positive = [
            (self.suction_pressure, "suction pressure must be positive"),
            (self.suction_temperature, "suction temperature must be positive"),
            (
                self.target_discharge_pressure,
                "target discharge pressure must be positive",
            ),
            (self.reference.pressure, "reference pressure must be positive"),
            (
                self.reference.temperature,
                "reference temperature must be positive",
            ),
            (self.gas_constant, "gas constant must be positive"),
        ];
        for (value, what) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ComponentError::InvalidArg { what });
            }
        }
        if !(self.k.is_finite() && self.k > 1.0) {
            return Err(ComponentError::InvalidArg {
                what: "polytropic exponent k must exceed 1",
            });
        }
        Ok(())
    }
}
