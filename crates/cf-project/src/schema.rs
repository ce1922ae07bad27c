//! Station file schema definitions.

use serde::{Deserialize, Serialize};

/// Station file format version written and accepted by this crate.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub version: u32,
    pub name: String,
    pub chain: ChainDef,
    #[serde(default)]
    pub stages: Vec<StageDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounds: Vec<StageBoundsDef>,
    #[serde(default)]
    pub modes: Vec<ModeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainDef {
    #[serde(default = "default_intercooler_drop")]
    pub intercooler_drop_mpa: f64,
    #[serde(default)]
    pub stages: Vec<ChainStageDef>,
}

fn default_intercooler_drop() -> f64 {
    0.06
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainStageDef {
    pub stage_id: String,
    #[serde(default = "default_parallel_units")]
    pub parallel_units: usize,
}

fn default_parallel_units() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageDef {
    pub id: String,
    pub name: String,
    pub params: StageParamsDef,
    #[serde(default = "default_degree")]
    pub degree: usize,
    pub source: StageSourceDef,
}

fn default_degree() -> usize {
    cf_components::DEFAULT_DEGREE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageParamsDef {
    pub gas_constant: f64,
    pub suction_temperature_k: f64,
    pub k: f64,
    pub diameter_m: f64,
    pub nominal_speed_rpm: f64,
    pub nominal_power_kw: f64,
    pub nominal_ratio: f64,
    pub nominal_discharge_mpa: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReferenceDef {
    pub pressure_mpa: f64,
    pub temperature_k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageSourceDef {
    /// Coefficients already reduced from test data.
    Dimensionless { points: Vec<DimensionlessPointDef> },
    /// Raw test samples.
    Samples { points: Vec<SamplePointDef> },
}

impl StageSourceDef {
    pub fn len(&self) -> usize {
        match self {
            StageSourceDef::Dimensionless { points } => points.len(),
            StageSourceDef::Samples { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DimensionlessPointDef {
    pub flow_coefficient: f64,
    pub head_coefficient: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SamplePointDef {
    /// mln std m³/day
    pub flow: f64,
    pub efficiency: f64,
    pub speed: f64,
    pub suction_pressure: f64,
    pub discharge_pressure: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundSpecDef {
    pub max: f64,
    pub min: f64,
    pub scale: f64,
}

/// Per-stage overrides of the default bound table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageBoundsDef {
    pub stage_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<BoundSpecDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<BoundSpecDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surge_margin: Option<BoundSpecDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_ratio: Option<BoundSpecDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_pressure: Option<BoundSpecDef>,
}

impl StageBoundsDef {
    pub fn overrides(&self) -> [(&'static str, Option<&BoundSpecDef>); 5] {
        [
            ("power", self.power.as_ref()),
            ("compression_ratio", self.compression_ratio.as_ref()),
            ("surge_margin", self.surge_margin.as_ref()),
            ("speed_ratio", self.speed_ratio.as_ref()),
            ("discharge_pressure", self.discharge_pressure.as_ref()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FlowDef {
    Uniform(f64),
    PerStage(Vec<f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModeDef {
    pub name: String,
    pub flow: FlowDef,
    pub suction_pressure_mpa: f64,
    pub target_discharge_mpa: f64,
    /// Defaults to the first chain stage's test temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suction_temperature_k: Option<f64>,
    /// Defaults to the first chain stage's gas constant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_constant: Option<f64>,
    /// Defaults to the first chain stage's polytropic exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<f64>,
}
