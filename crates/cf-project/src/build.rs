//! Conversion of a validated station file into core objects.

use crate::schema::{BoundSpecDef, FlowDef, ModeDef, StageDef, StageSourceDef, Station};
use crate::validate::ValidationError;
use crate::{ProjectError, ProjectResult};
use cf_components::{
    BoundSpec, BoundTable, BoundedQuantity, ChainConfig, DimensionlessPoint, FlowDemand, Mode,
    SamplePoint, StageBounds, StageChain, StageMap, StageParams, build_stage_map,
    stage_map_from_points,
};
use cf_thermo::ReferenceConditions;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything needed to evaluate and solve a station.
#[derive(Debug, Clone)]
pub struct StationModel {
    pub name: String,
    pub chain: StageChain,
    pub bounds: BoundTable,
    /// Stage maps by stage id
    pub maps: HashMap<String, Arc<StageMap>>,
    /// Modes in file order
    pub modes: Vec<(String, Mode)>,
}

impl StationModel {
    pub fn mode(&self, name: &str) -> ProjectResult<&Mode> {
        self.modes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
            .ok_or_else(|| {
                ValidationError::MissingReference {
                    id: name.to_string(),
                    context: "modes".to_string(),
                }
                .into()
            })
    }

    pub fn map(&self, stage_id: &str) -> ProjectResult<&Arc<StageMap>> {
        self.maps.get(stage_id).ok_or_else(|| {
            ValidationError::MissingReference {
                id: stage_id.to_string(),
                context: "stages".to_string(),
            }
            .into()
        })
    }
}

pub fn stage_params(stage: &StageDef) -> StageParams {
    let p = &stage.params;
    StageParams {
        name: stage.name.clone(),
        gas_constant: p.gas_constant,
        suction_temperature: p.suction_temperature_k,
        k: p.k,
        diameter: p.diameter_m,
        nominal_speed: p.nominal_speed_rpm,
        nominal_power: p.nominal_power_kw,
        nominal_ratio: p.nominal_ratio,
        nominal_discharge_pressure: p.nominal_discharge_mpa,
        reference: p
            .reference
            .map(|r| ReferenceConditions {
                pressure: r.pressure_mpa,
                temperature: r.temperature_k,
            })
            .unwrap_or_default(),
    }
}

/// Fit the stage map described by `stage`.
pub fn build_stage(stage: &StageDef) -> ProjectResult<StageMap> {
    let params = stage_params(stage);
    let map = match &stage.source {
        StageSourceDef::Dimensionless { points } => {
            let points = points
                .iter()
                .map(|p| DimensionlessPoint {
                    flow_coefficient: p.flow_coefficient,
                    head_coefficient: p.head_coefficient,
                    efficiency: p.efficiency,
                })
                .collect();
            stage_map_from_points(params, points, stage.degree)?
        }
        StageSourceDef::Samples { points } => {
            let samples: Vec<SamplePoint> = points
                .iter()
                .map(|s| SamplePoint {
                    flow: s.flow,
                    efficiency: s.efficiency,
                    speed: s.speed,
                    suction_pressure: s.suction_pressure,
                    discharge_pressure: s.discharge_pressure,
                })
                .collect();
            build_stage_map(params, &samples, stage.degree)?
        }
    };
    Ok(map)
}

fn bound_spec(def: &BoundSpecDef) -> BoundSpec {
    BoundSpec::new(def.max, def.min, def.scale)
}

fn build_mode(def: &ModeDef, first: &StageParams) -> Mode {
    let flow = match &def.flow {
        FlowDef::Uniform(q) => FlowDemand::Uniform(*q),
        FlowDef::PerStage(qs) => FlowDemand::PerStage(qs.clone()),
    };
    Mode::new(flow, def.suction_pressure_mpa, def.target_discharge_mpa)
        .with_suction_temperature(def.suction_temperature_k.unwrap_or(first.suction_temperature))
        .with_gas(
            def.gas_constant.unwrap_or(first.gas_constant),
            def.k.unwrap_or(first.k),
        )
        .with_reference(first.reference)
}

/// Build the chain, bound table and modes of a station.
///
/// Default bounds per stage come from [`StageBounds::for_stage`]; entries in
/// the station's `bounds` list override individual quantities.
pub fn build_station(station: &Station) -> ProjectResult<StationModel> {
    crate::validate::validate_station(station)?;

    let mut maps = HashMap::new();
    for stage in &station.stages {
        maps.insert(stage.id.clone(), Arc::new(build_stage(stage)?));
    }

    let mut links = Vec::with_capacity(station.chain.stages.len());
    let mut bounds = Vec::with_capacity(station.chain.stages.len());
    for link in &station.chain.stages {
        let map = maps
            .get(&link.stage_id)
            .cloned()
            .ok_or_else(|| ValidationError::MissingReference {
                id: link.stage_id.clone(),
                context: "chain".to_string(),
            })?;
        let mut b = StageBounds::for_stage(map.params());
        if let Some(over) = station.bounds.iter().find(|b| b.stage_id == link.stage_id) {
            for (&q, (_, spec)) in BoundedQuantity::ALL.iter().zip(over.overrides()) {
                if let Some(spec) = spec {
                    *b.get_mut(q) = bound_spec(spec);
                }
            }
        }
        bounds.push(b);
        links.push((map, link.parallel_units));
    }

    let first = links
        .first()
        .map(|(m, _)| m.params().clone())
        .ok_or(ProjectError::Component(cf_components::ComponentError::EmptyChain))?;
    let chain = StageChain::new(
        links,
        ChainConfig {
            intercooler_drop: station.chain.intercooler_drop_mpa,
        },
    )?;
    let bounds = BoundTable::new(bounds)?;
    let modes = station
        .modes
        .iter()
        .map(|m| (m.name.clone(), build_mode(m, &first)))
        .collect();

    Ok(StationModel {
        name: station.name.clone(),
        chain,
        bounds,
        maps,
        modes,
    })
}
