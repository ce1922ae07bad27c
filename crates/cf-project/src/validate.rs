//! Station validation logic.

use crate::schema::{FlowDef, ModeDef, SCHEMA_VERSION, StageDef, Station};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn require_positive(field: String, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite and positive"))
    }
}

pub fn validate_station(station: &Station) -> Result<(), ValidationError> {
    if station.version != SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: station.version,
        });
    }

    let mut stage_ids = HashSet::new();
    for stage in &station.stages {
        if !stage_ids.insert(stage.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: stage.id.clone(),
                context: "stages".to_string(),
            });
        }
        validate_stage(stage)?;
    }

    let drop = station.chain.intercooler_drop_mpa;
    if !(drop.is_finite() && drop >= 0.0) {
        return Err(invalid(
            "chain.intercooler_drop_mpa",
            drop,
            "must be finite and non-negative",
        ));
    }
    if station.chain.stages.is_empty() {
        return Err(invalid("chain.stages", "[]", "chain needs at least one stage"));
    }
    for (i, link) in station.chain.stages.iter().enumerate() {
        if !stage_ids.contains(link.stage_id.as_str()) {
            return Err(ValidationError::MissingReference {
                id: link.stage_id.clone(),
                context: format!("chain.stages[{i}]"),
            });
        }
        if link.parallel_units == 0 {
            return Err(invalid(
                format!("chain.stages[{i}].parallel_units"),
                0,
                "must be at least 1",
            ));
        }
    }

    let chained: HashSet<&str> = station
        .chain
        .stages
        .iter()
        .map(|s| s.stage_id.as_str())
        .collect();
    let mut bound_ids = HashSet::new();
    for b in &station.bounds {
        if !chained.contains(b.stage_id.as_str()) {
            return Err(ValidationError::MissingReference {
                id: b.stage_id.clone(),
                context: "bounds".to_string(),
            });
        }
        if !bound_ids.insert(b.stage_id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: b.stage_id.clone(),
                context: "bounds".to_string(),
            });
        }
        for (name, spec) in b.overrides() {
            let Some(spec) = spec else { continue };
            let field = format!("bounds[{}].{name}", b.stage_id);
            if !(spec.max.is_finite() && spec.min.is_finite()) || spec.max < spec.min {
                return Err(invalid(
                    field,
                    format!("[{}, {}]", spec.min, spec.max),
                    "max must not be below min",
                ));
            }
            if !(spec.scale.is_finite() && spec.scale > 0.0) {
                return Err(invalid(format!("{field}.scale"), spec.scale, "must be positive"));
            }
        }
    }

    let mut mode_names = HashSet::new();
    for mode in &station.modes {
        if !mode_names.insert(mode.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: mode.name.clone(),
                context: "modes".to_string(),
            });
        }
        validate_mode(mode, station.chain.stages.len())?;
    }

    Ok(())
}

fn validate_stage(stage: &StageDef) -> Result<(), ValidationError> {
    let p = &stage.params;
    let field = |name: &str| format!("stages[{}].params.{name}", stage.id);
    require_positive(field("gas_constant"), p.gas_constant)?;
    require_positive(field("suction_temperature_k"), p.suction_temperature_k)?;
    require_positive(field("diameter_m"), p.diameter_m)?;
    require_positive(field("nominal_speed_rpm"), p.nominal_speed_rpm)?;
    require_positive(field("nominal_ratio"), p.nominal_ratio)?;
    require_positive(field("nominal_discharge_mpa"), p.nominal_discharge_mpa)?;
    if !(p.nominal_power_kw.is_finite() && p.nominal_power_kw >= 0.0) {
        return Err(invalid(field("nominal_power_kw"), p.nominal_power_kw, "must be non-negative"));
    }
    if !(p.k.is_finite() && p.k > 1.0) {
        return Err(invalid(field("k"), p.k, "must exceed 1"));
    }
    if let Some(r) = &p.reference {
        require_positive(field("reference.pressure_mpa"), r.pressure_mpa)?;
        require_positive(field("reference.temperature_k"), r.temperature_k)?;
    }
    if stage.degree < 1 {
        return Err(invalid(
            format!("stages[{}].degree", stage.id),
            stage.degree,
            "must be at least 1",
        ));
    }
    if stage.source.len() < stage.degree + 1 {
        return Err(invalid(
            format!("stages[{}].source.points", stage.id),
            stage.source.len(),
            "need at least degree + 1 points",
        ));
    }
    Ok(())
}

fn validate_mode(mode: &ModeDef, chain_len: usize) -> Result<(), ValidationError> {
    let field = |name: &str| format!("modes[{}].{name}", mode.name);
    match &mode.flow {
        FlowDef::Uniform(q) => require_positive(field("flow"), *q)?,
        FlowDef::PerStage(qs) => {
            if qs.len() != chain_len {
                return Err(invalid(
                    field("flow"),
                    qs.len(),
                    "per-stage flow list must match the chain length",
                ));
            }
            for q in qs {
                require_positive(field("flow"), *q)?;
            }
        }
    }
    require_positive(field("suction_pressure_mpa"), mode.suction_pressure_mpa)?;
    require_positive(field("target_discharge_mpa"), mode.target_discharge_mpa)?;
    if let Some(t) = mode.suction_temperature_k {
        require_positive(field("suction_temperature_k"), t)?;
    }
    if let Some(r) = mode.gas_constant {
        require_positive(field("gas_constant"), r)?;
    }
    if let Some(k) = mode.k {
        if !(k.is_finite() && k > 1.0) {
            return Err(invalid(field("k"), k, "must exceed 1"));
        }
    }
    Ok(())
}
