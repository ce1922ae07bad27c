//! cf-project: station file format, validation and conversion into core objects.

pub mod build;
pub mod schema;
pub mod validate;

pub use build::{StationModel, build_stage, build_station, stage_params};
pub use schema::*;
pub use validate::{ValidationError, validate_station};

use cf_components::ComponentError;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<Station> {
    let content = std::fs::read_to_string(path)?;
    let station: Station = serde_yaml::from_str(&content)?;
    validate_station(&station)?;
    Ok(station)
}

pub fn save_yaml(path: &std::path::Path, station: &Station) -> ProjectResult<()> {
    validate_station(station)?;
    let content = serde_yaml::to_string(station)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<Station> {
    let content = std::fs::read_to_string(path)?;
    let station: Station = serde_json::from_str(&content)?;
    validate_station(&station)?;
    Ok(station)
}

pub fn save_json(path: &std::path::Path, station: &Station) -> ProjectResult<()> {
    validate_station(station)?;
    let content = serde_json::to_string_pretty(station)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &std::path::Path) -> ProjectResult<Station> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}
