mod error;
mod report;

use std::path::{Path, PathBuf};

use cf_components::{DEFAULT_PER_SIDE, DEFAULT_SPEED_FRACTIONS, iso_efficiency_lines};
use cf_project::StationModel;
use cf_solver::{
    InitializationStrategy, JacobianMethod, OperatingPointSolver, SolverConfig, SolverError,
};
use clap::{Parser, Subcommand, ValueEnum};
use error::{CliError, CliResult};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cf")]
#[command(about = "Centrifugal compressor station CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a station file
    Validate {
        /// Path to the station file (YAML or JSON)
        station: PathBuf,
    },
    /// Show the fitted map of one stage
    Map {
        station: PathBuf,
        /// Stage id
        stage: String,
        /// Knots on each side of the efficiency optimum
        #[arg(long, default_value_t = DEFAULT_PER_SIDE)]
        per_side: usize,
        /// Print speed lines and iso-efficiency lines for this mode
        #[arg(long)]
        mode: Option<String>,
    },
    /// Show the admissible speed window of every stage for a mode
    Bounds { station: PathBuf, mode: String },
    /// Evaluate the chain at a suction state and given speeds
    Evaluate {
        station: PathBuf,
        mode: String,
        /// Comma-separated speeds in rpm, one per stage
        #[arg(long, value_delimiter = ',', required = true)]
        speeds: Vec<f64>,
    },
    /// Find the operating point of one mode, or of every mode
    Solve {
        station: PathBuf,
        /// Mode name (all modes when omitted)
        mode: Option<String>,
        /// Starting point strategy
        #[arg(long, value_enum, default_value_t = StartArg::Midpoint)]
        start: StartArg,
        /// Use finite differences instead of automatic differentiation
        #[arg(long)]
        finite_difference: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StartArg {
    Midpoint,
    Nominal,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { station } => cmd_validate(&station),
        Commands::Map {
            station,
            stage,
            per_side,
            mode,
        } => cmd_map(&station, &stage, per_side, mode.as_deref()),
        Commands::Bounds { station, mode } => cmd_bounds(&station, &mode),
        Commands::Evaluate {
            station,
            mode,
            speeds,
        } => cmd_evaluate(&station, &mode, &speeds),
        Commands::Solve {
            station,
            mode,
            start,
            finite_difference,
            json,
        } => cmd_solve(&station, mode.as_deref(), start, finite_difference, json),
    }
}

fn load_model(path: &Path) -> CliResult<StationModel> {
    let station = cf_project::load(path).map_err(|source| CliError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cf_project::build_station(&station)?)
}

fn cmd_validate(path: &Path) -> CliResult<()> {
    let model = load_model(path)?;
    println!("✓ Station is valid: {}", model.name);
    println!("  Stages in chain: {}", model.chain.len());
    for stage in model.chain.stages() {
        let (lo, hi) = stage.map.domain();
        println!(
            "    {} × {} (φ {:.4}..{:.4}, degree {})",
            stage.map.name(),
            stage.parallel_units,
            lo,
            hi,
            stage.map.degree()
        );
    }
    println!("  Modes: {}", model.modes.len());
    Ok(())
}

fn cmd_map(path: &Path, stage_id: &str, per_side: usize, mode: Option<&str>) -> CliResult<()> {
    let model = load_model(path)?;
    let map = model.map(stage_id)?;
    let (lo, hi) = map.domain();

    println!("Stage: {}", map.name());
    println!("  Flow coefficient range: {:.5}..{:.5}", lo, hi);
    println!("  Head fit:       {:?}", map.head_fit().coefficients());
    println!("  Efficiency fit: {:?}", map.efficiency_fit().coefficients());

    let band = map.resample_by_efficiency_band(per_side);
    let (phi_opt, eta_max) = band.optimum();
    println!("  Optimum: φ = {:.5}, η = {:.4}", phi_opt, eta_max);
    println!("  {:>10} {:>10} {:>8}", "φ", "ψ", "η");
    for i in 0..band.len() {
        println!(
            "  {:>10.5} {:>10.5} {:>8.4}",
            band.flow_coefficients[i], band.head_coefficients[i], band.efficiencies[i]
        );
    }

    if let Some(name) = mode {
        let mode = model.mode(name)?;
        let lines = map.speed_lines(mode, &DEFAULT_SPEED_FRACTIONS);
        println!("  Speed lines ({}):", name);
        for line in &lines {
            let ratios: Vec<String> = line
                .points
                .iter()
                .map(|p| format!("{:.1}:{:.3}", p.volume_rate, p.compression_ratio))
                .collect();
            println!(
                "    {:.2} ({:.0} rpm) {}",
                line.speed_fraction,
                line.speed,
                ratios.join(" ")
            );
        }
        println!("  Iso-efficiency lines:");
        for line in iso_efficiency_lines(&lines) {
            println!("    η = {:.4} over {} speeds", line.efficiency, line.points.len());
        }
    }
    Ok(())
}

fn cmd_bounds(path: &Path, mode_name: &str) -> CliResult<()> {
    let model = load_model(path)?;
    let mode = model.mode(mode_name)?;
    let windows = model.chain.freq_bounds_all(mode)?;

    println!("Speed windows for mode {}:", mode_name);
    for (stage, w) in model.chain.stages().iter().zip(&windows) {
        println!(
            "  {:<14} {:>8.0} .. {:>8.0} rpm",
            stage.map.name(),
            w.lower(),
            w.upper()
        );
    }
    Ok(())
}

fn cmd_evaluate(path: &Path, mode_name: &str, speeds: &[f64]) -> CliResult<()> {
    let model = load_model(path)?;
    let mode = model.mode(mode_name)?;
    if speeds.len() != model.chain.len() {
        return Err(CliError::InvalidInput(format!(
            "expected {} speeds, got {}",
            model.chain.len(),
            speeds.len()
        )));
    }

    let scored = model.chain.evaluate_chain_with_bounds(
        mode,
        speeds,
        &model.bounds,
        &Default::default(),
    )?;
    println!("Mode {} at suction {:.4} MPa:", mode_name, mode.suction_pressure());
    report::print_penalty(&scored);
    Ok(())
}

fn cmd_solve(
    path: &Path,
    mode: Option<&str>,
    start: StartArg,
    finite_difference: bool,
    json: bool,
) -> CliResult<()> {
    let model = load_model(path)?;
    let strategy = match start {
        StartArg::Midpoint => InitializationStrategy::Midpoint,
        StartArg::Nominal => InitializationStrategy::Nominal,
    };
    let config = SolverConfig {
        strategy,
        fallback_strategies: vec![match strategy {
            InitializationStrategy::Midpoint => InitializationStrategy::Nominal,
            InitializationStrategy::Nominal => InitializationStrategy::Midpoint,
        }],
        jacobian: if finite_difference {
            JacobianMethod::FiniteDifference
        } else {
            JacobianMethod::Automatic
        },
        ..SolverConfig::default()
    };
    let solver = OperatingPointSolver::new(model.chain.clone(), config);

    let selected: Vec<(String, cf_components::Mode)> = match mode {
        Some(name) => vec![(name.to_string(), model.mode(name)?.clone())],
        None => model.modes.clone(),
    };
    let modes: Vec<_> = selected.iter().map(|(_, m)| m.clone()).collect();
    info!(modes = modes.len(), "solving");
    let outcomes = solver.solve_batch(&modes, &model.bounds);

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = 0;
    for ((name, _), outcome) in selected.iter().zip(outcomes) {
        let result = match outcome {
            Ok(result) => result,
            Err(SolverError::NoFeasiblePoint { best }) => {
                warn!(mode = %name, "no feasible operating point");
                failures += 1;
                *best
            }
            Err(e) => return Err(e.into()),
        };
        results.push((name.clone(), result));
    }

    if json {
        let out: Vec<_> = results
            .iter()
            .map(|(name, r)| serde_json::json!({ "mode": name, "result": r }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (name, result) in &results {
            println!("Mode {}:", name);
            report::print_solution(result);
            println!();
        }
    }

    require_all_feasible(failures, results.len())
}

fn require_all_feasible(failed: usize, total: usize) -> CliResult<()> {
    if failed > 0 {
        return Err(CliError::Infeasible { failed, total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_infeasible_mode_is_an_error() {
        assert!(require_all_feasible(0, 3).is_ok());
        let err = require_all_feasible(1, 3).unwrap_err();
        assert!(matches!(err, CliError::Infeasible { failed: 1, total: 3 }));
        assert_eq!(err.to_string(), "1 of 3 modes without a feasible point");
    }

    #[test]
    fn solve_arguments_parse() {
        let cli = Cli::try_parse_from(["cf", "solve", "station.yaml", "base", "--json"]).unwrap();
        match cli.command {
            Commands::Solve { mode, json, .. } => {
                assert_eq!(mode.as_deref(), Some("base"));
                assert!(json);
            }
            _ => panic!("expected solve"),
        }
    }
}
