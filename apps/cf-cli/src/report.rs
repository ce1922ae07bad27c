//! Plain-text tables for stage rows and solve results.

use cf_components::{ChainPenalty, StageResult};
use cf_solver::SolveResult;
use tracing::warn;

pub fn print_rows(rows: &[StageResult]) {
    println!(
        "  {:<14} {:>5} {:>8} {:>9} {:>8} {:>8} {:>8} {:>7} {:>7} {:>6} {:>9} {:>7}",
        "stage", "units", "Q", "V m3/min", "p_in", "p_out", "ratio", "n rpm", "n/n0", "eta",
        "N kW", "surge%"
    );
    for row in rows {
        println!(
            "  {:<14} {:>5} {:>8.3} {:>9.2} {:>8.4} {:>8.4} {:>8.4} {:>7.0} {:>7.4} {:>6.3} {:>9.1} {:>7.2}{}",
            row.name,
            row.parallel_units,
            row.flow,
            row.volume_rate,
            row.suction_pressure,
            row.discharge_pressure,
            row.compression_ratio,
            row.speed,
            row.speed_ratio,
            row.efficiency,
            row.power,
            row.surge_margin,
            if row.extrapolated { "  *" } else { "" }
        );
        if row.extrapolated {
            warn!(
                stage = %row.name,
                flow_coefficient = row.flow_coefficient,
                "flow coefficient outside sampled range"
            );
        }
    }
    if rows.iter().any(|r| r.extrapolated) {
        println!("  * flow coefficient outside the sampled map range");
    }
}

pub fn print_penalty(scored: &ChainPenalty) {
    print_rows(&scored.rows);
    for (row, v) in scored.rows.iter().zip(&scored.violations) {
        for (quantity, amount) in v.violated() {
            println!("  ! {}: {} out of bounds by {:.3} scale units", row.name, quantity, amount);
        }
    }
    println!("  Penalty:         {:.6}", scored.penalty);
    println!("  Target residual: {:.6} MPa", scored.target_residual);
    println!("  Power term:      {:.6}", scored.power_term);
    println!("  Objective:       {:.6}", scored.objective);
}

pub fn print_solution(result: &SolveResult) {
    let status = if result.success { "✓ Converged" } else { "✗ No feasible point" };
    println!(
        "{} ({} start, {} iterations)",
        status,
        result.strategy.as_str(),
        result.iterations
    );
    println!("  Suction pressure:   {:.4} MPa", result.suction_pressure);
    println!("  Discharge pressure: {:.4} MPa", result.discharge_pressure());
    print_rows(&result.rows);
    println!("  Target residual: {:.3e} MPa", result.target_residual);
    println!("  Max violation:   {:.3e}", result.max_violation);
    println!("  Objective:       {:.6}", result.objective);
}
