//! End-to-end operating-point solves on synthetic stages.

use approx::assert_relative_eq;
use cf_components::{
    BoundTable, ChainConfig, DimensionlessPoint, Mode, StageBounds, StageChain, StageMap,
    StageParams, stage_map_from_points,
};
use cf_solver::{
    InitializationStrategy, JacobianMethod, OperatingPointSolver, SolveStatus, SolverConfig,
    SolverError,
};
use cf_thermo::ReferenceConditions;
use std::sync::Arc;

fn map(name: &str, nominal_ratio: f64) -> Arc<StageMap> {
    let params = StageParams {
        name: name.into(),
        gas_constant: 500.0,
        suction_temperature: 288.0,
        k: 1.31,
        diameter: 0.6,
        nominal_speed: 6000.0,
        nominal_power: 16000.0,
        nominal_ratio,
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

/// Defaults with the power floor removed; the synthetic stage draws ~3 MW.
fn bounds(n: usize) -> BoundTable {
    let mut b = StageBounds::default();
    b.power.min = 0.0;
    BoundTable::uniform(n, b).unwrap()
}

fn assert_feasible(result: &cf_solver::SolveResult, target: f64, table: &BoundTable) {
    assert!(result.success);
    assert_eq!(result.status, SolveStatus::Converged);
    assert!((result.discharge_pressure() - target).abs() <= 1e-3);
    assert!(result.suction_pressure > 0.0 && result.suction_pressure <= target);
    for (row, b) in result.rows.iter().zip(table.stages()) {
        assert!(row.speed_ratio >= b.speed_ratio.min - 1e-9);
        assert!(row.speed_ratio <= b.speed_ratio.max + 1e-9);
        assert!(row.surge_margin >= -1e-6 && row.surge_margin <= 100.0 + 1e-6);
        assert!(row.power <= b.power.max);
    }
}

#[test]
fn single_stage_meets_target() {
    let chain = StageChain::single(map("s1", 1.25));
    let solver = OperatingPointSolver::new(chain, SolverConfig::default());
    let table = bounds(1);
    let mode = Mode::new(8.5, 3.0, 3.8);

    let result = solver.solve(&mode, &table).unwrap();
    assert_feasible(&result, 3.8, &table);
    assert_eq!(mode.suction_pressure(), 3.0, "caller's mode is untouched");
}

#[test]
fn two_stage_meets_target() {
    let chain = StageChain::new(
        [(map("s1", 1.25), 1), (map("s2", 1.25), 1)],
        ChainConfig::default(),
    )
    .unwrap();
    let solver = OperatingPointSolver::new(chain, SolverConfig::default());
    let table = bounds(2);
    let mode = Mode::new(8.5, 3.0, 4.6);

    let result = solver.solve(&mode, &table).unwrap();
    assert_feasible(&result, 4.6, &table);
    assert_relative_eq!(
        result.rows[1].suction_pressure,
        result.rows[0].discharge_pressure - 0.06,
        epsilon = 1e-9
    );
}

#[test]
fn finite_difference_jacobian_also_converges() {
    let chain = StageChain::single(map("s1", 1.25));
    let config = SolverConfig {
        jacobian: JacobianMethod::FiniteDifference,
        ..SolverConfig::default()
    };
    let solver = OperatingPointSolver::new(chain, config);
    let table = bounds(1);
    let result = solver.solve(&Mode::new(8.5, 3.0, 3.8), &table).unwrap();
    assert_feasible(&result, 3.8, &table);
}

#[test]
fn nominal_start_only() {
    let chain = StageChain::single(map("s1", 1.25));
    let config = SolverConfig {
        strategy: InitializationStrategy::Nominal,
        fallback_strategies: Vec::new(),
        ..SolverConfig::default()
    };
    let solver = OperatingPointSolver::new(chain, config);
    let table = bounds(1);
    let result = solver.solve(&Mode::new(8.5, 3.0, 3.8), &table).unwrap();
    assert_eq!(result.strategy, InitializationStrategy::Nominal);
    assert_feasible(&result, 3.8, &table);
}

#[test]
fn target_above_discharge_ceiling_is_infeasible() {
    let chain = StageChain::single(map("s1", 1.25));
    let solver = OperatingPointSolver::new(chain, SolverConfig::default());
    let table = bounds(1);
    let target = 3.0 * 7.5;

    match solver.solve(&Mode::new(8.5, 3.0, target), &table) {
        Err(SolverError::NoFeasiblePoint { best }) => {
            assert!(!best.success);
            assert_eq!(best.status, SolveStatus::NoFeasiblePoint);
            assert!(best.max_violation > 0.0 || best.target_residual > 1e-3);
        }
        other => panic!("expected NoFeasiblePoint, got {other:?}"),
    }
}

#[test]
fn mismatched_bound_table_is_setup_error() {
    let chain = StageChain::single(map("s1", 1.25));
    let solver = OperatingPointSolver::new(chain, SolverConfig::default());
    let err = solver.solve(&Mode::new(8.5, 3.0, 3.8), &bounds(2)).unwrap_err();
    assert!(matches!(err, SolverError::ProblemSetup { .. }));
}

#[test]
fn batch_matches_sequential() {
    let chain = StageChain::single(map("s1", 1.25));
    let solver = OperatingPointSolver::new(chain, SolverConfig::default());
    let table = bounds(1);
    let modes: Vec<Mode> = [3.6, 3.8, 4.0, 30.0]
        .iter()
        .map(|&t| Mode::new(8.5, 3.0, t))
        .collect();

    let batch = solver.solve_batch(&modes, &table);
    assert_eq!(batch.len(), modes.len());
    for (mode, parallel) in modes.iter().zip(batch) {
        let sequential = solver.solve(mode, &table);
        match (parallel, sequential) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (
                Err(SolverError::NoFeasiblePoint { best: a }),
                Err(SolverError::NoFeasiblePoint { best: b }),
            ) => assert_eq!(a, b),
            (a, b) => panic!("batch and sequential disagree: {a:?} vs {b:?}"),
        }
    }
}
