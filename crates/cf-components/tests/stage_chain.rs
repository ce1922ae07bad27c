//! Integration tests for stage maps and chains on a synthetic stage.

use approx::assert_relative_eq;
use cf_components::{
    BoundTable, ChainConfig, ComponentError, DEFAULT_DEPENDENT_SAMPLES, Mode, PenaltyWeights, SamplePoint, StageBounds,
    StageChain, StageMap, StageParams, build_stage_map,
};
use cf_thermo::{
    ReferenceConditions, circumferential_speed, compression_ratio, enthalpy_rise,
    volume_rate_from_flow_coefficient, volumetric_flow_from_mass_flow,
};
use std::sync::Arc;

const D: f64 = 0.6;
const N: f64 = 6000.0;
const P_TEST: f64 = 3.0;

fn psi(phi: f64) -> f64 {
    0.9 - 30.0 * (phi - 0.06).powi(2)
}

fn eta(phi: f64) -> f64 {
    0.82 - 60.0 * (phi - 0.06).powi(2)
}

fn params(name: &str) -> StageParams {
    StageParams {
        name: name.into(),
        gas_constant: 500.0,
        suction_temperature: 288.0,
        k: 1.31,
        diameter: D,
        nominal_speed: N,
        nominal_power: 16000.0,
        nominal_ratio: 1.3,
        nominal_discharge_pressure: 7.5,
        reference: ReferenceConditions::default(),
    }
}

/// Raw samples generated from known coefficient curves at test conditions.
fn samples(count: usize) -> Vec<SamplePoint> {
    (0..count)
        .map(|i| {
            let phi = 0.04 + 0.04 * i as f64 / (count - 1) as f64;
            let volume_rate = volume_rate_from_flow_coefficient(D, N, phi);
            let per_unit_flow =
                volumetric_flow_from_mass_flow(1.0, P_TEST, 288.0, 500.0, 0.101_325, 283.0);
            let u = circumferential_speed(D, N);
            let ratio = compression_ratio(P_TEST, enthalpy_rise(psi(phi), u), 500.0, 288.0, 1.31, eta(phi));
            SamplePoint {
                flow: volume_rate / per_unit_flow,
                efficiency: eta(phi),
                speed: N,
                suction_pressure: P_TEST,
                discharge_pressure: P_TEST * ratio,
            }
        })
        .collect()
}

fn map(name: &str) -> Arc<StageMap> {
    Arc::new(build_stage_map(params(name), &samples(11), 4).unwrap())
}

/// Speed at which the stage reaches `ratio` for the given suction state.
fn speed_for_ratio(map: &StageMap, mode: &Mode, flow: f64, suction: f64, ratio: f64) -> f64 {
    let (mut lo, mut hi) = (3000.0, 20000.0);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if map.evaluate_scalar(mode, flow, suction, mid).compression_ratio < ratio {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[test]
fn samples_recover_generating_coefficients() {
    let m = map("s1");
    let (lo, hi) = m.domain();
    assert_relative_eq!(lo, 0.04, epsilon = 1e-9);
    assert_relative_eq!(hi, 0.08, epsilon = 1e-9);
    for p in m.points() {
        assert_relative_eq!(p.head_coefficient, psi(p.flow_coefficient), epsilon = 1e-9);
    }
    for phi in [0.045, 0.06, 0.0725] {
        assert_relative_eq!(m.head_at(phi), psi(phi), epsilon = 1e-8);
        assert_relative_eq!(m.efficiency_at(phi), eta(phi), epsilon = 1e-8);
    }
}

#[test]
fn fit_passes_through_degree_plus_one_samples() {
    let m = build_stage_map(params("exact"), &samples(5), 4).unwrap();
    for p in m.points() {
        assert_relative_eq!(m.head_at(p.flow_coefficient), p.head_coefficient, epsilon = 1e-9);
        assert_relative_eq!(m.efficiency_at(p.flow_coefficient), p.efficiency, epsilon = 1e-9);
    }
}

#[test]
fn too_few_samples() {
    let err = build_stage_map(params("few"), &samples(11)[..3], 4).unwrap_err();
    assert_eq!(err, ComponentError::InsufficientSamples { needed: 5, got: 3 });
}

#[test]
fn duplicate_flow_coefficients_are_singular() {
    let base = samples(5);
    let dup = vec![base[0], base[0], base[2], base[2], base[4]];
    let err = build_stage_map(params("dup"), &dup, 4).unwrap_err();
    assert!(matches!(err, ComponentError::SingularFit { .. }));
}

#[test]
fn invalid_sample_reported_with_index() {
    let mut s = samples(6);
    s[4].efficiency = f64::NAN;
    let err = build_stage_map(params("nan"), &s, 4).unwrap_err();
    assert!(matches!(err, ComponentError::InvalidSample { index: 4, .. }));
}

#[test]
fn speed_at_max_flow_coefficient_places_phi_at_domain_max() {
    let m = map("s1");
    let mode = Mode::new(8.5, 3.0, 3.8);
    let chain = StageChain::single(m.clone());
    let bounds = chain.freq_bounds_all(&mode).unwrap();
    let row = m.evaluate(&mode, bounds[0].at_max_flow_coefficient);
    assert_relative_eq!(row.flow_coefficient, m.domain().1, epsilon = 1e-12);
    assert!(!row.extrapolated);
    let row = m.evaluate(&mode, bounds[0].at_min_flow_coefficient);
    assert_relative_eq!(row.flow_coefficient, m.domain().0, epsilon = 1e-12);
    assert_relative_eq!(row.surge_margin, 0.0, epsilon = 1e-9);
}

#[test]
fn single_stage_chain_matches_direct_evaluation() {
    let m = map("s1");
    let mode = Mode::new(8.5, 3.0, 3.8);
    let chain = StageChain::single(m.clone());
    for speed in [4500.0, 6000.0, 6300.0] {
        let rows = chain.evaluate_chain(&mode, &[speed]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], m.evaluate(&mode, speed));
    }
}

#[test]
fn two_stage_pressure_propagation() {
    let (a, b) = (map("s1"), map("s2"));
    let mode = Mode::new(8.5, 3.0, 8.5);
    let n1 = speed_for_ratio(&a, &mode, 8.5, 3.0, 1.8);
    let n2 = speed_for_ratio(&b, &mode, 8.5, 3.0 * 1.8 - 0.06, 1.6);

    let chain = StageChain::new([(a, 1), (b, 1)], ChainConfig::default()).unwrap();
    let rows = chain.evaluate_chain(&mode, &[n1, n2]).unwrap();

    assert_relative_eq!(rows[0].compression_ratio, 1.8, epsilon = 1e-9);
    assert_relative_eq!(rows[1].suction_pressure, 5.34, epsilon = 1e-9);
    assert_relative_eq!(rows[1].compression_ratio, 1.6, epsilon = 1e-9);
    assert_relative_eq!(rows[1].discharge_pressure, 8.544, epsilon = 1e-8);
    assert_relative_eq!(
        rows[1].suction_pressure,
        rows[0].discharge_pressure - 0.06,
        epsilon = 1e-12
    );
}

#[test]
fn evaluation_is_deterministic() {
    let chain = StageChain::new([(map("s1"), 2), (map("s2"), 1)], ChainConfig::default()).unwrap();
    let mode = Mode::new(17.0, 3.0, 5.0);
    let first = chain.evaluate_chain(&mode, &[6000.0, 6500.0]).unwrap();
    let second = chain.evaluate_chain(&mode, &[6000.0, 6500.0]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn penalty_is_mean_of_nonzero_violations() {
    let chain = StageChain::single(map("s1"));
    let mode = Mode::new(8.5, 3.0, 3.8);
    let mut b = StageBounds::default();
    b.power.min = 0.0;
    b.speed_ratio.max = 0.9;
    b.compression_ratio.max = 1.1;
    let table = BoundTable::uniform(1, b).unwrap();

    let scored = chain
        .evaluate_chain_with_bounds(&mode, &[6000.0], &table, &PenaltyWeights::default())
        .unwrap();
    let row = &scored.rows[0];
    let speed_violation = (row.speed_ratio - 0.9) / 0.01;
    let ratio_violation = (row.compression_ratio - 1.1) / 0.01;
    assert_relative_eq!(
        scored.penalty,
        0.5 * (speed_violation + ratio_violation),
        epsilon = 1e-9
    );
    assert_eq!(scored.violations[0].violated().count(), 2);
}

#[test]
fn bounds_table_must_match_chain() {
    let chain = StageChain::single(map("s1"));
    let table = BoundTable::uniform(2, StageBounds::default()).unwrap();
    let err = chain
        .evaluate_chain_with_bounds(
            &Mode::new(8.5, 3.0, 3.8),
            &[6000.0],
            &table,
            &PenaltyWeights::default(),
        )
        .unwrap_err();
    assert!(matches!(err, ComponentError::StageCountMismatch { .. }));
}

#[test]
fn dependent_windows_follow_first_stage_sweep() {
    let (a, b) = (map("s1"), map("s2"));
    let chain = StageChain::new([(a, 1), (b.clone(), 1)], ChainConfig::default()).unwrap();
    let mode = Mode::new(8.5, 3.0, 4.6);
    let windows = chain.freq_bounds_all(&mode).unwrap();

    let sweep = chain
        .dependent_speed_bounds(&mode, &windows[0], DEFAULT_DEPENDENT_SAMPLES)
        .unwrap();
    assert_eq!(sweep.len(), DEFAULT_DEPENDENT_SAMPLES);
    assert_relative_eq!(sweep[0].0, windows[0].lower(), epsilon = 1e-9);
    assert_relative_eq!(sweep[sweep.len() - 1].0, windows[0].upper(), epsilon = 1e-9);
    assert!(sweep.windows(2).all(|w| w[1].0 > w[0].0));

    for (speed, window) in &sweep {
        assert!(speed.is_finite() && *speed > 0.0);
        assert!(window.lower().is_finite() && window.lower() > 0.0);
        assert!(window.lower() < window.upper());
    }

    // The sweep ends coincide with the two pressure branches.
    assert_relative_eq!(
        sweep[0].1.at_max_flow_coefficient,
        windows[1].at_max_flow_coefficient,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        sweep[sweep.len() - 1].1.at_min_flow_coefficient,
        windows[1].at_min_flow_coefficient,
        epsilon = 1e-9
    );

    // Stage two at its window edge sits on the sampled flow-coefficient edge.
    let (n1, window) = sweep[DEFAULT_DEPENDENT_SAMPLES / 2];
    let rows = chain
        .evaluate_chain(&mode, &[n1, window.at_max_flow_coefficient])
        .unwrap();
    assert_relative_eq!(rows[1].flow_coefficient, b.domain().1, epsilon = 1e-9);
}

#[test]
fn dependent_windows_need_two_stages() {
    let chain = StageChain::single(map("s1"));
    let mode = Mode::new(8.5, 3.0, 3.8);
    let windows = chain.freq_bounds_all(&mode).unwrap();
    let err = chain
        .dependent_speed_bounds(&mode, &windows[0], DEFAULT_DEPENDENT_SAMPLES)
        .unwrap_err();
    assert!(matches!(err, ComponentError::InvalidArg { .. }));
}
