//! Performance map of a single centrifugal compressor stage.
//!
//! A [`StageMap`] is built once from vendor/test samples (or from already
//! derived dimensionless points) and is immutable afterwards. It answers two
//! kinds of queries: head and efficiency as functions of the flow coefficient,
//! and the full thermodynamic state of the stage at a given suction state and
//! shaft speed.

use crate::error::{ComponentError, ComponentResult};
use crate::fit::Polynomial;
use crate::mode::Mode;
use cf_core::{Scalar, floor_at};
use cf_thermo::{
    MIN_PRESSURE, ReferenceConditions, circumferential_speed, compression_ratio, enthalpy_rise,
    enthalpy_rise_from_pressure_ratio, flow_coefficient_from_volume_rate,
    head_coefficient_from_enthalpy_rise, power, speed_for_flow_coefficient,
    volumetric_flow_from_mass_flow,
};
use serde::Serialize;
use tracing::debug;

/// Polynomial degree used when none is given.
pub const DEFAULT_DEGREE: usize = 4;

/// Scalar metadata of a stage: test-bench gas state, geometry and nameplate data.
#[derive(Clone, Debug, PartialEq)]
pub struct StageParams {
    pub name: String,
    /// Gas constant of the test gas, J/(kg·K)
    pub gas_constant: f64,
    /// Test suction temperature (K)
    pub suction_temperature: f64,
    /// Polytropic exponent of the test gas
    pub k: f64,
    /// Impeller diameter (m)
    pub diameter: f64,
    /// Nominal shaft speed (rpm)
    pub nominal_speed: f64,
    /// Nominal shaft power (kW)
    pub nominal_power: f64,
    pub nominal_ratio: f64,
    /// Nominal discharge pressure (MPa)
    pub nominal_discharge_pressure: f64,
    /// Conditions at which sample flows are metered
    pub reference: ReferenceConditions,
}

impl StageParams {
    pub fn validate(&self) -> ComponentResult<()> {
        let positive = [
            (self.gas_constant, "gas constant must be positive"),
            (self.suction_temperature, "suction temperature must be positive"),
            (self.diameter, "diameter must be positive"),
            (self.nominal_speed, "nominal speed must be positive"),
            (self.nominal_ratio, "nominal ratio must be positive"),
            (
                self.nominal_discharge_pressure,
                "nominal discharge pressure must be positive",
            ),
            (self.reference.pressure, "reference pressure must be positive"),
            (
                self.reference.temperature,
                "reference temperature must be positive",
            ),
        ];
        for (value, what) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ComponentError::InvalidArg { what });
            }
        }
        if !(self.nominal_power.is_finite() && self.nominal_power >= 0.0) {
            return Err(ComponentError::InvalidArg {
                what: "nominal power must be non-negative",
            });
        }
        if !(self.k.is_finite() && self.k > 1.0) {
            return Err(ComponentError::InvalidArg {
                what: "polytropic exponent k must exceed 1",
            });
        }
        Ok(())
    }
}

/// One measured point of a stage characteristic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    /// Commercial flow (mln std m³/day)
    pub flow: f64,
    /// Polytropic efficiency, fraction
    pub efficiency: f64,
    /// Shaft speed (rpm)
    pub speed: f64,
    /// Test suction pressure (MPa)
    pub suction_pressure: f64,
    /// Test discharge pressure (MPa)
    pub discharge_pressure: f64,
}

/// Sample reduced to similarity coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DimensionlessPoint {
    pub flow_coefficient: f64,
    pub head_coefficient: f64,
    pub efficiency: f64,
}

/// Reduce raw samples to dimensionless points at the stage's test conditions.
///
/// # Errors
///
/// [`ComponentError::InvalidSample`] for non-finite or non-physical inputs.
pub fn derive_dimensionless(
    params: &StageParams,
    samples: &[SamplePoint],
) -> ComponentResult<Vec<DimensionlessPoint>> {
    samples
        .iter()
        .enumerate()
        .map(|(index, s)| {
            let invalid = |what| ComponentError::InvalidSample { index, what };
            let all_finite = [
                s.flow,
                s.efficiency,
                s.speed,
                s.suction_pressure,
                s.discharge_pressure,
            ]
            .iter()
            .all(|v| v.is_finite());
            if !all_finite {
                return Err(invalid("non-finite value"));
            }
            if !(s.efficiency > 0.0 && s.efficiency <= 1.0) {
                return Err(invalid("efficiency must be in (0, 1]"));
            }
            if s.flow <= 0.0 || s.speed <= 0.0 {
                return Err(invalid("flow and speed must be positive"));
            }
            if s.suction_pressure <= 0.0 || s.discharge_pressure <= 0.0 {
                return Err(invalid("pressures must be positive"));
            }

            let ratio = s.discharge_pressure / s.suction_pressure;
            let u = circumferential_speed(params.diameter, s.speed);
            let dh = enthalpy_rise_from_pressure_ratio(
                s.suction_pressure,
                params.gas_constant,
                params.suction_temperature,
                ratio,
                params.k,
                s.efficiency,
            );
            let volume_rate = volumetric_flow_from_mass_flow(
                s.flow,
                s.suction_pressure,
                params.suction_temperature,
                params.gas_constant,
                params.reference.pressure,
                params.reference.temperature,
            );
            let point = DimensionlessPoint {
                flow_coefficient: flow_coefficient_from_volume_rate(
                    params.diameter,
                    s.speed,
                    volume_rate,
                ),
                head_coefficient: head_coefficient_from_enthalpy_rise(dh, u),
                efficiency: s.efficiency,
            };
            if point.flow_coefficient.is_finite() && point.head_coefficient.is_finite() {
                Ok(point)
            } else {
                Err(invalid("derived coefficients are non-finite"))
            }
        })
        .collect()
}

/// Fit a stage map from raw samples.
///
/// # Errors
///
/// - [`ComponentError::InvalidArg`] for invalid stage params
/// - [`ComponentError::InvalidSample`] for a non-physical sample
/// - [`ComponentError::InsufficientSamples`] with fewer than `degree + 1` samples
/// - [`ComponentError::SingularFit`] when the flow coefficients are degenerate
pub fn build_stage_map(
    params: StageParams,
    samples: &[SamplePoint],
    degree: usize,
) -> ComponentResult<StageMap> {
    params.validate()?;
    let needed = degree + 1;
    if samples.len() < needed {
        return Err(ComponentError::InsufficientSamples {
            needed,
            got: samples.len(),
        });
    }
    let points = derive_dimensionless(&params, samples)?;
    stage_map_from_points(params, points, degree)
}

/// Fit a stage map from already derived dimensionless points.
pub fn stage_map_from_points(
    params: StageParams,
    points: Vec<DimensionlessPoint>,
    degree: usize,
) -> ComponentResult<StageMap> {
    params.validate()?;
    for (index, p) in points.iter().enumerate() {
        let invalid = |what| ComponentError::InvalidSample { index, what };
        if !(p.flow_coefficient.is_finite() && p.flow_coefficient > 0.0) {
            return Err(invalid("flow coefficient must be finite and positive"));
        }
        if !p.head_coefficient.is_finite() {
            return Err(invalid("non-finite head coefficient"));
        }
        if !(p.efficiency > 0.0 && p.efficiency <= 1.0) {
            return Err(invalid("efficiency must be in (0, 1]"));
        }
    }

    let phis: Vec<f64> = points.iter().map(|p| p.flow_coefficient).collect();
    let heads: Vec<f64> = points.iter().map(|p| p.head_coefficient).collect();
    let effs: Vec<f64> = points.iter().map(|p| p.efficiency).collect();

    let head = Polynomial::fit(&phis, &heads, degree)?;
    let efficiency = Polynomial::fit(&phis, &effs, degree)?;

    let domain = phis
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });

    debug!(
        stage = %params.name,
        points = points.len(),
        degree,
        phi_min = domain.0,
        phi_max = domain.1,
        "fitted stage map"
    );

    Ok(StageMap {
        params,
        points,
        head,
        efficiency,
        domain,
    })
}

/// Shaft speeds that place a given volume rate at the edges of the sampled
/// flow-coefficient range.
///
/// Because φ falls as speed rises, `at_max_flow_coefficient` is the lower of
/// the two speeds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpeedBounds {
    /// Speed at which φ equals the sampled maximum (rpm)
    pub at_max_flow_coefficient: f64,
    /// Speed at which φ equals the sampled minimum (rpm)
    pub at_min_flow_coefficient: f64,
}

impl SpeedBounds {
    pub fn lower(&self) -> f64 {
        self.at_max_flow_coefficient.min(self.at_min_flow_coefficient)
    }

    pub fn upper(&self) -> f64 {
        self.at_max_flow_coefficient.max(self.at_min_flow_coefficient)
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.at_max_flow_coefficient + self.at_min_flow_coefficient)
    }
}

/// Stage state at one suction state and speed, generic so that the solver can
/// carry derivatives through it.
#[derive(Clone, Copy, Debug)]
pub struct StageState<D> {
    /// Actual suction volume rate (m³/min)
    pub volume_rate: D,
    pub circumferential_speed: D,
    pub flow_coefficient: D,
    pub head_coefficient: D,
    pub efficiency: D,
    /// J/kg
    pub enthalpy_rise: D,
    /// kW
    pub power: D,
    pub compression_ratio: D,
    /// MPa
    pub discharge_pressure: D,
    /// Percent of the sampled φ range, 0 at φ_min
    pub surge_margin: D,
    pub speed_ratio: D,
}

/// One evaluated stage, as reported to callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageResult {
    pub name: String,
    pub parallel_units: usize,
    /// Commercial flow through one unit (mln std m³/day)
    pub flow: f64,
    /// m³/min
    pub volume_rate: f64,
    /// MPa
    pub suction_pressure: f64,
    /// MPa
    pub discharge_pressure: f64,
    pub compression_ratio: f64,
    /// rpm
    pub speed: f64,
    pub speed_ratio: f64,
    /// m/s
    pub circumferential_speed: f64,
    pub flow_coefficient: f64,
    pub head_coefficient: f64,
    pub efficiency: f64,
    /// J/kg
    pub enthalpy_rise: f64,
    /// kW
    pub power: f64,
    /// %
    pub surge_margin: f64,
    /// |discharge − target| (MPa)
    pub target_residual: f64,
    /// φ outside the sampled range
    pub extrapolated: bool,
}

/// Fitted performance map of one stage.
#[derive(Clone, Debug)]
pub struct StageMap {
    params: StageParams,
    points: Vec<DimensionlessPoint>,
    head: Polynomial,
    efficiency: Polynomial,
    domain: (f64, f64),
}

impl StageMap {
    pub fn params(&self) -> &StageParams {
        &self.params
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    pub fn points(&self) -> &[DimensionlessPoint] {
        &self.points
    }

    pub fn degree(&self) -> usize {
        self.head.degree()
    }

    pub fn head_fit(&self) -> &Polynomial {
        &self.head
    }

    pub fn efficiency_fit(&self) -> &Polynomial {
        &self.efficiency
    }

    /// Sampled flow-coefficient range `(min, max)`.
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Head coefficient ψ(φ).
    pub fn head_at<D: Scalar>(&self, flow_coefficient: D) -> D {
        self.head.eval(flow_coefficient)
    }

    /// Polytropic efficiency η(φ).
    pub fn efficiency_at<D: Scalar>(&self, flow_coefficient: D) -> D {
        self.efficiency.eval(flow_coefficient)
    }

    pub fn head_at_batch(&self, flow_coefficients: &[f64]) -> Vec<f64> {
        self.head.eval_batch(flow_coefficients)
    }

    pub fn efficiency_at_batch(&self, flow_coefficients: &[f64]) -> Vec<f64> {
        self.efficiency.eval_batch(flow_coefficients)
    }

    /// Whether `flow_coefficient` lies outside the sampled range.
    ///
    /// Points within a relative 1e-9 of the range edges count as inside, so the
    /// speeds from [`Self::speed_bounds_for_volume_rate`] are never flagged.
    pub fn is_extrapolation(&self, flow_coefficient: f64) -> bool {
        let (lo, hi) = self.domain;
        let slack = 1e-9 * (hi - lo);
        !(flow_coefficient >= lo - slack && flow_coefficient <= hi + slack)
    }

    /// Surge margin in percent: 0 at the sampled minimum φ, 100 at the maximum.
    pub fn surge_margin<D: Scalar>(&self, flow_coefficient: D) -> D {
        let (lo, hi) = self.domain;
        (flow_coefficient - lo) * (100.0 / (hi - lo))
    }

    /// Speed window that keeps `volume_rate` (m³/min) inside the sampled φ range.
    pub fn speed_bounds_for_volume_rate(&self, volume_rate: f64) -> SpeedBounds {
        let (lo, hi) = self.domain;
        SpeedBounds {
            at_max_flow_coefficient: speed_for_flow_coefficient(
                self.params.diameter,
                volume_rate,
                hi,
            ),
            at_min_flow_coefficient: speed_for_flow_coefficient(
                self.params.diameter,
                volume_rate,
                lo,
            ),
        }
    }

    /// Full stage state for `flow` (per unit) at `suction_pressure` and `speed`.
    ///
    /// Gas properties and reference conditions come from `mode`; its flow and
    /// suction pressure are not consulted.
    pub fn state_at<D: Scalar>(
        &self,
        mode: &Mode,
        flow: f64,
        suction_pressure: D,
        speed: D,
    ) -> StageState<D> {
        let reference = mode.reference();
        let (r, t_in, k) = (mode.gas_constant(), mode.suction_temperature(), mode.k());
        let d = self.params.diameter;

        let volume_rate = volumetric_flow_from_mass_flow(
            flow,
            suction_pressure,
            t_in,
            r,
            reference.pressure,
            reference.temperature,
        );
        let u = circumferential_speed(d, speed);
        let phi = flow_coefficient_from_volume_rate(d, speed, volume_rate);
        let psi = self.head_at(phi);
        let eff = self.efficiency_at(phi);
        let dh = enthalpy_rise(psi, u);
        let ratio = compression_ratio(suction_pressure, dh, r, t_in, k, eff);

        StageState {
            volume_rate,
            circumferential_speed: u,
            flow_coefficient: phi,
            head_coefficient: psi,
            efficiency: eff,
            enthalpy_rise: dh,
            power: power(flow, dh, eff, r, reference.pressure, reference.temperature),
            compression_ratio: ratio,
            discharge_pressure: floor_at(suction_pressure, MIN_PRESSURE) * ratio,
            surge_margin: self.surge_margin(phi),
            speed_ratio: speed / self.params.nominal_speed,
        }
    }

    /// Report row for a state computed by [`Self::state_at`].
    pub fn result_row(
        &self,
        mode: &Mode,
        flow: f64,
        suction_pressure: f64,
        speed: f64,
        state: &StageState<f64>,
    ) -> StageResult {
        StageResult {
            name: self.params.name.clone(),
            parallel_units: 1,
            flow,
            volume_rate: state.volume_rate,
            suction_pressure,
            discharge_pressure: state.discharge_pressure,
            compression_ratio: state.compression_ratio,
            speed,
            speed_ratio: state.speed_ratio,
            circumferential_speed: state.circumferential_speed,
            flow_coefficient: state.flow_coefficient,
            head_coefficient: state.head_coefficient,
            efficiency: state.efficiency,
            enthalpy_rise: state.enthalpy_rise,
            power: state.power,
            surge_margin: state.surge_margin,
            target_residual: (state.discharge_pressure - mode.target_discharge_pressure()).abs(),
            extrapolated: self.is_extrapolation(state.flow_coefficient),
        }
    }

    /// Evaluate the stage at the mode's suction state and the given speed.
    ///
    /// The flow is the mode's flow for the first stage. Out-of-range flow
    /// coefficients are evaluated on the fit and flagged, never rejected.
    pub fn evaluate(&self, mode: &Mode, speed: f64) -> StageResult {
        let flow = mode.flow().for_stage(0).unwrap_or(0.0);
        self.evaluate_scalar(mode, flow, mode.suction_pressure(), speed)
    }

    /// Evaluate at an explicit per-unit flow and suction pressure.
    pub fn evaluate_scalar(
        &self,
        mode: &Mode,
        flow: f64,
        suction_pressure: f64,
        speed: f64,
    ) -> StageResult {
        let state = self.state_at(mode, flow, suction_pressure, speed);
        self.result_row(mode, flow, suction_pressure, speed, &state)
    }
}
