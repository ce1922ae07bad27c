//! Stage-level gas-dynamic formulas.

use crate::conditions::CriticalPoint;
use cf_core::{Scalar, floor_at};
use std::f64::consts::PI;

/// Lowest suction pressure any formula will see (MPa).
pub const MIN_PRESSURE: f64 = 1e-6;

/// Lowest shaft speed any formula will see (rpm).
pub const MIN_SPEED: f64 = 1.0;

/// Lowest polytropic efficiency any formula will see.
pub const MIN_EFFICIENCY: f64 = 1e-3;

/// Lowest base of the fractional power in [`compression_ratio`].
pub const MIN_RATIO_BASE: f64 = 1e-9;

/// Value substituted for a negative compressibility factor.
pub const COMPRESSIBILITY_FLOOR: f64 = 0.1;

/// mln std m³/day → std m³/min
pub const COMMERCIAL_TO_M3_PER_MIN: f64 = 1.0e6 / 1440.0;

/// mln std m³/day → std m³/s
pub const COMMERCIAL_TO_M3_PER_S: f64 = 1.0e6 / 86_400.0;

/// π²·d³/4, the geometric factor linking flow coefficient, speed and volume rate.
#[inline]
fn flow_geometry(diam: f64) -> f64 {
    PI * PI * diam.powi(3) / 4.0
}

/// Compressibility factor Z from a simplified corresponding-states correlation.
///
/// ```text
/// Z = 1 - 0.427 · (p / p_c) · (t / t_c)^(-3.688)
/// ```
///
/// A negative result is replaced by exactly [`COMPRESSIBILITY_FLOOR`].
pub fn compressibility_factor<D: Scalar>(p_in: D, t_in: f64, critical: CriticalPoint) -> D {
    let coefficient = 0.427 / critical.pressure * (t_in / critical.temperature).powf(-3.688);
    let z = D::from(1.0) - p_in * coefficient;
    if z.re() < 0.0 {
        D::from(COMPRESSIBILITY_FLOOR)
    } else {
        z
    }
}

/// Element-wise [`compressibility_factor`] over a set of pressures at one temperature.
pub fn compressibility_factor_batch(
    pressures: &[f64],
    t_in: f64,
    critical: CriticalPoint,
) -> Vec<f64> {
    pressures
        .iter()
        .map(|&p| compressibility_factor(p, t_in, critical))
        .collect()
}

/// Impeller tip speed u = π·d·n/60 (m/s).
#[inline]
pub fn circumferential_speed<D: Scalar>(diam: f64, speed: D) -> D {
    speed * (PI * diam / 60.0)
}

/// Specific enthalpy rise dh = ψ·u² (J/kg).
#[inline]
pub fn enthalpy_rise<D: Scalar>(head_coefficient: D, u: D) -> D {
    head_coefficient * u * u
}

/// Head coefficient ψ = dh/u².
#[inline]
pub fn head_coefficient_from_enthalpy_rise(dh: f64, u: f64) -> f64 {
    dh / (u * u)
}

/// Flow coefficient φ = 4·V/(π²·d³·n) for V in m³/min and n in rpm.
#[inline]
pub fn flow_coefficient_from_volume_rate<D: Scalar>(diam: f64, speed: D, volume_rate: D) -> D {
    volume_rate / (floor_at(speed, MIN_SPEED) * flow_geometry(diam))
}

/// Volume rate V = φ·π²·d³·n/4, the inverse of [`flow_coefficient_from_volume_rate`].
#[inline]
pub fn volume_rate_from_flow_coefficient<D: Scalar>(
    diam: f64,
    speed: D,
    flow_coefficient: D,
) -> D {
    flow_coefficient * floor_at(speed, MIN_SPEED) * flow_geometry(diam)
}

/// Shaft speed that puts `volume_rate` at `flow_coefficient`.
#[inline]
pub fn speed_for_flow_coefficient(diam: f64, volume_rate: f64, flow_coefficient: f64) -> f64 {
    volume_rate / (flow_coefficient * flow_geometry(diam))
}

/// Specific volume Z·R·T/p, in units of R·K/MPa.
#[inline]
fn specific_volume<D: Scalar>(p: D, t: f64, gas_constant: f64) -> D {
    let p = floor_at(p, MIN_PRESSURE);
    compressibility_factor(p, t, CriticalPoint::default()) * (gas_constant * t) / p
}

/// Convert a commercial flow (mln std m³/day at reference conditions) to the
/// actual volumetric flow at suction (m³/min).
pub fn volumetric_flow_from_mass_flow<D: Scalar>(
    flow: f64,
    p_in: D,
    t_in: f64,
    gas_constant: f64,
    p_ref: f64,
    t_ref: f64,
) -> D {
    let reference = specific_volume(p_ref, t_ref, gas_constant);
    specific_volume(p_in, t_in, gas_constant) * (flow * COMMERCIAL_TO_M3_PER_MIN / reference)
}

/// Polytropic exponent term m = (k − 1)/(k·η).
#[inline]
pub fn polytropic_term<D: Scalar>(k: f64, efficiency: D) -> D {
    floor_at(efficiency, MIN_EFFICIENCY).recip() * ((k - 1.0) / k)
}

/// Pressure ratio produced by an enthalpy rise at given suction state.
///
/// ```text
/// m     = (k - 1) / (k · η)
/// ratio = (dh · m / (Z · R · T) + 1)^(1/m)
/// ```
pub fn compression_ratio<D: Scalar>(
    p_in: D,
    dh: D,
    gas_constant: f64,
    t_in: f64,
    k: f64,
    efficiency: D,
) -> D {
    let p = floor_at(p_in, MIN_PRESSURE);
    let z = compressibility_factor(p, t_in, CriticalPoint::default());
    let m = polytropic_term(k, efficiency);
    let base = dh * m / (z * (gas_constant * t_in)) + 1.0;
    floor_at(base, MIN_RATIO_BASE).powd(m.recip())
}

/// Enthalpy rise needed for a pressure ratio, the inverse of [`compression_ratio`].
///
/// ```text
/// dh = Z · R · T · (ratio^m - 1) / m
/// ```
pub fn enthalpy_rise_from_pressure_ratio(
    p_in: f64,
    gas_constant: f64,
    t_in: f64,
    ratio: f64,
    k: f64,
    efficiency: f64,
) -> f64 {
    let p = p_in.max(MIN_PRESSURE);
    let z = compressibility_factor(p, t_in, CriticalPoint::default());
    let m = polytropic_term(k, efficiency);
    z * gas_constant * t_in * (ratio.powf(m) - 1.0) / m
}

/// Mass flow (kg/s) of a commercial flow (mln std m³/day).
pub fn mass_flow_from_commercial(flow: f64, gas_constant: f64, p_ref: f64, t_ref: f64) -> f64 {
    let z_ref = compressibility_factor(p_ref, t_ref, CriticalPoint::default());
    let rho_ref = p_ref * 1.0e6 / (z_ref * gas_constant * t_ref);
    flow * COMMERCIAL_TO_M3_PER_S * rho_ref
}

/// Shaft power (kW) to push a commercial flow through an enthalpy rise.
pub fn power<D: Scalar>(
    flow: f64,
    dh: D,
    efficiency: D,
    gas_constant: f64,
    p_ref: f64,
    t_ref: f64,
) -> D {
    let mdot = mass_flow_from_commercial(flow, gas_constant, p_ref, t_ref);
    dh / floor_at(efficiency, MIN_EFFICIENCY) * (mdot / 1000.0)
}
