//! Presentation views of a stage map: efficiency-band knots, speed lines and
//! iso-efficiency lines.
//!
//! None of these change the fit; they resample it at points that read well on a
//! compressor chart.

use crate::golden::{GoldenConfig, maximize};
use crate::mode::Mode;
use crate::stage::StageMap;
use cf_core::{Tolerances, interp_linear, linspace, nearly_equal};
use cf_thermo::{
    circumferential_speed, compression_ratio, enthalpy_rise, volume_rate_from_flow_coefficient,
};
use serde::Serialize;

/// Inner efficiency levels on each side of the optimum when none is given.
pub const DEFAULT_PER_SIDE: usize = 3;

/// Speed fractions of nominal drawn on a chart.
pub const DEFAULT_SPEED_FRACTIONS: [f64; 8] = [1.05, 1.0, 0.95, 0.90, 0.85, 0.80, 0.75, 0.70];

/// Samples per branch of the efficiency → φ lookup table.
const BRANCH_SAMPLES: usize = 50;

/// Flow-coefficient knots spaced evenly in efficiency on both sides of the optimum.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EfficiencyBand {
    pub flow_coefficients: Vec<f64>,
    pub head_coefficients: Vec<f64>,
    pub efficiencies: Vec<f64>,
    /// Position of the efficiency optimum in the knot vectors
    pub optimum_index: usize,
}

impl EfficiencyBand {
    pub fn len(&self) -> usize {
        self.flow_coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flow_coefficients.is_empty()
    }

    pub fn optimum(&self) -> (f64, f64) {
        (
            self.flow_coefficients[self.optimum_index],
            self.efficiencies[self.optimum_index],
        )
    }
}

/// One point on a chart line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Suction volume rate (m³/min)
    pub volume_rate: f64,
    pub compression_ratio: f64,
    pub efficiency: f64,
}

/// Map at one constant speed, sampled at the efficiency-band knots.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeedLine {
    pub speed_fraction: f64,
    /// rpm
    pub speed: f64,
    pub points: Vec<ChartPoint>,
}

/// Points of equal efficiency across speed lines.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IsoEfficiencyLine {
    pub efficiency: f64,
    pub points: Vec<ChartPoint>,
}

impl StageMap {
    /// Resample the efficiency fit into `2·per_side + 3` knots.
    ///
    /// The knots are: the low edge of the domain, `per_side` points at
    /// efficiencies evenly spaced up to the optimum, the optimum, `per_side`
    /// points evenly spaced down to the high edge, and the high edge. Inner
    /// points on a side where the optimum sits at the domain edge are skipped.
    pub fn resample_by_efficiency_band(&self, per_side: usize) -> EfficiencyBand {
        let (lo, hi) = self.domain();
        let (phi_opt, eta_max) = maximize(
            |phi| self.efficiency_at(phi),
            [lo, hi],
            &GoldenConfig::default(),
        );
        let edge = 1e-9 * (hi - lo);

        let mut knots = vec![lo];
        if phi_opt - lo > edge {
            knots.extend(self.branch_knots(lo, phi_opt, per_side));
            knots.push(phi_opt);
        }
        if hi - phi_opt > edge {
            knots.extend(self.branch_knots(phi_opt, hi, per_side));
        }
        knots.push(hi);
        knots.sort_by(f64::total_cmp);
        let same = Tolerances { abs: edge, rel: 0.0 };
        knots.dedup_by(|a, b| nearly_equal(*a, *b, same));

        let optimum_index = knots
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - phi_opt).abs().total_cmp(&(b.1 - phi_opt).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let mut efficiencies = self.efficiency_at_batch(&knots);
        efficiencies[optimum_index] = efficiencies[optimum_index].max(eta_max);

        EfficiencyBand {
            head_coefficients: self.head_at_batch(&knots),
            efficiencies,
            flow_coefficients: knots,
            optimum_index,
        }
    }

    /// Inner knots of the branch `[a, b]`, at efficiency levels evenly spaced
    /// between the branch ends.
    fn branch_knots(&self, a: f64, b: f64, per_side: usize) -> Vec<f64> {
        let phis = linspace(a, b, BRANCH_SAMPLES);
        let mut table: Vec<(f64, f64)> = phis
            .iter()
            .map(|&phi| (self.efficiency_at(phi), phi))
            .collect();
        table.sort_by(|x, y| x.0.total_cmp(&y.0));
        let (etas, phis): (Vec<f64>, Vec<f64>) = table.into_iter().unzip();

        let levels = linspace(self.efficiency_at(a), self.efficiency_at(b), per_side + 2);
        levels[1..=per_side]
            .iter()
            .filter_map(|&eta| interp_linear(&etas, &phis, eta))
            .filter(|phi| *phi > a && *phi < b)
            .collect()
    }

    /// Speed lines at `fractions` of nominal speed, each sampled at the
    /// default efficiency-band knots and the mode's suction state.
    pub fn speed_lines(&self, mode: &Mode, fractions: &[f64]) -> Vec<SpeedLine> {
        let band = self.resample_by_efficiency_band(DEFAULT_PER_SIDE);
        let d = self.params().diameter;
        fractions
            .iter()
            .map(|&fraction| {
                let speed = fraction * self.params().nominal_speed;
                let u = circumferential_speed(d, speed);
                let points = band
                    .flow_coefficients
                    .iter()
                    .zip(&band.head_coefficients)
                    .zip(&band.efficiencies)
                    .map(|((&phi, &psi), &eff)| ChartPoint {
                        volume_rate: volume_rate_from_flow_coefficient(d, speed, phi),
                        compression_ratio: compression_ratio(
                            mode.suction_pressure(),
                            enthalpy_rise(psi, u),
                            mode.gas_constant(),
                            mode.suction_temperature(),
                            mode.k(),
                            eff,
                        ),
                        efficiency: eff,
                    })
                    .collect();
                SpeedLine {
                    speed_fraction: fraction,
                    speed,
                    points,
                }
            })
            .collect()
    }
}

/// Regroup speed lines by knot: one line per efficiency level.
pub fn iso_efficiency_lines(lines: &[SpeedLine]) -> Vec<IsoEfficiencyLine> {
    let knots = lines.iter().map(|l| l.points.len()).min().unwrap_or(0);
    (0..knots)
        .map(|k| IsoEfficiencyLine {
            efficiency: lines[0].points[k].efficiency,
            points: lines.iter().map(|l| l.points[k]).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{DimensionlessPoint, StageParams, stage_map_from_points};
    use approx::assert_relative_eq;
    use cf_thermo::ReferenceConditions;

    fn map_with_peak(peak: f64) -> StageMap {
        let params = StageParams {
            name: "band".into(),
            gas_constant: 500.0,
            suction_temperature: 288.0,
            k: 1.31,
            diameter: 0.6,
            nominal_speed: 6000.0,
            nominal_power: 16000.0,
            nominal_ratio: 1.3,
            nominal_discharge_pressure: 4.5,
            reference: ReferenceConditions::default(),
        };
        let points = (0..9)
            .map(|i| {
                let phi = 0.04 + 0.005 * i as f64;
                DimensionlessPoint {
                    flow_coefficient: phi,
                    head_coefficient: 0.9 - 30.0 * (phi - 0.06).powi(2),
                    efficiency: 0.82 - 60.0 * (phi - peak).powi(2),
                }
            })
            .collect();
        stage_map_from_points(params, points, 4).unwrap()
    }

    #[test]
    fn nine_sorted_knots_around_optimum() {
        let m = map_with_peak(0.06);
        let band = m.resample_by_efficiency_band(DEFAULT_PER_SIDE);
        assert_eq!(band.len(), 9);
        assert_eq!(band.optimum_index, 4);
        let (phi_opt, eta_opt) = band.optimum();
        assert_relative_eq!(phi_opt, 0.06, epsilon = 1e-6);
        assert_relative_eq!(eta_opt, 0.82, epsilon = 1e-9);
        assert!(band.flow_coefficients.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(band.flow_coefficients[0], 0.04);
        assert_eq!(band.flow_coefficients[8], m.domain().1);
        assert!(band.efficiencies.iter().all(|&e| e <= eta_opt + 1e-12));
    }

    #[test]
    fn inner_knots_sit_at_even_efficiency_levels() {
        let m = map_with_peak(0.06);
        let band = m.resample_by_efficiency_band(3);
        let eta_lo = m.efficiency_at(0.04);
        let step = (0.82 - eta_lo) / 4.0;
        for (i, eta) in band.efficiencies[1..4].iter().enumerate() {
            assert_relative_eq!(*eta, eta_lo + step * (i + 1) as f64, epsilon = 2e-4);
        }
    }

    #[test]
    fn optimum_at_edge_skips_that_side() {
        let m = map_with_peak(0.09);
        let band = m.resample_by_efficiency_band(3);
        assert_eq!(band.optimum_index, band.len() - 1);
        assert_eq!(band.len(), 5);
    }

    #[test]
    fn speed_lines_scale_volume_with_speed() {
        let m = map_with_peak(0.06);
        let mode = Mode::new(8.5, 3.0, 3.8);
        let lines = m.speed_lines(&mode, &DEFAULT_SPEED_FRACTIONS);
        assert_eq!(lines.len(), 8);
        let nominal = &lines[1];
        let fast = &lines[0];
        assert_relative_eq!(nominal.speed, 6000.0);
        for (a, b) in fast.points.iter().zip(&nominal.points) {
            assert_relative_eq!(a.volume_rate / b.volume_rate, 1.05, epsilon = 1e-12);
            assert!(a.compression_ratio > b.compression_ratio);
        }
        let iso = iso_efficiency_lines(&lines);
        assert_eq!(iso.len(), 9);
        assert_eq!(iso[4].points.len(), 8);
    }
}
