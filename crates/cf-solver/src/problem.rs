//! Operating-point search as a residual system.
//!
//! Decision vector (scaled): `[p_suction / target, n_1 / nominal_1, …, n_N / nominal_N]`.
//!
//! Residual vector, every entry in units of its bound scale:
//! - target: `(p_out − target) / scale`
//! - per stage and [`BoundedQuantity`]: hinge violation of the stage bounds
//! - final: the last discharge pressure inside `[target, ceiling]`
//!
//! A feasible operating point is exactly a zero of this vector.

use crate::error::{SolverError, SolverResult};
use cf_components::{BoundSpec, BoundTable, BoundedQuantity, Mode, StageChain};
use cf_core::{Scalar, ensure_finite};
use cf_thermo::{MIN_PRESSURE, MIN_SPEED};
use nalgebra::DVector;

/// Residual system for one mode.
#[derive(Clone, Debug)]
pub struct OperatingPointProblem<'a> {
    chain: &'a StageChain,
    mode: &'a Mode,
    bounds: &'a BoundTable,
    target: f64,
    nominal_speeds: Vec<f64>,
    final_bound: BoundSpec,
}

impl<'a> OperatingPointProblem<'a> {
    pub fn new(chain: &'a StageChain, mode: &'a Mode, bounds: &'a BoundTable) -> SolverResult<Self> {
        if bounds.len() != chain.len() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "bound table has {} stages, chain has {}",
                    bounds.len(),
                    chain.len()
                ),
            });
        }
        let target = ensure_finite(mode.target_discharge_pressure(), "target discharge pressure")?;
        if target <= MIN_PRESSURE {
            return Err(SolverError::ProblemSetup {
                what: format!("target discharge pressure {target} is not positive"),
            });
        }
        let last = bounds
            .stages()
            .last()
            .ok_or_else(|| SolverError::ProblemSetup {
                what: "empty bound table".to_string(),
            })?;
        let final_bound = BoundSpec::new(
            last.discharge_pressure.max,
            target,
            last.discharge_pressure.scale,
        );
        Ok(Self {
            chain,
            mode,
            bounds,
            target,
            nominal_speeds: chain
                .stages()
                .iter()
                .map(|s| s.map.params().nominal_speed)
                .collect(),
            final_bound,
        })
    }

    pub fn dimension(&self) -> usize {
        1 + self.chain.len()
    }

    pub fn residual_len(&self) -> usize {
        1 + BoundedQuantity::ALL.len() * self.chain.len() + 1
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Final-stage discharge window `[target, ceiling]`.
    pub fn final_bound(&self) -> &BoundSpec {
        &self.final_bound
    }

    /// Scaled vector for a suction pressure (MPa) and speeds (rpm).
    pub fn scale(&self, suction_pressure: f64, speeds: &[f64]) -> DVector<f64> {
        let mut x = DVector::zeros(self.dimension());
        x[0] = suction_pressure / self.target;
        for (i, (n, nominal)) in speeds.iter().zip(&self.nominal_speeds).enumerate() {
            x[i + 1] = n / nominal;
        }
        x
    }

    /// Suction pressure (MPa) and speeds (rpm) of a scaled vector.
    pub fn unscale<D: Scalar>(&self, x: &[D]) -> (D, Vec<D>) {
        let p = x[0] * self.target;
        let speeds = x[1..]
            .iter()
            .zip(&self.nominal_speeds)
            .map(|(&s, &nominal)| s * nominal)
            .collect();
        (p, speeds)
    }

    /// Box for the scaled vector: suction pressure in `[MIN_PRESSURE, target]`,
    /// speeds above `MIN_SPEED`.
    pub fn box_bounds(&self) -> crate::lm::BoxBounds {
        let n = self.dimension();
        let mut lower = DVector::zeros(n);
        let mut upper = DVector::from_element(n, f64::INFINITY);
        lower[0] = MIN_PRESSURE / self.target;
        upper[0] = 1.0;
        for (i, nominal) in self.nominal_speeds.iter().enumerate() {
            lower[i + 1] = MIN_SPEED / nominal;
        }
        crate::lm::BoxBounds { lower, upper }
    }

    /// Residual vector at scaled `x`.
    pub fn residuals<D: Scalar>(&self, x: &[D]) -> SolverResult<Vec<D>> {
        let (p, speeds) = self.unscale(x);
        let stages = self.chain.propagate(self.mode, p, &speeds)?;
        let p_out = stages
            .last()
            .map(|s| s.state.discharge_pressure)
            .ok_or_else(|| SolverError::ProblemSetup {
                what: "empty chain".to_string(),
            })?;

        let mut r = Vec::with_capacity(self.residual_len());
        r.push((p_out - self.target) * (1.0 / self.final_bound.scale));
        for (stage, bounds) in stages.iter().zip(self.bounds.stages()) {
            r.extend(bounds.violations(&stage.state));
        }
        r.push(self.final_bound.violation(p_out));
        Ok(r)
    }

    pub fn residual_vector(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let r = self.residuals(x.as_slice())?;
        Ok(DVector::from_vec(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jacobian::{central_difference_jacobian, dual_jacobian};
    use approx::assert_relative_eq;
    use cf_components::{
        ChainConfig, DimensionlessPoint, StageBounds, StageParams, stage_map_from_points,
    };
    use cf_thermo::ReferenceConditions;
    use std::sync::Arc;

    fn chain() -> StageChain {
        let params = StageParams {
            name: "p".into(),
            gas_constant: 500.0,
            suction_temperature: 288.0,
            k: 1.31,
            diameter: 0.6,
            nominal_speed: 6000.0,
            nominal_power: 16000.0,
            nominal_ratio: 1.3,
            nominal_discharge_pressure: 7.5,
            reference: ReferenceConditions::default(),
        };
        let points: Vec<DimensionlessPoint> = (0..9)
            .map(|i| {
                let phi = 0.04 + 0.005 * i as f64;
                DimensionlessPoint {
                    flow_coefficient: phi,
                    head_coefficient: 0.9 - 30.0 * (phi - 0.06).powi(2),
                    efficiency: 0.82 - 60.0 * (phi - 0.06).powi(2),
                }
            })
            .collect();
        let map = Arc::new(stage_map_from_points(params, points, 4).unwrap());
        StageChain::new([(map.clone(), 1), (map, 1)], ChainConfig::default()).unwrap()
    }

    #[test]
    fn layout_and_scaling() {
        let chain = chain();
        let mode = Mode::new(8.5, 3.0, 4.5);
        let bounds = BoundTable::uniform(2, StageBounds::default()).unwrap();
        let problem = OperatingPointProblem::new(&chain, &mode, &bounds).unwrap();
        assert_eq!(problem.dimension(), 3);
        assert_eq!(problem.residual_len(), 12);

        let x = problem.scale(3.0, &[6000.0, 6600.0]);
        assert_relative_eq!(x[0], 3.0 / 4.5);
        assert_relative_eq!(x[2], 1.1);
        let (p, speeds) = problem.unscale(x.as_slice());
        assert_relative_eq!(p, 3.0, epsilon = 1e-12);
        assert_relative_eq!(speeds[1], 6600.0, epsilon = 1e-9);
        assert_eq!(problem.residual_vector(&x).unwrap().len(), 12);
    }

    #[test]
    fn mismatched_bound_table() {
        let chain = chain();
        let mode = Mode::new(8.5, 3.0, 4.5);
        let bounds = BoundTable::uniform(1, StageBounds::default()).unwrap();
        assert!(matches!(
            OperatingPointProblem::new(&chain, &mode, &bounds),
            Err(SolverError::ProblemSetup { .. })
        ));
    }

    #[test]
    fn non_finite_target_is_numeric_error() {
        let chain = chain();
        let mode = Mode::new(8.5, 3.0, f64::NAN);
        let bounds = BoundTable::uniform(2, StageBounds::default()).unwrap();
        assert!(matches!(
            OperatingPointProblem::new(&chain, &mode, &bounds),
            Err(SolverError::Core(cf_core::CoreError::NonFinite { .. }))
        ));
    }

    #[test]
    fn dual_jacobian_matches_finite_differences_on_two_stages() {
        let chain = chain();
        let mode = Mode::new(8.5, 3.0, 5.0);
        let mut b = StageBounds::default();
        // Keep every hinge strictly on one side near the evaluation point.
        b.power.min = 0.0;
        b.speed_ratio.max = 1.0;
        let bounds = BoundTable::uniform(2, b).unwrap();
        let problem = OperatingPointProblem::new(&chain, &mode, &bounds).unwrap();

        let x = problem.scale(3.0, &[6000.0 * 1.03, 6000.0 * 0.97]);
        let (values, ad) = dual_jacobian(&x, |x| problem.residuals(x)).unwrap();
        let fd =
            central_difference_jacobian(&x, |x| problem.residual_vector(x), 1e-6).unwrap();

        let plain = problem.residual_vector(&x).unwrap();
        for (v, p) in values.iter().zip(plain.iter()) {
            assert_relative_eq!(*v, *p, epsilon = 1e-12, max_relative = 1e-12);
        }
        for (a, f) in ad.iter().zip(fd.iter()) {
            assert_relative_eq!(*a, *f, epsilon = 1e-5, max_relative = 1e-5);
        }
        // first stage above its speed-ratio ceiling: slope is 1/scale
        assert_relative_eq!(ad[(1 + 3, 1)], 100.0, max_relative = 1e-12);
    }
}
