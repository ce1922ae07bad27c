//! Scalar abstraction for formulas evaluated on plain values and on dual numbers.
//!
//! Every formula on the solver path is written once, generic over [`Scalar`].
//! Plain `f64` gives values; `num_dual::Dual64` carries a directional derivative
//! alongside, which is how the operating-point solver builds exact Jacobians.
//!
//! Comparisons always go through [`DualNum::re`], since dual numbers carry no
//! total order.

use num_dual::DualNum;

pub use num_dual::{Dual64, DualNum as DualNumber};

/// Number type accepted by the generic formulas.
pub trait Scalar: DualNum<f64> + Copy + Send + Sync + 'static {}

impl<T: DualNum<f64> + Copy + Send + Sync + 'static> Scalar for T {}

/// Replace `x` by `lo` when its real part falls below `lo`.
///
/// The replacement is a constant, so the derivative is zero on the clamped side.
#[inline]
pub fn floor_at<D: Scalar>(x: D, lo: f64) -> D {
    if x.re() < lo { D::from(lo) } else { x }
}

/// Seed a dual number with unit derivative.
#[inline]
pub fn seeded(x: f64) -> Dual64 {
    Dual64::new(x, 1.0)
}

/// Derivative part of a dual number.
#[inline]
pub fn derivative(x: Dual64) -> f64 {
    x.eps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_at_keeps_value_above_floor() {
        assert_eq!(floor_at(2.0_f64, 1.0), 2.0);
        assert_eq!(floor_at(0.5_f64, 1.0), 1.0);
    }

    #[test]
    fn floor_at_kills_derivative_when_clamped() {
        let x = seeded(0.5);
        let y = floor_at(x, 1.0);
        assert_eq!(y.re, 1.0);
        assert_eq!(derivative(y), 0.0);

        let z = floor_at(seeded(3.0), 1.0);
        assert_eq!(derivative(z), 1.0);
    }

    #[test]
    fn dual_derivative_of_power() {
        // d/dx x^3 at x = 2 is 12
        let y = seeded(2.0).powi(3);
        assert!((y.re - 8.0).abs() < 1e-12);
        assert!((derivative(y) - 12.0).abs() < 1e-12);
    }
}
