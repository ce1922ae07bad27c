//! Least-squares polynomial fits over a normalized abscissa.
//!
//! Sampled flow coefficients sit in a narrow band (typically 0.02..0.1), so a
//! raw Vandermonde matrix in φ is badly conditioned at degree 4 and above. The
//! fit maps the sampled range onto t ∈ [-1, 1] first and stores coefficients in
//! t; evaluation applies the same map.

use crate::error::{ComponentError, ComponentResult};
use cf_core::Scalar;
use nalgebra::{DMatrix, DVector};

/// Polynomial `p(t) = c₀ + c₁·t + … + c_d·t^d` with `t = (x - centre) / half_width`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    centre: f64,
    half_width: f64,
}

impl Polynomial {
    /// Fit a degree-`degree` polynomial through `(xs, ys)` in the least-squares sense.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::InvalidArg`] if `xs` and `ys` differ in length
    /// - [`ComponentError::InsufficientSamples`] if there are fewer than `degree + 1` points
    /// - [`ComponentError::SingularFit`] if the abscissae do not span `degree + 1`
    ///   distinct values, or the solve produces non-finite coefficients
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> ComponentResult<Self> {
        if xs.len() != ys.len() {
            return Err(ComponentError::InvalidArg {
                what: "abscissa and ordinate lengths differ",
            });
        }
        let needed = degree + 1;
        if xs.len() < needed {
            return Err(ComponentError::InsufficientSamples {
                needed,
                got: xs.len(),
            });
        }

        let (lo, hi) = xs
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        let half_width = 0.5 * (hi - lo);
        if !(half_width.is_finite() && half_width > 0.0) {
            return Err(ComponentError::SingularFit {
                what: "abscissae span a zero-width range",
            });
        }
        let centre = 0.5 * (hi + lo);

        let n = xs.len();
        let a = DMatrix::from_fn(n, needed, |i, j| {
            ((xs[i] - centre) / half_width).powi(j as i32)
        });
        let b = DVector::from_column_slice(ys);

        let svd = a.svd(true, true);
        let tol = svd.singular_values.max() * (n as f64) * f64::EPSILON;
        if svd.rank(tol) < needed {
            return Err(ComponentError::SingularFit {
                what: "design matrix is rank deficient",
            });
        }
        let solution = svd.solve(&b, tol).map_err(|_| ComponentError::SingularFit {
            what: "least-squares solve failed",
        })?;

        let coefficients: Vec<f64> = solution.iter().copied().collect();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ComponentError::SingularFit {
                what: "non-finite coefficient",
            });
        }

        Ok(Self {
            coefficients,
            centre,
            half_width,
        })
    }

    /// Polynomial degree.
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Coefficients in the normalized abscissa, lowest power first.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Evaluate at `x` (Horner scheme).
    pub fn eval<D: Scalar>(&self, x: D) -> D {
        let t = (x - self.centre) / self.half_width;
        let mut terms = self.coefficients.iter().rev();
        let mut acc = D::from(terms.next().copied().unwrap_or(0.0));
        for &c in terms {
            acc = acc * t + c;
        }
        acc
    }

    /// Evaluate at every element of `xs`.
    pub fn eval_batch(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}
