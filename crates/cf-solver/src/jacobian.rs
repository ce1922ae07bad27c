//! Jacobian computation: forward-mode automatic differentiation, with finite
//! differences as a fallback.

use crate::error::SolverResult;
use cf_core::Dual64;
use nalgebra::{DMatrix, DVector};

/// Residual vector and Jacobian by forward-mode automatic differentiation.
///
/// Column j comes from one pass of `f` with `x[j]` seeded by a unit derivative.
pub fn dual_jacobian<F>(x: &DVector<f64>, f: F) -> SolverResult<(DVector<f64>, DMatrix<f64>)>
where
    F: Fn(&[Dual64]) -> SolverResult<Vec<Dual64>>,
{
    let n = x.len();
    let mut values = DVector::zeros(0);
    let mut jac = DMatrix::zeros(0, n);

    for j in 0..n {
        let seeded: Vec<Dual64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| Dual64::new(v, if i == j { 1.0 } else { 0.0 }))
            .collect();
        let r = f(&seeded)?;
        if j == 0 {
            values = DVector::from_iterator(r.len(), r.iter().map(|d| d.re));
            jac = DMatrix::zeros(r.len(), n);
        }
        for (i, d) in r.iter().enumerate().take(jac.nrows()) {
            jac[(i, j)] = d.eps;
        }
    }

    Ok((values, jac))
}

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let mut x_perturbed = x.clone();
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] += dx;

        let f_perturbed = f(&x_perturbed)?;
        let df = (f_perturbed - &f_x) / dx;
        jac.set_column(j, &df);
    }

    Ok(jac)
}

/// Compute Jacobian using central finite differences (more accurate but 2x cost).
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let m = f(x)?.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let f_minus = f(&x_minus)?;

        jac.set_column(j, &((f_plus - f_minus) / (2.0 * dx)));
    }

    Ok(jac)
}
