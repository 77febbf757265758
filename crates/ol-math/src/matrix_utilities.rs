//! Matrix decompositions over nalgebra.

use nalgebra::{DMatrix, DVector};
use ol_core::{
    errors::{Error, Result},
    Real,
};

/// Cholesky factor of a correlation (or covariance) matrix given as rows.
///
/// Returns the lower-triangular `L` with `A = L Lᵀ`. The input must be
/// square, symmetric and positive definite.
pub fn cholesky(rows: &[Vec<Real>]) -> Result<DMatrix<Real>> {
    let n = rows.len();
    if n == 0 {
        return Err(Error::InvalidParameter("cholesky: empty matrix".into()));
    }
    if rows.iter().any(|row| row.len() != n) {
        return Err(Error::InvalidParameter("cholesky: matrix must be square".into()));
    }
    let m = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
    for i in 0..n {
        for j in 0..i {
            if (m[(i, j)] - m[(j, i)]).abs() > 1e-12 {
                return Err(Error::InvalidParameter(format!(
                    "cholesky: matrix is not symmetric at ({i}, {j})"
                )));
            }
        }
    }
    match m.cholesky() {
        Some(chol) => Ok(chol.l()),
        None => Err(Error::InvalidParameter(
            "cholesky: matrix is not positive definite".into(),
        )),
    }
}

/// Ordinary least-squares coefficients `β` minimising `‖Xβ − y‖²`.
///
/// Solved through the SVD so that rank-deficient designs (all regressors
/// equal on a thin sample) still return the minimum-norm solution.
pub fn least_squares(x: &DMatrix<Real>, y: &DVector<Real>) -> Result<DVector<Real>> {
    if x.nrows() != y.len() {
        return Err(Error::InvalidParameter(format!(
            "least_squares: {} rows against {} observations",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(Error::InvalidParameter("least_squares: no observations".into()));
    }
    x.clone()
        .svd(true, true)
        .solve(y, 1e-12)
        .map_err(|e| Error::NumericalDegeneracy(format!("least_squares: {e}")))
}
