//! Tridiagonal operators.

use ol_core::{errors::Result, fail, Real};

/// A tridiagonal matrix.
///
/// Stores the lower, diagonal and upper bands; `lower[0]` and
/// `upper[n − 1]` are unused.
#[derive(Debug, Clone, PartialEq)]
pub struct TridiagonalOperator {
    /// Lower diagonal (index 0 unused).
    pub lower: Vec<Real>,
    /// Main diagonal.
    pub diag: Vec<Real>,
    /// Upper diagonal (last index unused).
    pub upper: Vec<Real>,
}

impl TridiagonalOperator {
    /// Zero operator of size `n`.
    pub fn new(n: usize) -> Self {
        Self {
            lower: vec![0.0; n],
            diag: vec![0.0; n],
            upper: vec![0.0; n],
        }
    }

    /// Operator with constant bands on the interior rows and identity rows
    /// at both ends, the shape of a Dirichlet problem.
    pub fn interior(n: usize, lower: Real, diag: Real, upper: Real) -> Self {
        let mut op = Self::new(n);
        for i in 1..n.saturating_sub(1) {
            op.lower[i] = lower;
            op.diag[i] = diag;
            op.upper[i] = upper;
        }
        op.diag[0] = 1.0;
        if n > 1 {
            op.diag[n - 1] = 1.0;
        }
        op
    }

    /// Size (number of rows/columns).
    pub fn size(&self) -> usize {
        self.diag.len()
    }

    /// `y = A · x`.
    pub fn apply(&self, x: &[Real]) -> Vec<Real> {
        let n = self.size();
        debug_assert_eq!(x.len(), n);
        if n == 1 {
            return vec![self.diag[0] * x[0]];
        }
        let mut y = vec![0.0; n];
        y[0] = self.diag[0] * x[0] + self.upper[0] * x[1];
        for i in 1..n - 1 {
            y[i] = self.lower[i] * x[i - 1] + self.diag[i] * x[i] + self.upper[i] * x[i + 1];
        }
        y[n - 1] = self.lower[n - 1] * x[n - 2] + self.diag[n - 1] * x[n - 1];
        y
    }

    /// Solve `A · x = rhs` with the Thomas algorithm.
    ///
    /// Fails with `NumericalDegeneracy` on a zero pivot; diagonally dominant
    /// systems never hit one.
    pub fn solve(&self, rhs: &[Real]) -> Result<Vec<Real>> {
        let n = self.size();
        if rhs.len() != n {
            return Err(ol_core::Error::InvalidParameter(format!(
                "right-hand side has {} rows, operator has {n}",
                rhs.len()
            )));
        }
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut c_prime = vec![0.0; n];
        let mut d_prime = vec![0.0; n];

        let mut pivot = self.diag[0];
        for i in 0..n {
            if i > 0 {
                pivot = self.diag[i] - self.lower[i] * c_prime[i - 1];
            }
            if pivot.abs() < Real::MIN_POSITIVE || !pivot.is_finite() {
                fail!("zero pivot in tridiagonal solve at row {i}");
            }
            if i < n - 1 {
                c_prime[i] = self.upper[i] / pivot;
            }
            let carried = if i > 0 {
                self.lower[i] * d_prime[i - 1]
            } else {
                0.0
            };
            d_prime[i] = (rhs[i] - carried) / pivot;
        }

        let mut x = d_prime;
        for i in (0..n - 1).rev() {
            x[i] -= c_prime[i] * x[i + 1];
        }
        Ok(x)
    }
}
