//! 1D root-finding solvers.

use ol_core::{
    errors::{Error, Result},
    Real,
};

const MAX_ITERATIONS: u32 = 100;
const MAX_BRACKET_EXPANSIONS: u32 = 60;
const DEFAULT_ACCURACY: Real = 1.0e-11;

// ── Brent ─────────────────────────────────────────────────────────────────────

/// Brent's method for finding a root of `f(x)` in `[x_min, x_max]`.
///
/// Combines bisection, secant, and inverse quadratic interpolation.
pub fn brent<F>(f: F, x_min: Real, x_max: Real, accuracy: Real) -> Result<Real>
where
    F: Fn(Real) -> Real,
{
    let acc = if accuracy > 0.0 {
        accuracy
    } else {
        DEFAULT_ACCURACY
    };
    let mut a = x_min;
    let mut b = x_max;
    let mut fa = f(a);
    let mut fb = f(b);

    if !(fa.is_finite() && fb.is_finite()) {
        return Err(Error::NumericalDegeneracy(format!(
            "brent: non-finite objective at the bracket [{a}, {b}]"
        )));
    }
    if fa * fb > 0.0 {
        return Err(Error::InvalidParameter(format!(
            "brent: f({a}) and f({b}) must have opposite signs"
        )));
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..MAX_ITERATIONS {
        if fb * fc > 0.0 {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }
        let tol = 2.0 * Real::EPSILON * b.abs() + 0.5 * acc;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol || fb == 0.0 {
            return Ok(b);
        }
        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (p, q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                let p = s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0));
                (p, (q - 1.0) * (r - 1.0) * (s - 1.0))
            };
            let (p, q) = if p > 0.0 { (p, -q) } else { (-p, q) };
            if 2.0 * p < (3.0 * xm * q - (tol * q).abs()) && 2.0 * p < (e * q).abs() {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }
        a = b;
        fa = fb;
        b += if d.abs() > tol {
            d
        } else if xm > 0.0 {
            tol
        } else {
            -tol
        };
        fb = f(b);
    }
    Err(Error::NumericalDegeneracy(
        "brent: maximum iterations reached".into(),
    ))
}

// ── Bracketing ───────────────────────────────────────────────────────────────

/// Grow `[lo, hi]` geometrically until `f` changes sign across it.
///
/// `lo` is clamped to stay above `floor`, which keeps searches over spot
/// levels strictly positive.
pub fn expand_bracket<F>(f: &F, mut lo: Real, mut hi: Real, floor: Real) -> Result<(Real, Real)>
where
    F: Fn(Real) -> Real,
{
    if !(lo < hi) {
        return Err(Error::InvalidParameter(format!(
            "expand_bracket: empty interval [{lo}, {hi}]"
        )));
    }
    let mut f_lo = f(lo);
    let mut f_hi = f(hi);
    for _ in 0..MAX_BRACKET_EXPANSIONS {
        if f_lo * f_hi <= 0.0 {
            return Ok((lo, hi));
        }
        if f_lo.abs() < f_hi.abs() {
            lo = (lo - 1.6 * (hi - lo)).max(floor + 0.5 * (lo - floor));
            f_lo = f(lo);
        } else {
            hi += 1.6 * (hi - lo);
            f_hi = f(hi);
        }
    }
    Err(Error::NumericalDegeneracy(format!(
        "expand_bracket: no sign change found up to [{lo}, {hi}]"
    )))
}

/// Root of `f` starting from the interval `[lo, hi]`, expanded as needed.
pub fn find_root<F>(f: F, lo: Real, hi: Real, floor: Real, accuracy: Real) -> Result<Real>
where
    F: Fn(Real) -> Real,
{
    let (a, b) = expand_bracket(&f, lo, hi, floor)?;
    brent(f, a, b, accuracy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brent_sqrt2() {
        let root = brent(|x| x * x - 2.0, 0.0, 2.0, 1e-12).unwrap();
        assert!((root - 2.0_f64.sqrt()).abs() < 1e-10, "root = {root}");
    }

    #[test]
    fn brent_cos() {
        let root = brent(|x: Real| x.cos(), 0.0, 2.0, 1e-12).unwrap();
        assert!((root - std::f64::consts::FRAC_PI_2).abs() < 1e-10);
    }

    #[test]
    fn brent_rejects_same_sign_bracket() {
        let err = brent(|x| x * x + 1.0, -1.0, 1.0, 1e-12).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn find_root_expands_to_the_right() {
        let root = find_root(|x: Real| x.ln() - 5.0, 1.0, 2.0, 0.0, 1e-12).unwrap();
        assert!((root - 5.0f64.exp()).abs() < 1e-8, "root = {root}");
    }

    #[test]
    fn find_root_stays_above_floor() {
        let root = find_root(|x: Real| x - 0.01, 50.0, 60.0, 0.0, 1e-12).unwrap();
        assert!((root - 0.01).abs() < 1e-10, "root = {root}");
    }
}
