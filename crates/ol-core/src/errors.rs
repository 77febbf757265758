//! Error types for optlab.
//!
//! Every fallible operation in the workspace returns [`Result`]. Validation
//! failures surface as [`Error::InvalidParameter`] through the [`ensure!`]
//! macro; numerical dead ends surface as [`Error::NumericalDegeneracy`]
//! through [`fail!`].
//!
//! [`ensure!`]: crate::ensure
//! [`fail!`]: crate::fail

use thiserror::Error;

use crate::Real;

/// The error type used throughout optlab.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// An out-of-domain market or contract field (e.g. non-positive volatility).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The payoff kind / method pair is absent from the capability registry.
    #[error("{kind} options cannot be priced with the {method} method")]
    UnsupportedCombination {
        /// Name of the option kind.
        kind: String,
        /// Name of the numerical method.
        method: String,
    },

    /// A lattice branch probability fell outside (0, 1).
    #[error("degenerate tree: {0}")]
    DegenerateTree(String),

    /// The explicit finite-difference step violates the stability bound and
    /// auto-adjustment is disabled.
    #[error("explicit scheme unstable: dt = {dt:.3e} exceeds the stability bound {max_dt:.3e}")]
    StabilityViolation {
        /// Requested time step.
        dt: Real,
        /// Largest stable time step for the grid.
        max_dt: Real,
    },

    /// Monte Carlo stopped before meeting the requested standard error.
    #[error("target standard error {target:.3e} not reached after {paths} paths (std error {std_error:.3e})")]
    ConvergenceNotReached {
        /// Number of paths simulated.
        paths: usize,
        /// Standard error achieved.
        std_error: Real,
        /// Requested standard error.
        target: Real,
    },

    /// A formula has no safe limiting form for the given inputs.
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
}

/// Shorthand `Result` type used throughout optlab.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::InvalidParameter(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use ol_core::{ensure, errors::Error};
/// fn positive(x: f64) -> ol_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(matches!(positive(-1.0), Err(Error::InvalidParameter(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::InvalidParameter(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::NumericalDegeneracy(...))` immediately.
///
/// # Example
/// ```
/// use ol_core::{fail, errors::Error};
/// fn always_err() -> ol_core::errors::Result<()> {
///     fail!("variance collapsed to {}", 0.0);
/// }
/// assert!(matches!(always_err(), Err(Error::NumericalDegeneracy(_))));
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::NumericalDegeneracy(format!($($msg)*)))
    };
}
