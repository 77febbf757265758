//! # ol-methods
//!
//! Payoff-agnostic numerical method cores: recombining trees with generic
//! backward induction, finite-difference grids with θ-scheme time stepping,
//! and Monte Carlo path simulation with variance reduction and
//! Longstaff–Schwartz regression. The pricing engines in
//! `ol-pricingengines` map contracts onto these cores.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use ol_core::InterruptReason;

// ── Modules ───────────────────────────────────────────────────────────────────

/// Early-exercise schedules shared by lattices and grids.
pub mod exercise;

/// Finite-difference grids and θ-scheme solvers.
pub mod finite_differences;

/// Binomial and trinomial trees with backward induction.
pub mod lattice;

/// Monte Carlo path generation and estimation.
pub mod monte_carlo;

/// Constant-coefficient Black–Scholes dynamics.
pub mod process;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use exercise::{EarlyExercise, ExercisePolicy};
pub use process::BlackScholesProcess;

/// Outcome of a computation that polls an [`ol_core::Interrupt`].
#[derive(Debug, Clone, PartialEq)]
pub enum Interruptible<T> {
    /// The computation ran to completion.
    Finished(T),
    /// The computation stopped early for the given reason.
    Stopped(InterruptReason),
}

impl<T> Interruptible<T> {
    /// Apply `f` to a finished value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Interruptible<U> {
        match self {
            Interruptible::Finished(v) => Interruptible::Finished(f(v)),
            Interruptible::Stopped(reason) => Interruptible::Stopped(reason),
        }
    }

    /// The finished value, if any.
    pub fn finished(self) -> Option<T> {
        match self {
            Interruptible::Finished(v) => Some(v),
            Interruptible::Stopped(_) => None,
        }
    }
}

/// Return early with `Interruptible::Stopped` when the interrupt has fired.
#[macro_export]
macro_rules! poll {
    ($interrupt:expr) => {
        if let Some(reason) = $interrupt.check() {
            return $crate::Interruptible::Stopped(reason);
        }
    };
}

/// Unwrap an `Interruptible`, propagating `Stopped` to the caller.
#[macro_export]
macro_rules! finish {
    ($e:expr) => {
        match $e {
            $crate::Interruptible::Finished(v) => v,
            $crate::Interruptible::Stopped(reason) => {
                return $crate::Interruptible::Stopped(reason)
            }
        }
    };
}
