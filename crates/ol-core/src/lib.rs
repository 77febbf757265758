//! # ol-core
//!
//! Core types and error definitions for optlab.
//!
//! This crate provides the building blocks shared by every other crate in the
//! workspace – numeric type aliases, the error enum with its `ensure!` /
//! `fail!` macros, cooperative interruption of long-running computations,
//! and the day-count helper used to turn calendar dates into year fractions.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Error types and the `ensure!` / `fail!` macros.
pub mod errors;

/// Deadlines and cancellation flags checked by long-running engines.
pub mod interrupt;

/// Actual/365 Fixed year fractions between calendar dates.
pub mod time;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the library.
pub type Real = f64;

/// Alias used for array sizes / indices.
pub type Size = usize;

/// A rate expressed as a decimal (e.g. 0.05 = 5 %).
pub type Rate = Real;

/// A discount factor in [0, 1].
pub type DiscountFactor = Real;

/// A price or value.
pub type Price = Real;

/// A volatility level expressed as a decimal.
pub type Volatility = Real;

/// A time measurement in years.
pub type Time = Real;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use errors::{Error, Result};
pub use interrupt::{Interrupt, InterruptReason};
pub use time::year_fraction;
