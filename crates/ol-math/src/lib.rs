//! # ol-math
//!
//! Numerical building blocks shared by the pricing methods: normal and
//! bivariate normal distributions, Mersenne-Twister random numbers with
//! deterministic sub-streams, mergeable sample statistics, a Brent root
//! finder, and small linear-algebra helpers over nalgebra.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Probability distributions.
pub mod distributions;

/// Cholesky factorisation and least-squares regression.
pub mod matrix_utilities;

/// Random number generators.
pub mod random_numbers;

/// 1D root-finding solvers.
pub mod solvers1d;

/// Statistics accumulators.
pub mod statistics;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use distributions::{bivariate_normal_cdf, normal_cdf, normal_cdf_inverse, normal_pdf};
pub use random_numbers::{substream_seed, NormalMethod, NormalRng};
pub use statistics::{ControlVariateStatistics, Statistics};
