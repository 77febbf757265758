//! # ol-pricingengines
//!
//! Maps option contracts onto the numerical cores of `ol-methods` and the
//! closed-form formulas in [`analytic`].
//!
//! ## Engines
//!
//! - [`AnalyticEngine`]: closed forms and standard approximations
//! - [`LatticeEngine`]: binomial and trinomial trees, with state-augmented
//!   nodes for path-dependent payoffs
//! - [`FiniteDifferenceEngine`]: θ-scheme grids in log-spot
//! - [`MonteCarloEngine`]: path simulation with Longstaff–Schwartz regression
//!
//! [`price`] checks the capability [`registry`] before any work is done.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Closed-form formulas and the analytic engine.
pub mod analytic;

/// Per-method engine settings.
pub mod config;

/// The engine trait and the pricing entry point.
pub mod engine;

/// Finite-difference engine.
pub mod fd_engine;

/// Lattice engine.
pub mod lattice_engine;

/// Monte Carlo engine.
pub mod mc_engine;

/// Reductions of multi-factor payoffs to a single adjusted process.
pub mod reduction;

/// Which method prices which option kind.
pub mod registry;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use analytic::AnalyticEngine;
pub use config::{EngineConfig, FdConfig, LatticeConfig, MonteCarloConfig};
pub use engine::{engine_for, price, PricingEngine};
pub use fd_engine::FiniteDifferenceEngine;
pub use lattice_engine::LatticeEngine;
pub use mc_engine::MonteCarloEngine;
pub use registry::{ensure_supported, is_supported, methods_for};
