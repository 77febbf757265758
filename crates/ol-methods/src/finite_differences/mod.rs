//! Finite-difference methods for the Black–Scholes PDE.
//!
//! # Overview
//!
//! * [`TridiagonalOperator`]: tridiagonal matrix with a Thomas-algorithm solver
//! * [`LogGrid`]: uniform log-spot grid with the spot (or a barrier) on a node
//! * [`ThetaSolver`]: θ-scheme time stepping with Rannacher start-up,
//!   Dirichlet boundaries and an optional early-exercise projection
//! * [`FdScheme`]: explicit, implicit or Crank–Nicolson

pub mod mesher;
pub mod solver;
pub mod tridiagonal;

pub use mesher::LogGrid;
pub use solver::{forward_intrinsic, Boundaries, FdGreeks, ThetaSolver};
pub use tridiagonal::TridiagonalOperator;

use ol_core::Real;

/// Finite-difference time-stepping scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FdScheme {
    /// Explicit: `V^n = (I + Δt L) V^{n+1}`. Conditionally stable.
    Explicit,
    /// Fully implicit: `(I − Δt L) V^n = V^{n+1}`.
    Implicit,
    /// Crank–Nicolson: the θ = ½ average of the two. Second order in time.
    #[default]
    CrankNicolson,
}

impl FdScheme {
    /// Implicitness weight θ.
    pub fn theta(self) -> Real {
        match self {
            FdScheme::Explicit => 0.0,
            FdScheme::Implicit => 1.0,
            FdScheme::CrankNicolson => 0.5,
        }
    }

    /// Scheme name, reported in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            FdScheme::Explicit => "Explicit",
            FdScheme::Implicit => "Implicit",
            FdScheme::CrankNicolson => "CrankNicolson",
        }
    }
}

impl std::fmt::Display for FdScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
