//! # optlab
//!
//! Option pricing under constant-parameter Black–Scholes dynamics with four
//! interchangeable methods: closed forms, lattices, finite differences and
//! Monte Carlo.
//!
//! This crate is a **façade** over the workspace crates. Application code
//! should depend on it and import the [`prelude`].
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use optlab::prelude::*;
//!
//! let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
//! let market = MarketParameters::new(100.0, 0.05, 0.0, 0.2, date).unwrap();
//! let call = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
//!
//! let result = price(&call, &market, &EngineConfig::Analytic).unwrap();
//! assert!((result.price - 10.4506).abs() < 1e-4);
//! assert!(is_supported(OptionKind::American, Method::MonteCarlo));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, errors and cooperative interruption.
pub use ol_core as core;

/// Normal distributions, random numbers, statistics and linear algebra.
pub use ol_math as math;

/// Market data, contracts, payoffs and results.
pub use ol_instruments as instruments;

/// Numerical method cores (lattices, FDM, Monte Carlo).
pub use ol_methods as methods;

/// Pricing engines and the capability registry.
pub use ol_pricingengines as pricingengines;

/// The types most callers need.
pub mod prelude {
    pub use ol_core::{Error, Interrupt, InterruptReason, Real, Result, Time};
    pub use ol_instruments::{
        Averaging, BarrierType, BinaryKind, Diagnostics, ExerciseStyle, Greeks, LookbackKind,
        MarketParameters, Method, OptionContract, OptionKind, OptionType, PartialReason, Payoff,
        PricingResult, RainbowKind, ResultStatus, UnderlyingAsset,
    };
    pub use ol_math::NormalMethod;
    pub use ol_methods::{finite_differences::FdScheme, lattice::TreeKind};
    pub use ol_pricingengines::{
        engine_for, is_supported, methods_for, price, EngineConfig, FdConfig, LatticeConfig,
        MonteCarloConfig, PricingEngine,
    };
}
