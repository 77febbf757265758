//! # ol-instruments
//!
//! The shared data model of optlab: the market snapshot every engine reads,
//! the option contract with its tagged payoff and exercise style, the
//! option-kind and method enums that key the capability registry, and the
//! pricing result every engine returns.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Exercise styles.
pub mod exercise;

/// Option kinds and numerical methods.
pub mod kind;

/// Market parameters and additional underlying assets.
pub mod market;

/// The option contract.
pub mod option;

/// Payoff families.
pub mod payoff;

/// Pricing results, Greeks and diagnostics.
pub mod results;

pub use exercise::ExerciseStyle;
pub use kind::{Method, OptionKind};
pub use market::{MarketParameters, UnderlyingAsset};
pub use option::OptionContract;
pub use payoff::{
    Averaging, BarrierType, BinaryKind, LookbackKind, OptionType, Payoff, RainbowKind,
};
pub use results::{Diagnostics, Greeks, PartialReason, PricingResult, ResultStatus};
