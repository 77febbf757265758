//! Option kinds and numerical methods: the two keys of the capability
//! registry.

use std::fmt;

/// The option families of the support matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptionKind {
    /// Vanilla, European exercise.
    European,
    /// Vanilla, American exercise.
    American,
    /// Vanilla, Bermudan exercise.
    Bermudan,
    /// Vanilla, American exercise without maturity.
    PerpetualAmerican,
    /// Average-price option.
    Asian,
    /// Single-barrier option.
    Barrier,
    /// Weighted basket option.
    Basket,
    /// Digital option.
    Binary,
    /// Simple chooser.
    Chooser,
    /// Option on an option.
    Compound,
    /// Exchange of one asset for another.
    Exchange,
    /// Forward-start option.
    ForwardStart,
    /// Gap option.
    Gap,
    /// Lookback option.
    Lookback,
    /// Fixed-rate currency-translated option.
    Quanto,
    /// Best-of / worst-of two assets.
    Rainbow,
    /// Shout option.
    Shout,
    /// Two-asset spread option.
    Spread,
    /// Variance swap.
    VarianceSwap,
}

impl OptionKind {
    /// Every kind, in declaration order.
    pub const ALL: [OptionKind; 19] = [
        OptionKind::European,
        OptionKind::American,
        OptionKind::Bermudan,
        OptionKind::PerpetualAmerican,
        OptionKind::Asian,
        OptionKind::Barrier,
        OptionKind::Basket,
        OptionKind::Binary,
        OptionKind::Chooser,
        OptionKind::Compound,
        OptionKind::Exchange,
        OptionKind::ForwardStart,
        OptionKind::Gap,
        OptionKind::Lookback,
        OptionKind::Quanto,
        OptionKind::Rainbow,
        OptionKind::Shout,
        OptionKind::Spread,
        OptionKind::VarianceSwap,
    ];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            OptionKind::European => "European",
            OptionKind::American => "American",
            OptionKind::Bermudan => "Bermudan",
            OptionKind::PerpetualAmerican => "PerpetualAmerican",
            OptionKind::Asian => "Asian",
            OptionKind::Barrier => "Barrier",
            OptionKind::Basket => "Basket",
            OptionKind::Binary => "Binary",
            OptionKind::Chooser => "Chooser",
            OptionKind::Compound => "Compound",
            OptionKind::Exchange => "Exchange",
            OptionKind::ForwardStart => "ForwardStart",
            OptionKind::Gap => "Gap",
            OptionKind::Lookback => "Lookback",
            OptionKind::Quanto => "Quanto",
            OptionKind::Rainbow => "Rainbow",
            OptionKind::Shout => "Shout",
            OptionKind::Spread => "Spread",
            OptionKind::VarianceSwap => "VarianceSwap",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numerical method families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    /// Closed-form formulas.
    Analytic,
    /// Binomial and trinomial trees.
    Lattice,
    /// PDE grids.
    FiniteDifference,
    /// Path simulation.
    MonteCarlo,
}

impl Method {
    /// Every method, in declaration order.
    pub const ALL: [Method; 4] = [
        Method::Analytic,
        Method::Lattice,
        Method::FiniteDifference,
        Method::MonteCarlo,
    ];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Method::Analytic => "Analytic",
            Method::Lattice => "Lattice",
            Method::FiniteDifference => "FiniteDifference",
            Method::MonteCarlo => "MonteCarlo",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
