//! Payoff families.
//!
//! [`Payoff`] is a tagged variant: each family carries its own parameters,
//! and the state-free families can be evaluated directly on a terminal spot
//! through [`Payoff::value_at`]. Path-dependent and multi-asset families are
//! evaluated by the method cores, which supply the path statistics.

use std::fmt;

use ol_core::{Real, Time};

use crate::market::UnderlyingAsset;

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptionType {
    /// A call option (right to buy).
    Call,
    /// A put option (right to sell).
    Put,
}

impl OptionType {
    /// +1 for Call, −1 for Put.
    pub fn sign(self) -> Real {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// The opposite right.
    pub fn flip(self) -> Self {
        match self {
            OptionType::Call => OptionType::Put,
            OptionType::Put => OptionType::Call,
        }
    }

    /// Plain exercise value `max(φ(S − K), 0)`.
    #[inline]
    pub fn intrinsic(self, spot: Real, strike: Real) -> Real {
        (self.sign() * (spot - strike)).max(0.0)
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "Call"),
            OptionType::Put => write!(f, "Put"),
        }
    }
}

/// Barrier direction and knock behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BarrierType {
    /// Becomes active when the price falls to the barrier.
    DownIn,
    /// Becomes active when the price rises to the barrier.
    UpIn,
    /// Extinguished when the price falls to the barrier.
    DownOut,
    /// Extinguished when the price rises to the barrier.
    UpOut,
}

impl BarrierType {
    /// True for the down barriers, which must sit below spot.
    pub fn is_down(self) -> bool {
        matches!(self, BarrierType::DownIn | BarrierType::DownOut)
    }

    /// True for knock-out barriers.
    pub fn is_out(self) -> bool {
        matches!(self, BarrierType::DownOut | BarrierType::UpOut)
    }

    /// Whether `spot` has reached the barrier.
    #[inline]
    pub fn is_breached(self, spot: Real, barrier: Real) -> bool {
        if self.is_down() {
            spot <= barrier
        } else {
            spot >= barrier
        }
    }

    /// The knock-out counterpart with the same direction.
    pub fn as_out(self) -> Self {
        match self {
            BarrierType::DownIn | BarrierType::DownOut => BarrierType::DownOut,
            BarrierType::UpIn | BarrierType::UpOut => BarrierType::UpOut,
        }
    }
}

/// Averaging rule of an Asian option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Averaging {
    /// Arithmetic mean of the fixings.
    Arithmetic,
    /// Geometric mean of the fixings.
    Geometric,
}

/// What a binary option pays when it finishes in the money.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryKind {
    /// A fixed cash amount.
    CashOrNothing {
        /// Amount paid.
        cash: Real,
    },
    /// One unit of the underlying.
    AssetOrNothing,
}

/// Strike convention of a lookback option.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LookbackKind {
    /// Call pays `S_T − min`, put pays `max − S_T`.
    Floating,
    /// Call pays `(max − K)⁺`, put pays `(K − min)⁺`.
    Fixed {
        /// Fixed strike.
        strike: Real,
    },
}

/// Best-of or worst-of selection for a two-asset rainbow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RainbowKind {
    /// Payoff on `max(S₁, S₂)`.
    BestOf,
    /// Payoff on `min(S₁, S₂)`.
    WorstOf,
}

/// Payoff family with its parameters.
///
/// The option right lives on the contract; the variants describe the call
/// version of each payoff and puts mirror it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Payoff {
    /// `(S − K)⁺`.
    Vanilla {
        /// Strike.
        strike: Real,
    },
    /// `(A − K)⁺` over fixings `t_k = start + k (T − start) / m`, `k = 1..m`.
    Asian {
        /// Strike.
        strike: Real,
        /// Arithmetic or geometric mean.
        averaging: Averaging,
        /// Start of the averaging window, in years from valuation.
        averaging_start: Time,
        /// Number of equally spaced fixings `m`.
        fixings: usize,
    },
    /// Single continuously monitored barrier on a vanilla payoff.
    Barrier {
        /// Strike.
        strike: Real,
        /// Barrier level.
        barrier: Real,
        /// Direction and knock behaviour.
        barrier_type: BarrierType,
        /// Cash rebate: paid at the hit for knock-outs, at expiry for
        /// knock-ins that never knocked in.
        rebate: Real,
    },
    /// `(Σ wᵢ Sᵢ − K)⁺` where asset 0 is the market underlying.
    Basket {
        /// Strike.
        strike: Real,
        /// One weight per asset, market underlying first.
        weights: Vec<Real>,
        /// The assets after the market underlying.
        assets: Vec<UnderlyingAsset>,
        /// Correlation matrix over all assets, market underlying first.
        correlation: Vec<Vec<Real>>,
    },
    /// Digital payoff.
    Binary {
        /// Strike.
        strike: Real,
        /// Cash-or-nothing or asset-or-nothing.
        binary: BinaryKind,
    },
    /// The holder picks a call or a put at `choose_time`.
    Chooser {
        /// Common strike of the call and put.
        strike: Real,
        /// Decision time in years.
        choose_time: Time,
    },
    /// Option on an option: `(V_inner(T) − K)⁺`.
    Compound {
        /// Strike of the outer option, paid at the contract maturity.
        strike: Real,
        /// Right of the inner option.
        inner_right: OptionType,
        /// Strike of the inner option.
        inner_strike: Real,
        /// Maturity of the inner option, after the contract maturity.
        inner_maturity: Time,
    },
    /// Right to exchange the second asset for the market underlying:
    /// call pays `(S₁ − S₂)⁺`, put pays `(S₂ − S₁)⁺`.
    Exchange {
        /// The asset given up.
        second: UnderlyingAsset,
        /// Correlation of the two log-returns.
        correlation: Real,
    },
    /// Strike set to `α S(t₁)` at `start_time`.
    ForwardStart {
        /// Strike-setting time `t₁`.
        start_time: Time,
        /// Moneyness `α`.
        moneyness: Real,
    },
    /// `(S − K₂) 1{S > K₁}`.
    Gap {
        /// Trigger strike `K₁`.
        trigger: Real,
        /// Payment strike `K₂`.
        payment_strike: Real,
    },
    /// Payoff on the running extremum of the path.
    Lookback {
        /// Floating or fixed strike.
        lookback: LookbackKind,
        /// Extremum observed before valuation, if any: the running minimum
        /// for floating calls and fixed puts, the running maximum otherwise.
        running_extreme: Option<Real>,
    },
    /// Foreign-currency vanilla paid in domestic currency at a fixed rate:
    /// `X̄ (S − K)⁺`. The market rate is the domestic rate.
    Quanto {
        /// Strike in the asset's currency.
        strike: Real,
        /// Fixed conversion rate `X̄`.
        fx_rate: Real,
        /// Volatility of the exchange rate.
        fx_volatility: Real,
        /// Correlation between the asset and the exchange rate.
        correlation: Real,
        /// Risk-free rate of the asset's currency.
        foreign_rate: Real,
    },
    /// Option on the best or worst of two assets.
    Rainbow {
        /// Strike.
        strike: Real,
        /// The second asset.
        second: UnderlyingAsset,
        /// Correlation of the two log-returns.
        correlation: Real,
        /// Best-of or worst-of.
        rainbow: RainbowKind,
    },
    /// Vanilla whose holder may once lock in the intrinsic value.
    Shout {
        /// Strike.
        strike: Real,
    },
    /// `(S₁ − S₂ − K)⁺`.
    Spread {
        /// Strike.
        strike: Real,
        /// The second asset.
        second: UnderlyingAsset,
        /// Correlation of the two log-returns.
        correlation: Real,
    },
    /// Pays `notional (σ²_realised − K_var)` at maturity.
    VarianceSwap {
        /// Variance strike `K_var` (in variance units).
        variance_strike: Real,
        /// Variance notional.
        notional: Real,
        /// Annualised variance realised so far.
        realized_variance: Real,
        /// Time already elapsed in the variance window, in years.
        elapsed: Time,
    },
}

impl Payoff {
    /// Short name of the family.
    pub fn name(&self) -> &'static str {
        match self {
            Payoff::Vanilla { .. } => "Vanilla",
            Payoff::Asian { .. } => "Asian",
            Payoff::Barrier { .. } => "Barrier",
            Payoff::Basket { .. } => "Basket",
            Payoff::Binary { .. } => "Binary",
            Payoff::Chooser { .. } => "Chooser",
            Payoff::Compound { .. } => "Compound",
            Payoff::Exchange { .. } => "Exchange",
            Payoff::ForwardStart { .. } => "ForwardStart",
            Payoff::Gap { .. } => "Gap",
            Payoff::Lookback { .. } => "Lookback",
            Payoff::Quanto { .. } => "Quanto",
            Payoff::Rainbow { .. } => "Rainbow",
            Payoff::Shout { .. } => "Shout",
            Payoff::Spread { .. } => "Spread",
            Payoff::VarianceSwap { .. } => "VarianceSwap",
        }
    }

    /// The strike the exercise value is measured against, if the family has
    /// a single one.
    pub fn strike(&self) -> Option<Real> {
        match self {
            Payoff::Vanilla { strike }
            | Payoff::Asian { strike, .. }
            | Payoff::Barrier { strike, .. }
            | Payoff::Basket { strike, .. }
            | Payoff::Binary { strike, .. }
            | Payoff::Chooser { strike, .. }
            | Payoff::Compound { strike, .. }
            | Payoff::Quanto { strike, .. }
            | Payoff::Rainbow { strike, .. }
            | Payoff::Shout { strike }
            | Payoff::Spread { strike, .. } => Some(*strike),
            Payoff::Gap { payment_strike, .. } => Some(*payment_strike),
            Payoff::Lookback {
                lookback: LookbackKind::Fixed { strike },
                ..
            } => Some(*strike),
            Payoff::Exchange { .. }
            | Payoff::ForwardStart { .. }
            | Payoff::Lookback { .. }
            | Payoff::VarianceSwap { .. } => None,
        }
    }

    /// Payoff as a function of the terminal spot alone.
    ///
    /// Defined for the families whose value at maturity depends on nothing
    /// but `S_T`: vanilla, binary, gap, quanto (including the conversion
    /// rate), and an unshouted shout. Returns `None` for every other family.
    pub fn value_at(&self, right: OptionType, spot: Real) -> Option<Real> {
        let phi = right.sign();
        match *self {
            Payoff::Vanilla { strike } | Payoff::Shout { strike } => {
                Some(right.intrinsic(spot, strike))
            }
            Payoff::Binary { strike, binary } => {
                let in_the_money = phi * (spot - strike) > 0.0;
                Some(match (in_the_money, binary) {
                    (false, _) => 0.0,
                    (true, BinaryKind::CashOrNothing { cash }) => cash,
                    (true, BinaryKind::AssetOrNothing) => spot,
                })
            }
            Payoff::Gap {
                trigger,
                payment_strike,
            } => Some(if phi * (spot - trigger) > 0.0 {
                phi * (spot - payment_strike)
            } else {
                0.0
            }),
            Payoff::Quanto { strike, fx_rate, .. } => Some(fx_rate * right.intrinsic(spot, strike)),
            _ => None,
        }
    }

    /// Whether [`value_at`](Payoff::value_at) is defined for this family.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Payoff::Vanilla { .. }
                | Payoff::Shout { .. }
                | Payoff::Binary { .. }
                | Payoff::Gap { .. }
                | Payoff::Quanto { .. }
        )
    }

    /// Whether the payoff reads more than one underlying.
    pub fn is_multi_asset(&self) -> bool {
        matches!(
            self,
            Payoff::Basket { .. }
                | Payoff::Exchange { .. }
                | Payoff::Rainbow { .. }
                | Payoff::Spread { .. }
        )
    }
}
