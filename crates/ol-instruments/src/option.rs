//! The option contract.
//!
//! An [`OptionContract`] pairs a [`Payoff`] with an [`ExerciseStyle`], a
//! right and a maturity. Construction validates everything that can be
//! checked from the terms alone; [`OptionContract::validate`] adds the
//! checks that need the market (a barrier on the correct side of spot, a
//! running extremum consistent with spot).

use ol_core::{ensure, errors::Result, Real, Time};

use crate::exercise::ExerciseStyle;
use crate::kind::OptionKind;
use crate::market::MarketParameters;
use crate::payoff::{Averaging, BarrierType, LookbackKind, OptionType, Payoff};

/// A single option contract.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptionContract {
    payoff: Payoff,
    exercise: ExerciseStyle,
    right: OptionType,
    maturity: Option<Time>,
}

impl OptionContract {
    /// Validated constructor for any payoff.
    ///
    /// `maturity` is the time to expiry in years and must be `None` exactly
    /// when the exercise style is [`ExerciseStyle::Perpetual`].
    pub fn new(
        payoff: Payoff,
        exercise: ExerciseStyle,
        right: OptionType,
        maturity: Option<Time>,
    ) -> Result<Self> {
        let contract = Self {
            payoff,
            exercise,
            right,
            maturity,
        };
        contract.validate_terms()?;
        Ok(contract)
    }

    /// European vanilla.
    pub fn european(right: OptionType, strike: Real, maturity: Time) -> Result<Self> {
        Self::new(
            Payoff::Vanilla { strike },
            ExerciseStyle::European,
            right,
            Some(maturity),
        )
    }

    /// American vanilla.
    pub fn american(right: OptionType, strike: Real, maturity: Time) -> Result<Self> {
        Self::new(
            Payoff::Vanilla { strike },
            ExerciseStyle::American,
            right,
            Some(maturity),
        )
    }

    /// Bermudan vanilla exercisable at `exercise_times`.
    pub fn bermudan(
        right: OptionType,
        strike: Real,
        exercise_times: Vec<Time>,
        maturity: Time,
    ) -> Result<Self> {
        Self::new(
            Payoff::Vanilla { strike },
            ExerciseStyle::bermudan(exercise_times),
            right,
            Some(maturity),
        )
    }

    /// Perpetual American vanilla.
    pub fn perpetual_american(right: OptionType, strike: Real) -> Result<Self> {
        Self::new(
            Payoff::Vanilla { strike },
            ExerciseStyle::Perpetual,
            right,
            None,
        )
    }

    /// Single-barrier option, checked against the current `spot`.
    ///
    /// A down barrier at or above spot, or an up barrier at or below spot,
    /// is rejected with `InvalidParameter`.
    #[allow(clippy::too_many_arguments)]
    pub fn barrier(
        right: OptionType,
        strike: Real,
        barrier: Real,
        barrier_type: BarrierType,
        rebate: Real,
        maturity: Time,
        spot: Real,
    ) -> Result<Self> {
        let contract = Self::new(
            Payoff::Barrier {
                strike,
                barrier,
                barrier_type,
                rebate,
            },
            ExerciseStyle::European,
            right,
            Some(maturity),
        )?;
        contract.check_against_spot(spot)?;
        Ok(contract)
    }

    /// Asian option with `fixings` equally spaced fixings after
    /// `averaging_start`.
    pub fn asian(
        right: OptionType,
        strike: Real,
        averaging: Averaging,
        averaging_start: Time,
        fixings: usize,
        maturity: Time,
    ) -> Result<Self> {
        Self::new(
            Payoff::Asian {
                strike,
                averaging,
                averaging_start,
                fixings,
            },
            ExerciseStyle::European,
            right,
            Some(maturity),
        )
    }

    /// The payoff.
    pub fn payoff(&self) -> &Payoff {
        &self.payoff
    }

    /// The exercise style.
    pub fn exercise(&self) -> &ExerciseStyle {
        &self.exercise
    }

    /// Call or put.
    pub fn right(&self) -> OptionType {
        self.right
    }

    /// Time to expiry, `None` for perpetual contracts.
    pub fn maturity(&self) -> Option<Time> {
        self.maturity
    }

    /// Time to expiry; `InvalidParameter` for perpetual contracts.
    pub fn time_to_maturity(&self) -> Result<Time> {
        match self.maturity {
            Some(t) => Ok(t),
            None => Err(ol_core::Error::InvalidParameter(
                "perpetual contracts have no maturity".into(),
            )),
        }
    }

    /// The option kind, derived from payoff and exercise style.
    pub fn kind(&self) -> OptionKind {
        match (&self.payoff, &self.exercise) {
            (Payoff::Vanilla { .. }, ExerciseStyle::European) => OptionKind::European,
            (Payoff::Vanilla { .. }, ExerciseStyle::American) => OptionKind::American,
            (Payoff::Vanilla { .. }, ExerciseStyle::Bermudan { .. }) => OptionKind::Bermudan,
            (Payoff::Vanilla { .. }, ExerciseStyle::Perpetual) => OptionKind::PerpetualAmerican,
            (Payoff::Asian { .. }, _) => OptionKind::Asian,
            (Payoff::Barrier { .. }, _) => OptionKind::Barrier,
            (Payoff::Basket { .. }, _) => OptionKind::Basket,
            (Payoff::Binary { .. }, _) => OptionKind::Binary,
            (Payoff::Chooser { .. }, _) => OptionKind::Chooser,
            (Payoff::Compound { .. }, _) => OptionKind::Compound,
            (Payoff::Exchange { .. }, _) => OptionKind::Exchange,
            (Payoff::ForwardStart { .. }, _) => OptionKind::ForwardStart,
            (Payoff::Gap { .. }, _) => OptionKind::Gap,
            (Payoff::Lookback { .. }, _) => OptionKind::Lookback,
            (Payoff::Quanto { .. }, _) => OptionKind::Quanto,
            (Payoff::Rainbow { .. }, _) => OptionKind::Rainbow,
            (Payoff::Shout { .. }, _) => OptionKind::Shout,
            (Payoff::Spread { .. }, _) => OptionKind::Spread,
            (Payoff::VarianceSwap { .. }, _) => OptionKind::VarianceSwap,
        }
    }

    /// Full validation against a market snapshot.
    pub fn validate(&self, market: &MarketParameters) -> Result<()> {
        market.validate()?;
        self.validate_terms()?;
        self.check_against_spot(market.spot())
    }

    fn check_against_spot(&self, spot: Real) -> Result<()> {
        match self.payoff {
            Payoff::Barrier {
                barrier,
                barrier_type,
                ..
            } => {
                if barrier_type.is_down() {
                    ensure!(
                        barrier < spot,
                        "{barrier_type:?} barrier {barrier} must lie below spot {spot}"
                    );
                } else {
                    ensure!(
                        barrier > spot,
                        "{barrier_type:?} barrier {barrier} must lie above spot {spot}"
                    );
                }
            }
            Payoff::Lookback {
                lookback,
                running_extreme: Some(extreme),
            } => {
                if tracks_minimum(lookback, self.right) {
                    ensure!(
                        extreme <= spot,
                        "running minimum {extreme} exceeds spot {spot}"
                    );
                } else {
                    ensure!(
                        extreme >= spot,
                        "running maximum {extreme} is below spot {spot}"
                    );
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn validate_terms(&self) -> Result<()> {
        let perpetual = self.exercise == ExerciseStyle::Perpetual;
        match self.maturity {
            Some(t) => {
                ensure!(!perpetual, "perpetual exercise takes no maturity, got {t}");
                ensure!(t.is_finite() && t > 0.0, "maturity must be positive, got {t}");
            }
            None => ensure!(perpetual, "maturity is required unless exercise is perpetual"),
        }
        if !matches!(self.payoff, Payoff::Vanilla { .. }) {
            ensure!(
                self.exercise == ExerciseStyle::European,
                "{} payoffs support European exercise only, got {}",
                self.payoff.name(),
                self.exercise
            );
        }
        if let ExerciseStyle::Bermudan { exercise_times } = &self.exercise {
            ensure!(
                !exercise_times.is_empty(),
                "Bermudan exercise needs at least one exercise time"
            );
            let t = self.maturity.unwrap_or(0.0);
            for &ti in exercise_times {
                ensure!(
                    ti > 0.0 && ti <= t + 1e-12,
                    "Bermudan exercise time {ti} outside (0, {t}]"
                );
            }
        }
        let t = self.maturity.unwrap_or(Real::INFINITY);
        match &self.payoff {
            Payoff::Vanilla { strike } | Payoff::Shout { strike } => positive("strike", *strike),
            Payoff::Asian {
                strike,
                averaging_start,
                fixings,
                ..
            } => {
                positive("strike", *strike)?;
                ensure!(*fixings >= 1, "Asian options need at least one fixing");
                ensure!(
                    *averaging_start >= 0.0 && *averaging_start < t,
                    "averaging start {averaging_start} must lie in [0, {t})"
                );
                Ok(())
            }
            Payoff::Barrier {
                strike,
                barrier,
                rebate,
                ..
            } => {
                positive("strike", *strike)?;
                positive("barrier", *barrier)?;
                ensure!(
                    rebate.is_finite() && *rebate >= 0.0,
                    "rebate must be non-negative, got {rebate}"
                );
                Ok(())
            }
            Payoff::Basket {
                strike,
                weights,
                assets,
                correlation,
            } => {
                positive("strike", *strike)?;
                let n = assets.len() + 1;
                ensure!(
                    weights.len() == n,
                    "basket has {n} assets but {} weights",
                    weights.len()
                );
                ensure!(
                    weights.iter().all(|w| w.is_finite()),
                    "basket weights must be finite"
                );
                for asset in assets {
                    asset.validate()?;
                }
                validate_correlation_matrix(correlation, n)
            }
            Payoff::Binary { strike, binary } => {
                positive("strike", *strike)?;
                if let crate::payoff::BinaryKind::CashOrNothing { cash } = binary {
                    ensure!(
                        cash.is_finite() && *cash >= 0.0,
                        "cash amount must be non-negative, got {cash}"
                    );
                }
                Ok(())
            }
            Payoff::Chooser {
                strike,
                choose_time,
            } => {
                positive("strike", *strike)?;
                ensure!(
                    *choose_time > 0.0 && *choose_time < t,
                    "choose time {choose_time} must lie in (0, {t})"
                );
                Ok(())
            }
            Payoff::Compound {
                strike,
                inner_strike,
                inner_maturity,
                ..
            } => {
                positive("strike", *strike)?;
                positive("inner strike", *inner_strike)?;
                ensure!(
                    inner_maturity.is_finite() && *inner_maturity > t,
                    "inner maturity {inner_maturity} must exceed the contract maturity {t}"
                );
                Ok(())
            }
            Payoff::Exchange {
                second,
                correlation,
            } => {
                second.validate()?;
                correlation_in_range(*correlation)
            }
            Payoff::ForwardStart {
                start_time,
                moneyness,
            } => {
                positive("moneyness", *moneyness)?;
                ensure!(
                    *start_time >= 0.0 && *start_time < t,
                    "start time {start_time} must lie in [0, {t})"
                );
                Ok(())
            }
            Payoff::Gap {
                trigger,
                payment_strike,
            } => {
                positive("trigger", *trigger)?;
                positive("payment strike", *payment_strike)
            }
            Payoff::Lookback {
                lookback,
                running_extreme,
            } => {
                if let LookbackKind::Fixed { strike } = lookback {
                    positive("strike", *strike)?;
                }
                if let Some(extreme) = running_extreme {
                    positive("running extreme", *extreme)?;
                }
                Ok(())
            }
            Payoff::Quanto {
                strike,
                fx_rate,
                fx_volatility,
                correlation,
                foreign_rate,
            } => {
                positive("strike", *strike)?;
                positive("fx rate", *fx_rate)?;
                positive("fx volatility", *fx_volatility)?;
                ensure!(
                    foreign_rate.is_finite(),
                    "foreign rate must be finite, got {foreign_rate}"
                );
                correlation_in_range(*correlation)
            }
            Payoff::Rainbow {
                strike,
                second,
                correlation,
                ..
            } => {
                positive("strike", *strike)?;
                second.validate()?;
                correlation_in_range(*correlation)
            }
            Payoff::Spread {
                strike,
                second,
                correlation,
            } => {
                ensure!(
                    strike.is_finite() && *strike >= 0.0,
                    "spread strike must be non-negative, got {strike}"
                );
                second.validate()?;
                correlation_in_range(*correlation)
            }
            Payoff::VarianceSwap {
                variance_strike,
                notional,
                realized_variance,
                elapsed,
            } => {
                ensure!(
                    variance_strike.is_finite() && *variance_strike >= 0.0,
                    "variance strike must be non-negative, got {variance_strike}"
                );
                ensure!(notional.is_finite(), "notional must be finite");
                ensure!(
                    realized_variance.is_finite() && *realized_variance >= 0.0,
                    "realised variance must be non-negative, got {realized_variance}"
                );
                ensure!(
                    elapsed.is_finite() && *elapsed >= 0.0,
                    "elapsed time must be non-negative, got {elapsed}"
                );
                Ok(())
            }
        }
    }
}

/// Whether a lookback's running extremum is a minimum.
pub fn tracks_minimum(lookback: LookbackKind, right: OptionType) -> bool {
    matches!(
        (lookback, right),
        (LookbackKind::Floating, OptionType::Call) | (LookbackKind::Fixed { .. }, OptionType::Put)
    )
}

fn positive(what: &str, x: Real) -> Result<()> {
    ensure!(x.is_finite() && x > 0.0, "{what} must be positive, got {x}");
    Ok(())
}

fn correlation_in_range(rho: Real) -> Result<()> {
    ensure!(
        (-1.0..=1.0).contains(&rho),
        "correlation must lie in [-1, 1], got {rho}"
    );
    Ok(())
}

fn validate_correlation_matrix(matrix: &[Vec<Real>], n: usize) -> Result<()> {
    ensure!(
        matrix.len() == n && matrix.iter().all(|row| row.len() == n),
        "correlation matrix must be {n}x{n}"
    );
    for (i, row) in matrix.iter().enumerate() {
        ensure!(
            (row[i] - 1.0).abs() < 1e-12,
            "correlation matrix diagonal must be 1, got {} at {i}",
            row[i]
        );
        for &rho in row {
            correlation_in_range(rho)?;
        }
    }
    ol_math::matrix_utilities::cholesky(matrix)?;
    Ok(())
}
