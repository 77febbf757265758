//! Constant-coefficient Black–Scholes dynamics.

use ol_core::{DiscountFactor, Rate, Real, Time, Volatility};
use ol_instruments::MarketParameters;

/// Geometric Brownian motion `dS = (r − q) S dt + σ S dW` with constant
/// coefficients.
///
/// Engines reduce several contracts to a single-asset problem by adjusting
/// the dividend yield (quanto drift, numeraire changes), so the yield here
/// may be negative and no validation is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholesProcess {
    /// Initial spot.
    pub spot: Real,
    /// Risk-free rate used for discounting.
    pub rate: Rate,
    /// Continuous dividend yield (possibly an adjusted carry).
    pub dividend: Rate,
    /// Volatility.
    pub volatility: Volatility,
}

impl BlackScholesProcess {
    /// Process with the given coefficients.
    pub fn new(spot: Real, rate: Rate, dividend: Rate, volatility: Volatility) -> Self {
        Self {
            spot,
            rate,
            dividend,
            volatility,
        }
    }

    /// Process read from a validated market snapshot.
    pub fn from_market(market: &MarketParameters) -> Self {
        Self::new(
            market.spot(),
            market.rate(),
            market.dividend(),
            market.volatility(),
        )
    }

    /// Same coefficients from a different spot.
    pub fn with_spot(self, spot: Real) -> Self {
        Self { spot, ..self }
    }

    /// Risk-neutral drift of `S`, `r − q`.
    pub fn carry(&self) -> Rate {
        self.rate - self.dividend
    }

    /// Drift of `ln S`, `r − q − σ²/2`.
    pub fn log_drift(&self) -> Rate {
        self.rate - self.dividend - 0.5 * self.volatility * self.volatility
    }

    /// Risk-free discount factor.
    pub fn discount(&self, t: Time) -> DiscountFactor {
        (-self.rate * t).exp()
    }

    /// Dividend discount factor.
    pub fn dividend_discount(&self, t: Time) -> DiscountFactor {
        (-self.dividend * t).exp()
    }

    /// Forward price at `t`.
    pub fn forward(&self, t: Time) -> Real {
        self.spot * (self.carry() * t).exp()
    }

    /// Standard deviation of `ln S_t`, `σ √t`.
    pub fn std_dev(&self, t: Time) -> Real {
        self.volatility * t.max(0.0).sqrt()
    }
}
