//! Market snapshot shared by every engine.

use chrono::NaiveDate;
use ol_core::{ensure, errors::Result, DiscountFactor, Rate, Real, Time, Volatility};

/// Immutable market snapshot for one valuation.
///
/// Rates and the dividend yield are continuously compounded; the volatility
/// is the Black–Scholes volatility of the underlying. Constructed once,
/// validated, and shared by reference across every engine invoked for the
/// same valuation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketParameters {
    spot: Real,
    rate: Rate,
    dividend: Rate,
    volatility: Volatility,
    valuation_date: NaiveDate,
}

impl MarketParameters {
    /// Validated constructor.
    ///
    /// Requires `spot > 0`, a finite `rate`, `dividend ≥ 0` and
    /// `volatility > 0`.
    pub fn new(
        spot: Real,
        rate: Rate,
        dividend: Rate,
        volatility: Volatility,
        valuation_date: NaiveDate,
    ) -> Result<Self> {
        let market = Self {
            spot,
            rate,
            dividend,
            volatility,
            valuation_date,
        };
        market.validate()?;
        Ok(market)
    }

    /// Re-run the construction checks.
    ///
    /// Engines call this at the start of a pricing call so that values that
    /// bypassed the constructor (for example through deserialisation) are
    /// still rejected.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.spot.is_finite() && self.spot > 0.0,
            "spot must be positive, got {}",
            self.spot
        );
        ensure!(self.rate.is_finite(), "rate must be finite, got {}", self.rate);
        ensure!(
            self.dividend.is_finite() && self.dividend >= 0.0,
            "dividend yield must be non-negative, got {}",
            self.dividend
        );
        ensure!(
            self.volatility.is_finite() && self.volatility > 0.0,
            "volatility must be positive, got {}",
            self.volatility
        );
        Ok(())
    }

    /// Spot price of the underlying.
    pub fn spot(&self) -> Real {
        self.spot
    }

    /// Continuously compounded risk-free rate.
    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// Continuous dividend yield.
    pub fn dividend(&self) -> Rate {
        self.dividend
    }

    /// Black–Scholes volatility.
    pub fn volatility(&self) -> Volatility {
        self.volatility
    }

    /// Valuation date.
    pub fn valuation_date(&self) -> NaiveDate {
        self.valuation_date
    }

    /// Risk-free discount factor `e^{−rt}`.
    pub fn discount(&self, t: Time) -> DiscountFactor {
        (-self.rate * t).exp()
    }

    /// Dividend discount factor `e^{−qt}`.
    pub fn dividend_discount(&self, t: Time) -> DiscountFactor {
        (-self.dividend * t).exp()
    }

    /// Forward price `S e^{(r−q)t}`.
    pub fn forward(&self, t: Time) -> Real {
        self.spot * ((self.rate - self.dividend) * t).exp()
    }

    /// Act/365 Fixed year fraction from the valuation date to `date`.
    pub fn year_fraction_to(&self, date: NaiveDate) -> Result<Time> {
        ol_core::year_fraction(self.valuation_date, date)
    }

    /// The underlying described as an [`UnderlyingAsset`].
    pub fn underlying(&self) -> UnderlyingAsset {
        UnderlyingAsset {
            spot: self.spot,
            volatility: self.volatility,
            dividend: self.dividend,
        }
    }
}

/// A further underlying for multi-asset payoffs (exchange, spread, rainbow,
/// basket). Shares the risk-free rate of the [`MarketParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnderlyingAsset {
    /// Spot price.
    pub spot: Real,
    /// Black–Scholes volatility.
    pub volatility: Volatility,
    /// Continuous dividend yield.
    pub dividend: Rate,
}

impl UnderlyingAsset {
    /// Validated constructor.
    pub fn new(spot: Real, volatility: Volatility, dividend: Rate) -> Result<Self> {
        let asset = Self {
            spot,
            volatility,
            dividend,
        };
        asset.validate()?;
        Ok(asset)
    }

    /// Check `spot > 0`, `volatility > 0` and `dividend ≥ 0`.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.spot.is_finite() && self.spot > 0.0,
            "asset spot must be positive, got {}",
            self.spot
        );
        ensure!(
            self.volatility.is_finite() && self.volatility > 0.0,
            "asset volatility must be positive, got {}",
            self.volatility
        );
        ensure!(
            self.dividend.is_finite() && self.dividend >= 0.0,
            "asset dividend yield must be non-negative, got {}",
            self.dividend
        );
        Ok(())
    }
}
