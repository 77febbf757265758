//! Multi-asset closed forms: Margrabe exchange, Kirk spread, Stulz
//! best/worst-of two, and the moment-matched basket.

use ol_core::{errors::Result, fail, Real, Time};
use ol_instruments::{OptionType, RainbowKind, UnderlyingAsset};
use ol_math::{bivariate_normal_cdf, normal_cdf};
use ol_methods::BlackScholesProcess;

use super::black_scholes::{black_scholes_price, MIN_STD_DEV};
use crate::reduction::{exchange_process, ratio_volatility};

/// The market underlying and one further asset.
#[derive(Debug, Clone, Copy)]
pub struct TwoAssets<'a> {
    /// First asset, carrying the risk-free rate.
    pub first: &'a BlackScholesProcess,
    /// Second asset.
    pub second: &'a UnderlyingAsset,
    /// Correlation of the log-returns.
    pub correlation: Real,
}

impl TwoAssets<'_> {
    fn sigma(&self) -> Real {
        ratio_volatility(
            self.first.volatility,
            self.second.volatility,
            self.correlation,
        )
    }
}

/// Margrabe's price of the right to receive the first asset for the second,
/// `(S₁ − S₂)⁺`.
pub fn margrabe(assets: TwoAssets<'_>, t: Time) -> Real {
    let process = exchange_process(assets.first, assets.second, assets.correlation);
    black_scholes_price(&process, OptionType::Call, assets.second.spot, t)
}

/// Kirk's approximation for `φ (S₁ − S₂ − K)⁺`.
///
/// `S₂ + K` is treated as log-normal with the volatility of `S₂` scaled by
/// `F₂ / (F₂ + K)`.
pub fn kirk_spread(assets: TwoAssets<'_>, right: OptionType, strike: Real, t: Time) -> Real {
    let p = assets.first;
    let phi = right.sign();
    let f1 = p.forward(t);
    let f2 = assets.second.spot * ((p.rate - assets.second.dividend) * t).exp();
    let shifted = f2 + strike;
    let w = f2 / shifted;
    let v1 = p.volatility;
    let v2 = assets.second.volatility * w;
    let sigma = (v1 * v1 + v2 * v2 - 2.0 * assets.correlation * v1 * v2)
        .max(0.0)
        .sqrt();
    let sd = sigma * t.sqrt();
    let df = p.discount(t);
    if sd < MIN_STD_DEV {
        return df * right.intrinsic(f1, shifted);
    }
    let d1 = ((f1 / shifted).ln() + 0.5 * sd * sd) / sd;
    let d2 = d1 - sd;
    df * phi * (f1 * normal_cdf(phi * d1) - shifted * normal_cdf(phi * d2))
}

/// Stulz's price of an option on the maximum or minimum of two assets.
///
/// Calls are closed form; puts follow from `P = C − E[e^{−rT} X] + K e^{−rT}`
/// with `E[max] = S₂ e^{−q₂T} + M` and `E[min] = S₁ e^{−q₁T} − M`, where `M`
/// is the Margrabe value.
pub fn stulz_rainbow(
    assets: TwoAssets<'_>,
    right: OptionType,
    rainbow: RainbowKind,
    strike: Real,
    t: Time,
) -> Real {
    let p = assets.first;
    let second = assets.second;
    let rho = assets.correlation;
    let (s1, s2) = (p.spot, second.spot);
    let (v1, v2) = (p.volatility, second.volatility);
    let (q1, q2) = (p.dividend, second.dividend);
    let r = p.rate;
    let sigma = assets.sigma();
    let sqrt_t = t.sqrt();

    let a = s1 * (-q1 * t).exp();
    let b = s2 * (-q2 * t).exp();
    let bond = strike * (-r * t).exp();

    let y1 = ((s1 / strike).ln() + (r - q1 + 0.5 * v1 * v1) * t) / (v1 * sqrt_t);
    let y2 = ((s2 / strike).ln() + (r - q2 + 0.5 * v2 * v2) * t) / (v2 * sqrt_t);
    let m = |x: Real, y: Real, c: Real| bivariate_normal_cdf(x, y, c);

    let call = if sigma * sqrt_t < MIN_STD_DEV {
        // The assets move together; the extremum is whichever forward is larger.
        let best_first = a >= b;
        let chosen = match (rainbow, best_first) {
            (RainbowKind::BestOf, true) | (RainbowKind::WorstOf, false) => (s1, q1, v1),
            _ => (s2, q2, v2),
        };
        let proc = BlackScholesProcess::new(chosen.0, r, chosen.1, chosen.2);
        black_scholes_price(&proc, OptionType::Call, strike, t)
    } else {
        let d = ((s1 / s2).ln() + (q2 - q1 + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
        let r1 = (v1 - rho * v2) / sigma;
        let r2 = (v2 - rho * v1) / sigma;
        match rainbow {
            RainbowKind::BestOf => {
                a * m(y1, d, r1) + b * m(y2, -d + sigma * sqrt_t, r2)
                    - bond * (1.0 - m(-y1 + v1 * sqrt_t, -y2 + v2 * sqrt_t, rho))
            }
            RainbowKind::WorstOf => {
                a * m(y1, -d, -r1) + b * m(y2, d - sigma * sqrt_t, -r2)
                    - bond * m(y1 - v1 * sqrt_t, y2 - v2 * sqrt_t, rho)
            }
        }
    };

    match right {
        OptionType::Call => call.max(0.0),
        OptionType::Put => {
            let exchange = margrabe(assets, t);
            let expected = match rainbow {
                RainbowKind::BestOf => b + exchange,
                RainbowKind::WorstOf => a - exchange,
            };
            (call - expected + bond).max(0.0)
        }
    }
}

/// Moment-matched price of an option on `Σ wᵢ Sᵢ`.
///
/// The basket's terminal value is replaced by a log-normal with the same
/// first two moments. Needs a positive expected basket value.
pub fn basket(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    weights: &[Real],
    assets: &[UnderlyingAsset],
    correlation: &[Vec<Real>],
    t: Time,
) -> Result<Real> {
    let r = process.rate;
    let mut forwards = Vec::with_capacity(weights.len());
    let mut vols = Vec::with_capacity(weights.len());
    forwards.push(process.forward(t));
    vols.push(process.volatility);
    for asset in assets {
        forwards.push(asset.spot * ((r - asset.dividend) * t).exp());
        vols.push(asset.volatility);
    }

    let m1: Real = weights.iter().zip(&forwards).map(|(w, f)| w * f).sum();
    if m1 <= 0.0 {
        fail!("moment matching needs a positive basket forward, got {m1}");
    }
    let mut m2 = 0.0;
    for i in 0..weights.len() {
        for j in 0..weights.len() {
            m2 += weights[i]
                * weights[j]
                * forwards[i]
                * forwards[j]
                * (correlation[i][j] * vols[i] * vols[j] * t).exp();
        }
    }
    if m2 <= 0.0 {
        fail!("basket second moment is not positive: {m2}");
    }

    let phi = right.sign();
    let df = process.discount(t);
    let variance = (m2 / (m1 * m1)).ln().max(0.0);
    let sd = variance.sqrt();
    if sd < MIN_STD_DEV {
        return Ok(df * right.intrinsic(m1, strike));
    }
    let d1 = ((m1 / strike).ln() + 0.5 * variance) / sd;
    let d2 = d1 - sd;
    Ok(df * phi * (m1 * normal_cdf(phi * d1) - strike * normal_cdf(phi * d2)))
}
