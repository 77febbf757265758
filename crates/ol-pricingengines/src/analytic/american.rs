//! American vanilla options: the Barone-Adesi–Whaley quadratic
//! approximation and the exact perpetual value.

use ol_core::{ensure, errors::Result, Real, Time};
use ol_instruments::{Greeks, OptionType};
use ol_math::{normal_cdf, normal_pdf};
use ol_methods::BlackScholesProcess;

use super::black_scholes::black_scholes_price;

const MAX_NEWTON_ITERATIONS: usize = 200;

fn d1(process: &BlackScholesProcess, spot: Real, strike: Real, t: Time) -> Real {
    let sigma = process.volatility;
    ((spot / strike).ln() + (process.carry() + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt())
}

/// Barone-Adesi–Whaley American option price.
///
/// The early-exercise premium is `A (S/S*)^q` above the European value,
/// with the critical spot `S*` found by Newton iteration. A call on an
/// asset whose carry is at least the rate is never exercised early and is
/// worth its European value.
pub fn barone_adesi_whaley(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    t: Time,
) -> Real {
    let spot = process.spot;
    if t <= 0.0 {
        return right.intrinsic(spot, strike);
    }
    let european = black_scholes_price(process, right, strike, t);
    let r = process.rate;
    let b = process.carry();
    if right == OptionType::Call && b >= r {
        return european;
    }

    let sigma2 = process.volatility * process.volatility;
    let m = 2.0 * r / sigma2;
    let n = 2.0 * b / sigma2;
    let big_k = 1.0 - (-r * t).exp();
    if big_k.abs() < 1e-15 {
        return european;
    }

    let phi = right.sign();
    let root = ((n - 1.0) * (n - 1.0) + 4.0 * m / big_k).sqrt();
    let q = (-(n - 1.0) + phi * root) / 2.0;
    let s_star = critical_price(process, right, strike, t, q);

    if phi * (spot - s_star) >= 0.0 {
        return right.intrinsic(spot, strike);
    }
    let carry_df = ((b - r) * t).exp();
    let a = phi * (s_star / q) * (1.0 - carry_df * normal_cdf(phi * d1(process, s_star, strike, t)));
    european + a * (spot / s_star).powf(q)
}

/// Critical exercise spot solving
/// `φ(S − K) = V_E(S) + φ(1 − e^{(b−r)T} N(φ d₁(S))) S / q`.
fn critical_price(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    t: Time,
    q: Real,
) -> Real {
    let phi = right.sign();
    let sigma = process.volatility;
    let b = process.carry();
    let r = process.rate;
    let sst = sigma * t.sqrt();
    let carry_df = ((b - r) * t).exp();

    // Seed from the perpetual boundary.
    let sigma2 = sigma * sigma;
    let n = 2.0 * b / sigma2;
    let m = 2.0 * r / sigma2;
    let q_inf = (-(n - 1.0) + phi * ((n - 1.0) * (n - 1.0) + 4.0 * m).sqrt()) / 2.0;
    let s_inf = strike / (1.0 - 1.0 / q_inf);
    let mut si = match right {
        OptionType::Call => {
            let h = -(b * t + 2.0 * sst) * strike / (s_inf - strike);
            strike + (s_inf - strike) * (1.0 - h.exp())
        }
        OptionType::Put => {
            let h = (b * t - 2.0 * sst) * strike / (strike - s_inf);
            s_inf + (strike - s_inf) * h.exp()
        }
    };

    for _ in 0..MAX_NEWTON_ITERATIONS {
        let d = d1(process, si, strike, t);
        let european = black_scholes_price(&process.with_spot(si), right, strike, t);
        let lhs = phi * (si - strike);
        let rhs = european + phi * (1.0 - carry_df * normal_cdf(phi * d)) * si / q;
        if (lhs - rhs).abs() / strike < 1e-10 {
            break;
        }
        // Slope of the right-hand side in S.
        let slope = match right {
            OptionType::Call => {
                carry_df * normal_cdf(d) * (1.0 - 1.0 / q)
                    + (1.0 - carry_df * normal_pdf(d) / sst) / q
            }
            OptionType::Put => {
                -carry_df * normal_cdf(-d) * (1.0 - 1.0 / q)
                    - (1.0 + carry_df * normal_pdf(d) / sst) / q
            }
        };
        si = match right {
            OptionType::Call => (strike + rhs - slope * si) / (1.0 - slope),
            OptionType::Put => (strike - rhs + slope * si) / (1.0 + slope),
        };
        if !si.is_finite() || si <= 0.0 {
            // Newton left the domain; fall back to the seed boundary.
            return s_inf;
        }
    }
    si
}

/// Value and Greeks of a perpetual American option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerpetualValue {
    /// Present value.
    pub price: Real,
    /// Exercise boundary; infinite for a call that is never exercised.
    pub boundary: Real,
    /// Delta, gamma and (zero) theta.
    pub greeks: Greeks,
}

/// Exact value of a perpetual American option.
///
/// With `y = ½ − b/σ² ± √((b/σ² − ½)² + 2r/σ²)` (plus for calls, minus for
/// puts) the continuation value is `K/|y − 1| · ((y − 1)/y · S/K)^y` below
/// (above) the boundary `S* = K y/(y − 1)`. A call on an asset without a
/// positive dividend yield is never exercised and is worth the spot.
pub fn perpetual_american(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
) -> Result<PerpetualValue> {
    let spot = process.spot;
    let sigma2 = process.volatility * process.volatility;
    let b = process.carry();
    let a = 0.5 - b / sigma2;
    let c = ((b / sigma2 - 0.5).powi(2) + 2.0 * process.rate / sigma2).sqrt();

    match right {
        OptionType::Call => {
            let y = a + c;
            if y <= 1.0 + 1e-12 {
                return Ok(PerpetualValue {
                    price: spot,
                    boundary: Real::INFINITY,
                    greeks: Greeks::spot_and_time(1.0, 0.0, 0.0),
                });
            }
            let boundary = strike * y / (y - 1.0);
            if spot >= boundary {
                return Ok(exercised(right, spot, strike, boundary));
            }
            let price = strike / (y - 1.0) * ((y - 1.0) / y * spot / strike).powf(y);
            Ok(continuation(price, y, spot, boundary))
        }
        OptionType::Put => {
            ensure!(
                process.rate > 0.0,
                "a perpetual put needs a positive rate, got {}",
                process.rate
            );
            let y = a - c;
            let boundary = strike * y / (y - 1.0);
            if spot <= boundary {
                return Ok(exercised(right, spot, strike, boundary));
            }
            let price = strike / (1.0 - y) * ((y - 1.0) / y * spot / strike).powf(y);
            Ok(continuation(price, y, spot, boundary))
        }
    }
}

fn exercised(right: OptionType, spot: Real, strike: Real, boundary: Real) -> PerpetualValue {
    PerpetualValue {
        price: right.intrinsic(spot, strike),
        boundary,
        greeks: Greeks::spot_and_time(right.sign(), 0.0, 0.0),
    }
}

fn continuation(price: Real, y: Real, spot: Real, boundary: Real) -> PerpetualValue {
    PerpetualValue {
        price,
        boundary,
        greeks: Greeks::spot_and_time(y * price / spot, y * (y - 1.0) * price / (spot * spot), 0.0),
    }
}
