//! Continuously monitored lookback options.
//!
//! Floating-strike lookbacks follow Goldman, Sosin & Gatto (1979) and
//! fixed-strike lookbacks Conze & Viswanathan (1991), both extended to a
//! running extremum observed before valuation. The zero-carry limit of the
//! reflection term is taken analytically.

use ol_core::{Real, Time};
use ol_instruments::{option::tracks_minimum, LookbackKind, OptionType};
use ol_math::{normal_cdf, normal_pdf};
use ol_methods::BlackScholesProcess;

/// Below this carry the reflection term uses its `b → 0` limit.
const ZERO_CARRY: Real = 1e-7;

/// Price of a lookback option; the running extremum defaults to spot.
pub fn lookback(
    process: &BlackScholesProcess,
    right: OptionType,
    kind: LookbackKind,
    running_extreme: Option<Real>,
    t: Time,
) -> Real {
    let spot = process.spot;
    let extreme = running_extreme.unwrap_or(spot);
    // A stale extremum on the wrong side of spot is superseded by spot.
    let extreme = if tracks_minimum(kind, right) {
        extreme.min(spot)
    } else {
        extreme.max(spot)
    };
    match kind {
        LookbackKind::Floating => floating(process, right, extreme, t),
        LookbackKind::Fixed { strike } => fixed(process, right, strike, extreme, t),
    }
}

/// Reflection term `E[·]` shared by both families, per unit of spot and
/// undiscounted: `σ²/(2b) [ (S/X)^{−2b/σ²} N(η(−a₁ + 2b√T/σ)) − e^{bT} N(−η a₁) ]`.
fn reflection(process: &BlackScholesProcess, x: Real, eta: Real, t: Time) -> Real {
    let sigma = process.volatility;
    let sigma2 = sigma * sigma;
    let b = process.carry();
    let sqrt_t = t.sqrt();
    let log_sx = (process.spot / x).ln();
    if b.abs() < ZERO_CARRY {
        let a1 = (log_sx + 0.5 * sigma2 * t) / (sigma * sqrt_t);
        return -(log_sx + 0.5 * sigma2 * t) * normal_cdf(-eta * a1)
            + eta * sigma * sqrt_t * normal_pdf(a1);
    }
    let a1 = (log_sx + (b + 0.5 * sigma2) * t) / (sigma * sqrt_t);
    sigma2 / (2.0 * b)
        * ((process.spot / x).powf(-2.0 * b / sigma2)
            * normal_cdf(eta * (-a1 + 2.0 * b * sqrt_t / sigma))
            - (b * t).exp() * normal_cdf(-eta * a1))
}

/// Floating strike: a call pays `S_T − min`, a put `max − S_T`.
fn floating(process: &BlackScholesProcess, right: OptionType, extreme: Real, t: Time) -> Real {
    let spot = process.spot;
    if t <= 0.0 {
        return (right.sign() * (spot - extreme)).max(0.0);
    }
    let sigma = process.volatility;
    let sst = sigma * t.sqrt();
    let a1 = ((spot / extreme).ln() + (process.carry() + 0.5 * sigma * sigma) * t) / sst;
    let a2 = a1 - sst;
    let df_r = process.discount(t);
    let df_q = process.dividend_discount(t);
    match right {
        OptionType::Call => {
            spot * df_q * normal_cdf(a1) - extreme * df_r * normal_cdf(a2)
                + spot * df_r * reflection(process, extreme, 1.0, t)
        }
        OptionType::Put => {
            extreme * df_r * normal_cdf(-a2) - spot * df_q * normal_cdf(-a1)
                - spot * df_r * reflection(process, extreme, -1.0, t)
        }
    }
}

/// Fixed strike: a call pays `(max − K)⁺`, a put `(K − min)⁺`.
fn fixed(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    extreme: Real,
    t: Time,
) -> Real {
    let spot = process.spot;
    if t <= 0.0 {
        return right.intrinsic(extreme, strike);
    }
    let sigma = process.volatility;
    let sst = sigma * t.sqrt();
    let df_r = process.discount(t);
    let df_q = process.dividend_discount(t);
    let b = process.carry();

    // Once the extremum has passed the strike the option is the locked-in
    // amount plus a floating lookback on further moves.
    match right {
        OptionType::Call => {
            let x = strike.max(extreme);
            let locked = if strike <= extreme {
                df_r * (extreme - strike)
            } else {
                0.0
            };
            let d1 = ((spot / x).ln() + (b + 0.5 * sigma * sigma) * t) / sst;
            let d2 = d1 - sst;
            locked + spot * df_q * normal_cdf(d1) - x * df_r * normal_cdf(d2)
                - spot * df_r * reflection(process, x, -1.0, t)
        }
        OptionType::Put => {
            let x = strike.min(extreme);
            let locked = if strike >= extreme {
                df_r * (strike - extreme)
            } else {
                0.0
            };
            let d1 = ((spot / x).ln() + (b + 0.5 * sigma * sigma) * t) / sst;
            let d2 = d1 - sst;
            locked + x * df_r * normal_cdf(-d2) - spot * df_q * normal_cdf(-d1)
                + spot * df_r * reflection(process, x, 1.0, t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn process() -> BlackScholesProcess {
        BlackScholesProcess::new(100.0, 0.05, 0.01, 0.25)
    }

    #[test]
    fn floating_reference_values() {
        let p = process();
        let call = lookback(&p, OptionType::Call, LookbackKind::Floating, None, 1.0);
        assert_relative_eq!(call, 19.916_986_281_101_28, epsilon = 1e-10);
        let put = lookback(&p, OptionType::Put, LookbackKind::Floating, None, 1.0);
        assert_relative_eq!(put, 19.067_789_828_791_348, epsilon = 1e-10);
        let seasoned = lookback(&p, OptionType::Call, LookbackKind::Floating, Some(90.0), 1.0);
        assert_relative_eq!(seasoned, 21.519_973_630_058_587, epsilon = 1e-10);
    }

    #[test]
    fn fixed_reference_values() {
        let p = process();
        let fixed_at = |strike| LookbackKind::Fixed { strike };
        let call = lookback(&p, OptionType::Call, fixed_at(100.0), None, 1.0);
        assert_relative_eq!(call, 22.949_830_753_636_753, epsilon = 1e-10);
        let put = lookback(&p, OptionType::Put, fixed_at(100.0), None, 1.0);
        assert_relative_eq!(put, 16.034_945_356_255_875, epsilon = 1e-10);
        let locked = lookback(&p, OptionType::Call, fixed_at(95.0), Some(110.0), 1.0);
        assert_relative_eq!(locked, 29.106_884_142_520_205, epsilon = 1e-10);
        let locked_put = lookback(&p, OptionType::Put, fixed_at(105.0), Some(90.0), 1.0);
        assert_relative_eq!(locked_put, 22.394_079_827_716_762, epsilon = 1e-10);
    }

    #[test]
    fn zero_carry_limit_is_continuous() {
        let flat = BlackScholesProcess::new(100.0, 0.03, 0.03, 0.25);
        let near = BlackScholesProcess::new(100.0, 0.03, 0.03 + 1e-6, 0.25);
        let a = lookback(&flat, OptionType::Call, LookbackKind::Floating, None, 1.0);
        let b = lookback(&near, OptionType::Call, LookbackKind::Floating, None, 1.0);
        assert_relative_eq!(a, 17.891_637_607_241_663, epsilon = 1e-10);
        assert_relative_eq!(b, 17.891_580_139_149_96, epsilon = 1e-9);
        let put = lookback(&flat, OptionType::Put, LookbackKind::Floating, None, 1.0);
        assert_relative_eq!(put, 20.924_279_899_580_753, epsilon = 1e-10);
    }

    #[test]
    fn lookback_dominates_vanilla() {
        let p = process();
        let vanilla =
            super::super::black_scholes::black_scholes_price(&p, OptionType::Call, 100.0, 1.0);
        let fixed = lookback(
            &p,
            OptionType::Call,
            LookbackKind::Fixed { strike: 100.0 },
            None,
            1.0,
        );
        assert!(fixed > vanilla);
    }

    #[test]
    fn expiry_pays_the_extreme() {
        let p = process();
        let v = lookback(&p, OptionType::Put, LookbackKind::Floating, Some(120.0), 0.0);
        assert_relative_eq!(v, 20.0);
    }
}
