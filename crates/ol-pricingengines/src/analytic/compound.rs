//! Options on options (Geske, 1979).

use ol_core::{errors::Result, Real, Time};
use ol_instruments::OptionType;
use ol_math::{bivariate_normal_cdf, normal_cdf, solvers1d::find_root};
use ol_methods::BlackScholesProcess;

use super::black_scholes::black_scholes_price;

const CRITICAL_SPOT_ACCURACY: Real = 1e-10;

/// Price of a compound option.
///
/// The outer option (`right`, strike `outer_strike`, maturity `t`) is
/// written on a European inner option (`inner_right`, `inner_strike`,
/// maturity `inner_maturity`). The critical spot at which the inner option
/// is worth the outer strike is found with Brent's method. When an inner
/// put can never be worth the outer strike, the call on it is worthless
/// and the put on it is always exercised.
pub fn geske_compound(
    process: &BlackScholesProcess,
    right: OptionType,
    inner_right: OptionType,
    outer_strike: Real,
    inner_strike: Real,
    t: Time,
    inner_maturity: Time,
) -> Result<Real> {
    let spot = process.spot;
    let tau = inner_maturity - t;
    let df_tau = process.discount(tau);

    if inner_right == OptionType::Put && outer_strike >= inner_strike * df_tau {
        return Ok(match right {
            OptionType::Call => 0.0,
            OptionType::Put => {
                outer_strike * process.discount(t)
                    - black_scholes_price(process, OptionType::Put, inner_strike, inner_maturity)
            }
        });
    }

    let inner_less_strike = |s: Real| {
        black_scholes_price(&process.with_spot(s), inner_right, inner_strike, tau) - outer_strike
    };
    let critical = find_root(
        inner_less_strike,
        0.5 * inner_strike,
        2.0 * inner_strike,
        0.0,
        CRITICAL_SPOT_ACCURACY,
    )?;

    let sigma = process.volatility;
    let b = process.carry();
    let w = right.sign();
    let phi = inner_right.sign();
    let s1 = sigma * t.sqrt();
    let s2 = sigma * inner_maturity.sqrt();
    let y1 = ((spot / critical).ln() + (b + 0.5 * sigma * sigma) * t) / s1;
    let y2 = y1 - s1;
    let z1 = ((spot / inner_strike).ln() + (b + 0.5 * sigma * sigma) * inner_maturity) / s2;
    let z2 = z1 - s2;
    let rho = (t / inner_maturity).sqrt();

    let value = w
        * (phi
            * spot
            * process.dividend_discount(inner_maturity)
            * bivariate_normal_cdf(phi * z1, w * phi * y1, w * rho)
            - phi
                * inner_strike
                * process.discount(inner_maturity)
                * bivariate_normal_cdf(phi * z2, w * phi * y2, w * rho)
            - outer_strike * process.discount(t) * normal_cdf(w * phi * y2));
    Ok(value.max(0.0))
}
