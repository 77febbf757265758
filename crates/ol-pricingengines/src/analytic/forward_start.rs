//! Forward-start options (Rubinstein, 1990).
//!
//! The strike is fixed at `α S(t₁)`. By homogeneity the option is worth
//! `S e^{−q t₁}` units of an at-`α` option on a unit spot with `T − t₁`
//! years to run.

use ol_core::{Real, Time};
use ol_instruments::OptionType;
use ol_methods::BlackScholesProcess;

use super::black_scholes::{black_scholes, BlackScholesValue};

/// Price and Greeks of a forward-start option.
///
/// Delta is `V/S`, gamma vanishes, theta is `qV`; vega and rho are those of
/// the unit option scaled by `S e^{−q t₁}`.
pub fn forward_start(
    process: &BlackScholesProcess,
    right: OptionType,
    moneyness: Real,
    start_time: Time,
    t: Time,
) -> BlackScholesValue {
    let spot = process.spot;
    let scale = spot * process.dividend_discount(start_time);
    let unit = black_scholes(&process.with_spot(1.0), right, moneyness, t - start_time);
    let price = scale * unit.price;
    BlackScholesValue {
        price,
        delta: price / spot,
        gamma: 0.0,
        vega: scale * unit.vega,
        theta: process.dividend * price,
        rho: scale * unit.rho,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytic::black_scholes::black_scholes_price;
    use approx::assert_relative_eq;

    fn process() -> BlackScholesProcess {
        BlackScholesProcess::new(100.0, 0.05, 0.01, 0.25)
    }

    #[test]
    fn reference_values() {
        let call = forward_start(&process(), OptionType::Call, 1.0, 0.25, 1.0);
        assert_relative_eq!(call.price, 9.951_909_864_996_233, epsilon = 1e-10);
        let put = forward_start(&process(), OptionType::Put, 1.1, 0.5, 1.0);
        assert_relative_eq!(put.price, 11.763_539_843_066_189, epsilon = 1e-10);
    }

    #[test]
    fn immediate_start_is_vanilla() {
        let p = process();
        let v = forward_start(&p, OptionType::Call, 1.05, 0.0, 1.0);
        assert_relative_eq!(
            v.price,
            black_scholes_price(&p, OptionType::Call, 105.0, 1.0),
            epsilon = 1e-10
        );
    }

    #[test]
    fn spot_greeks() {
        let v = forward_start(&process(), OptionType::Call, 1.0, 0.25, 1.0);
        assert_relative_eq!(v.delta, v.price / 100.0);
        assert_eq!(v.gamma, 0.0);
        assert_relative_eq!(v.theta, 0.01 * v.price);
    }
}
