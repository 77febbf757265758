//! Single-barrier options (Reiner & Rubinstein, 1991).
//!
//! Prices all eight up/down × in/out × call/put combinations of a
//! continuously monitored barrier on a European vanilla payoff. Knock-out
//! rebates are paid at the hit; knock-in rebates at expiry.

use ol_core::{Real, Time};
use ol_instruments::{BarrierType, OptionType};
use ol_math::normal_cdf;
use ol_methods::BlackScholesProcess;

/// Closed-form barrier option price.
///
/// The spot must lie strictly on the live side of the barrier; contract
/// validation guarantees it.
pub fn barrier_price(
    process: &BlackScholesProcess,
    right: OptionType,
    barrier_type: BarrierType,
    strike: Real,
    barrier: Real,
    rebate: Real,
    t: Time,
) -> Real {
    let spot = process.spot;
    if t <= 0.0 {
        return if barrier_type.is_out() {
            right.intrinsic(spot, strike)
        } else {
            rebate
        };
    }

    let r = process.rate;
    let q = process.dividend;
    let sigma = process.volatility;
    let sigma2 = sigma * sigma;
    let sst = sigma * t.sqrt();
    let mu = (r - q - 0.5 * sigma2) / sigma2;
    let lambda = (mu * mu * sigma2 + 2.0 * r).sqrt() / sigma;
    let z = (barrier / spot).ln() / sst + lambda * sst;

    let phi = right.sign();
    let eta = if barrier_type.is_down() { 1.0 } else { -1.0 };

    let x1 = (spot / strike).ln() / sst + (1.0 + mu) * sst;
    let x2 = (spot / barrier).ln() / sst + (1.0 + mu) * sst;
    let y1 = (barrier * barrier / (spot * strike)).ln() / sst + (1.0 + mu) * sst;
    let y2 = (barrier / spot).ln() / sst + (1.0 + mu) * sst;

    let df_r = (-r * t).exp();
    let df_q = (-q * t).exp();
    let hs = barrier / spot;
    let hs_2mu = hs.powf(2.0 * mu);
    let hs_2mu2 = hs.powf(2.0 * (mu + 1.0));

    // Components A through F.
    let a = phi * spot * df_q * normal_cdf(phi * x1)
        - phi * strike * df_r * normal_cdf(phi * (x1 - sst));
    let b = phi * spot * df_q * normal_cdf(phi * x2)
        - phi * strike * df_r * normal_cdf(phi * (x2 - sst));
    let c = phi * spot * df_q * hs_2mu2 * normal_cdf(eta * y1)
        - phi * strike * df_r * hs_2mu * normal_cdf(eta * (y1 - sst));
    let d = phi * spot * df_q * hs_2mu2 * normal_cdf(eta * y2)
        - phi * strike * df_r * hs_2mu * normal_cdf(eta * (y2 - sst));
    let e = rebate
        * df_r
        * (normal_cdf(eta * (x2 - sst)) - hs_2mu * normal_cdf(eta * (y2 - sst)));
    let f = rebate
        * (hs.powf(mu + lambda) * normal_cdf(eta * z)
            + hs.powf(mu - lambda) * normal_cdf(eta * (z - 2.0 * lambda * sst)));

    let high_strike = strike >= barrier;
    match (barrier_type, right) {
        (BarrierType::DownIn, OptionType::Call) if high_strike => c + e,
        (BarrierType::DownIn, OptionType::Call) => a - b + d + e,
        (BarrierType::DownIn, OptionType::Put) if high_strike => b - c + d + e,
        (BarrierType::DownIn, OptionType::Put) => a + e,

        (BarrierType::UpIn, OptionType::Call) if high_strike => a + e,
        (BarrierType::UpIn, OptionType::Call) => b - c + d + e,
        (BarrierType::UpIn, OptionType::Put) if high_strike => a - b + d + e,
        (BarrierType::UpIn, OptionType::Put) => c + e,

        (BarrierType::DownOut, OptionType::Call) if high_strike => a - c + f,
        (BarrierType::DownOut, OptionType::Call) => b - d + f,
        (BarrierType::DownOut, OptionType::Put) if high_strike => a - b + c - d + f,
        (BarrierType::DownOut, OptionType::Put) => f,

        (BarrierType::UpOut, OptionType::Call) if high_strike => f,
        (BarrierType::UpOut, OptionType::Call) => a - b + c - d + f,
        (BarrierType::UpOut, OptionType::Put) if high_strike => b - d + f,
        (BarrierType::UpOut, OptionType::Put) => a - c + f,
    }
    .max(0.0)
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
    fn down_and_out_call_reference() {
        let v = barrier_price(
            &process(),
            OptionType::Call,
            BarrierType::DownOut,
            100.0,
            90.0,
            0.0,
            1.0,
        );
        assert_relative_eq!(v, 8.615_032_677_349_781, epsilon = 1e-10);
    }

    #[test]
    fn up_and_out_put_with_rebate() {
        let v = barrier_price(
            &process(),
            OptionType::Put,
            BarrierType::UpOut,
            100.0,
            110.0,
            2.0,
            1.0,
        );
        assert_relative_eq!(v, 6.615_430_505_239_525, epsilon = 1e-10);
    }

    #[test]
    fn rebates_on_all_four_directions() {
        let p = process();
        let cases = [
            (OptionType::Call, BarrierType::DownIn, 90.0, 4.064_62),
            (OptionType::Put, BarrierType::UpIn, 110.0, 3.449_26),
            (OptionType::Call, BarrierType::DownOut, 90.0, 10.577_95),
            (OptionType::Put, BarrierType::UpOut, 110.0, 7.318_74),
        ];
        for (right, barrier_type, barrier, expected) in cases {
            let v = barrier_price(&p, right, barrier_type, 100.0, barrier, 3.0, 1.0);
            assert_relative_eq!(v, expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn in_plus_out_equals_vanilla() {
        let p = process();
        let cases = [
            (OptionType::Call, 90.0, BarrierType::DownIn, BarrierType::DownOut),
            (OptionType::Put, 90.0, BarrierType::DownIn, BarrierType::DownOut),
            (OptionType::Call, 120.0, BarrierType::UpIn, BarrierType::UpOut),
            (OptionType::Put, 120.0, BarrierType::UpIn, BarrierType::UpOut),
        ];
        for strike in [85.0, 100.0, 125.0] {
            for (right, barrier, knock_in, knock_out) in cases {
                let vin = barrier_price(&p, right, knock_in, strike, barrier, 0.0, 1.0);
                let vout = barrier_price(&p, right, knock_out, strike, barrier, 0.0, 1.0);
                let vanilla = black_scholes_price(&p, right, strike, 1.0);
                assert_relative_eq!(vin + vout, vanilla, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn knock_out_is_cheaper_than_vanilla() {
        let p = process();
        let knocked = barrier_price(
            &p,
            OptionType::Call,
            BarrierType::UpOut,
            100.0,
            130.0,
            0.0,
            1.0,
        );
        assert!(knocked < black_scholes_price(&p, OptionType::Call, 100.0, 1.0));
        assert!(knocked > 0.0);
    }
}
