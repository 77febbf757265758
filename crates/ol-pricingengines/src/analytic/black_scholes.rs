//! Black–Scholes–Merton.
//!
//! Prices European vanilla options with the closed form
//!
//! $$C = S e^{-qT} N(d_1) - K e^{-rT} N(d_2)$$
//! $$P = K e^{-rT} N(-d_2) - S e^{-qT} N(-d_1)$$
//!
//! where $d_{1,2} = \frac{\ln(S/K) + (r - q \pm \sigma^2/2)T}{\sigma\sqrt{T}}$,
//! and its first and second order Greeks. The process may carry an adjusted
//! dividend yield (quanto drift, exchange numeraire), so `q` is not assumed
//! to be non-negative here.

use ol_core::{Real, Time};
use ol_instruments::{Greeks, OptionType};
use ol_math::{normal_cdf, normal_pdf};
use ol_methods::BlackScholesProcess;

/// Below this total standard deviation the option is valued at its
/// discounted forward intrinsic value.
pub const MIN_STD_DEV: Real = 1e-15;

/// Price and Greeks of a European vanilla option.
///
/// Vega is per unit of volatility, theta per year of calendar time, rho per
/// unit of rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholesValue {
    /// Present value.
    pub price: Real,
    /// ∂V/∂S.
    pub delta: Real,
    /// ∂²V/∂S².
    pub gamma: Real,
    /// ∂V/∂σ.
    pub vega: Real,
    /// ∂V/∂t.
    pub theta: Real,
    /// ∂V/∂r.
    pub rho: Real,
}

impl BlackScholesValue {
    /// All five Greeks.
    pub fn greeks(&self) -> Greeks {
        Greeks::full(self.delta, self.gamma, self.vega, self.theta, self.rho)
    }

    /// Every field multiplied by `factor`.
    pub fn scaled(self, factor: Real) -> Self {
        Self {
            price: self.price * factor,
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            vega: self.vega * factor,
            theta: self.theta * factor,
            rho: self.rho * factor,
        }
    }
}

/// Black–Scholes–Merton value of a European option with `t` years left.
///
/// `t ≤ 0` gives the intrinsic value; a vanishing `σ√t` gives the
/// discounted forward intrinsic value with its exact sensitivities.
pub fn black_scholes(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    t: Time,
) -> BlackScholesValue {
    let phi = right.sign();
    let spot = process.spot;

    if t <= 0.0 {
        let itm = phi * (spot - strike) > 0.0;
        return BlackScholesValue {
            price: right.intrinsic(spot, strike),
            delta: if itm { phi } else { 0.0 },
            gamma: 0.0,
            vega: 0.0,
            theta: 0.0,
            rho: 0.0,
        };
    }

    let r = process.rate;
    let q = process.dividend;
    let sigma = process.volatility;
    let sqrt_t = t.sqrt();
    let std_dev = sigma * sqrt_t;
    let df_r = (-r * t).exp();
    let df_q = (-q * t).exp();

    if std_dev < MIN_STD_DEV {
        let forward_value = phi * (spot * df_q - strike * df_r);
        if forward_value <= 0.0 {
            return BlackScholesValue {
                price: 0.0,
                delta: 0.0,
                gamma: 0.0,
                vega: 0.0,
                theta: 0.0,
                rho: 0.0,
            };
        }
        return BlackScholesValue {
            price: forward_value,
            delta: phi * df_q,
            gamma: 0.0,
            vega: 0.0,
            theta: phi * (q * spot * df_q - r * strike * df_r),
            rho: phi * strike * t * df_r,
        };
    }

    let d1 = ((spot / strike).ln() + (r - q + 0.5 * sigma * sigma) * t) / std_dev;
    let d2 = d1 - std_dev;
    let nd1 = normal_cdf(phi * d1);
    let nd2 = normal_cdf(phi * d2);
    let npd1 = normal_pdf(d1);

    let price = phi * (spot * df_q * nd1 - strike * df_r * nd2);
    let delta = phi * df_q * nd1;
    let gamma = df_q * npd1 / (spot * std_dev);
    let vega = spot * df_q * npd1 * sqrt_t;
    let theta = -(spot * df_q * npd1 * sigma) / (2.0 * sqrt_t) - phi * r * strike * df_r * nd2
        + phi * q * spot * df_q * nd1;
    let rho = phi * strike * t * df_r * nd2;

    BlackScholesValue {
        price,
        delta,
        gamma,
        vega,
        theta,
        rho,
    }
}

/// Black–Scholes–Merton price only.
pub fn black_scholes_price(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    t: Time,
) -> Real {
    black_scholes(process, right, strike, t).price
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn process(spot: Real, r: Real, q: Real, sigma: Real) -> BlackScholesProcess {
        BlackScholesProcess::new(spot, r, q, sigma)
    }

    #[test]
    fn reference_call_and_put() {
        let p = process(100.0, 0.05, 0.0, 0.20);
        let call = black_scholes(&p, OptionType::Call, 100.0, 1.0);
        assert_relative_eq!(call.price, 10.450_583_572_185_565, epsilon = 1e-10);
        assert_relative_eq!(call.delta, 0.636_830_651, epsilon = 1e-8);
        assert_relative_eq!(call.gamma, 0.018_762_017, epsilon = 1e-8);
        assert_relative_eq!(call.theta, -6.414_027_546, epsilon = 1e-6);
        let put = black_scholes(&p, OptionType::Put, 100.0, 1.0);
        assert_relative_eq!(put.price, 5.573_526_022_256_971, epsilon = 1e-10);
    }

    #[test]
    fn greeks_match_bumped_prices() {
        let (s, k, r, q, v, t) = (105.0, 100.0, 0.04, 0.02, 0.3, 0.75);
        for right in [OptionType::Call, OptionType::Put] {
            let g = black_scholes(&process(s, r, q, v), right, k, t);
            let price = |s: Real, r: Real, v: Real, t: Real| {
                black_scholes_price(&process(s, r, q, v), right, k, t)
            };
            let h = 1e-4;
            let delta = (price(s + h, r, v, t) - price(s - h, r, v, t)) / (2.0 * h);
            let gamma =
                (price(s + h, r, v, t) - 2.0 * price(s, r, v, t) + price(s - h, r, v, t)) / (h * h);
            let vega = (price(s, r, v + h, t) - price(s, r, v - h, t)) / (2.0 * h);
            let rho = (price(s, r + h, v, t) - price(s, r - h, v, t)) / (2.0 * h);
            let theta = -(price(s, r, v, t + h) - price(s, r, v, t - h)) / (2.0 * h);
            assert_relative_eq!(g.delta, delta, epsilon = 1e-6);
            assert_relative_eq!(g.gamma, gamma, epsilon = 1e-4);
            assert_relative_eq!(g.vega, vega, epsilon = 1e-5);
            assert_relative_eq!(g.rho, rho, epsilon = 1e-5);
            assert_relative_eq!(g.theta, theta, epsilon = 1e-5);
        }
    }

    #[test]
    fn vanishing_volatility_gives_discounted_intrinsic() {
        let p = process(100.0, 0.05, 0.01, 1e-18);
        let call = black_scholes(&p, OptionType::Call, 95.0, 2.0);
        let expected = 100.0 * (-0.02f64).exp() - 95.0 * (-0.1f64).exp();
        assert_relative_eq!(call.price, expected, epsilon = 1e-12);
        assert_relative_eq!(call.delta, (-0.02f64).exp(), epsilon = 1e-15);
        assert_eq!(call.gamma, 0.0);
        let put = black_scholes(&p, OptionType::Put, 95.0, 2.0);
        assert_eq!(put.price, 0.0);
    }

    #[test]
    fn expiry_gives_intrinsic() {
        let p = process(110.0, 0.05, 0.0, 0.2);
        assert_eq!(black_scholes_price(&p, OptionType::Call, 100.0, 0.0), 10.0);
        assert_eq!(black_scholes_price(&p, OptionType::Put, 100.0, 0.0), 0.0);
    }

    proptest! {
        #[test]
        fn put_call_parity(
            s in 10.0..300.0f64,
            k in 10.0..300.0f64,
            r in -0.02..0.15f64,
            q in 0.0..0.1f64,
            v in 0.01..1.0f64,
            t in 0.01..5.0f64,
        ) {
            let p = process(s, r, q, v);
            let call = black_scholes_price(&p, OptionType::Call, k, t);
            let put = black_scholes_price(&p, OptionType::Put, k, t);
            let forward = s * (-q * t).exp() - k * (-r * t).exp();
            prop_assert!((call - put - forward).abs() < 1e-9 * s.max(k));
        }

        #[test]
        fn price_lies_within_no_arbitrage_bounds(
            s in 10.0..300.0f64,
            k in 10.0..300.0f64,
            v in 0.01..1.0f64,
            t in 0.01..5.0f64,
        ) {
            let p = process(s, 0.03, 0.01, v);
            let call = black_scholes_price(&p, OptionType::Call, k, t);
            let lower = (s * (-0.01 * t).exp() - k * (-0.03 * t).exp()).max(0.0);
            prop_assert!(call >= lower - 1e-9);
            prop_assert!(call <= s * (-0.01 * t).exp() + 1e-9);
        }
    }
}
