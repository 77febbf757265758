//! Discretely sampled Asian options.
//!
//! The geometric average of log-normal fixings is itself log-normal, which
//! gives an exact Black-type formula. The arithmetic average is priced by
//! matching its first two moments to a log-normal (Levy, 1992).

use ol_core::{Real, Time};
use ol_instruments::OptionType;
use ol_math::normal_cdf;
use ol_methods::BlackScholesProcess;

use super::black_scholes::MIN_STD_DEV;

/// Fixing times `t_k = start + k (T − start) / m`, `k = 1..m`.
pub fn fixing_times(start: Time, maturity: Time, fixings: usize) -> Vec<Time> {
    let m = fixings as Real;
    (1..=fixings)
        .map(|k| start + (maturity - start) * k as Real / m)
        .collect()
}

/// Black formula on a log-normal underlying with forward `forward` and
/// log-variance `variance`, discounted with `df`.
fn lognormal_option(right: OptionType, forward: Real, strike: Real, variance: Real, df: Real) -> Real {
    let phi = right.sign();
    let sd = variance.max(0.0).sqrt();
    if sd < MIN_STD_DEV {
        return df * right.intrinsic(forward, strike);
    }
    let d1 = ((forward / strike).ln() + 0.5 * variance) / sd;
    let d2 = d1 - sd;
    df * phi * (forward * normal_cdf(phi * d1) - strike * normal_cdf(phi * d2))
}

/// Exact price of a geometric-average Asian option.
pub fn geometric_asian(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    averaging_start: Time,
    maturity: Time,
    fixings: usize,
) -> Real {
    let times = fixing_times(averaging_start, maturity, fixings);
    let m = fixings as Real;
    let sigma2 = process.volatility * process.volatility;

    let mean_time = times.iter().sum::<Real>() / m;
    let mu = process.spot.ln() + process.log_drift() * mean_time;
    // Σᵢ Σⱼ min(tᵢ, tⱼ) over ascending times.
    let cross: Real = times
        .iter()
        .enumerate()
        .map(|(k, &t)| t * (2 * (fixings - k) - 1) as Real)
        .sum();
    let variance = sigma2 * cross / (m * m);

    let forward = (mu + 0.5 * variance).exp();
    lognormal_option(right, forward, strike, variance, process.discount(maturity))
}

/// Levy's moment-matched price of an arithmetic-average Asian option.
pub fn levy_asian(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    averaging_start: Time,
    maturity: Time,
    fixings: usize,
) -> Real {
    let times = fixing_times(averaging_start, maturity, fixings);
    let m = fixings as Real;
    let s = process.spot;
    let b = process.carry();
    let sigma2 = process.volatility * process.volatility;

    let m1 = times.iter().map(|&t| s * (b * t).exp()).sum::<Real>() / m;
    let mut m2 = 0.0;
    for &ti in &times {
        for &tj in &times {
            m2 += s * s * (b * (ti + tj) + sigma2 * ti.min(tj)).exp();
        }
    }
    m2 /= m * m;

    let variance = (m2 / (m1 * m1)).ln();
    lognormal_option(right, m1, strike, variance, process.discount(maturity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn process() -> BlackScholesProcess {
        BlackScholesProcess::new(100.0, 0.05, 0.01, 0.25)
    }

    #[test]
    fn fixing_schedule() {
        let t = fixing_times(0.5, 1.0, 4);
        assert_eq!(t.len(), 4);
        assert_relative_eq!(t[0], 0.625);
        assert_relative_eq!(t[3], 1.0);
    }

    #[test]
    fn geometric_reference_values() {
        let p = process();
        let call = geometric_asian(&p, OptionType::Call, 100.0, 0.0, 1.0, 12);
        assert_relative_eq!(call, 6.686_089_097_698_59, epsilon = 1e-10);
        let put = geometric_asian(&p, OptionType::Put, 100.0, 0.0, 1.0, 12);
        assert_relative_eq!(put, 5.104_072_079_514_037, epsilon = 1e-10);
        let late_put = geometric_asian(&p, OptionType::Put, 100.0, 0.5, 1.0, 6);
        assert_relative_eq!(late_put, 6.771_793_822_192_427, epsilon = 1e-10);
    }

    #[test]
    fn levy_reference_values() {
        let p = process();
        let call = levy_asian(&p, OptionType::Call, 100.0, 0.0, 1.0, 12);
        assert_relative_eq!(call, 7.019_547_556_034_036, epsilon = 1e-10);
        let put = levy_asian(&p, OptionType::Put, 100.0, 0.0, 1.0, 12);
        assert_relative_eq!(put, 4.929_625_317_726_61, epsilon = 1e-10);
    }

    #[test]
    fn arithmetic_call_exceeds_geometric() {
        let p = process();
        for k in [80.0, 100.0, 120.0] {
            let g = geometric_asian(&p, OptionType::Call, k, 0.0, 1.0, 24);
            let a = levy_asian(&p, OptionType::Call, k, 0.0, 1.0, 24);
            assert!(a > g, "strike {k}: {a} <= {g}");
        }
    }

    #[test]
    fn single_fixing_at_maturity_is_european() {
        let p = process();
        let euro = super::super::black_scholes::black_scholes_price(&p, OptionType::Call, 100.0, 1.0);
        let g = geometric_asian(&p, OptionType::Call, 100.0, 0.0, 1.0, 1);
        let a = levy_asian(&p, OptionType::Call, 100.0, 0.0, 1.0, 1);
        assert_relative_eq!(g, euro, epsilon = 1e-10);
        assert_relative_eq!(a, euro, epsilon = 1e-10);
    }
}
