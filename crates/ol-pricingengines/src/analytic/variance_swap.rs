//! Variance swap fair value under constant volatility.
//!
//! With `e` years already elapsed at realised variance `R` and `T` years to
//! run, the expected annualised variance over the whole window is
//! `(R e + σ² T) / (e + T)`. The swap pays `N (σ²_realised − K_var)` at
//! maturity.

use ol_core::{Real, Time};
use ol_instruments::Greeks;
use ol_methods::BlackScholesProcess;

/// Present value and sensitivities of a variance swap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceSwapValue {
    /// Present value to the variance receiver.
    pub price: Real,
    /// Expected annualised variance over the whole window.
    pub expected_variance: Real,
    /// Zero delta and gamma, vega and rho.
    pub greeks: Greeks,
}

/// Value of a variance swap with `t` years to maturity.
pub fn variance_swap(
    process: &BlackScholesProcess,
    variance_strike: Real,
    notional: Real,
    realized_variance: Real,
    elapsed: Time,
    t: Time,
) -> VarianceSwapValue {
    let sigma = process.volatility;
    let window = elapsed + t;
    let expected_variance = (realized_variance * elapsed + sigma * sigma * t) / window;
    let df = process.discount(t);
    let price = notional * df * (expected_variance - variance_strike);
    VarianceSwapValue {
        price,
        expected_variance,
        greeks: Greeks {
            delta: Some(0.0),
            gamma: Some(0.0),
            vega: Some(notional * df * 2.0 * sigma * t / window),
            theta: None,
            rho: Some(-t * price),
        },
    }
}
