//! Single-asset reductions.
//!
//! Two payoffs that read a second random factor collapse onto an ordinary
//! Black–Scholes process, which lets every single-asset method price them:
//!
//! - a quanto is a vanilla on the asset with its drift corrected by the
//!   asset/FX covariance, paid at the fixed conversion rate;
//! - an exchange option is a vanilla struck at `S₂` on a process that takes
//!   the second asset as numeraire: rate `q₂`, dividend `q₁` and volatility
//!   `√(σ₁² + σ₂² − 2ρσ₁σ₂)`.

use ol_core::Real;
use ol_instruments::UnderlyingAsset;
use ol_methods::BlackScholesProcess;

/// Domestic-measure process of a foreign asset whose payoff is converted at
/// a fixed rate: the dividend yield becomes `q + r − r_f + ρ σ σ_X`.
pub fn quanto_process(
    process: &BlackScholesProcess,
    fx_volatility: Real,
    correlation: Real,
    foreign_rate: Real,
) -> BlackScholesProcess {
    let adjusted_dividend = process.dividend + process.rate - foreign_rate
        + correlation * process.volatility * fx_volatility;
    BlackScholesProcess::new(
        process.spot,
        process.rate,
        adjusted_dividend,
        process.volatility,
    )
}

/// Volatility of `S₁/S₂`.
pub fn ratio_volatility(sigma1: Real, sigma2: Real, correlation: Real) -> Real {
    (sigma1 * sigma1 + sigma2 * sigma2 - 2.0 * correlation * sigma1 * sigma2)
        .max(0.0)
        .sqrt()
}

/// Process on which a vanilla call struck at `second.spot` is worth the
/// option to exchange `second` for the market underlying.
pub fn exchange_process(
    process: &BlackScholesProcess,
    second: &UnderlyingAsset,
    correlation: Real,
) -> BlackScholesProcess {
    BlackScholesProcess::new(
        process.spot,
        second.dividend,
        process.dividend,
        ratio_volatility(process.volatility, second.volatility, correlation),
    )
}
