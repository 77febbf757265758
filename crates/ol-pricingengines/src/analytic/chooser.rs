//! Simple chooser option (Rubinstein, 1991).
//!
//! At `t₁` the holder picks a call or a put with common strike `K` and
//! maturity `T`. By put-call parity this is a call to `T` plus
//! `e^{−q(T−t₁)}` puts to `t₁` struck at `K e^{−b(T−t₁)}`.

use ol_core::{Real, Time};
use ol_math::normal_cdf;
use ol_methods::BlackScholesProcess;

/// Price of a simple chooser with decision time `choose_time` and
/// maturity `t`.
pub fn simple_chooser(
    process: &BlackScholesProcess,
    strike: Real,
    choose_time: Time,
    t: Time,
) -> Real {
    let spot = process.spot;
    let sigma = process.volatility;
    let b = process.carry();
    let sst = sigma * t.sqrt();
    let ss1 = sigma * choose_time.sqrt();
    let log_sk = (spot / strike).ln();

    let d = (log_sk + (b + 0.5 * sigma * sigma) * t) / sst;
    let y = (log_sk + b * t + 0.5 * sigma * sigma * choose_time) / ss1;
    let df_r = process.discount(t);
    let df_q = process.dividend_discount(t);

    spot * df_q * normal_cdf(d) - strike * df_r * normal_cdf(d - sst) - spot * df_q * normal_cdf(-y)
        + strike * df_r * normal_cdf(-y + ss1)
}
