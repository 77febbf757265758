//! Cash-or-nothing, asset-or-nothing and gap options.

use ol_core::{Real, Time};
use ol_instruments::{BinaryKind, OptionType};
use ol_math::{normal_cdf, normal_pdf};
use ol_methods::BlackScholesProcess;

use super::black_scholes::{BlackScholesValue, MIN_STD_DEV};

/// Price and Greeks of a European binary option.
pub fn binary(
    process: &BlackScholesProcess,
    right: OptionType,
    binary: BinaryKind,
    strike: Real,
    t: Time,
) -> BlackScholesValue {
    match binary {
        BinaryKind::CashOrNothing { cash } => cash_or_nothing(process, right, strike, t).scaled(cash),
        BinaryKind::AssetOrNothing => asset_or_nothing(process, right, strike, t),
    }
}

/// Pays `φ (S − K₂)` when `φ (S − K₁) > 0`: an asset-or-nothing less `K₂`
/// cash-or-nothing claims, both triggered at `K₁`.
pub fn gap(
    process: &BlackScholesProcess,
    right: OptionType,
    trigger: Real,
    payment_strike: Real,
    t: Time,
) -> BlackScholesValue {
    let asset = asset_or_nothing(process, right, trigger, t);
    let cash = cash_or_nothing(process, right, trigger, t);
    let phi = right.sign();
    BlackScholesValue {
        price: phi * (asset.price - payment_strike * cash.price),
        delta: phi * (asset.delta - payment_strike * cash.delta),
        gamma: phi * (asset.gamma - payment_strike * cash.gamma),
        vega: phi * (asset.vega - payment_strike * cash.vega),
        theta: phi * (asset.theta - payment_strike * cash.theta),
        rho: phi * (asset.rho - payment_strike * cash.rho),
    }
}

fn flat(price: Real, delta: Real) -> BlackScholesValue {
    BlackScholesValue {
        price,
        delta,
        gamma: 0.0,
        vega: 0.0,
        theta: 0.0,
        rho: 0.0,
    }
}

/// Unit cash paid when the option finishes in the money.
fn cash_or_nothing(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    t: Time,
) -> BlackScholesValue {
    let phi = right.sign();
    let spot = process.spot;
    if t <= 0.0 {
        return flat(if phi * (spot - strike) > 0.0 { 1.0 } else { 0.0 }, 0.0);
    }
    let df = process.discount(t);
    let sigma = process.volatility;
    let sqrt_t = t.sqrt();
    let sd = sigma * sqrt_t;
    if sd < MIN_STD_DEV {
        let itm = phi * (process.forward(t) - strike) > 0.0;
        return flat(if itm { df } else { 0.0 }, 0.0);
    }

    let b = process.carry();
    let d2 = ((spot / strike).ln() + (b - 0.5 * sigma * sigma) * t) / sd;
    let d1 = d2 + sd;
    let nd2 = normal_pdf(d2);
    let price = df * normal_cdf(phi * d2);
    let density = phi * df * nd2;

    BlackScholesValue {
        price,
        delta: density / (spot * sd),
        gamma: -density * d1 / (spot * spot * sd * sd),
        vega: -density * d1 / sigma,
        theta: process.rate * price
            - density * ((b - 0.5 * sigma * sigma) / sd - d2 / (2.0 * t)),
        rho: -t * price + density * sqrt_t / sigma,
    }
}

/// One unit of the asset delivered when the option finishes in the money.
fn asset_or_nothing(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    t: Time,
) -> BlackScholesValue {
    let phi = right.sign();
    let spot = process.spot;
    if t <= 0.0 {
        let itm = phi * (spot - strike) > 0.0;
        return flat(if itm { spot } else { 0.0 }, if itm { 1.0 } else { 0.0 });
    }
    let dq = process.dividend_discount(t);
    let sigma = process.volatility;
    let sqrt_t = t.sqrt();
    let sd = sigma * sqrt_t;
    if sd < MIN_STD_DEV {
        let itm = phi * (process.forward(t) - strike) > 0.0;
        return if itm {
            flat(spot * dq, dq)
        } else {
            flat(0.0, 0.0)
        };
    }

    let b = process.carry();
    let d1 = ((spot / strike).ln() + (b + 0.5 * sigma * sigma) * t) / sd;
    let d2 = d1 - sd;
    let nd1 = normal_pdf(d1);
    let price = spot * dq * normal_cdf(phi * d1);
    let density = phi * dq * nd1;

    BlackScholesValue {
        price,
        delta: dq * normal_cdf(phi * d1) + density / sd,
        gamma: -density * d2 / (spot * sd * sd),
        vega: -spot * density * d2 / sigma,
        theta: process.dividend * price
            - spot * density * ((b + 0.5 * sigma * sigma) / sd - d1 / (2.0 * t)),
        rho: spot * density * sqrt_t / sigma,
    }
}
