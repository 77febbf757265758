//! Closed-form formulas and the analytic engine.

pub mod american;
pub mod asian;
pub mod barrier;
pub mod binary;
pub mod black_scholes;
pub mod chooser;
pub mod compound;
pub mod forward_start;
pub mod lookback;
pub mod two_asset;
pub mod variance_swap;

use ol_core::{errors::Result, Error, Real, Time};
use ol_instruments::{
    Averaging, Diagnostics, ExerciseStyle, Greeks, MarketParameters, Method, OptionContract,
    OptionType, Payoff, PricingResult,
};
use ol_methods::BlackScholesProcess;
use tracing::debug;

use crate::engine::{prepare, PricingEngine};
use crate::reduction::{exchange_process, quanto_process};
use black_scholes::{black_scholes, BlackScholesValue};
use two_asset::TwoAssets;

/// Relative spot bump for finite-difference delta and gamma.
const SPOT_BUMP: Real = 1e-4;

type AsianFormula = fn(&BlackScholesProcess, OptionType, Real, Time, Time, usize) -> Real;

/// Closed-form engine.
///
/// Every formula returns a price; Greeks come from the formula where it has
/// them in closed form and from central spot bumps otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticEngine;

impl PricingEngine for AnalyticEngine {
    fn method(&self) -> Method {
        Method::Analytic
    }

    fn calculate(
        &self,
        contract: &OptionContract,
        market: &MarketParameters,
    ) -> Result<PricingResult> {
        let process = prepare(Method::Analytic, contract, market)?;
        debug!(kind = %contract.kind(), "analytic pricing");
        let right = contract.right();

        if let ExerciseStyle::Perpetual = contract.exercise() {
            let strike = contract.payoff().strike().ok_or_else(|| {
                Error::InvalidParameter("perpetual exercise needs a strike".into())
            })?;
            let v = american::perpetual_american(&process, right, strike)?;
            return Ok(result(v.price, "perpetual-american").with_greeks(v.greeks));
        }
        let t = contract.time_to_maturity()?;

        match contract.payoff() {
            &Payoff::Vanilla { strike } => match contract.exercise() {
                ExerciseStyle::American => {
                    let price = american::barone_adesi_whaley(&process, right, strike, t);
                    let greeks = spot_greeks(&process, price, SPOT_BUMP, |p| {
                        Ok(american::barone_adesi_whaley(p, right, strike, t))
                    })?;
                    Ok(result(price, "barone-adesi-whaley").with_greeks(greeks))
                }
                _ => Ok(closed_form(
                    black_scholes(&process, right, strike, t),
                    "black-scholes-merton",
                )),
            },

            &Payoff::Asian {
                strike,
                averaging,
                averaging_start,
                fixings,
            } => {
                let (formula, f): (&str, AsianFormula) = match averaging {
                    Averaging::Geometric => ("geometric-asian", asian::geometric_asian),
                    Averaging::Arithmetic => ("levy-asian", asian::levy_asian),
                };
                let price = f(&process, right, strike, averaging_start, t, fixings);
                let greeks = spot_greeks(&process, price, SPOT_BUMP, |p| {
                    Ok(f(p, right, strike, averaging_start, t, fixings))
                })?;
                Ok(result(price, formula).with_greeks(greeks))
            }

            &Payoff::Barrier {
                strike,
                barrier,
                barrier_type,
                rebate,
            } => {
                let price = barrier::barrier_price(
                    &process,
                    right,
                    barrier_type,
                    strike,
                    barrier,
                    rebate,
                    t,
                );
                // Bumps stay on the live side of the barrier.
                let bump = SPOT_BUMP.min(0.25 * (process.spot - barrier).abs() / process.spot);
                let greeks = spot_greeks(&process, price, bump, |p| {
                    Ok(barrier::barrier_price(
                        p,
                        right,
                        barrier_type,
                        strike,
                        barrier,
                        rebate,
                        t,
                    ))
                })?;
                Ok(result(price, "reiner-rubinstein").with_greeks(greeks))
            }

            Payoff::Basket {
                strike,
                weights,
                assets,
                correlation,
            } => {
                let f = |p: &BlackScholesProcess| {
                    two_asset::basket(p, right, *strike, weights, assets, correlation, t)
                };
                let price = f(&process)?;
                let greeks = spot_greeks(&process, price, SPOT_BUMP, f)?;
                Ok(result(price, "moment-matched-basket").with_greeks(greeks))
            }

            &Payoff::Binary { strike, binary } => Ok(closed_form(
                binary::binary(&process, right, binary, strike, t),
                "binary",
            )),

            &Payoff::Chooser {
                strike,
                choose_time,
            } => {
                let price = chooser::simple_chooser(&process, strike, choose_time, t);
                let greeks = spot_greeks(&process, price, SPOT_BUMP, |p| {
                    Ok(chooser::simple_chooser(p, strike, choose_time, t))
                })?;
                Ok(result(price, "rubinstein-chooser").with_greeks(greeks))
            }

            &Payoff::Compound {
                strike,
                inner_right,
                inner_strike,
                inner_maturity,
            } => {
                let f = |p: &BlackScholesProcess| {
                    compound::geske_compound(
                        p,
                        right,
                        inner_right,
                        strike,
                        inner_strike,
                        t,
                        inner_maturity,
                    )
                };
                let price = f(&process)?;
                let greeks = spot_greeks(&process, price, SPOT_BUMP, f)?;
                Ok(result(price, "geske-compound").with_greeks(greeks))
            }

            Payoff::Exchange {
                second,
                correlation,
            } => {
                let reduced = exchange_process(&process, second, *correlation);
                let v = black_scholes(&reduced, right, second.spot, t);
                Ok(result(v.price, "margrabe")
                    .with_greeks(Greeks::spot_and_time(v.delta, v.gamma, v.theta)))
            }

            &Payoff::ForwardStart {
                start_time,
                moneyness,
            } => Ok(closed_form(
                forward_start::forward_start(&process, right, moneyness, start_time, t),
                "rubinstein-forward-start",
            )),

            &Payoff::Gap {
                trigger,
                payment_strike,
            } => Ok(closed_form(
                binary::gap(&process, right, trigger, payment_strike, t),
                "gap",
            )),

            &Payoff::Lookback {
                lookback,
                running_extreme,
            } => {
                let price = lookback::lookback(&process, right, lookback, running_extreme, t);
                Ok(result(price, "lookback"))
            }

            &Payoff::Quanto {
                strike,
                fx_rate,
                fx_volatility,
                correlation,
                foreign_rate,
            } => {
                let reduced = quanto_process(&process, fx_volatility, correlation, foreign_rate);
                let v = black_scholes(&reduced, right, strike, t).scaled(fx_rate);
                Ok(result(v.price, "quanto")
                    .with_greeks(Greeks::spot_and_time(v.delta, v.gamma, v.theta)))
            }

            &Payoff::Rainbow {
                strike,
                second,
                correlation,
                rainbow,
            } => {
                let f = |p: &BlackScholesProcess| -> Result<Real> {
                    let assets = TwoAssets {
                        first: p,
                        second: &second,
                        correlation,
                    };
                    Ok(two_asset::stulz_rainbow(assets, right, rainbow, strike, t))
                };
                let price = f(&process)?;
                let greeks = spot_greeks(&process, price, SPOT_BUMP, f)?;
                Ok(result(price, "stulz-rainbow").with_greeks(greeks))
            }

            &Payoff::Spread {
                strike,
                second,
                correlation,
            } => {
                let f = |p: &BlackScholesProcess| -> Result<Real> {
                    let assets = TwoAssets {
                        first: p,
                        second: &second,
                        correlation,
                    };
                    Ok(two_asset::kirk_spread(assets, right, strike, t))
                };
                let price = f(&process)?;
                let greeks = spot_greeks(&process, price, SPOT_BUMP, f)?;
                Ok(result(price, "kirk-spread").with_greeks(greeks))
            }

            &Payoff::VarianceSwap {
                variance_strike,
                notional,
                realized_variance,
                elapsed,
            } => {
                let v = variance_swap::variance_swap(
                    &process,
                    variance_strike,
                    notional,
                    realized_variance,
                    elapsed,
                    t,
                );
                Ok(result(v.price, "variance-swap").with_greeks(v.greeks))
            }

            // Shout options are never reached: the registry rejects them.
            Payoff::Shout { .. } => Err(Error::UnsupportedCombination {
                kind: contract.kind().name().into(),
                method: Method::Analytic.name().into(),
            }),
        }
    }
}

fn result(price: Real, formula: &str) -> PricingResult {
    PricingResult::new(
        price,
        Diagnostics::Analytic {
            formula: formula.into(),
        },
    )
}

fn closed_form(v: BlackScholesValue, formula: &str) -> PricingResult {
    result(v.price, formula).with_greeks(v.greeks())
}

/// Delta and gamma from central differences with relative bump `bump`.
fn spot_greeks<F>(process: &BlackScholesProcess, price: Real, bump: Real, f: F) -> Result<Greeks>
where
    F: Fn(&BlackScholesProcess) -> Result<Real>,
{
    let h = bump * process.spot;
    let up = f(&process.with_spot(process.spot + h))?;
    let down = f(&process.with_spot(process.spot - h))?;
    Ok(Greeks {
        delta: Some((up - down) / (2.0 * h)),
        gamma: Some((up - 2.0 * price + down) / (h * h)),
        ..Greeks::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ol_instruments::{BarrierType, BinaryKind, LookbackKind, UnderlyingAsset};

    fn market() -> MarketParameters {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        MarketParameters::new(100.0, 0.05, 0.01, 0.25, date).unwrap()
    }

    fn european(payoff: Payoff, right: OptionType) -> OptionContract {
        OptionContract::new(payoff, ExerciseStyle::European, right, Some(1.0)).unwrap()
    }

    fn price(contract: &OptionContract) -> PricingResult {
        AnalyticEngine.calculate(contract, &market()).unwrap()
    }

    fn formula(r: &PricingResult) -> &str {
        match &r.diagnostics {
            Diagnostics::Analytic { formula } => formula,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn european_vanilla() {
        let r = price(&OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap());
        assert_relative_eq!(r.price, 11.719_265_860_819_057, epsilon = 1e-10);
        assert_eq!(formula(&r), "black-scholes-merton");
        let g = r.greeks.unwrap();
        assert!(g.vega.is_some() && g.rho.is_some());
    }

    #[test]
    fn american_put_has_bumped_delta() {
        let r = price(&OptionContract::american(OptionType::Put, 100.0, 1.0).unwrap());
        let euro = price(&OptionContract::european(OptionType::Put, 100.0, 1.0).unwrap());
        assert!(r.price > euro.price);
        let delta = r.greeks.unwrap().delta.unwrap();
        assert!(delta < 0.0 && delta > -1.0, "{delta}");
    }

    #[test]
    fn barrier_contract() {
        let m = market();
        let c = OptionContract::barrier(
            OptionType::Call,
            100.0,
            90.0,
            BarrierType::DownOut,
            0.0,
            1.0,
            m.spot(),
        )
        .unwrap();
        let r = price(&c);
        assert_relative_eq!(r.price, 8.615_032_677_349_781, epsilon = 1e-10);
        assert!(r.greeks.unwrap().delta.unwrap() > 0.0);
    }

    #[test]
    fn quanto_scales_by_conversion_rate() {
        let c = european(
            Payoff::Quanto {
                strike: 100.0,
                fx_rate: 1.5,
                fx_volatility: 0.1,
                correlation: 0.4,
                foreign_rate: 0.03,
            },
            OptionType::Call,
        );
        let r = price(&c);
        assert_relative_eq!(r.price, 14.993_415_822_010_277, epsilon = 1e-10);
        assert!(r.greeks.unwrap().vega.is_none());
    }

    #[test]
    fn exchange_is_margrabe() {
        let second = UnderlyingAsset::new(95.0, 0.3, 0.02).unwrap();
        let call = price(&european(
            Payoff::Exchange {
                second,
                correlation: 0.5,
            },
            OptionType::Call,
        ));
        assert_relative_eq!(call.price, 13.832_385_744_105_828, epsilon = 1e-10);
        let put = price(&european(
            Payoff::Exchange {
                second,
                correlation: 0.5,
            },
            OptionType::Put,
        ));
        // (S₂ − S₁)⁺ = (S₁ − S₂)⁺ − S₁e^{−q₁T} + S₂e^{−q₂T}
        let parity = call.price - 100.0 * (-0.01f64).exp() + 95.0 * (-0.02f64).exp();
        assert_relative_eq!(put.price, parity, epsilon = 1e-10);
    }

    #[test]
    fn binary_and_lookback_dispatch() {
        let r = price(&european(
            Payoff::Binary {
                strike: 100.0,
                binary: BinaryKind::CashOrNothing { cash: 10.0 },
            },
            OptionType::Call,
        ));
        assert_relative_eq!(r.price, 4.888_939_982_602_95, epsilon = 1e-10);

        let r = price(&european(
            Payoff::Lookback {
                lookback: LookbackKind::Floating,
                running_extreme: None,
            },
            OptionType::Call,
        ));
        assert_relative_eq!(r.price, 19.916_986_281_101_28, epsilon = 1e-10);
        assert!(r.greeks.is_none());
    }

    #[test]
    fn perpetual_put() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let m = MarketParameters::new(100.0, 0.05, 0.0, 0.2, date).unwrap();
        let c = OptionContract::perpetual_american(OptionType::Put, 100.0).unwrap();
        let r = AnalyticEngine.calculate(&c, &m).unwrap();
        assert_relative_eq!(r.price, 12.320_032_867_762_635, epsilon = 1e-10);
        assert_eq!(formula(&r), "perpetual-american");
    }

    #[test]
    fn bermudan_is_unsupported() {
        let c = OptionContract::bermudan(OptionType::Put, 100.0, vec![0.5, 1.0], 1.0).unwrap();
        assert!(matches!(
            AnalyticEngine.calculate(&c, &market()),
            Err(ol_core::Error::UnsupportedCombination { .. })
        ));
    }

    #[test]
    fn vanishing_volatility_is_discounted_intrinsic() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let m = MarketParameters::new(100.0, 0.05, 0.0, 1e-18, date).unwrap();
        let c = OptionContract::european(OptionType::Call, 90.0, 1.0).unwrap();
        let r = AnalyticEngine.calculate(&c, &m).unwrap();
        assert_relative_eq!(r.price, 100.0 - 90.0 * (-0.05f64).exp(), epsilon = 1e-12);
    }
}
