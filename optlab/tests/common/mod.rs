//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use optlab::prelude::*;

/// S = 100, r = 5%, q = 1%, σ = 25%.
pub fn market() -> MarketParameters {
    let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    MarketParameters::new(100.0, 0.05, 0.01, 0.25, date).unwrap()
}

pub fn second_asset() -> UnderlyingAsset {
    UnderlyingAsset::new(95.0, 0.3, 0.02).unwrap()
}

/// Route engine logs to the test harness; `RUST_LOG=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn european(payoff: Payoff, right: OptionType) -> OptionContract {
    OptionContract::new(payoff, ExerciseStyle::European, right, Some(1.0)).unwrap()
}

/// One representative contract per option kind.
pub fn sample(kind: OptionKind) -> OptionContract {
    let call = OptionType::Call;
    match kind {
        OptionKind::European => OptionContract::european(call, 100.0, 1.0).unwrap(),
        OptionKind::American => OptionContract::american(OptionType::Put, 100.0, 1.0).unwrap(),
        OptionKind::Bermudan => {
            OptionContract::bermudan(OptionType::Put, 100.0, vec![0.25, 0.5, 0.75, 1.0], 1.0)
                .unwrap()
        }
        OptionKind::PerpetualAmerican => {
            OptionContract::perpetual_american(OptionType::Put, 90.0).unwrap()
        }
        OptionKind::Asian => {
            OptionContract::asian(call, 100.0, Averaging::Arithmetic, 0.0, 12, 1.0).unwrap()
        }
        OptionKind::Barrier => {
            OptionContract::barrier(call, 100.0, 90.0, BarrierType::DownOut, 3.0, 1.0, 100.0)
                .unwrap()
        }
        OptionKind::Basket => european(
            Payoff::Basket {
                strike: 100.0,
                weights: vec![0.5, 0.5],
                assets: vec![second_asset()],
                correlation: vec![vec![1.0, 0.5], vec![0.5, 1.0]],
            },
            call,
        ),
        OptionKind::Binary => european(
            Payoff::Binary {
                strike: 100.0,
                binary: BinaryKind::CashOrNothing { cash: 10.0 },
            },
            call,
        ),
        OptionKind::Chooser => european(
            Payoff::Chooser {
                strike: 100.0,
                choose_time: 0.5,
            },
            call,
        ),
        OptionKind::Compound => european(
            Payoff::Compound {
                strike: 5.0,
                inner_right: call,
                inner_strike: 100.0,
                inner_maturity: 2.0,
            },
            call,
        ),
        OptionKind::Exchange => european(
            Payoff::Exchange {
                second: second_asset(),
                correlation: 0.5,
            },
            call,
        ),
        OptionKind::ForwardStart => european(
            Payoff::ForwardStart {
                start_time: 0.25,
                moneyness: 1.0,
            },
            call,
        ),
        OptionKind::Gap => european(
            Payoff::Gap {
                trigger: 100.0,
                payment_strike: 95.0,
            },
            call,
        ),
        OptionKind::Lookback => european(
            Payoff::Lookback {
                lookback: LookbackKind::Floating,
                running_extreme: None,
            },
            call,
        ),
        OptionKind::Quanto => european(
            Payoff::Quanto {
                strike: 100.0,
                fx_rate: 1.2,
                fx_volatility: 0.1,
                correlation: -0.3,
                foreign_rate: 0.02,
            },
            call,
        ),
        OptionKind::Rainbow => european(
            Payoff::Rainbow {
                strike: 100.0,
                second: second_asset(),
                correlation: 0.5,
                rainbow: RainbowKind::BestOf,
            },
            call,
        ),
        OptionKind::Shout => european(Payoff::Shout { strike: 100.0 }, call),
        OptionKind::Spread => european(
            Payoff::Spread {
                strike: 5.0,
                second: second_asset(),
                correlation: 0.5,
            },
            call,
        ),
        OptionKind::VarianceSwap => european(
            Payoff::VarianceSwap {
                variance_strike: 0.04,
                notional: 100.0,
                realized_variance: 0.0,
                elapsed: 0.0,
            },
            call,
        ),
    }
}

/// Cheap settings for smoke runs over the whole support matrix.
pub fn light(method: Method) -> EngineConfig {
    match method {
        Method::Analytic => EngineConfig::Analytic,
        Method::Lattice => EngineConfig::Lattice(LatticeConfig::with_steps(50)),
        Method::FiniteDifference => EngineConfig::FiniteDifference(FdConfig {
            price_grid_size: 101,
            time_steps: 50,
            ..FdConfig::default()
        }),
        Method::MonteCarlo => EngineConfig::MonteCarlo(MonteCarloConfig {
            time_steps: 20,
            batch_size: 1_000,
            ..MonteCarloConfig::with_paths(4_000, 11)
        }),
    }
}

pub fn lattice(steps: usize) -> EngineConfig {
    EngineConfig::Lattice(LatticeConfig::with_steps(steps))
}

pub fn finite_difference() -> EngineConfig {
    EngineConfig::FiniteDifference(FdConfig {
        price_grid_size: 401,
        time_steps: 200,
        ..FdConfig::default()
    })
}

pub fn monte_carlo(paths: usize) -> EngineConfig {
    EngineConfig::MonteCarlo(MonteCarloConfig::with_paths(paths, 2024))
}

/// `|price − expected| < 4 se + bias`.
pub fn assert_statistically_close(result: &PricingResult, expected: Real, bias: Real) {
    let se = result.standard_error.unwrap();
    assert!(
        (result.price - expected).abs() < 4.0 * se + bias,
        "{} ± {se} vs {expected}",
        result.price
    );
}
