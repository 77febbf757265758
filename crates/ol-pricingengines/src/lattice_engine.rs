//! Lattice engine.
//!
//! State-free payoffs are induced on a single value per node, path-dependent
//! ones through a node-state model. Choosers and compounds roll back in two
//! phases: the inner values are carried to the decision step, where the
//! outer payoff is applied, and the result is rolled on to the root.

use ol_core::{
    errors::{Error, Result},
    Interrupt, Real, Time,
};
use ol_instruments::{
    Diagnostics, LookbackKind, MarketParameters, Method, OptionContract, OptionType, Payoff,
    PricingResult, ResultStatus,
};
use ol_methods::{
    lattice::{
        build_tree, induce, induce_with_states, roll_back, step_at, terminal_values, value_from,
        AsianStates, BarrierStates, ForwardStartStates, LookbackStates, RecombiningTree,
        TreeKind, TreeValuation,
    },
    BlackScholesProcess, EarlyExercise, ExercisePolicy, Interruptible,
};
use tracing::debug;

use crate::config::LatticeConfig;
use crate::engine::{prepare, shout_value, terminal, PricingEngine};
use crate::reduction::{exchange_process, quanto_process};

/// Steps of the estimate kept in reserve while an interruptible run is in
/// flight.
pub const COARSE_STEPS: usize = 25;

/// Binomial and trinomial tree pricing.
#[derive(Debug, Clone, Default)]
pub struct LatticeEngine {
    config: LatticeConfig,
}

/// A finished induction together with the tree that produced it.
struct Induction {
    valuation: TreeValuation,
    tree: &'static str,
    steps: usize,
}

impl LatticeEngine {
    /// Engine with the given settings.
    pub fn new(config: LatticeConfig) -> Self {
        Self { config }
    }

    /// The settings.
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    /// Tree used for `payoff`: the configured one, else Leisen–Reimer for
    /// state-free payoffs, a barrier-fitted trinomial for barriers and CRR
    /// for the other state models.
    pub fn tree_for(&self, payoff: &Payoff) -> TreeKind {
        self.config.tree.unwrap_or(match payoff {
            Payoff::Barrier { .. } => TreeKind::Trinomial,
            Payoff::Asian { .. } | Payoff::Lookback { .. } | Payoff::ForwardStart { .. } => {
                TreeKind::CoxRossRubinstein
            }
            _ => TreeKind::LeisenReimer,
        })
    }

    fn induce(
        &self,
        contract: &OptionContract,
        process: &BlackScholesProcess,
        steps: usize,
        interrupt: &Interrupt,
    ) -> Result<Interruptible<Induction>> {
        let payoff = contract.payoff();
        let right = contract.right();
        let t = contract.time_to_maturity()?;
        let kind = self.tree_for(payoff);
        let build = |p: &BlackScholesProcess,
                     end: Time,
                     strike: Option<Real>,
                     barrier: Option<Real>| {
            build_tree(kind, p, end, steps, strike, barrier)
        };

        let (tree, outcome) = match *payoff {
            Payoff::Vanilla { strike } => {
                let tree = build(process, t, Some(strike), None)?;
                let policy = ExercisePolicy::from_style(contract.exercise())?;
                let times = tree.times();
                let exercise_value = move |_: Time, s: Real| right.intrinsic(s, strike);
                let exercise = EarlyExercise::new(&policy, &times, &exercise_value);
                let active = (!policy.is_european()).then_some(&exercise);
                let payoff = |s: Real| right.intrinsic(s, strike);
                let outcome = induce(tree.as_ref(), &payoff, active, interrupt);
                (tree, outcome)
            }
            Payoff::Binary { strike, .. } | Payoff::Gap { trigger: strike, .. } => {
                let tree = build(process, t, Some(strike), None)?;
                let outcome = induce(tree.as_ref(), &terminal(payoff, right)?, None, interrupt);
                (tree, outcome)
            }
            Payoff::Quanto {
                strike,
                fx_volatility,
                correlation,
                foreign_rate,
                ..
            } => {
                let quanto = quanto_process(process, fx_volatility, correlation, foreign_rate);
                let tree = build(&quanto, t, Some(strike), None)?;
                let outcome = induce(tree.as_ref(), &terminal(payoff, right)?, None, interrupt);
                (tree, outcome)
            }
            Payoff::Exchange {
                ref second,
                correlation,
            } => {
                let exchange = exchange_process(process, second, correlation);
                let strike = second.spot;
                let tree = build(&exchange, t, Some(strike), None)?;
                let payoff = |s: Real| right.intrinsic(s, strike);
                let outcome = induce(tree.as_ref(), &payoff, None, interrupt);
                (tree, outcome)
            }
            Payoff::Shout { strike } => {
                let tree = build(process, t, Some(strike), None)?;
                let times = tree.times();
                let shout = |time: Time, s: Real| shout_value(process, right, strike, t - time, s);
                let exercise = EarlyExercise::new(&ExercisePolicy::American, &times, &shout);
                let payoff = |s: Real| right.intrinsic(s, strike);
                let outcome = induce(tree.as_ref(), &payoff, Some(&exercise), interrupt);
                (tree, outcome)
            }
            Payoff::Chooser {
                strike,
                choose_time,
            } => {
                let tree = build(process, t, Some(strike), None)?;
                let outcome = chooser(tree.as_ref(), strike, choose_time, interrupt);
                (tree, outcome)
            }
            Payoff::Compound {
                strike,
                inner_right,
                inner_strike,
                inner_maturity,
            } => {
                let tree = build(process, inner_maturity, Some(inner_strike), None)?;
                let outcome = compound(
                    tree.as_ref(),
                    right,
                    strike,
                    inner_right,
                    inner_strike,
                    t,
                    interrupt,
                );
                (tree, outcome)
            }
            Payoff::Barrier {
                strike,
                barrier,
                barrier_type,
                rebate,
            } => {
                let tree = build(process, t, Some(strike), Some(barrier))?;
                let model = BarrierStates::new(
                    right,
                    strike,
                    barrier,
                    barrier_type.is_down(),
                    barrier_type.is_out(),
                    rebate,
                );
                let outcome = induce_with_states(tree.as_ref(), &model, interrupt);
                (tree, outcome)
            }
            Payoff::Asian {
                strike,
                averaging,
                averaging_start,
                fixings,
            } => {
                let tree = build(process, t, Some(strike), None)?;
                let model = AsianStates::new(
                    tree.as_ref(),
                    right,
                    strike,
                    averaging,
                    averaging_start,
                    t,
                    fixings,
                    self.config.state_resolution,
                );
                let outcome = induce_with_states(tree.as_ref(), &model, interrupt);
                (tree, outcome)
            }
            Payoff::Lookback {
                lookback,
                running_extreme,
            } => {
                let strike = match lookback {
                    LookbackKind::Floating => None,
                    LookbackKind::Fixed { strike } => Some(strike),
                };
                let tree = build(process, t, strike, None)?;
                let model = LookbackStates::new(tree.as_ref(), right, strike, running_extreme);
                let outcome = induce_with_states(tree.as_ref(), &model, interrupt);
                (tree, outcome)
            }
            Payoff::ForwardStart {
                start_time,
                moneyness,
            } => {
                let tree = build(process, t, Some(moneyness * process.spot), None)?;
                let model = ForwardStartStates::new(tree.as_ref(), right, moneyness, start_time);
                let outcome = induce_with_states(tree.as_ref(), &model, interrupt);
                (tree, outcome)
            }
            Payoff::Basket { .. }
            | Payoff::Rainbow { .. }
            | Payoff::Spread { .. }
            | Payoff::VarianceSwap { .. } => {
                return Err(Error::UnsupportedCombination {
                    kind: contract.kind().name().into(),
                    method: Method::Lattice.name().into(),
                })
            }
        };

        Ok(outcome.map(|valuation| Induction {
            valuation,
            tree: tree.name(),
            steps: tree.steps(),
        }))
    }
}

impl PricingEngine for LatticeEngine {
    fn method(&self) -> Method {
        Method::Lattice
    }

    fn calculate(
        &self,
        contract: &OptionContract,
        market: &MarketParameters,
    ) -> Result<PricingResult> {
        let process = prepare(Method::Lattice, contract, market)?;
        let interrupt = &self.config.interrupt;
        let steps = self.config.steps;

        // Best effort: a fitted barrier can sit too close to spot for the
        // reserve tree while the requested one builds fine.
        let coarse = if interrupt.is_armed() {
            let quiet = Interrupt::default();
            match self.induce(contract, &process, steps.min(COARSE_STEPS), &quiet) {
                Ok(outcome) => outcome.finished(),
                Err(err) => {
                    debug!(%err, "coarse tree unavailable");
                    None
                }
            }
        } else {
            None
        };
        match self.induce(contract, &process, steps, interrupt)? {
            Interruptible::Finished(done) => Ok(result(done)),
            Interruptible::Stopped(reason) => {
                let done = coarse.ok_or_else(|| {
                    Error::NumericalDegeneracy(format!(
                        "lattice run stopped ({reason:?}) with no coarse estimate"
                    ))
                })?;
                debug!(
                    ?reason,
                    steps = done.steps,
                    "lattice run interrupted, keeping the coarse tree"
                );
                Ok(result(done).with_status(ResultStatus::Partial(reason.into())))
            }
        }
    }
}

fn result(done: Induction) -> PricingResult {
    let Induction {
        valuation,
        tree,
        steps,
    } = done;
    let result = PricingResult::new(
        valuation.value,
        Diagnostics::Lattice {
            tree: tree.to_string(),
            steps,
            max_states: valuation.max_states,
        },
    );
    match valuation.greeks {
        Some(greeks) => result.with_greeks(greeks),
        None => result,
    }
}

/// `max(call, put)` at the choose step, rolled back to the root.
fn chooser(
    tree: &dyn RecombiningTree,
    strike: Real,
    choose_time: Time,
    interrupt: &Interrupt,
) -> Interruptible<TreeValuation> {
    let n = tree.steps();
    let k = step_at(choose_time, tree.dt(), n);
    let call = terminal_values(tree, &|s| (s - strike).max(0.0));
    let put = terminal_values(tree, &|s| (strike - s).max(0.0));
    let call = ol_methods::finish!(roll_back(tree, call, n, k, None, interrupt));
    let put = ol_methods::finish!(roll_back(tree, put, n, k, None, interrupt));
    let chosen = call.iter().zip(&put).map(|(c, p)| c.max(*p)).collect();
    value_from(tree, chosen, k, None, interrupt)
}

/// Outer payoff on the inner option's value at the outer maturity.
fn compound(
    tree: &dyn RecombiningTree,
    right: OptionType,
    strike: Real,
    inner_right: OptionType,
    inner_strike: Real,
    t: Time,
    interrupt: &Interrupt,
) -> Interruptible<TreeValuation> {
    let n = tree.steps();
    let k = step_at(t, tree.dt(), n);
    let inner = terminal_values(tree, &|s| inner_right.intrinsic(s, inner_strike));
    let inner = ol_methods::finish!(roll_back(tree, inner, n, k, None, interrupt));
    let outer = inner.iter().map(|&v| right.intrinsic(v, strike)).collect();
    value_from(tree, outer, k, None, interrupt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytic::{
        american::barone_adesi_whaley, black_scholes::black_scholes,
        chooser::simple_chooser, compound::geske_compound,
    };
    use chrono::NaiveDate;
    use ol_instruments::{BarrierType, BinaryKind, ExerciseStyle, UnderlyingAsset};
    use std::{
        sync::{atomic::AtomicBool, Arc},
        time::Duration,
    };

    fn market() -> MarketParameters {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        MarketParameters::new(100.0, 0.05, 0.01, 0.25, date).unwrap()
    }

    fn process() -> BlackScholesProcess {
        BlackScholesProcess::new(100.0, 0.05, 0.01, 0.25)
    }

    fn engine(steps: usize) -> LatticeEngine {
        LatticeEngine::new(LatticeConfig::with_steps(steps))
    }

    fn contract(payoff: Payoff, right: OptionType) -> OptionContract {
        OptionContract::new(payoff, ExerciseStyle::European, right, Some(1.0)).unwrap()
    }

    #[test]
    fn european_matches_black_scholes_with_greeks() {
        let call = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let r = engine(301).calculate(&call, &market()).unwrap();
        let bs = black_scholes(&process(), OptionType::Call, 100.0, 1.0);
        assert!((r.price - bs.price).abs() < 1e-3, "{} vs {}", r.price, bs.price);
        let greeks = r.greeks.unwrap();
        assert!((greeks.delta.unwrap() - bs.delta).abs() < 2e-3);
        assert!((greeks.gamma.unwrap() - bs.gamma).abs() < 5e-4);
        match r.diagnostics {
            Diagnostics::Lattice { tree, steps, .. } => {
                assert_eq!(tree, "LeisenReimer");
                assert_eq!(steps, 301);
            }
            other => panic!("unexpected diagnostics {other:?}"),
        }
        assert_eq!(r.status, ResultStatus::Complete);
    }

    #[test]
    fn american_put_sits_between_european_and_baw() {
        let put = OptionContract::american(OptionType::Put, 100.0, 1.0).unwrap();
        let european = OptionContract::european(OptionType::Put, 100.0, 1.0).unwrap();
        let am = engine(400).calculate(&put, &market()).unwrap().price;
        let eu = engine(400).calculate(&european, &market()).unwrap().price;
        let baw = barone_adesi_whaley(&process(), OptionType::Put, 100.0, 1.0);
        assert!(am > eu + 0.1, "{am} vs {eu}");
        assert!((am - baw).abs() < 0.1, "{am} vs BAW {baw}");
    }

    #[test]
    fn bermudan_lies_between_european_and_american() {
        let times: Vec<Time> = (1..=4).map(|k| k as Time * 0.25).collect();
        let bermudan =
            OptionContract::bermudan(OptionType::Put, 100.0, times, 1.0).unwrap();
        let american = OptionContract::american(OptionType::Put, 100.0, 1.0).unwrap();
        let european = OptionContract::european(OptionType::Put, 100.0, 1.0).unwrap();
        let e = engine(200);
        let b = e.calculate(&bermudan, &market()).unwrap().price;
        let a = e.calculate(&american, &market()).unwrap().price;
        let eu = e.calculate(&european, &market()).unwrap().price;
        assert!(eu <= b + 1e-9 && b <= a + 1e-9, "{eu} {b} {a}");
    }

    #[test]
    fn cash_or_nothing_converges() {
        let binary = contract(
            Payoff::Binary {
                strike: 100.0,
                binary: BinaryKind::CashOrNothing { cash: 10.0 },
            },
            OptionType::Call,
        );
        let p = process();
        let d2 = ((p.spot / 100.0).ln() + p.log_drift()) / p.std_dev(1.0);
        let expected = 10.0 * p.discount(1.0) * ol_math::normal_cdf(d2);
        let v = engine(501).calculate(&binary, &market()).unwrap().price;
        assert!((v - expected).abs() < 0.05, "{v} vs {expected}");
    }

    #[test]
    fn barrier_uses_fitted_trinomial() {
        let knock_out = contract(
            Payoff::Barrier {
                strike: 100.0,
                barrier: 90.0,
                barrier_type: BarrierType::DownOut,
                rebate: 3.0,
            },
            OptionType::Call,
        );
        let r = engine(100).calculate(&knock_out, &market()).unwrap();
        assert!((r.price - 10.57795).abs() < 0.02, "{}", r.price);
        assert!(r.greeks.is_none());
        assert!(matches!(
            r.diagnostics,
            Diagnostics::Lattice { ref tree, .. } if tree.contains("Trinomial")
        ));
    }

    #[test]
    fn chooser_and_compound_match_closed_forms() {
        let chooser_contract = contract(
            Payoff::Chooser {
                strike: 100.0,
                choose_time: 0.5,
            },
            OptionType::Call,
        );
        let v = engine(400).calculate(&chooser_contract, &market()).unwrap().price;
        let expected = simple_chooser(&process(), 100.0, 0.5, 1.0);
        assert!((v - expected).abs() < 0.05, "{v} vs {expected}");

        let compound_contract = contract(
            Payoff::Compound {
                strike: 5.0,
                inner_right: OptionType::Call,
                inner_strike: 100.0,
                inner_maturity: 2.0,
            },
            OptionType::Call,
        );
        let v = engine(400).calculate(&compound_contract, &market()).unwrap().price;
        let expected =
            geske_compound(&process(), OptionType::Call, OptionType::Call, 5.0, 100.0, 1.0, 2.0)
                .unwrap();
        assert!((v - expected).abs() < 0.08, "{v} vs {expected}");
    }

    #[test]
    fn exchange_reduces_to_one_factor() {
        let exchange = contract(
            Payoff::Exchange {
                second: UnderlyingAsset::new(95.0, 0.3, 0.02).unwrap(),
                correlation: 0.5,
            },
            OptionType::Call,
        );
        let v = engine(301).calculate(&exchange, &market()).unwrap().price;
        assert!((v - 13.832_385_744_105_828).abs() < 0.01, "{v}");

        // Parity: C − P = S₁e^{−q₁T} − S₂e^{−q₂T}.
        let put = contract(exchange.payoff().clone(), OptionType::Put);
        let p = engine(301).calculate(&put, &market()).unwrap().price;
        let forward_gap = 100.0 * (-0.01_f64).exp() - 95.0 * (-0.02_f64).exp();
        assert!((v - p - forward_gap).abs() < 0.02, "{v} − {p} vs {forward_gap}");
    }

    #[test]
    fn shout_is_worth_at_least_the_vanilla() {
        let shout = contract(Payoff::Shout { strike: 100.0 }, OptionType::Call);
        let vanilla = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let s = engine(200).calculate(&shout, &market()).unwrap().price;
        let v = engine(200).calculate(&vanilla, &market()).unwrap().price;
        assert!(s > v, "{s} vs {v}");
        // Never worth more than the lookback on the maximum.
        assert!(s < 22.95, "{s}");
    }

    #[test]
    fn forward_start_uses_state_model() {
        let forward = contract(
            Payoff::ForwardStart {
                start_time: 0.25,
                moneyness: 1.0,
            },
            OptionType::Call,
        );
        let r = engine(100).calculate(&forward, &market()).unwrap();
        assert!((r.price - 9.95191).abs() < 0.05, "{}", r.price);
        assert!(matches!(
            r.diagnostics,
            Diagnostics::Lattice { ref tree, max_states, .. }
                if tree == "CoxRossRubinstein" && max_states >= 1
        ));
    }

    #[test]
    fn configured_tree_overrides_selection() {
        let config = LatticeConfig {
            tree: Some(TreeKind::JarrowRudd),
            ..LatticeConfig::with_steps(200)
        };
        let call = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let r = LatticeEngine::new(config).calculate(&call, &market()).unwrap();
        assert!(matches!(
            r.diagnostics,
            Diagnostics::Lattice { ref tree, .. } if tree == "JarrowRudd"
        ));
    }

    #[test]
    fn basket_is_unsupported() {
        let basket = contract(
            Payoff::Basket {
                strike: 100.0,
                weights: vec![0.5, 0.5],
                assets: vec![UnderlyingAsset::new(100.0, 0.2, 0.0).unwrap()],
                correlation: vec![vec![1.0, 0.3], vec![0.3, 1.0]],
            },
            OptionType::Call,
        );
        assert!(matches!(
            engine(50).calculate(&basket, &market()),
            Err(Error::UnsupportedCombination { .. })
        ));
    }

    #[test]
    fn cancelled_run_returns_coarse_estimate() {
        let flag = Arc::new(AtomicBool::new(true));
        let config = LatticeConfig {
            interrupt: Interrupt::default().with_cancel_flag(flag),
            ..LatticeConfig::with_steps(2_000)
        };
        let call = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let r = LatticeEngine::new(config).calculate(&call, &market()).unwrap();
        assert!(r.is_partial());
        assert!(matches!(r.diagnostics, Diagnostics::Lattice { steps, .. } if steps <= COARSE_STEPS));
        let bs = black_scholes(&process(), OptionType::Call, 100.0, 1.0).price;
        assert!((r.price - bs).abs() < 0.1, "{} vs {bs}", r.price);
    }

    #[test]
    fn generous_deadline_completes() {
        let config = LatticeConfig {
            interrupt: Interrupt::default().with_timeout(Duration::from_secs(60)),
            ..LatticeConfig::with_steps(101)
        };
        let call = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let r = LatticeEngine::new(config).calculate(&call, &market()).unwrap();
        assert_eq!(r.status, ResultStatus::Complete);
    }

    #[test]
    fn deadline_does_not_break_a_near_spot_barrier() {
        // 97 is inside one step standard deviation of spot at 25 steps but
        // not at 100.
        let option = contract(
            Payoff::Barrier {
                strike: 100.0,
                barrier: 97.0,
                barrier_type: BarrierType::DownOut,
                rebate: 0.0,
            },
            OptionType::Call,
        );
        let plain = engine(100).calculate(&option, &market()).unwrap();
        let config = LatticeConfig {
            interrupt: Interrupt::default().with_timeout(Duration::from_secs(60)),
            ..LatticeConfig::with_steps(100)
        };
        let timed = LatticeEngine::new(config)
            .calculate(&option, &market())
            .unwrap();
        assert_eq!(timed.status, ResultStatus::Complete);
        assert_eq!(timed.price, plain.price);
    }
}
