//! Finite-difference engine.
//!
//! Every supported payoff is solved on a uniform log-spot grid with the
//! θ-scheme of [`ThetaSolver`]. Terminal values are cell-averaged and the
//! Dirichlet rows carry the discounted payoff at the forward. Knock-out
//! barriers sit on a boundary node; knock-ins follow from in/out parity plus
//! a no-touch solve for the rebate.

use std::sync::{atomic::AtomicBool, Arc};

use ol_core::{
    errors::{Error, Result},
    Interrupt, Real, Time,
};
use ol_instruments::{
    BarrierType, Diagnostics, Greeks, MarketParameters, Method, OptionContract, OptionType,
    Payoff, PricingResult, ResultStatus,
};
use ol_methods::{
    finite_differences::{forward_intrinsic, Boundaries, FdGreeks, LogGrid, ThetaSolver},
    BlackScholesProcess, EarlyExercise, ExercisePolicy, Interruptible,
};
use tracing::{debug, warn};

use crate::config::FdConfig;
use crate::engine::{prepare, shout_value, terminal, PricingEngine};
use crate::reduction::{exchange_process, quanto_process};

/// Time steps of the estimate kept in reserve while an interruptible run is
/// in flight.
pub const COARSE_TIME_STEPS: usize = 25;

/// Price nodes of the reserve estimate.
pub const COARSE_PRICE_NODES: usize = 51;

type Payout<'a> = &'a (dyn Fn(Real) -> Real + Sync);
type Edge<'a> = &'a (dyn Fn(Time, Real) -> Real + Sync);

/// Unwrap a finished solve or hand the stop reason back to the caller.
macro_rules! solved {
    ($e:expr) => {
        match $e? {
            Interruptible::Finished(v) => v,
            Interruptible::Stopped(reason) => return Ok(Interruptible::Stopped(reason)),
        }
    };
}

/// Grid and time resolution of one run.
#[derive(Debug, Clone, Copy)]
struct Resolution {
    nodes: usize,
    time_steps: usize,
    auto_adjust: bool,
}

/// Shape of the grid a run was solved on.
#[derive(Debug, Clone, Copy)]
struct Layout {
    price_nodes: usize,
    time_steps: usize,
    requested_time_steps: usize,
    time_step_adjusted: bool,
    lower_bound: Real,
    upper_bound: Real,
}

impl Layout {
    fn of(solver: &ThetaSolver<'_>) -> Self {
        let grid = solver.grid();
        Self {
            price_nodes: grid.len(),
            time_steps: solver.steps(),
            requested_time_steps: solver.requested_steps(),
            time_step_adjusted: solver.time_step_adjusted(),
            lower_bound: grid.lower_bound(),
            upper_bound: grid.upper_bound(),
        }
    }
}

type Solved = Interruptible<(FdGreeks, Layout)>;

/// A single-factor problem: terminal payoff, Dirichlet edges and optional
/// early exercise.
struct Problem<'a> {
    process: &'a BlackScholesProcess,
    horizon: Time,
    payoff: Payout<'a>,
    edge: Edge<'a>,
    exercise: Option<(&'a ExercisePolicy, Edge<'a>)>,
}

/// θ-scheme pricing on a log-spot grid.
#[derive(Debug, Clone, Default)]
pub struct FiniteDifferenceEngine {
    config: FdConfig,
}

impl FiniteDifferenceEngine {
    /// Engine with the given settings.
    pub fn new(config: FdConfig) -> Self {
        Self { config }
    }

    /// The settings.
    pub fn config(&self) -> &FdConfig {
        &self.config
    }

    fn half_width(&self, process: &BlackScholesProcess, horizon: Time) -> Real {
        self.config.std_devs * process.std_dev(horizon)
    }

    fn solver<'g>(
        &self,
        grid: &'g LogGrid,
        process: &BlackScholesProcess,
        horizon: Time,
        res: Resolution,
    ) -> Result<ThetaSolver<'g>> {
        ThetaSolver::new(
            grid,
            *process,
            horizon,
            res.time_steps,
            self.config.scheme,
            self.config.rannacher_steps,
            res.auto_adjust,
        )
    }

    fn run(
        &self,
        contract: &OptionContract,
        process: &BlackScholesProcess,
        res: Resolution,
        interrupt: &Interrupt,
    ) -> Result<Solved> {
        let payoff = contract.payoff();
        let right = contract.right();
        let t = contract.time_to_maturity()?;

        match *payoff {
            Payoff::Vanilla { strike } => {
                let policy = ExercisePolicy::from_style(contract.exercise())?;
                let intrinsic = move |s: Real| right.intrinsic(s, strike);
                let american = policy == ExercisePolicy::American;
                let edge =
                    |time: Time, s: Real| vanilla_edge(process, t, time, s, &intrinsic, american);
                let exercise_value = move |_: Time, s: Real| intrinsic(s);
                let exercise =
                    (!policy.is_european()).then_some((&policy, &exercise_value as Edge<'_>));
                self.one_factor(
                    Problem {
                        process,
                        horizon: t,
                        payoff: &intrinsic,
                        edge: &edge,
                        exercise,
                    },
                    res,
                    interrupt,
                )
            }
            Payoff::Binary { .. } | Payoff::Gap { .. } => {
                let value = terminal(payoff, right)?;
                self.european(process, t, &value, res, interrupt)
            }
            Payoff::Quanto {
                fx_volatility,
                correlation,
                foreign_rate,
                ..
            } => {
                let quanto = quanto_process(process, fx_volatility, correlation, foreign_rate);
                let value = terminal(payoff, right)?;
                self.european(&quanto, t, &value, res, interrupt)
            }
            Payoff::Exchange {
                ref second,
                correlation,
            } => {
                let exchange = exchange_process(process, second, correlation);
                let strike = second.spot;
                let value = move |s: Real| right.intrinsic(s, strike);
                self.european(&exchange, t, &value, res, interrupt)
            }
            Payoff::Shout { strike } => {
                let intrinsic = move |s: Real| right.intrinsic(s, strike);
                let shout = |time: Time, s: Real| shout_value(process, right, strike, t - time, s);
                let edge = |time: Time, s: Real| {
                    forward_intrinsic(process, t, time, s, intrinsic).max(shout(time, s))
                };
                self.one_factor(
                    Problem {
                        process,
                        horizon: t,
                        payoff: &intrinsic,
                        edge: &edge,
                        exercise: Some((&ExercisePolicy::American, &shout as Edge<'_>)),
                    },
                    res,
                    interrupt,
                )
            }
            Payoff::Chooser {
                strike,
                choose_time,
            } => self.chooser(process, strike, choose_time, t, res, interrupt),
            Payoff::Compound {
                strike,
                inner_right,
                inner_strike,
                inner_maturity,
            } => self.compound(
                process,
                (right, strike),
                (inner_right, inner_strike),
                t,
                inner_maturity,
                res,
                interrupt,
            ),
            Payoff::Barrier {
                strike,
                barrier,
                barrier_type,
                rebate,
            } => self.barrier(
                process,
                right,
                strike,
                barrier,
                barrier_type,
                rebate,
                t,
                res,
                interrupt,
            ),
            _ => Err(Error::UnsupportedCombination {
                kind: contract.kind().name().into(),
                method: Method::FiniteDifference.name().into(),
            }),
        }
    }

    /// European payoff with forward-intrinsic edges.
    fn european(
        &self,
        process: &BlackScholesProcess,
        horizon: Time,
        payoff: Payout<'_>,
        res: Resolution,
        interrupt: &Interrupt,
    ) -> Result<Solved> {
        let edge = |time: Time, s: Real| forward_intrinsic(process, horizon, time, s, payoff);
        self.one_factor(
            Problem {
                process,
                horizon,
                payoff,
                edge: &edge,
                exercise: None,
            },
            res,
            interrupt,
        )
    }

    fn one_factor(
        &self,
        problem: Problem<'_>,
        res: Resolution,
        interrupt: &Interrupt,
    ) -> Result<Solved> {
        let Problem {
            process,
            horizon,
            payoff,
            edge,
            exercise,
        } = problem;
        let grid = LogGrid::centered(process.spot, self.half_width(process, horizon), res.nodes)?;
        let solver = self.solver(&grid, process, horizon, res)?;
        let times = solver.times();
        let early = exercise.map(|(policy, value)| EarlyExercise::new(policy, &times, value));
        let boundaries = Boundaries {
            lower: edge,
            upper: edge,
        };
        let values = grid.cell_average(payoff);
        let greeks = solved!(solver.solve(
            values,
            solver.steps(),
            &boundaries,
            early.as_ref(),
            interrupt
        ));
        Ok(Interruptible::Finished((greeks, Layout::of(&solver))))
    }

    /// Two-phase solve: call and put to the choose time, the larger of the
    /// two from there.
    fn chooser(
        &self,
        process: &BlackScholesProcess,
        strike: Real,
        choose_time: Time,
        t: Time,
        res: Resolution,
        interrupt: &Interrupt,
    ) -> Result<Solved> {
        let grid = LogGrid::centered(process.spot, self.half_width(process, t), res.nodes)?;
        let solver = self.solver(&grid, process, t, res)?;
        let k = solver.level_at(choose_time);
        let n = solver.steps();

        let call = move |s: Real| (s - strike).max(0.0);
        let put = move |s: Real| (strike - s).max(0.0);
        let call_edge = |time: Time, s: Real| forward_intrinsic(process, t, time, s, call);
        let put_edge = |time: Time, s: Real| forward_intrinsic(process, t, time, s, put);
        let either = |time: Time, s: Real| call_edge(time, s).max(put_edge(time, s));

        let calls = solved!(solver.march(
            grid.cell_average(&call),
            n,
            k,
            &Boundaries {
                lower: &call_edge,
                upper: &call_edge,
            },
            None,
            interrupt
        ));
        let puts = solved!(solver.march(
            grid.cell_average(&put),
            n,
            k,
            &Boundaries {
                lower: &put_edge,
                upper: &put_edge,
            },
            None,
            interrupt
        ));
        let chosen = calls.iter().zip(&puts).map(|(c, p)| c.max(*p)).collect();
        let greeks = solved!(solver.solve(
            chosen,
            k,
            &Boundaries {
                lower: &either,
                upper: &either,
            },
            None,
            interrupt
        ));
        Ok(Interruptible::Finished((greeks, Layout::of(&solver))))
    }

    /// Two-phase solve: the inner option back to the outer maturity, the
    /// outer payoff on its value from there.
    #[allow(clippy::too_many_arguments)]
    fn compound(
        &self,
        process: &BlackScholesProcess,
        (right, strike): (OptionType, Real),
        (inner_right, inner_strike): (OptionType, Real),
        t: Time,
        inner_maturity: Time,
        res: Resolution,
        interrupt: &Interrupt,
    ) -> Result<Solved> {
        let grid = LogGrid::centered(
            process.spot,
            self.half_width(process, inner_maturity),
            res.nodes,
        )?;
        let solver = self.solver(&grid, process, inner_maturity, res)?;
        let k = solver.level_at(t);

        let inner = move |s: Real| inner_right.intrinsic(s, inner_strike);
        let inner_edge =
            |time: Time, s: Real| forward_intrinsic(process, inner_maturity, time, s, inner);
        let inner_at_expiry = |s: Real| inner_edge(t, s);
        let outer_edge = |time: Time, s: Real| {
            forward_intrinsic(process, t, time, s, |x| {
                right.intrinsic(inner_at_expiry(x), strike)
            })
        };

        let inner_values = solved!(solver.march(
            grid.cell_average(&inner),
            solver.steps(),
            k,
            &Boundaries {
                lower: &inner_edge,
                upper: &inner_edge,
            },
            None,
            interrupt
        ));
        let outer = inner_values
            .iter()
            .map(|&v| right.intrinsic(v, strike))
            .collect();
        let greeks = solved!(solver.solve(
            outer,
            k,
            &Boundaries {
                lower: &outer_edge,
                upper: &outer_edge,
            },
            None,
            interrupt
        ));
        Ok(Interruptible::Finished((greeks, Layout::of(&solver))))
    }

    #[allow(clippy::too_many_arguments)]
    fn barrier(
        &self,
        process: &BlackScholesProcess,
        right: OptionType,
        strike: Real,
        barrier: Real,
        barrier_type: BarrierType,
        rebate: Real,
        t: Time,
        res: Resolution,
        interrupt: &Interrupt,
    ) -> Result<Solved> {
        let half_width = self.half_width(process, t);
        let grid = LogGrid::with_barrier(process.spot, barrier, half_width, res.nodes)?;
        let solver = self.solver(&grid, process, t, res)?;
        let down = barrier_type.is_down();
        let vanilla = move |s: Real| right.intrinsic(s, strike);
        let far = |time: Time, s: Real| forward_intrinsic(process, t, time, s, vanilla);

        if barrier_type.is_out() {
            let greeks = solved!(knock_out(&solver, down, &vanilla, &far, rebate, interrupt));
            return Ok(Interruptible::Finished((greeks, Layout::of(&solver))));
        }

        let out = solved!(knock_out(&solver, down, &vanilla, &far, 0.0, interrupt));
        let unit = |_: Real| 1.0;
        let bond = |time: Time, _: Real| process.discount(t - time);
        let no_touch = solved!(knock_out(&solver, down, &unit, &bond, 0.0, interrupt));
        let (plain, _) = solved!(self.european(process, t, &vanilla, res, interrupt));
        let greeks = plain - out + no_touch * rebate;
        Ok(Interruptible::Finished((greeks, Layout::of(&solver))))
    }
}

/// Forward intrinsic at a grid edge, floored at the exercise value when
/// exercise is possible at every level.
fn vanilla_edge(
    process: &BlackScholesProcess,
    horizon: Time,
    time: Time,
    spot: Real,
    intrinsic: Payout<'_>,
    american: bool,
) -> Real {
    let forward = forward_intrinsic(process, horizon, time, spot, intrinsic);
    if american {
        forward.max(intrinsic(spot))
    } else {
        forward
    }
}

/// Solve with the barrier node pinned to `at_barrier` and `far` on the
/// opposite edge.
fn knock_out(
    solver: &ThetaSolver<'_>,
    down: bool,
    payoff: Payout<'_>,
    far: Edge<'_>,
    at_barrier: Real,
    interrupt: &Interrupt,
) -> Result<Interruptible<FdGreeks>> {
    let grid = solver.grid();
    let mut values = grid.cell_average(payoff);
    let hit = move |_: Time, _: Real| at_barrier;
    let (barrier_node, boundaries) = if down {
        (
            0,
            Boundaries {
                lower: &hit,
                upper: far,
            },
        )
    } else {
        (
            grid.len() - 1,
            Boundaries {
                lower: far,
                upper: &hit,
            },
        )
    };
    values[barrier_node] = at_barrier;
    solver.solve(values, solver.steps(), &boundaries, None, interrupt)
}

fn result(scheme: &str, (greeks, layout): (FdGreeks, Layout)) -> PricingResult {
    PricingResult::new(
        greeks.value,
        Diagnostics::FiniteDifference {
            scheme: scheme.to_string(),
            price_nodes: layout.price_nodes,
            time_steps: layout.time_steps,
            requested_time_steps: layout.requested_time_steps,
            time_step_adjusted: layout.time_step_adjusted,
            lower_bound: layout.lower_bound,
            upper_bound: layout.upper_bound,
        },
    )
    .with_greeks(Greeks::spot_and_time(greeks.delta, greeks.gamma, greeks.theta))
}

impl PricingEngine for FiniteDifferenceEngine {
    fn method(&self) -> Method {
        Method::FiniteDifference
    }

    fn calculate(
        &self,
        contract: &OptionContract,
        market: &MarketParameters,
    ) -> Result<PricingResult> {
        let process = prepare(Method::FiniteDifference, contract, market)?;
        let interrupt = &self.config.interrupt;
        let scheme = self.config.scheme.name();
        let full = Resolution {
            nodes: self.config.price_grid_size,
            time_steps: self.config.time_steps,
            auto_adjust: self.config.auto_adjust_time_step,
        };

        let coarse = if interrupt.is_armed() {
            // Set up the full grid with an already-raised flag so that its
            // errors (an unstable explicit step) surface before any solving.
            let stopped = Interrupt::default().with_cancel_flag(Arc::new(AtomicBool::new(true)));
            self.run(contract, &process, full, &stopped)?;

            let res = Resolution {
                nodes: full.nodes.min(COARSE_PRICE_NODES),
                time_steps: full.time_steps.min(COARSE_TIME_STEPS),
                auto_adjust: true,
            };
            match self.run(contract, &process, res, &Interrupt::default()) {
                Ok(outcome) => outcome.finished(),
                Err(err) => {
                    debug!(%err, "coarse grid unavailable");
                    None
                }
            }
        } else {
            None
        };

        match self.run(contract, &process, full, interrupt)? {
            Interruptible::Finished(done) => {
                let layout = done.1;
                if layout.time_step_adjusted {
                    warn!(
                        requested = layout.requested_time_steps,
                        used = layout.time_steps,
                        "explicit time step raised to the stability bound"
                    );
                }
                Ok(result(scheme, done))
            }
            Interruptible::Stopped(reason) => {
                let done = coarse.ok_or_else(|| {
                    Error::NumericalDegeneracy(format!(
                        "finite-difference run stopped ({reason:?}) with no coarse estimate"
                    ))
                })?;
                debug!(
                    ?reason,
                    nodes = done.1.price_nodes,
                    "finite-difference run interrupted, keeping the coarse grid"
                );
                Ok(result(scheme, done).with_status(ResultStatus::Partial(reason.into())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytic::{
        barrier::barrier_price, black_scholes::black_scholes, binary::binary,
        chooser::simple_chooser, compound::geske_compound,
    };
    use crate::config::LatticeConfig;
    use crate::lattice_engine::LatticeEngine;
    use chrono::NaiveDate;
    use ol_instruments::{BinaryKind, ExerciseStyle, UnderlyingAsset};
    use ol_methods::finite_differences::FdScheme;
    use std::sync::{atomic::AtomicBool, Arc};

    fn market() -> MarketParameters {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        MarketParameters::new(100.0, 0.05, 0.01, 0.25, date).unwrap()
    }

    fn process() -> BlackScholesProcess {
        BlackScholesProcess::new(100.0, 0.05, 0.01, 0.25)
    }

    fn engine() -> FiniteDifferenceEngine {
        FiniteDifferenceEngine::new(FdConfig {
            price_grid_size: 401,
            time_steps: 200,
            ..FdConfig::default()
        })
    }

    fn contract(payoff: Payoff, right: OptionType) -> OptionContract {
        OptionContract::new(payoff, ExerciseStyle::European, right, Some(1.0)).unwrap()
    }

    #[test]
    fn european_matches_black_scholes() {
        for right in [OptionType::Call, OptionType::Put] {
            let option = OptionContract::european(right, 100.0, 1.0).unwrap();
            let r = engine().calculate(&option, &market()).unwrap();
            let bs = black_scholes(&process(), right, 100.0, 1.0);
            assert!(
                (r.price - bs.price).abs() < 0.01,
                "{right}: {} vs {}",
                r.price,
                bs.price
            );
            let greeks = r.greeks.unwrap();
            assert!((greeks.delta.unwrap() - bs.delta).abs() < 1e-3);
            assert!((greeks.gamma.unwrap() - bs.gamma).abs() < 1e-3);
            assert!((greeks.theta.unwrap() - bs.theta).abs() < 0.05);
        }
    }

    #[test]
    fn diagnostics_describe_the_grid() {
        let option = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let r = FiniteDifferenceEngine::default()
            .calculate(&option, &market())
            .unwrap();
        match r.diagnostics {
            Diagnostics::FiniteDifference {
                scheme,
                price_nodes,
                time_steps,
                time_step_adjusted,
                lower_bound,
                upper_bound,
                ..
            } => {
                assert_eq!(scheme, FdScheme::CrankNicolson.name());
                assert_eq!(price_nodes, 201);
                assert_eq!(time_steps, 100);
                assert!(!time_step_adjusted);
                assert!(lower_bound < 40.0 && upper_bound > 250.0);
            }
            other => panic!("unexpected diagnostics {other:?}"),
        }
    }

    #[test]
    fn bermudan_put_between_european_and_american() {
        let times: Vec<Time> = (1..=4).map(|k| k as Time * 0.25).collect();
        let bermudan = OptionContract::bermudan(OptionType::Put, 100.0, times, 1.0).unwrap();
        let b = engine().calculate(&bermudan, &market()).unwrap().price;
        let eu = black_scholes(&process(), OptionType::Put, 100.0, 1.0).price;
        let american = OptionContract::american(OptionType::Put, 100.0, 1.0).unwrap();
        let a = LatticeEngine::new(LatticeConfig::with_steps(500))
            .calculate(&american, &market())
            .unwrap()
            .price;
        assert!(b > eu && b < a + 0.01, "{eu} < {b} < {a}");
    }

    #[test]
    fn american_is_not_offered() {
        let american = OptionContract::american(OptionType::Put, 100.0, 1.0).unwrap();
        assert!(matches!(
            engine().calculate(&american, &market()),
            Err(Error::UnsupportedCombination { .. })
        ));
    }

    #[test]
    fn digital_converges_with_cell_averaging() {
        let digital = contract(
            Payoff::Binary {
                strike: 105.0,
                binary: BinaryKind::CashOrNothing { cash: 1.0 },
            },
            OptionType::Call,
        );
        let v = engine().calculate(&digital, &market()).unwrap().price;
        let expected = binary(
            &process(),
            OptionType::Call,
            BinaryKind::CashOrNothing { cash: 1.0 },
            105.0,
            1.0,
        )
        .price;
        assert!((v - expected).abs() < 5e-3, "{v} vs {expected}");
    }

    #[test]
    fn knock_out_matches_reiner_rubinstein() {
        let cases = [
            (OptionType::Call, 90.0, BarrierType::DownOut, 10.57795),
            (OptionType::Put, 110.0, BarrierType::UpOut, 7.31874),
        ];
        for (right, h, barrier_type, expected) in cases {
            let option = contract(
                Payoff::Barrier {
                    strike: 100.0,
                    barrier: h,
                    barrier_type,
                    rebate: 3.0,
                },
                right,
            );
            let r = engine().calculate(&option, &market()).unwrap();
            assert!(
                (r.price - expected).abs() < 0.03,
                "{barrier_type:?}: {} vs {expected}",
                r.price
            );
            match r.diagnostics {
                Diagnostics::FiniteDifference {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    let edge = if barrier_type.is_down() { lower_bound } else { upper_bound };
                    assert!((edge - h).abs() < 1e-9, "{edge} vs {h}");
                }
                other => panic!("unexpected diagnostics {other:?}"),
            }
        }
    }

    #[test]
    fn knock_in_by_parity() {
        for rebate in [0.0, 3.0] {
            let option = contract(
                Payoff::Barrier {
                    strike: 100.0,
                    barrier: 90.0,
                    barrier_type: BarrierType::DownIn,
                    rebate,
                },
                OptionType::Call,
            );
            let v = engine().calculate(&option, &market()).unwrap().price;
            let expected = barrier_price(
                &process(),
                OptionType::Call,
                BarrierType::DownIn,
                100.0,
                90.0,
                rebate,
                1.0,
            );
            assert!((v - expected).abs() < 0.03, "rebate {rebate}: {v} vs {expected}");
        }
    }

    #[test]
    fn chooser_and_compound_match_closed_forms() {
        let chooser = contract(
            Payoff::Chooser {
                strike: 100.0,
                choose_time: 0.5,
            },
            OptionType::Call,
        );
        let v = engine().calculate(&chooser, &market()).unwrap().price;
        let expected = simple_chooser(&process(), 100.0, 0.5, 1.0);
        assert!((v - expected).abs() < 0.03, "{v} vs {expected}");

        let compound = contract(
            Payoff::Compound {
                strike: 5.0,
                inner_right: OptionType::Call,
                inner_strike: 100.0,
                inner_maturity: 2.0,
            },
            OptionType::Put,
        );
        let v = engine().calculate(&compound, &market()).unwrap().price;
        let expected =
            geske_compound(&process(), OptionType::Put, OptionType::Call, 5.0, 100.0, 1.0, 2.0)
                .unwrap();
        assert!((v - expected).abs() < 0.03, "{v} vs {expected}");
    }

    #[test]
    fn exchange_and_shout() {
        let exchange = contract(
            Payoff::Exchange {
                second: UnderlyingAsset::new(95.0, 0.3, 0.02).unwrap(),
                correlation: 0.5,
            },
            OptionType::Call,
        );
        let v = engine().calculate(&exchange, &market()).unwrap().price;
        assert!((v - 13.832_385_744_105_828).abs() < 0.02, "{v}");

        let shout = contract(Payoff::Shout { strike: 100.0 }, OptionType::Put);
        let s = engine().calculate(&shout, &market()).unwrap().price;
        let eu = black_scholes(&process(), OptionType::Put, 100.0, 1.0).price;
        assert!(s > eu, "{s} vs {eu}");
    }

    #[test]
    fn explicit_scheme_stability() {
        let option = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let strict = FiniteDifferenceEngine::new(FdConfig {
            scheme: FdScheme::Explicit,
            ..FdConfig::default()
        });
        assert!(matches!(
            strict.calculate(&option, &market()),
            Err(Error::StabilityViolation { .. })
        ));

        let adjusting = FiniteDifferenceEngine::new(FdConfig {
            scheme: FdScheme::Explicit,
            auto_adjust_time_step: true,
            ..FdConfig::default()
        });
        let r = adjusting.calculate(&option, &market()).unwrap();
        match r.diagnostics {
            Diagnostics::FiniteDifference {
                time_steps,
                requested_time_steps,
                time_step_adjusted,
                ..
            } => {
                assert!(time_step_adjusted);
                assert_eq!(requested_time_steps, 100);
                assert!(time_steps > 100);
            }
            other => panic!("unexpected diagnostics {other:?}"),
        }
        let bs = black_scholes(&process(), OptionType::Call, 100.0, 1.0).price;
        assert!((r.price - bs).abs() < 0.02, "{} vs {bs}", r.price);
    }

    #[test]
    fn cancelled_run_returns_coarse_estimate() {
        let config = FdConfig {
            interrupt: Interrupt::default().with_cancel_flag(Arc::new(AtomicBool::new(true))),
            ..FdConfig::default()
        };
        let option = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let r = FiniteDifferenceEngine::new(config)
            .calculate(&option, &market())
            .unwrap();
        assert!(matches!(r.status, ResultStatus::Partial(_)));
        let bs = black_scholes(&process(), OptionType::Call, 100.0, 1.0).price;
        assert!((r.price - bs).abs() < 0.3, "{} vs {bs}", r.price);
    }

    #[test]
    fn american_put_edge_never_drops_below_intrinsic() {
        let put = |s: Real| OptionType::Put.intrinsic(s, 100.0);
        let p = process();
        let american = vanilla_edge(&p, 1.0, 0.0, 50.0, &put, true);
        let european = vanilla_edge(&p, 1.0, 0.0, 50.0, &put, false);
        assert_eq!(american, 50.0);
        assert!(european < 46.0, "{european}");
        assert_eq!(vanilla_edge(&p, 1.0, 0.0, 150.0, &put, true), 0.0);
    }

    #[test]
    fn deadline_does_not_break_a_near_spot_barrier() {
        let option = contract(
            Payoff::Barrier {
                strike: 100.0,
                barrier: 97.0,
                barrier_type: BarrierType::DownOut,
                rebate: 0.0,
            },
            OptionType::Call,
        );
        let plain = engine().calculate(&option, &market()).unwrap();
        let timed = FiniteDifferenceEngine::new(FdConfig {
            price_grid_size: 401,
            time_steps: 200,
            interrupt: Interrupt::default().with_timeout(std::time::Duration::from_secs(60)),
            ..FdConfig::default()
        })
        .calculate(&option, &market())
        .unwrap();
        assert_eq!(timed.status, ResultStatus::Complete);
        assert_eq!(timed.price, plain.price);
    }

    #[test]
    fn unstable_grid_is_rejected_before_the_coarse_pass() {
        // The coarse grid adjusts its own step, so only the full one fails.
        let flag = Arc::new(AtomicBool::new(true));
        let option = OptionContract::european(OptionType::Call, 100.0, 1.0).unwrap();
        let strict = FiniteDifferenceEngine::new(FdConfig {
            scheme: FdScheme::Explicit,
            interrupt: Interrupt::default().with_cancel_flag(flag),
            ..FdConfig::default()
        });
        assert!(matches!(
            strict.calculate(&option, &market()),
            Err(Error::StabilityViolation { .. })
        ));
    }
}
