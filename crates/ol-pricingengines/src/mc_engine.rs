//! Monte Carlo engine.
//!
//! Paths are exact log-normal steps on a [`TimeGrid`] that merges the
//! contract's monitoring dates with uniform steps where monitoring is
//! continuous. Every pricer also reports a control whose expectation is known
//! in closed form:
//!
//! * European-style single-asset payoffs use the discounted terminal spot
//! * arithmetic Asians use the discrete geometric Asian
//! * barriers use the vanilla with the same strike
//! * multi-asset payoffs use a linear combination of the forwards
//!
//! The control only enters the estimate when `control_variate` is set.

use ol_core::{
    errors::{Error, Result},
    Real, Time,
};
use ol_instruments::{
    option::tracks_minimum, Averaging, BarrierType, Diagnostics, ExerciseStyle, LookbackKind,
    MarketParameters, Method, OptionContract, OptionType, Payoff, PricingResult, RainbowKind,
    UnderlyingAsset,
};
use ol_methods::{
    monte_carlo::{
        crossing_probability, shifted_barrier, BatchSampler, LongstaffSchwartz, McEstimate,
        McSettings, MonteCarloModel, MultiAssetPricer, MultiPathGenerator, PathGenerator,
        Pathwise, Sample, SingleAssetPricer, TimeGrid,
    },
    BlackScholesProcess, ExercisePolicy,
};
use tracing::debug;

use crate::analytic::{
    asian::{fixing_times, geometric_asian},
    black_scholes::black_scholes_price,
};
use crate::config::MonteCarloConfig;
use crate::engine::{prepare, terminal, PricingEngine};
use crate::reduction::quanto_process;

/// Outcome of one simulation.
struct Simulation {
    estimate: McEstimate,
    time_steps: usize,
    regression: bool,
}

/// Path simulation with optional antithetic pairs, control variates and
/// least-squares early exercise.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloEngine {
    config: MonteCarloConfig,
}

fn last(path: &[Real]) -> Real {
    path[path.len() - 1]
}

/// Grid index of a monitoring time; time zero is the start of every path.
fn index_at(grid: &TimeGrid, t: Time) -> Result<usize> {
    if t <= 0.0 {
        return Ok(0);
    }
    grid.index_of(t).ok_or_else(|| {
        Error::NumericalDegeneracy(format!("monitoring time {t} is not on the simulation grid"))
    })
}

/// Monitoring times strictly after the valuation date.
fn after_start(times: &[Time]) -> Vec<Time> {
    times.iter().copied().filter(|&t| t > 0.0).collect()
}

/// A second asset simulated alongside the market underlying.
fn companion(process: &BlackScholesProcess, asset: &UnderlyingAsset) -> BlackScholesProcess {
    BlackScholesProcess::new(asset.spot, process.rate, asset.dividend, asset.volatility)
}

fn pair_correlation(correlation: Real) -> Vec<Vec<Real>> {
    vec![vec![1.0, correlation], vec![correlation, 1.0]]
}

/// Present value of `Σ cᵢ Sᵢ(T)`.
fn forward_value(processes: &[BlackScholesProcess], coefficients: &[Real], t: Time) -> Real {
    processes
        .iter()
        .zip(coefficients)
        .map(|(p, c)| c * p.spot * p.dividend_discount(t))
        .sum()
}

impl MonteCarloEngine {
    /// Engine with the given settings.
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    /// The settings.
    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    fn settings(&self) -> McSettings {
        let c = &self.config;
        McSettings {
            paths: c.paths,
            seed: c.seed,
            batch_size: c.batch_size,
            parallel: c.parallel,
            normal_method: c.normal_method,
            control_variate: c.control_variate,
            target_std_error: c.target_std_error,
            max_paths: c.max_paths,
        }
    }

    fn run(&self, sampler: &dyn BatchSampler) -> Result<McEstimate> {
        MonteCarloModel::new(sampler, self.settings()).run(&self.config.interrupt)
    }

    fn single<F>(
        &self,
        process: &BlackScholesProcess,
        grid: &TimeGrid,
        payoff: F,
        control_mean: Real,
    ) -> Result<Simulation>
    where
        F: Fn(&[Real]) -> Sample + Sync,
    {
        let pricer = SingleAssetPricer::new(
            PathGenerator::new(process, grid),
            payoff,
            Some(control_mean),
        );
        let sampler = Pathwise::new(pricer, self.config.antithetic);
        Ok(Simulation {
            estimate: self.run(&sampler)?,
            time_steps: grid.steps(),
            regression: false,
        })
    }

    fn multi<F>(
        &self,
        processes: &[BlackScholesProcess],
        correlation: &[Vec<Real>],
        grid: &TimeGrid,
        payoff: F,
        control_mean: Real,
    ) -> Result<Simulation>
    where
        F: Fn(&[Vec<Real>]) -> Sample + Sync,
    {
        let generator = MultiPathGenerator::new(processes, correlation, grid)?;
        let pricer = MultiAssetPricer::new(generator, payoff, Some(control_mean));
        let sampler = Pathwise::new(pricer, self.config.antithetic);
        Ok(Simulation {
            estimate: self.run(&sampler)?,
            time_steps: grid.steps(),
            regression: false,
        })
    }

    /// A payoff on the terminal spot, controlled by the terminal spot.
    fn terminal_spot(
        &self,
        process: &BlackScholesProcess,
        t: Time,
        payoff: impl Fn(Real) -> Real + Sync,
    ) -> Result<Simulation> {
        let grid = TimeGrid::new(t, 1, &[])?;
        let df = process.discount(t);
        self.single(
            process,
            &grid,
            |path: &[Real]| {
                let s = last(path);
                Sample {
                    value: df * payoff(s),
                    control: df * s,
                }
            },
            process.spot * process.dividend_discount(t),
        )
    }

    fn early_exercise(
        &self,
        process: &BlackScholesProcess,
        right: OptionType,
        strike: Real,
        style: &ExerciseStyle,
        t: Time,
    ) -> Result<Simulation> {
        let policy = ExercisePolicy::from_style(style)?;
        let grid = match &policy {
            ExercisePolicy::Bermudan(times) => TimeGrid::new(t, 1, times)?,
            _ => TimeGrid::new(t, self.config.time_steps, &[])?,
        };
        let exercise_value = move |_: Time, s: Real| right.intrinsic(s, strike);
        let european = black_scholes_price(process, right, strike, t);
        let sampler = LongstaffSchwartz::new(
            process,
            &grid,
            &policy,
            &exercise_value,
            strike,
            self.config.antithetic,
            Some(european),
        );
        let mut estimate = self.run(&sampler)?;
        if policy == ExercisePolicy::American {
            // Immediate exercise is always available.
            estimate.mean = estimate.mean.max(right.intrinsic(process.spot, strike));
        }
        Ok(Simulation {
            estimate,
            time_steps: grid.steps(),
            regression: true,
        })
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
    ) -> Result<Simulation> {
        let grid = TimeGrid::new(t, self.config.time_steps, &[])?;
        let variance = process.volatility * process.volatility;
        let variances: Vec<Real> = (0..grid.steps()).map(|i| variance * grid.dt(i)).collect();
        let discounts: Vec<Real> = grid.times().iter().map(|&u| process.discount(u)).collect();
        let df = process.discount(t);
        let bridge = self.config.continuity_correction;
        let out = barrier_type.is_out();

        let payoff = move |path: &[Real]| {
            let mut survival = 1.0;
            let mut rebate_at_hit = 0.0;
            for (i, step) in path.windows(2).enumerate() {
                let hit = if bridge {
                    crossing_probability(step[0], step[1], barrier, variances[i])
                } else if barrier_type.is_breached(step[1], barrier) {
                    1.0
                } else {
                    0.0
                };
                rebate_at_hit += survival * hit * discounts[i + 1];
                survival *= 1.0 - hit;
            }
            let vanilla = df * right.intrinsic(last(path), strike);
            let value = if out {
                survival * vanilla + rebate * rebate_at_hit
            } else {
                (1.0 - survival) * vanilla + survival * rebate * df
            };
            Sample {
                value,
                control: vanilla,
            }
        };
        let control_mean = black_scholes_price(process, right, strike, t);
        self.single(process, &grid, payoff, control_mean)
    }

    #[allow(clippy::too_many_arguments)]
    fn asian(
        &self,
        process: &BlackScholesProcess,
        right: OptionType,
        strike: Real,
        averaging: Averaging,
        start: Time,
        fixings: usize,
        t: Time,
    ) -> Result<Simulation> {
        let times = fixing_times(start, t, fixings);
        let grid = TimeGrid::new(t, 1, &after_start(&times))?;
        let indices = times
            .iter()
            .map(|&u| index_at(&grid, u))
            .collect::<Result<Vec<_>>>()?;
        let df = process.discount(t);
        let m = fixings as Real;

        let payoff = move |path: &[Real]| {
            let geometric = (indices.iter().map(|&i| path[i].ln()).sum::<Real>() / m).exp();
            let average = match averaging {
                Averaging::Arithmetic => indices.iter().map(|&i| path[i]).sum::<Real>() / m,
                Averaging::Geometric => geometric,
            };
            let control = match averaging {
                Averaging::Arithmetic => df * right.intrinsic(geometric, strike),
                Averaging::Geometric => df * last(path),
            };
            Sample {
                value: df * right.intrinsic(average, strike),
                control,
            }
        };
        let control_mean = match averaging {
            Averaging::Arithmetic => geometric_asian(process, right, strike, start, t, fixings),
            Averaging::Geometric => process.spot * process.dividend_discount(t),
        };
        self.single(process, &grid, payoff, control_mean)
    }

    fn lookback(
        &self,
        process: &BlackScholesProcess,
        right: OptionType,
        lookback: LookbackKind,
        running_extreme: Option<Real>,
        t: Time,
    ) -> Result<Simulation> {
        let grid = TimeGrid::new(t, self.config.time_steps, &[])?;
        let dt = grid.dt(0);
        let minimum = tracks_minimum(lookback, right);
        let sigma = process.volatility;
        let shift = self.config.continuity_correction;
        let df = process.discount(t);

        let payoff = move |path: &[Real]| {
            let observed = if minimum {
                path.iter().copied().fold(Real::INFINITY, Real::min)
            } else {
                path.iter().copied().fold(Real::NEG_INFINITY, Real::max)
            };
            let simulated = if shift {
                shifted_barrier(observed, minimum, sigma, dt)
            } else {
                observed
            };
            let extreme = match (running_extreme, minimum) {
                (Some(m), true) => simulated.min(m),
                (Some(m), false) => simulated.max(m),
                (None, _) => simulated,
            };
            let s = last(path);
            let value = match lookback {
                LookbackKind::Floating => right.sign() * (s - extreme),
                LookbackKind::Fixed { strike } => right.intrinsic(extreme, strike),
            };
            Sample {
                value: df * value.max(0.0),
                control: df * s,
            }
        };
        self.single(process, &grid, payoff, process.spot * process.dividend_discount(t))
    }

    fn simulate(
        &self,
        contract: &OptionContract,
        process: &BlackScholesProcess,
    ) -> Result<Simulation> {
        let payoff = contract.payoff();
        let right = contract.right();
        let t = contract.time_to_maturity()?;

        match *payoff {
            Payoff::Vanilla { strike } => match contract.exercise() {
                ExerciseStyle::European => {
                    self.terminal_spot(process, t, move |s| right.intrinsic(s, strike))
                }
                style => self.early_exercise(process, right, strike, style, t),
            },
            Payoff::Binary { .. } | Payoff::Gap { .. } => {
                self.terminal_spot(process, t, terminal(payoff, right)?)
            }
            Payoff::Quanto {
                fx_volatility,
                correlation,
                foreign_rate,
                ..
            } => {
                let quanto = quanto_process(process, fx_volatility, correlation, foreign_rate);
                self.terminal_spot(&quanto, t, terminal(payoff, right)?)
            }
            Payoff::Barrier {
                strike,
                barrier,
                barrier_type,
                rebate,
            } => self.barrier(process, right, strike, barrier, barrier_type, rebate, t),
            Payoff::Asian {
                strike,
                averaging,
                averaging_start,
                fixings,
            } => self.asian(
                process,
                right,
                strike,
                averaging,
                averaging_start,
                fixings,
                t,
            ),
            Payoff::Lookback {
                lookback,
                running_extreme,
            } => self.lookback(process, right, lookback, running_extreme, t),
            Payoff::Chooser {
                strike,
                choose_time,
            } => {
                // max(C, P) at the choose date is C plus a put struck at the
                // discounted strike on the dividend-discounted spot.
                let grid = TimeGrid::new(t, 1, &after_start(&[choose_time]))?;
                let k = index_at(&grid, choose_time)?;
                let tau = t - choose_time;
                let (df, df_choose) = (process.discount(t), process.discount(choose_time));
                let (bond, carry) = (strike * process.discount(tau), process.dividend_discount(tau));
                let payoff = move |path: &[Real]| {
                    let s = last(path);
                    let put_leg = (bond - path[k] * carry).max(0.0);
                    Sample {
                        value: df * (s - strike).max(0.0) + df_choose * put_leg,
                        control: df * s,
                    }
                };
                self.single(process, &grid, payoff, process.spot * process.dividend_discount(t))
            }
            Payoff::Compound {
                strike,
                inner_right,
                inner_strike,
                inner_maturity,
            } => {
                let grid = TimeGrid::new(t, 1, &[])?;
                let df = process.discount(t);
                let tau = inner_maturity - t;
                let payoff = move |path: &[Real]| {
                    let s = last(path);
                    let inner =
                        black_scholes_price(&process.with_spot(s), inner_right, inner_strike, tau);
                    Sample {
                        value: df * right.intrinsic(inner, strike),
                        control: df * s,
                    }
                };
                self.single(process, &grid, payoff, process.spot * process.dividend_discount(t))
            }
            Payoff::ForwardStart {
                start_time,
                moneyness,
            } => {
                let grid = TimeGrid::new(t, 1, &after_start(&[start_time]))?;
                let k = index_at(&grid, start_time)?;
                let df = process.discount(t);
                let payoff = move |path: &[Real]| {
                    let s = last(path);
                    Sample {
                        value: df * right.intrinsic(s, moneyness * path[k]),
                        control: df * s,
                    }
                };
                self.single(process, &grid, payoff, process.spot * process.dividend_discount(t))
            }
            Payoff::Basket {
                strike,
                ref weights,
                ref assets,
                ref correlation,
            } => {
                let mut processes = vec![*process];
                processes.extend(assets.iter().map(|a| companion(process, a)));
                let grid = TimeGrid::new(t, 1, &[])?;
                let df = process.discount(t);
                let payoff = |paths: &[Vec<Real>]| {
                    let basket: Real = weights.iter().zip(paths).map(|(w, p)| w * last(p)).sum();
                    Sample {
                        value: df * right.intrinsic(basket, strike),
                        control: df * basket,
                    }
                };
                let control_mean = forward_value(&processes, weights, t);
                self.multi(&processes, correlation, &grid, payoff, control_mean)
            }
            Payoff::Exchange {
                ref second,
                correlation,
            } => self.two_assets(process, second, correlation, t, [1.0, -1.0], |s1, s2| {
                right.intrinsic(s1, s2)
            }),
            Payoff::Spread {
                strike,
                ref second,
                correlation,
            } => self.two_assets(process, second, correlation, t, [1.0, -1.0], |s1, s2| {
                right.intrinsic(s1 - s2, strike)
            }),
            Payoff::Rainbow {
                strike,
                ref second,
                correlation,
                rainbow,
            } => self.two_assets(process, second, correlation, t, [1.0, 1.0], |s1, s2| {
                let extreme = match rainbow {
                    RainbowKind::BestOf => s1.max(s2),
                    RainbowKind::WorstOf => s1.min(s2),
                };
                right.intrinsic(extreme, strike)
            }),
            Payoff::Shout { .. } | Payoff::VarianceSwap { .. } => {
                Err(Error::UnsupportedCombination {
                    kind: contract.kind().name().into(),
                    method: Method::MonteCarlo.name().into(),
                })
            }
        }
    }

    /// A payoff on two terminal spots, controlled by `c₁ S₁ + c₂ S₂`.
    fn two_assets(
        &self,
        process: &BlackScholesProcess,
        second: &UnderlyingAsset,
        correlation: Real,
        t: Time,
        coefficients: [Real; 2],
        payoff: impl Fn(Real, Real) -> Real + Sync,
    ) -> Result<Simulation> {
        let processes = [*process, companion(process, second)];
        let grid = TimeGrid::new(t, 1, &[])?;
        let df = process.discount(t);
        let [c1, c2] = coefficients;
        let pricer = |paths: &[Vec<Real>]| {
            let (s1, s2) = (last(&paths[0]), last(&paths[1]));
            Sample {
                value: df * payoff(s1, s2),
                control: df * (c1 * s1 + c2 * s2),
            }
        };
        let control_mean = forward_value(&processes, &coefficients, t);
        self.multi(
            &processes,
            &pair_correlation(correlation),
            &grid,
            pricer,
            control_mean,
        )
    }
}

impl PricingEngine for MonteCarloEngine {
    fn method(&self) -> Method {
        Method::MonteCarlo
    }

    fn calculate(
        &self,
        contract: &OptionContract,
        market: &MarketParameters,
    ) -> Result<PricingResult> {
        let process = prepare(Method::MonteCarlo, contract, market)?;
        let Simulation {
            estimate,
            time_steps,
            regression,
        } = self.simulate(contract, &process)?;
        debug!(
            paths = estimate.paths,
            batches = estimate.batches,
            mean = estimate.mean,
            std_error = estimate.std_error,
            "monte carlo estimate"
        );
        // Control-variate adjustment can dip a deep out-of-the-money
        // estimate below zero.
        let price = estimate.mean.max(0.0);
        Ok(PricingResult::new(
            price,
            Diagnostics::MonteCarlo {
                paths: estimate.paths,
                time_steps,
                batches: estimate.batches,
                antithetic: self.config.antithetic,
                control_variate: estimate.control_variate,
                regression,
                target_std_error: self.config.target_std_error,
            },
        )
        .with_standard_error(estimate.std_error)
        .with_status(estimate.status))
    }
}
