//! Batched Monte Carlo estimation.
//!
//! A [`BatchSampler`] turns a seeded normal generator into the statistics of
//! one batch of samples. [`MonteCarloModel`] runs batches (in parallel with
//! rayon when asked), seeding batch `b` with `substream_seed(seed, b)`, and
//! merges their statistics in batch order, so a run is a pure function of
//! its settings whether or not it ran in parallel.

use ol_core::{errors::Result, fail, Interrupt, Real};
use ol_instruments::{PartialReason, ResultStatus};
use ol_math::{
    random_numbers::{substream_seed, NormalMethod, NormalRng},
    statistics::{ControlVariateStatistics, Estimate},
};
use rayon::prelude::*;
use tracing::trace;

use super::path::{MultiPathGenerator, PathGenerator};

/// One Monte Carlo observation: a discounted payoff and, optionally, a
/// control with known expectation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Discounted payoff.
    pub value: Real,
    /// Discounted control payoff (0 when there is no control).
    pub control: Real,
}

/// Produces the statistics of one batch.
pub trait BatchSampler: Sync {
    /// Simulate `samples` samples using `rng`.
    fn sample_batch(&self, rng: &mut NormalRng, samples: usize)
        -> Result<ControlVariateStatistics>;

    /// Simulated paths per sample (2 with antithetic pairs).
    fn paths_per_sample(&self) -> usize {
        1
    }

    /// Exact expectation of the control, when there is one.
    fn control_mean(&self) -> Option<Real> {
        None
    }
}

/// Discounted payoff (and control) of one path set.
pub trait PathPricer: Sync {
    /// The path set.
    type Paths: Default;

    /// Normals consumed per path set.
    fn dimension(&self) -> usize;

    /// Write the paths driven by `normals` (negated when `antithetic`).
    fn generate(&self, normals: &[Real], antithetic: bool, paths: &mut Self::Paths);

    /// Discounted payoff of `paths`.
    fn price(&self, paths: &Self::Paths) -> Sample;

    /// Exact expectation of the control, when there is one.
    fn control_mean(&self) -> Option<Real> {
        None
    }
}

/// Path-by-path sampling of a [`PathPricer`], optionally in antithetic
/// pairs that count as one sample.
pub struct Pathwise<P> {
    pricer: P,
    antithetic: bool,
}

impl<P: PathPricer> Pathwise<P> {
    /// Wrap `pricer`.
    pub fn new(pricer: P, antithetic: bool) -> Self {
        Self { pricer, antithetic }
    }
}

impl<P: PathPricer> BatchSampler for Pathwise<P> {
    fn sample_batch(
        &self,
        rng: &mut NormalRng,
        samples: usize,
    ) -> Result<ControlVariateStatistics> {
        let mut stats = ControlVariateStatistics::new();
        let mut normals = vec![0.0; self.pricer.dimension()];
        let mut paths = P::Paths::default();
        for _ in 0..samples {
            rng.fill(&mut normals);
            self.pricer.generate(&normals, false, &mut paths);
            let mut s = self.pricer.price(&paths);
            if self.antithetic {
                self.pricer.generate(&normals, true, &mut paths);
                let mirror = self.pricer.price(&paths);
                s.value = 0.5 * (s.value + mirror.value);
                s.control = 0.5 * (s.control + mirror.control);
            }
            stats.add(s.value, s.control);
        }
        Ok(stats)
    }

    fn paths_per_sample(&self) -> usize {
        if self.antithetic {
            2
        } else {
            1
        }
    }

    fn control_mean(&self) -> Option<Real> {
        self.pricer.control_mean()
    }
}

/// A single-asset path pricer built from a generator and a closure.
pub struct SingleAssetPricer<F> {
    generator: PathGenerator,
    payoff: F,
    control_mean: Option<Real>,
}

impl<F> SingleAssetPricer<F>
where
    F: Fn(&[Real]) -> Sample + Sync,
{
    /// `payoff` maps a path (spots on the grid, starting with the spot) to
    /// a discounted sample.
    pub fn new(generator: PathGenerator, payoff: F, control_mean: Option<Real>) -> Self {
        Self {
            generator,
            payoff,
            control_mean,
        }
    }
}

impl<F> PathPricer for SingleAssetPricer<F>
where
    F: Fn(&[Real]) -> Sample + Sync,
{
    type Paths = Vec<Real>;

    fn dimension(&self) -> usize {
        self.generator.dimension()
    }

    fn generate(&self, normals: &[Real], antithetic: bool, paths: &mut Vec<Real>) {
        self.generator.fill(normals, antithetic, paths);
    }

    fn price(&self, paths: &Vec<Real>) -> Sample {
        (self.payoff)(paths)
    }

    fn control_mean(&self) -> Option<Real> {
        self.control_mean
    }
}

/// A multi-asset path pricer built from a generator and a closure.
pub struct MultiAssetPricer<F> {
    generator: MultiPathGenerator,
    payoff: F,
    control_mean: Option<Real>,
}

impl<F> MultiAssetPricer<F>
where
    F: Fn(&[Vec<Real>]) -> Sample + Sync,
{
    /// `payoff` maps one path per asset to a discounted sample.
    pub fn new(generator: MultiPathGenerator, payoff: F, control_mean: Option<Real>) -> Self {
        Self {
            generator,
            payoff,
            control_mean,
        }
    }
}

impl<F> PathPricer for MultiAssetPricer<F>
where
    F: Fn(&[Vec<Real>]) -> Sample + Sync,
{
    type Paths = Vec<Vec<Real>>;

    fn dimension(&self) -> usize {
        self.generator.dimension()
    }

    fn generate(&self, normals: &[Real], antithetic: bool, paths: &mut Vec<Vec<Real>>) {
        self.generator.fill(normals, antithetic, paths);
    }

    fn price(&self, paths: &Vec<Vec<Real>>) -> Sample {
        (self.payoff)(paths)
    }

    fn control_mean(&self) -> Option<Real> {
        self.control_mean
    }
}

// ─── Runner ───────────────────────────────────────────────────────────────────

/// Run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct McSettings {
    /// Paths for the first pass.
    pub paths: usize,
    /// User seed.
    pub seed: u64,
    /// Paths per batch.
    pub batch_size: usize,
    /// Run batches on the rayon pool.
    pub parallel: bool,
    /// Normal sampler.
    pub normal_method: NormalMethod,
    /// Apply the sampler's control variate when it has one.
    pub control_variate: bool,
    /// Keep adding batches until the standard error is at most this.
    pub target_std_error: Option<Real>,
    /// Cap on simulated paths when chasing a target.
    pub max_paths: usize,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct McEstimate {
    /// Estimated mean.
    pub mean: Real,
    /// Standard error.
    pub std_error: Real,
    /// Simulated paths.
    pub paths: usize,
    /// Batches merged.
    pub batches: usize,
    /// Whether the control variate adjusted the estimate.
    pub control_variate: bool,
    /// Partial when interrupted or capped before reaching the target.
    pub status: ResultStatus,
}

/// Monte Carlo orchestrator over a [`BatchSampler`].
pub struct MonteCarloModel<'a> {
    sampler: &'a dyn BatchSampler,
    settings: McSettings,
}

impl<'a> MonteCarloModel<'a> {
    /// Model running `sampler` with `settings`.
    pub fn new(sampler: &'a dyn BatchSampler, settings: McSettings) -> Self {
        Self { sampler, settings }
    }

    fn run_batches(
        &self,
        first_batch: u64,
        sizes: &[usize],
        interrupt: &Interrupt,
        guarantee_first: bool,
    ) -> Vec<Option<Result<ControlVariateStatistics>>> {
        let settings = &self.settings;
        let job = |k: usize| {
            if !(guarantee_first && k == 0) && interrupt.check().is_some() {
                return None;
            }
            let batch = first_batch + k as u64;
            let mut rng =
                NormalRng::new(settings.normal_method, substream_seed(settings.seed, batch));
            let stats = self.sampler.sample_batch(&mut rng, sizes[k]);
            trace!(batch, samples = sizes[k], "monte carlo batch done");
            Some(stats)
        };
        if settings.parallel {
            (0..sizes.len()).into_par_iter().map(job).collect()
        } else {
            (0..sizes.len()).map(job).collect()
        }
    }

    /// Run to completion, to the target standard error, to the path cap or
    /// until interrupted, whichever comes first. At least one batch always
    /// completes.
    pub fn run(&self, interrupt: &Interrupt) -> Result<McEstimate> {
        let s = &self.settings;
        let per_sample = self.sampler.paths_per_sample().max(1);
        let batch_samples = (s.batch_size / per_sample).max(1);
        let max_samples = (s.max_paths / per_sample).max(1);
        let control_mean = if s.control_variate {
            self.sampler.control_mean()
        } else {
            None
        };

        let mut stats = ControlVariateStatistics::new();
        let mut wanted = s.paths.div_ceil(per_sample).max(2);
        let mut next_batch = 0_u64;
        let mut status = ResultStatus::Complete;

        let estimate = loop {
            let missing = wanted.saturating_sub(stats.samples());
            let sizes: Vec<usize> = (0..missing.div_ceil(batch_samples))
                .map(|k| batch_samples.min(missing - k * batch_samples))
                .collect();
            let outcomes = self.run_batches(next_batch, &sizes, interrupt, next_batch == 0);
            next_batch += sizes.len() as u64;
            for outcome in outcomes {
                match outcome {
                    Some(batch) => stats.merge(&batch?),
                    None => {
                        if let Some(reason) = interrupt.check() {
                            status = ResultStatus::Partial(reason.into());
                        }
                        break;
                    }
                }
            }

            let Some(estimate) = self.estimate(&stats, control_mean) else {
                fail!(
                    "monte carlo needs at least 3 samples, got {}",
                    stats.samples()
                );
            };
            if status != ResultStatus::Complete {
                break estimate;
            }
            let Some(target) = s.target_std_error else {
                break estimate;
            };
            if estimate.std_error <= target {
                break estimate;
            }
            let n = stats.samples();
            if n >= max_samples {
                status = ResultStatus::Partial(PartialReason::MaxPathsReached);
                break estimate;
            }
            let ratio = estimate.std_error / target;
            let needed = (n as Real * ratio * ratio * 1.1).ceil() as usize;
            wanted = needed.clamp(n + 1, max_samples);
        };

        Ok(McEstimate {
            mean: estimate.mean,
            std_error: estimate.std_error,
            paths: stats.samples() * per_sample,
            batches: next_batch as usize,
            control_variate: control_mean.is_some(),
            status,
        })
    }

    fn estimate(
        &self,
        stats: &ControlVariateStatistics,
        control_mean: Option<Real>,
    ) -> Option<Estimate> {
        match control_mean {
            Some(mean) => stats.adjusted(mean),
            None => stats.plain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::path::TimeGrid;
    use crate::process::BlackScholesProcess;

    // S=100, K=100, r=5%, q=0, σ=20%, T=1.
    const BS_CALL: Real = 10.450_583_572_185_565;

    fn settings() -> McSettings {
        McSettings {
            paths: 40_000,
            seed: 42,
            batch_size: 5_000,
            parallel: true,
            normal_method: NormalMethod::InverseCumulative,
            control_variate: false,
            target_std_error: None,
            max_paths: 1_000_000,
        }
    }

    fn european_call() -> impl PathPricer<Paths = Vec<Real>> {
        let p = BlackScholesProcess::new(100.0, 0.05, 0.0, 0.2);
        let grid = TimeGrid::new(1.0, 1, &[]).unwrap();
        let df = p.discount(1.0);
        // Control: the discounted terminal spot, whose mean is S0 e^{−qT}.
        SingleAssetPricer::new(
            PathGenerator::new(&p, &grid),
            move |path: &[Real]| {
                let s = path[path.len() - 1];
                Sample {
                    value: df * (s - 100.0).max(0.0),
                    control: df * s,
                }
            },
            Some(100.0),
        )
    }

    #[test]
    fn plain_estimate_brackets_black_scholes() {
        let sampler = Pathwise::new(european_call(), false);
        let est = MonteCarloModel::new(&sampler, settings())
            .run(&Interrupt::default())
            .unwrap();
        assert_eq!(est.paths, 40_000);
        assert_eq!(est.batches, 8);
        assert!((est.mean - BS_CALL).abs() < 4.0 * est.std_error, "{est:?}");
    }

    #[test]
    fn same_seed_same_bits_serial_or_parallel() {
        let sampler = Pathwise::new(european_call(), true);
        let parallel = MonteCarloModel::new(&sampler, settings())
            .run(&Interrupt::default())
            .unwrap();
        let serial = MonteCarloModel::new(
            &sampler,
            McSettings {
                parallel: false,
                ..settings()
            },
        )
        .run(&Interrupt::default())
        .unwrap();
        assert_eq!(parallel.mean.to_bits(), serial.mean.to_bits());
        assert_eq!(parallel.std_error.to_bits(), serial.std_error.to_bits());
    }

    #[test]
    fn antithetic_pairs_count_once() {
        let sampler = Pathwise::new(european_call(), true);
        let est = MonteCarloModel::new(&sampler, settings())
            .run(&Interrupt::default())
            .unwrap();
        assert_eq!(est.paths, 40_000);
        assert!((est.mean - BS_CALL).abs() < 4.0 * est.std_error);
    }

    #[test]
    fn control_variate_shrinks_the_error() {
        let sampler = Pathwise::new(european_call(), false);
        let plain = MonteCarloModel::new(&sampler, settings())
            .run(&Interrupt::default())
            .unwrap();
        let controlled = MonteCarloModel::new(
            &sampler,
            McSettings {
                control_variate: true,
                ..settings()
            },
        )
        .run(&Interrupt::default())
        .unwrap();
        assert!(controlled.control_variate);
        assert!(controlled.std_error < 0.5 * plain.std_error);
        assert!((controlled.mean - BS_CALL).abs() < 4.0 * controlled.std_error);
    }

    #[test]
    fn target_error_adds_paths() {
        let sampler = Pathwise::new(european_call(), false);
        let est = MonteCarloModel::new(
            &sampler,
            McSettings {
                paths: 10_000,
                target_std_error: Some(0.05),
                ..settings()
            },
        )
        .run(&Interrupt::default())
        .unwrap();
        assert_eq!(est.status, ResultStatus::Complete);
        assert!(est.std_error <= 0.05);
        assert!(est.paths > 10_000);
    }

    #[test]
    fn path_cap_marks_partial() {
        let sampler = Pathwise::new(european_call(), false);
        let est = MonteCarloModel::new(
            &sampler,
            McSettings {
                paths: 10_000,
                target_std_error: Some(1e-4),
                max_paths: 20_000,
                ..settings()
            },
        )
        .run(&Interrupt::default())
        .unwrap();
        assert_eq!(est.paths, 20_000);
        assert_eq!(
            est.status,
            ResultStatus::Partial(PartialReason::MaxPathsReached)
        );
    }

    #[test]
    fn cancelled_run_keeps_the_first_batch() {
        use std::sync::{atomic::AtomicBool, Arc};
        let sampler = Pathwise::new(european_call(), false);
        let interrupt = Interrupt::default().with_cancel_flag(Arc::new(AtomicBool::new(true)));
        let est = MonteCarloModel::new(&sampler, settings())
            .run(&interrupt)
            .unwrap();
        assert_eq!(est.paths, 5_000);
        assert_eq!(est.status, ResultStatus::Partial(PartialReason::Cancelled));
        assert!(est.mean > 0.0);
    }
}
