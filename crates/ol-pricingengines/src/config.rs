//! Engine configuration.
//!
//! One config struct per method, each with documented defaults and a
//! `validate` that runs before any computation. [`EngineConfig`] selects the
//! method.

use ol_core::{ensure, errors::Result, Interrupt, Real};
use ol_instruments::Method;
use ol_math::NormalMethod;
use ol_methods::{finite_differences::FdScheme, lattice::TreeKind};

/// Upper bound on paths for a single run.
pub const MAX_PATHS: usize = 100_000_000;

/// Upper bound on lattice steps.
pub const MAX_LATTICE_STEPS: usize = 100_000;

// ─── Lattice ──────────────────────────────────────────────────────────────────

/// Lattice engine settings.
///
/// Cost grows as `O(steps²)` nodes (times the number of states per node for
/// path-dependent payoffs); error falls roughly as `1/steps`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatticeConfig {
    /// Time steps. Default 100.
    pub steps: usize,
    /// Tree parameterisation; `None` picks one per payoff.
    pub tree: Option<TreeKind>,
    /// State-grid refinement for running averages: the state step is the
    /// tree's log spacing divided by this. Default 4.
    pub state_resolution: usize,
    /// Deadline and cancellation.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub interrupt: Interrupt,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            tree: None,
            state_resolution: 4,
            interrupt: Interrupt::default(),
        }
    }
}

impl LatticeConfig {
    /// Default settings with `steps` time steps.
    pub fn with_steps(steps: usize) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_LATTICE_STEPS).contains(&self.steps),
            "lattice steps must lie in [1, {MAX_LATTICE_STEPS}], got {}",
            self.steps
        );
        ensure!(
            self.state_resolution >= 1,
            "state resolution must be at least 1"
        );
        Ok(())
    }
}

// ─── Finite differences ───────────────────────────────────────────────────────

/// Finite-difference engine settings.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FdConfig {
    /// Nodes of the log-spot grid. Default 201.
    pub price_grid_size: usize,
    /// Time steps. Default 100.
    pub time_steps: usize,
    /// Time-stepping scheme. Default Crank–Nicolson.
    pub scheme: FdScheme,
    /// Half-width of the grid in standard deviations of `ln S_T`. Default 5.
    pub std_devs: Real,
    /// Fully implicit start-up steps for Crank–Nicolson. Default 2.
    pub rannacher_steps: usize,
    /// Raise an unstable explicit step count instead of failing. Default off.
    pub auto_adjust_time_step: bool,
    /// Deadline and cancellation.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub interrupt: Interrupt,
}

impl Default for FdConfig {
    fn default() -> Self {
        Self {
            price_grid_size: 201,
            time_steps: 100,
            scheme: FdScheme::CrankNicolson,
            std_devs: 5.0,
            rannacher_steps: 2,
            auto_adjust_time_step: false,
            interrupt: Interrupt::default(),
        }
    }
}

impl FdConfig {
    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.price_grid_size >= 5,
            "price grid needs at least 5 nodes, got {}",
            self.price_grid_size
        );
        ensure!(self.time_steps >= 1, "time steps must be positive");
        ensure!(
            self.std_devs.is_finite() && self.std_devs > 0.0,
            "grid width must be positive, got {} standard deviations",
            self.std_devs
        );
        Ok(())
    }
}

// ─── Monte Carlo ──────────────────────────────────────────────────────────────

/// Monte Carlo engine settings.
///
/// The defaults run plain Monte Carlo; antithetic pairs and control variates
/// are flags on the same path generator.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonteCarloConfig {
    /// Paths for the first pass. Default 100 000.
    pub paths: usize,
    /// Seed of the random stream. Default 42.
    pub seed: u64,
    /// Antithetic pairs. Default off.
    pub antithetic: bool,
    /// Closed-form control variate where one exists. Default off.
    pub control_variate: bool,
    /// Keep simulating until the standard error is at most this.
    pub target_std_error: Option<Real>,
    /// Cap on paths when chasing a target. Default 10 000 000.
    pub max_paths: usize,
    /// Uniform steps for continuously monitored payoffs. Default 100.
    pub time_steps: usize,
    /// Paths per batch; batch `b` is seeded from `(seed, b)`. Default 10 000.
    pub batch_size: usize,
    /// Run batches on the rayon pool. Default on.
    pub parallel: bool,
    /// Uniform-to-normal transform. Default inverse cumulative.
    pub normal_method: NormalMethod,
    /// Brownian-bridge survival for barriers and the Broadie–Glasserman–Kou
    /// shift for lookbacks. Default on.
    pub continuity_correction: bool,
    /// Deadline and cancellation.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub interrupt: Interrupt,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            paths: 100_000,
            seed: 42,
            antithetic: false,
            control_variate: false,
            target_std_error: None,
            max_paths: 10_000_000,
            time_steps: 100,
            batch_size: 10_000,
            parallel: true,
            normal_method: NormalMethod::InverseCumulative,
            continuity_correction: true,
            interrupt: Interrupt::default(),
        }
    }
}

impl MonteCarloConfig {
    /// Default settings with `paths` paths and `seed`.
    pub fn with_paths(paths: usize, seed: u64) -> Self {
        Self {
            paths,
            seed,
            ..Self::default()
        }
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (4..=MAX_PATHS).contains(&self.paths),
            "paths must lie in [4, {MAX_PATHS}], got {}",
            self.paths
        );
        ensure!(
            self.max_paths >= self.paths && self.max_paths <= MAX_PATHS,
            "max_paths {} must lie in [paths = {}, {MAX_PATHS}]",
            self.max_paths,
            self.paths
        );
        ensure!(self.time_steps >= 1, "time steps must be positive");
        ensure!(self.batch_size >= 2, "batch size must be at least 2");
        if let Some(target) = self.target_std_error {
            ensure!(
                target.is_finite() && target > 0.0,
                "target standard error must be positive, got {target}"
            );
        }
        Ok(())
    }
}

// ─── Selection ────────────────────────────────────────────────────────────────

/// Method selection with its settings.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngineConfig {
    /// Closed-form formulas.
    #[default]
    Analytic,
    /// Binomial or trinomial tree.
    Lattice(LatticeConfig),
    /// Finite-difference grid.
    FiniteDifference(FdConfig),
    /// Monte Carlo simulation.
    MonteCarlo(MonteCarloConfig),
}

impl EngineConfig {
    /// The method this config selects.
    pub fn method(&self) -> Method {
        match self {
            EngineConfig::Analytic => Method::Analytic,
            EngineConfig::Lattice(_) => Method::Lattice,
            EngineConfig::FiniteDifference(_) => Method::FiniteDifference,
            EngineConfig::MonteCarlo(_) => Method::MonteCarlo,
        }
    }

    /// Default settings for `method`.
    pub fn default_for(method: Method) -> Self {
        match method {
            Method::Analytic => EngineConfig::Analytic,
            Method::Lattice => EngineConfig::Lattice(LatticeConfig::default()),
            Method::FiniteDifference => EngineConfig::FiniteDifference(FdConfig::default()),
            Method::MonteCarlo => EngineConfig::MonteCarlo(MonteCarloConfig::default()),
        }
    }

    /// Check the settings of the selected method.
    pub fn validate(&self) -> Result<()> {
        match self {
            EngineConfig::Analytic => Ok(()),
            EngineConfig::Lattice(c) => c.validate(),
            EngineConfig::FiniteDifference(c) => c.validate(),
            EngineConfig::MonteCarlo(c) => c.validate(),
        }
    }
}
