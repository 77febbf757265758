//! Time grids and exact log-normal path generation.

use nalgebra::DMatrix;
use ol_core::{ensure, errors::Result, Real, Time};
use ol_math::matrix_utilities::cholesky;

use crate::process::BlackScholesProcess;

const TIME_TOLERANCE: Time = 1e-10;

// ─── Time grid ────────────────────────────────────────────────────────────────

/// Simulation times `0 = t_0 < t_1 < … < t_n = end`.
///
/// Built from `steps` uniform steps merged with the monitoring times a
/// payoff needs (fixings, exercise dates, a start or choose date), so those
/// times are hit exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<Time>,
}

impl TimeGrid {
    /// Uniform grid of `steps` steps over `[0, end]` merged with
    /// `mandatory` times in `(0, end]`.
    pub fn new(end: Time, steps: usize, mandatory: &[Time]) -> Result<Self> {
        ensure!(end > 0.0 && end.is_finite(), "grid end must be positive, got {end}");
        let mut times: Vec<Time> = (0..=steps.max(1))
            .map(|i| end * i as Time / steps.max(1) as Time)
            .collect();
        for &t in mandatory {
            ensure!(
                t > 0.0 && t <= end + TIME_TOLERANCE,
                "monitoring time {t} outside (0, {end}]"
            );
            times.push(t.min(end));
        }
        times.sort_by(|a, b| a.total_cmp(b));
        times.dedup_by(|a, b| (*a - *b).abs() < TIME_TOLERANCE);
        Ok(Self { times })
    }

    /// Grid times including `0`.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Number of steps.
    pub fn steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Length of step `i` (from `t_i` to `t_{i+1}`).
    pub fn dt(&self, i: usize) -> Time {
        self.times[i + 1] - self.times[i]
    }

    /// Last time.
    pub fn end(&self) -> Time {
        self.times[self.times.len() - 1]
    }

    /// Index of the grid time equal to `t`.
    pub fn index_of(&self, t: Time) -> Option<usize> {
        self.times
            .iter()
            .position(|&g| (g - t).abs() < 1e-8)
    }
}

// ─── Single asset ─────────────────────────────────────────────────────────────

/// Exact geometric Brownian motion on a [`TimeGrid`].
///
/// `S_{i+1} = S_i exp((r − q − σ²/2) Δt_i + σ √Δt_i z_i)`.
#[derive(Debug, Clone)]
pub struct PathGenerator {
    spot: Real,
    drifts: Vec<Real>,
    diffusions: Vec<Real>,
}

impl PathGenerator {
    /// Generator for `process` on `grid`.
    pub fn new(process: &BlackScholesProcess, grid: &TimeGrid) -> Self {
        let steps = grid.steps();
        Self {
            spot: process.spot,
            drifts: (0..steps).map(|i| process.log_drift() * grid.dt(i)).collect(),
            diffusions: (0..steps)
                .map(|i| process.volatility * grid.dt(i).sqrt())
                .collect(),
        }
    }

    /// Normals consumed per path.
    pub fn dimension(&self) -> usize {
        self.drifts.len()
    }

    /// Write the path driven by `normals` (or their negation) into `out`,
    /// starting with the spot.
    pub fn fill(&self, normals: &[Real], antithetic: bool, out: &mut Vec<Real>) {
        let sign = if antithetic { -1.0 } else { 1.0 };
        out.clear();
        out.push(self.spot);
        let mut log_s = self.spot.ln();
        for ((drift, diffusion), z) in self.drifts.iter().zip(&self.diffusions).zip(normals) {
            log_s += drift + diffusion * sign * z;
            out.push(log_s.exp());
        }
    }
}

// ─── Several correlated assets ────────────────────────────────────────────────

/// Correlated geometric Brownian motions sharing a risk-free rate.
///
/// Step `i` consumes `n` normals `z`, correlated as `w = L z` with
/// `L Lᵀ` the correlation matrix.
#[derive(Debug, Clone)]
pub struct MultiPathGenerator {
    assets: Vec<PathGenerator>,
    factor: DMatrix<Real>,
}

impl MultiPathGenerator {
    /// Generator for `processes` correlated by `correlation` on `grid`.
    pub fn new(
        processes: &[BlackScholesProcess],
        correlation: &[Vec<Real>],
        grid: &TimeGrid,
    ) -> Result<Self> {
        ensure!(
            processes.len() == correlation.len(),
            "{} assets but a {}×{} correlation matrix",
            processes.len(),
            correlation.len(),
            correlation.len()
        );
        Ok(Self {
            assets: processes.iter().map(|p| PathGenerator::new(p, grid)).collect(),
            factor: cholesky(correlation)?,
        })
    }

    /// Number of assets.
    pub fn assets(&self) -> usize {
        self.assets.len()
    }

    /// Normals consumed per path.
    pub fn dimension(&self) -> usize {
        self.assets.len() * self.assets.first().map_or(0, PathGenerator::dimension)
    }

    /// Write one path per asset into `out`.
    pub fn fill(&self, normals: &[Real], antithetic: bool, out: &mut Vec<Vec<Real>>) {
        let n = self.assets.len();
        let steps = self.dimension() / n.max(1);
        out.resize_with(n, Vec::new);
        let mut correlated = vec![vec![0.0; steps]; n];
        for i in 0..steps {
            let z = &normals[i * n..(i + 1) * n];
            for (a, row) in correlated.iter_mut().enumerate() {
                row[i] = (0..=a).map(|k| self.factor[(a, k)] * z[k]).sum();
            }
        }
        for ((generator, w), path) in self.assets.iter().zip(&correlated).zip(out.iter_mut()) {
            generator.fill(w, antithetic, path);
        }
    }
}

// ─── Continuity corrections ───────────────────────────────────────────────────

/// Probability that a Brownian bridge in log-spot between `s0` and `s1`
/// over a step with variance `variance = σ²Δt` touches `barrier`.
///
/// Both endpoints must lie on the same side of the barrier; otherwise the
/// crossing is certain.
pub fn crossing_probability(s0: Real, s1: Real, barrier: Real, variance: Real) -> Real {
    let a = (s0 / barrier).ln();
    let b = (s1 / barrier).ln();
    if a * b <= 0.0 {
        return 1.0;
    }
    if variance <= 0.0 {
        return 0.0;
    }
    (-2.0 * a * b / variance).exp()
}

/// Broadie–Glasserman–Kou constant `β = −ζ(½)/√(2π)`.
pub const BGK_BETA: Real = 0.582_597_157_939_010_7;

/// Barrier shifted so that discrete monitoring every `dt` approximates
/// continuous monitoring: moved away from the spot by `e^{β σ √Δt}`.
pub fn shifted_barrier(barrier: Real, down: bool, volatility: Real, dt: Time) -> Real {
    let shift = (BGK_BETA * volatility * dt.sqrt()).exp();
    if down {
        barrier / shift
    } else {
        barrier * shift
    }
}
