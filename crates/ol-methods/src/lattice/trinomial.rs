//! Kamrad–Ritchken trinomial tree.
//!
//! Node `(i, j)`, `j = 0..=2i`, sits at `x0 e^{(j − i) Δx}` with
//! `Δx = λ σ √Δt`. Branches go down, middle and up with
//!
//! ```text
//! p_u = 1/(2λ²) + μ√Δt / (2λσ)
//! p_m = 1 − 1/λ²
//! p_d = 1/(2λ²) − μ√Δt / (2λσ)
//! ```
//!
//! where `μ = r − q − σ²/2`. For barrier payoffs the stretch `λ` is chosen so
//! that the barrier lies exactly on a node level, which removes the
//! sawtooth error of trees whose levels straddle the barrier.

use ol_core::{errors::Result, Real, Time};

use super::{check_probability, RecombiningTree};
use crate::process::BlackScholesProcess;

/// Default stretch parameter, giving `p_m = 1/3`.
pub const DEFAULT_STRETCH: Real = 1.224_744_871_391_589;

/// A recombining trinomial tree on a uniform log-spot lattice.
#[derive(Debug, Clone)]
pub struct TrinomialTree {
    name: &'static str,
    x0: Real,
    dt: Time,
    steps: usize,
    dx: Real,
    probabilities: [Real; 3],
    discount: Real,
}

impl TrinomialTree {
    /// Tree with stretch `lambda` (`λ ≥ 1`; `√1.5` by default).
    pub fn new(
        process: &BlackScholesProcess,
        end: Time,
        steps: usize,
        lambda: Real,
    ) -> Result<Self> {
        Self::build("Trinomial", process, end, steps, lambda)
    }

    /// Tree whose node levels include `barrier` exactly.
    ///
    /// The spacing is `|ln(H/S)| / k` with `k = ⌊|ln(H/S)| / (σ√Δt)⌋`, so
    /// `λ ∈ [1, 2)`. A barrier closer to spot than one standard deviation
    /// of a step leaves no valid stretch; more steps fix that.
    pub fn barrier_fitted(
        process: &BlackScholesProcess,
        end: Time,
        steps: usize,
        barrier: Real,
    ) -> Result<Self> {
        let dt = end / steps as Real;
        let step_std = process.volatility * dt.sqrt();
        let distance = (barrier / process.spot).ln().abs();
        let ratio = distance / step_std;
        if ratio < 1.0 {
            return Err(ol_core::Error::DegenerateTree(format!(
                "barrier {barrier} is within one step standard deviation of spot \
                 with {steps} steps; increase the step count"
            )));
        }
        let mut levels = ratio.floor();
        // λ = 1 would zero the middle branch.
        if ratio - levels < 1e-9 && levels > 1.0 {
            levels -= 1.0;
        }
        let lambda = distance / levels / step_std;
        Self::build("Trinomial(barrier-fitted)", process, end, steps, lambda)
    }

    fn build(
        name: &'static str,
        process: &BlackScholesProcess,
        end: Time,
        steps: usize,
        lambda: Real,
    ) -> Result<Self> {
        let dt = end / steps as Real;
        let sigma = process.volatility;
        let dx = lambda * sigma * dt.sqrt();
        let drift_term = process.log_drift() * dt.sqrt() / (2.0 * lambda * sigma);
        let edge = 1.0 / (2.0 * lambda * lambda);
        let probabilities = [edge - drift_term, 1.0 - 1.0 / (lambda * lambda), edge + drift_term];
        for (p, branch) in probabilities.iter().zip(["down", "middle", "up"]) {
            check_probability(name, branch, *p)?;
        }
        Ok(Self {
            name,
            x0: process.spot,
            dt,
            steps,
            dx,
            probabilities,
            discount: process.discount(dt),
        })
    }

    /// Log-spot spacing `Δx`.
    pub fn dx(&self) -> Real {
        self.dx
    }

    /// Branch probabilities `[p_d, p_m, p_u]`.
    pub fn probabilities(&self) -> [Real; 3] {
        self.probabilities
    }
}

impl RecombiningTree for TrinomialTree {
    fn name(&self) -> &'static str {
        self.name
    }

    fn steps(&self) -> usize {
        self.steps
    }

    fn dt(&self) -> Time {
        self.dt
    }

    fn size(&self, i: usize) -> usize {
        2 * i + 1
    }

    fn branches(&self) -> usize {
        3
    }

    fn underlying(&self, i: usize, j: usize) -> Real {
        self.x0 * ((j as Real - i as Real) * self.dx).exp()
    }

    fn probability(&self, _i: usize, _j: usize, branch: usize) -> Real {
        self.probabilities[branch]
    }

    fn discount(&self) -> Real {
        self.discount
    }

    fn log_spacing(&self) -> Real {
        self.dx
    }

    fn bounding_path(&self, i: usize, j: usize, upper: bool) -> Vec<Real> {
        let level = j as isize - i as isize;
        (0..=i)
            .map(|k| {
                let k_i = k as isize;
                let remaining = (i - k) as isize;
                let at_k = if upper {
                    k_i.min(level + remaining)
                } else {
                    (-k_i).max(level - remaining)
                };
                self.x0 * (at_k as Real * self.dx).exp()
            })
            .collect()
    }
}
