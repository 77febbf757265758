//! Recombining binomial trees.
//!
//! | Constructor | Parameterisation |
//! |---|---|
//! | [`BinomialTree::cox_ross_rubinstein`] | `u = e^{σ√Δt}`, `d = 1/u`, `p = (e^{(r−q)Δt} − d)/(u − d)` |
//! | [`BinomialTree::jarrow_rudd`] | equal probabilities, drift in the node levels |
//! | [`BinomialTree::tian`] | first three moments matched |
//! | [`BinomialTree::leisen_reimer`] | Peizer–Pratt inversion, odd step count |
//!
//! Node `(i, j)` is reached by `j` up-moves and `i − j` down-moves.

use ol_core::{errors::Result, Real, Time};

use super::{check_probability, RecombiningTree};
use crate::process::BlackScholesProcess;

/// A recombining binomial tree with constant up/down factors.
#[derive(Debug, Clone)]
pub struct BinomialTree {
    name: &'static str,
    x0: Real,
    dt: Time,
    steps: usize,
    ln_up: Real,
    ln_down: Real,
    pu: Real,
    discount: Real,
}

impl BinomialTree {
    fn build(
        name: &'static str,
        process: &BlackScholesProcess,
        dt: Time,
        steps: usize,
        up: Real,
        down: Real,
        pu: Real,
    ) -> Result<Self> {
        check_probability(name, "up", pu)?;
        check_probability(name, "down", 1.0 - pu)?;
        if !(up > down && down > 0.0) {
            return Err(ol_core::Error::DegenerateTree(format!(
                "{name}: up factor {up} must exceed down factor {down} > 0"
            )));
        }
        Ok(Self {
            name,
            x0: process.spot,
            dt,
            steps,
            ln_up: up.ln(),
            ln_down: down.ln(),
            pu,
            discount: process.discount(dt),
        })
    }

    /// Cox–Ross–Rubinstein: `u = e^{σ√Δt}`, `d = 1/u`,
    /// `p = (e^{(r−q)Δt} − d)/(u − d)`.
    ///
    /// Fails with `DegenerateTree` when the carry over one step exceeds the
    /// spread of the factors (large `|r − q|` with few steps).
    pub fn cox_ross_rubinstein(
        process: &BlackScholesProcess,
        end: Time,
        steps: usize,
    ) -> Result<Self> {
        let dt = end / steps as Real;
        let up = (process.volatility * dt.sqrt()).exp();
        let down = 1.0 / up;
        let pu = ((process.carry() * dt).exp() - down) / (up - down);
        Self::build("CoxRossRubinstein", process, dt, steps, up, down, pu)
    }

    /// Jarrow–Rudd: `p = ½`, `u, d = e^{(r−q−σ²/2)Δt ± σ√Δt}`.
    pub fn jarrow_rudd(process: &BlackScholesProcess, end: Time, steps: usize) -> Result<Self> {
        let dt = end / steps as Real;
        let drift = process.log_drift() * dt;
        let dx = process.volatility * dt.sqrt();
        Self::build(
            "JarrowRudd",
            process,
            dt,
            steps,
            (drift + dx).exp(),
            (drift - dx).exp(),
            0.5,
        )
    }

    /// Tian: multiplicative factors matching the first three moments of the
    /// log-normal step.
    pub fn tian(process: &BlackScholesProcess, end: Time, steps: usize) -> Result<Self> {
        let dt = end / steps as Real;
        let v = (process.volatility * process.volatility * dt).exp();
        let m = (process.carry() * dt).exp();
        let root = (v * v + 2.0 * v - 3.0).sqrt();
        let up = 0.5 * m * v * (v + 1.0 + root);
        let down = 0.5 * m * v * (v + 1.0 - root);
        let pu = (m - down) / (up - down);
        Self::build("Tian", process, dt, steps, up, down, pu)
    }

    /// Leisen–Reimer with the Peizer–Pratt method 2 inversion.
    ///
    /// The step count is rounded up to the next odd number; the tree is
    /// centred on `strike`, which is what removes the odd/even oscillation
    /// of the vanilla price.
    pub fn leisen_reimer(
        process: &BlackScholesProcess,
        end: Time,
        steps: usize,
        strike: Real,
    ) -> Result<Self> {
        let odd_steps = if steps % 2 == 1 { steps } else { steps + 1 };
        let n = odd_steps as Real;
        let dt = end / n;
        let std_dev = process.std_dev(end);
        let d2 = ((process.spot / strike).ln() + process.log_drift() * end) / std_dev;
        let d1 = d2 + std_dev;
        let pu = peizer_pratt_2(d2, odd_steps);
        let p_dash = peizer_pratt_2(d1, odd_steps);
        let growth = (process.carry() * dt).exp();
        let up = growth * p_dash / pu;
        let down = (growth - pu * up) / (1.0 - pu);
        Self::build("LeisenReimer", process, dt, odd_steps, up, down, pu)
    }

    /// Up factor `u`.
    pub fn up(&self) -> Real {
        self.ln_up.exp()
    }

    /// Down factor `d`.
    pub fn down(&self) -> Real {
        self.ln_down.exp()
    }

    /// Up probability `p`.
    pub fn probability_up(&self) -> Real {
        self.pu
    }
}

impl RecombiningTree for BinomialTree {
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
        i + 1
    }

    fn branches(&self) -> usize {
        2
    }

    fn underlying(&self, i: usize, j: usize) -> Real {
        self.x0 * (j as Real * self.ln_up + (i - j) as Real * self.ln_down).exp()
    }

    fn probability(&self, _i: usize, _j: usize, branch: usize) -> Real {
        if branch == 1 {
            self.pu
        } else {
            1.0 - self.pu
        }
    }

    fn discount(&self) -> Real {
        self.discount
    }

    fn log_spacing(&self) -> Real {
        0.5 * (self.ln_up - self.ln_down)
    }

    fn bounding_path(&self, i: usize, j: usize, upper: bool) -> Vec<Real> {
        (0..=i)
            .map(|k| {
                let ups = if upper { k.min(j) } else { k.saturating_sub(i - j) };
                self.underlying(k, ups)
            })
            .collect()
    }
}

/// Peizer–Pratt method 2 inversion: binomial probability matching the normal
/// quantile `z` for an odd number of steps `n`.
fn peizer_pratt_2(z: Real, n: usize) -> Real {
    let nf = n as Real;
    let r = z / (nf + 1.0 / 3.0 + 0.1 / (nf + 1.0));
    let ex = (-r * r * (nf + 1.0 / 6.0)).exp();
    0.5 + z.signum() * 0.5 * (1.0 - ex).sqrt()
}
