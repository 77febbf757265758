//! Path states carried through a tree.
//!
//! A path-dependent payoff is valued on a recombining tree by attaching to
//! every node a sorted list of representative values of a path statistic
//! (running average, running extreme, reset strike, barrier-hit flag). The
//! statistic for any path through a node is bracketed by its value along the
//! node's two bounding paths, so the list spans that bracket on a grid
//! anchored at a fixed level; values in between are interpolated linearly by
//! [`induce_with_states`](super::induce_with_states).

use ol_core::{Real, Time};
use ol_instruments::{Averaging, OptionType};

use super::{step_at, RecombiningTree};

/// Path statistic carried through a tree.
pub trait NodeStateModel: Send + Sync {
    /// Ascending representative states at node `(i, j)`.
    fn states(&self, tree: &dyn RecombiningTree, i: usize, j: usize) -> Vec<Real>;

    /// State at the root.
    fn initial_state(&self, spot: Real) -> Real;

    /// State after moving to a node at step `step` with spot `spot`.
    fn advance(&self, state: Real, step: usize, spot: Real) -> Real;

    /// Payoff at maturity.
    fn terminal_value(&self, state: Real, spot: Real) -> Real;

    /// Value that replaces the continuation at a node, e.g. a rebate paid on
    /// knock-out.
    fn node_override(&self, _state: Real, _step: usize, _spot: Real) -> Option<Real> {
        None
    }
}

/// Geometric grid `anchor · e^{k h}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateGrid {
    /// Level with `k = 0`.
    pub anchor: Real,
    /// Log distance between neighbouring levels.
    pub log_step: Real,
}

impl StateGrid {
    /// Grid levels covering `[lo, hi]`, at least one.
    pub fn span(&self, lo: Real, hi: Real) -> Vec<Real> {
        let k0 = ((lo / self.anchor).ln() / self.log_step + 1e-9).floor() as i64;
        let k1 = ((hi / self.anchor).ln() / self.log_step - 1e-9).ceil() as i64;
        (k0..=k1.max(k0))
            .map(|k| self.anchor * (k as Real * self.log_step).exp())
            .collect()
    }
}

fn bounds(tree: &dyn RecombiningTree, i: usize, j: usize) -> (Vec<Real>, Vec<Real>) {
    (
        tree.bounding_path(i, j, false),
        tree.bounding_path(i, j, true),
    )
}

// ─── Asian ────────────────────────────────────────────────────────────────────

/// Running average over equally spaced fixings.
///
/// Fixing `k` of `m` falls at `t_k = start + k (T − start)/m` and is placed on
/// the nearest step. Before the first fixing the state is the sentinel `0`.
#[derive(Debug, Clone)]
pub struct AsianStates {
    right: OptionType,
    strike: Real,
    averaging: Averaging,
    weights: Vec<usize>,
    counts: Vec<usize>,
    grid: StateGrid,
}

impl AsianStates {
    /// Average-price option with `fixings` fixings in `(start, maturity]`.
    ///
    /// The state grid step is the tree's log spacing divided by `resolution`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tree: &dyn RecombiningTree,
        right: OptionType,
        strike: Real,
        averaging: Averaging,
        start: Time,
        maturity: Time,
        fixings: usize,
        resolution: usize,
    ) -> Self {
        let n = tree.steps();
        let mut weights = vec![0; n + 1];
        for k in 1..=fixings {
            let t = start + k as Real * (maturity - start) / fixings as Real;
            weights[step_at(t, tree.dt(), n)] += 1;
        }
        let counts = weights
            .iter()
            .scan(0, |acc, &w| {
                *acc += w;
                Some(*acc)
            })
            .collect();
        Self {
            right,
            strike,
            averaging,
            weights,
            counts,
            grid: StateGrid {
                anchor: tree.underlying(0, 0),
                log_step: tree.log_spacing() / resolution.max(1) as Real,
            },
        }
    }

    fn weighted_mean(&self, path: &[Real], count: usize) -> Real {
        let c = count as Real;
        match self.averaging {
            Averaging::Arithmetic => {
                path.iter()
                    .zip(&self.weights)
                    .map(|(s, &w)| w as Real * s)
                    .sum::<Real>()
                    / c
            }
            Averaging::Geometric => (path
                .iter()
                .zip(&self.weights)
                .map(|(s, &w)| w as Real * s.ln())
                .sum::<Real>()
                / c)
                .exp(),
        }
    }
}

impl NodeStateModel for AsianStates {
    fn states(&self, tree: &dyn RecombiningTree, i: usize, j: usize) -> Vec<Real> {
        let count = self.counts[i];
        if count == 0 {
            return vec![0.0];
        }
        let (lower, upper) = bounds(tree, i, j);
        self.grid.span(
            self.weighted_mean(&lower, count),
            self.weighted_mean(&upper, count),
        )
    }

    fn initial_state(&self, spot: Real) -> Real {
        if self.weights[0] > 0 {
            spot
        } else {
            0.0
        }
    }

    fn advance(&self, state: Real, step: usize, spot: Real) -> Real {
        let w = self.weights[step];
        if w == 0 {
            return state;
        }
        let before = self.counts[step - 1];
        if before == 0 {
            return spot;
        }
        let (c0, w) = (before as Real, w as Real);
        match self.averaging {
            Averaging::Arithmetic => (c0 * state + w * spot) / (c0 + w),
            Averaging::Geometric => ((c0 * state.ln() + w * spot.ln()) / (c0 + w)).exp(),
        }
    }

    fn terminal_value(&self, state: Real, _spot: Real) -> Real {
        self.right.intrinsic(state, self.strike)
    }
}

// ─── Lookback ─────────────────────────────────────────────────────────────────

/// Running minimum or maximum of the spot.
#[derive(Debug, Clone)]
pub struct LookbackStates {
    right: OptionType,
    strike: Option<Real>,
    running_extreme: Option<Real>,
    tracks_min: bool,
    grid: StateGrid,
}

impl LookbackStates {
    /// Floating-strike lookback when `strike` is `None`, fixed-strike
    /// otherwise. `running_extreme` is the extreme observed before the
    /// valuation date.
    pub fn new(
        tree: &dyn RecombiningTree,
        right: OptionType,
        strike: Option<Real>,
        running_extreme: Option<Real>,
    ) -> Self {
        let tracks_min = matches!(
            (strike.is_none(), right),
            (true, OptionType::Call) | (false, OptionType::Put)
        );
        Self {
            right,
            strike,
            running_extreme,
            tracks_min,
            grid: StateGrid {
                anchor: tree.underlying(0, 0),
                log_step: tree.log_spacing(),
            },
        }
    }

    fn combine(&self, a: Real, b: Real) -> Real {
        if self.tracks_min {
            a.min(b)
        } else {
            a.max(b)
        }
    }

    fn extreme_of(&self, path: &[Real]) -> Real {
        let seed = self.running_extreme.unwrap_or(path[0]);
        path.iter().fold(seed, |acc, &s| self.combine(acc, s))
    }
}

impl NodeStateModel for LookbackStates {
    fn states(&self, tree: &dyn RecombiningTree, i: usize, j: usize) -> Vec<Real> {
        let (lower, upper) = bounds(tree, i, j);
        let a = self.extreme_of(&lower);
        let b = self.extreme_of(&upper);
        self.grid.span(a.min(b), a.max(b))
    }

    fn initial_state(&self, spot: Real) -> Real {
        match self.running_extreme {
            Some(m) => self.combine(spot, m),
            None => spot,
        }
    }

    fn advance(&self, state: Real, _step: usize, spot: Real) -> Real {
        self.combine(state, spot)
    }

    fn terminal_value(&self, state: Real, spot: Real) -> Real {
        match self.strike {
            None => self.right.sign() * (spot - state),
            Some(k) => self.right.intrinsic(state, k),
        }
    }
}

// ─── Forward start ────────────────────────────────────────────────────────────

/// Strike set to `moneyness · S(t_start)` at the start date.
#[derive(Debug, Clone)]
pub struct ForwardStartStates {
    right: OptionType,
    moneyness: Real,
    start_step: usize,
    grid: StateGrid,
}

impl ForwardStartStates {
    /// Forward-start option whose strike is fixed at `start_time`.
    pub fn new(
        tree: &dyn RecombiningTree,
        right: OptionType,
        moneyness: Real,
        start_time: Time,
    ) -> Self {
        Self {
            right,
            moneyness,
            start_step: step_at(start_time, tree.dt(), tree.steps()),
            grid: StateGrid {
                anchor: moneyness * tree.underlying(0, 0),
                log_step: tree.log_spacing(),
            },
        }
    }
}

impl NodeStateModel for ForwardStartStates {
    fn states(&self, tree: &dyn RecombiningTree, i: usize, j: usize) -> Vec<Real> {
        if i < self.start_step {
            return vec![0.0];
        }
        let (lower, upper) = bounds(tree, i, j);
        self.grid.span(
            self.moneyness * lower[self.start_step],
            self.moneyness * upper[self.start_step],
        )
    }

    fn initial_state(&self, spot: Real) -> Real {
        if self.start_step == 0 {
            self.moneyness * spot
        } else {
            0.0
        }
    }

    fn advance(&self, state: Real, step: usize, spot: Real) -> Real {
        if step == self.start_step {
            self.moneyness * spot
        } else {
            state
        }
    }

    fn terminal_value(&self, state: Real, spot: Real) -> Real {
        self.right.intrinsic(spot, state)
    }
}

// ─── Barrier ──────────────────────────────────────────────────────────────────

/// Knock-in / knock-out flag with a rebate.
///
/// Knock-out: one state per node; a node on or beyond the barrier is worth
/// the rebate, paid at the hit. Knock-in: states `0` (not yet hit) and `1`;
/// an unhit path pays the rebate at maturity.
#[derive(Debug, Clone)]
pub struct BarrierStates {
    right: OptionType,
    strike: Real,
    barrier: Real,
    down: bool,
    out: bool,
    rebate: Real,
}

impl BarrierStates {
    /// Barrier on a vanilla payoff.
    pub fn new(
        right: OptionType,
        strike: Real,
        barrier: Real,
        down: bool,
        out: bool,
        rebate: Real,
    ) -> Self {
        Self {
            right,
            strike,
            barrier,
            down,
            out,
            rebate,
        }
    }

    fn hit(&self, spot: Real) -> bool {
        if self.down {
            spot <= self.barrier * (1.0 + 1e-12)
        } else {
            spot >= self.barrier * (1.0 - 1e-12)
        }
    }
}

impl NodeStateModel for BarrierStates {
    fn states(&self, _tree: &dyn RecombiningTree, _i: usize, _j: usize) -> Vec<Real> {
        if self.out {
            vec![0.0]
        } else {
            vec![0.0, 1.0]
        }
    }

    fn initial_state(&self, spot: Real) -> Real {
        if self.hit(spot) {
            1.0
        } else {
            0.0
        }
    }

    fn advance(&self, state: Real, _step: usize, spot: Real) -> Real {
        if self.hit(spot) {
            1.0
        } else {
            state
        }
    }

    fn terminal_value(&self, state: Real, spot: Real) -> Real {
        let vanilla = self.right.intrinsic(spot, self.strike);
        if self.out || state > 0.5 {
            vanilla
        } else {
            self.rebate
        }
    }

    fn node_override(&self, _state: Real, _step: usize, spot: Real) -> Option<Real> {
        (self.out && self.hit(spot)).then_some(self.rebate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{induce_with_states, BinomialTree, TrinomialTree};
    use crate::process::BlackScholesProcess;
    use ol_core::Interrupt;

    fn process() -> BlackScholesProcess {
        BlackScholesProcess::new(100.0, 0.05, 0.01, 0.25)
    }

    fn value(tree: &dyn RecombiningTree, model: &dyn NodeStateModel) -> Real {
        induce_with_states(tree, model, &Interrupt::default())
            .finished()
            .unwrap()
            .value
    }

    #[test]
    fn grid_spans_the_bracket() {
        let grid = StateGrid {
            anchor: 100.0,
            log_step: 0.1,
        };
        let levels = grid.span(95.0, 112.0);
        assert!(levels[0] <= 95.0 && *levels.last().unwrap() >= 112.0);
        assert_eq!(levels.len(), 3);
        assert_eq!(grid.span(100.0, 100.0), vec![100.0]);
    }

    #[test]
    fn arithmetic_asian_near_levy() {
        let tree = BinomialTree::cox_ross_rubinstein(&process(), 1.0, 60).unwrap();
        let model = AsianStates::new(
            &tree,
            OptionType::Call,
            100.0,
            Averaging::Arithmetic,
            0.0,
            1.0,
            12,
            4,
        );
        // Levy approximation 7.0195; simulation ≈ 7.00.
        let v = value(&tree, &model);
        assert!((v - 7.01).abs() < 0.05, "{v}");
    }

    #[test]
    fn geometric_asian_near_closed_form() {
        let tree = BinomialTree::cox_ross_rubinstein(&process(), 1.0, 60).unwrap();
        let model = AsianStates::new(
            &tree,
            OptionType::Call,
            100.0,
            Averaging::Geometric,
            0.0,
            1.0,
            12,
            4,
        );
        // Discrete geometric closed form 6.68609.
        let v = value(&tree, &model);
        assert!((v - 6.686).abs() < 0.05, "{v}");
    }

    #[test]
    fn floating_lookback_approaches_continuous_value_from_below() {
        let p = process();
        let coarse = BinomialTree::cox_ross_rubinstein(&p, 1.0, 50).unwrap();
        let fine = BinomialTree::cox_ross_rubinstein(&p, 1.0, 100).unwrap();
        let model = |t: &dyn RecombiningTree| LookbackStates::new(t, OptionType::Call, None, None);
        let v50 = value(&coarse, &model(&coarse));
        let v100 = value(&fine, &model(&fine));
        // Continuous monitoring: 19.91699.
        assert!(v50 < v100 && v100 < 19.917, "{v50} {v100}");
        assert!(19.917 - v100 < 1.2, "{v100}");
    }

    #[test]
    fn fixed_lookback_with_running_extreme() {
        let tree = BinomialTree::cox_ross_rubinstein(&process(), 1.0, 100).unwrap();
        let fresh = value(
            &tree,
            &LookbackStates::new(&tree, OptionType::Call, Some(100.0), None),
        );
        let seasoned = value(
            &tree,
            &LookbackStates::new(&tree, OptionType::Call, Some(100.0), Some(110.0)),
        );
        // Continuous monitoring: 22.94983 for a fresh contract.
        assert!(fresh < 22.95 && fresh > 21.0, "{fresh}");
        assert!(seasoned > fresh);
    }

    #[test]
    fn forward_start_matches_closed_form() {
        let tree = BinomialTree::cox_ross_rubinstein(&process(), 1.0, 100).unwrap();
        let call = value(
            &tree,
            &ForwardStartStates::new(&tree, OptionType::Call, 1.0, 0.25),
        );
        let put = value(
            &tree,
            &ForwardStartStates::new(&tree, OptionType::Put, 1.1, 0.5),
        );
        assert!((call - 9.95191).abs() < 0.05, "{call}");
        assert!((put - 11.76354).abs() < 0.05, "{put}");
    }

    #[test]
    fn fitted_trinomial_barriers_match_reiner_rubinstein() {
        let p = process();
        let cases = [
            (OptionType::Call, 90.0, true, false, 4.06462),
            (OptionType::Put, 110.0, false, false, 3.44926),
            (OptionType::Call, 90.0, true, true, 10.57795),
            (OptionType::Put, 110.0, false, true, 7.31874),
        ];
        for (right, h, down, out, expected) in cases {
            let tree = TrinomialTree::barrier_fitted(&p, 1.0, 100, h).unwrap();
            let model = BarrierStates::new(right, 100.0, h, down, out, 3.0);
            let v = value(&tree, &model);
            assert!(
                (v - expected).abs() < 0.02,
                "{right} H={h} out={out}: {v} vs {expected}"
            );
        }
    }

    #[test]
    fn asian_fixings_land_on_steps() {
        let tree = BinomialTree::cox_ross_rubinstein(&process(), 1.0, 24).unwrap();
        let model = AsianStates::new(
            &tree,
            OptionType::Call,
            100.0,
            Averaging::Arithmetic,
            0.5,
            1.0,
            6,
            1,
        );
        let fixed: Vec<usize> = (0..=24).filter(|&i| model.weights[i] > 0).collect();
        assert_eq!(fixed, vec![14, 16, 18, 20, 22, 24]);
        assert_eq!(model.counts[24], 6);
        assert_eq!(model.advance(0.0, 14, 105.0), 105.0);
        assert_eq!(model.advance(104.0, 16, 108.0), 106.0);
    }
}
