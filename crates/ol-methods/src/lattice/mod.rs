//! Lattice methods.
//!
//! * [`BinomialTree`] and [`TrinomialTree`] implement [`RecombiningTree`].
//! * [`roll_back`] and [`value_from`] run moving-window backward induction
//!   for payoffs that need nothing but the spot at each node, applying an
//!   optional [`EarlyExercise`] projection.
//! * [`induce_with_states`] runs the same induction for path-dependent
//!   payoffs, carrying a vector of path states per node supplied by a
//!   [`NodeStateModel`].
//!
//! Only two time layers are alive at any point, so memory is linear in the
//! number of steps (times the number of states per node).

pub mod binomial;
pub mod states;
pub mod trinomial;

pub use binomial::BinomialTree;
pub use states::{
    AsianStates, BarrierStates, ForwardStartStates, LookbackStates, NodeStateModel, StateGrid,
};
pub use trinomial::TrinomialTree;

use ol_core::{errors::Result, Interrupt, Real, Time};
use ol_instruments::Greeks;
use rayon::prelude::*;

use crate::exercise::EarlyExercise;
use crate::process::BlackScholesProcess;
use crate::{finish, poll, Interruptible};

// ─── Tree abstraction ─────────────────────────────────────────────────────────

/// A recombining tree with time-homogeneous branching.
///
/// Descendant `b` of node `(i, j)` is node `(i + 1, j + b)`, with branches
/// ordered from the lowest to the highest child.
pub trait RecombiningTree: Send + Sync {
    /// Parameterisation name, reported in diagnostics.
    fn name(&self) -> &'static str;

    /// Number of time steps.
    fn steps(&self) -> usize;

    /// Time step.
    fn dt(&self) -> Time;

    /// Number of nodes at step `i`.
    fn size(&self, i: usize) -> usize;

    /// Number of branches per node.
    fn branches(&self) -> usize;

    /// Spot at node `(i, j)`.
    fn underlying(&self, i: usize, j: usize) -> Real;

    /// Probability of `branch` from node `(i, j)`.
    fn probability(&self, i: usize, j: usize, branch: usize) -> Real;

    /// One-step discount factor.
    fn discount(&self) -> Real;

    /// Typical log-spot distance between neighbouring nodes.
    fn log_spacing(&self) -> Real;

    /// Spots along the pointwise highest (`upper`) or lowest path from the
    /// root to node `(i, j)`, one entry per step `0..=i`.
    fn bounding_path(&self, i: usize, j: usize, upper: bool) -> Vec<Real>;

    /// Discounted expectation of `next` (values at step `i + 1`) seen from
    /// node `(i, j)`.
    #[inline]
    fn continuation(&self, i: usize, j: usize, next: &[Real]) -> Real {
        let expected: Real = (0..self.branches())
            .map(|b| self.probability(i, j, b) * next[j + b])
            .sum();
        self.discount() * expected
    }

    /// Time levels `0, Δt, …, N Δt`.
    fn times(&self) -> Vec<Time> {
        (0..=self.steps()).map(|i| i as Time * self.dt()).collect()
    }
}

pub(crate) fn check_probability(tree: &str, branch: &str, p: Real) -> Result<()> {
    if p > 0.0 && p < 1.0 {
        Ok(())
    } else {
        Err(ol_core::Error::DegenerateTree(format!(
            "{tree}: {branch} probability {p} outside (0, 1); increase the step count"
        )))
    }
}

/// Tree parameterisations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TreeKind {
    /// Cox–Ross–Rubinstein binomial.
    CoxRossRubinstein,
    /// Jarrow–Rudd binomial.
    JarrowRudd,
    /// Tian binomial.
    Tian,
    /// Leisen–Reimer binomial (odd steps, strike-centred).
    LeisenReimer,
    /// Kamrad–Ritchken trinomial; barrier-fitted when a barrier is given.
    Trinomial,
}

/// Build a tree of the given kind over `[0, end]`.
///
/// `strike` centres a Leisen–Reimer tree (spot when absent); `barrier` fits
/// a trinomial tree's levels to the barrier.
pub fn build_tree(
    kind: TreeKind,
    process: &BlackScholesProcess,
    end: Time,
    steps: usize,
    strike: Option<Real>,
    barrier: Option<Real>,
) -> Result<Box<dyn RecombiningTree>> {
    Ok(match kind {
        TreeKind::CoxRossRubinstein => {
            Box::new(BinomialTree::cox_ross_rubinstein(process, end, steps)?)
        }
        TreeKind::JarrowRudd => Box::new(BinomialTree::jarrow_rudd(process, end, steps)?),
        TreeKind::Tian => Box::new(BinomialTree::tian(process, end, steps)?),
        TreeKind::LeisenReimer => Box::new(BinomialTree::leisen_reimer(
            process,
            end,
            steps,
            strike.unwrap_or(process.spot),
        )?),
        TreeKind::Trinomial => match barrier {
            Some(h) => Box::new(TrinomialTree::barrier_fitted(process, end, steps, h)?),
            None => Box::new(TrinomialTree::new(
                process,
                end,
                steps,
                trinomial::DEFAULT_STRETCH,
            )?),
        },
    })
}

/// Step index closest to time `t` on a tree with step `dt` and `steps` steps.
pub fn step_at(t: Time, dt: Time, steps: usize) -> usize {
    ((t / dt).round().max(0.0) as usize).min(steps)
}

// ─── Backward induction ───────────────────────────────────────────────────────

/// Root value of a tree induction.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeValuation {
    /// Value at the root.
    pub value: Real,
    /// Delta, gamma and theta from the first layers, when available.
    pub greeks: Option<Greeks>,
    /// Largest number of states carried by one node.
    pub max_states: usize,
}

/// Roll `values` (at step `from`) back to step `to`.
pub fn roll_back(
    tree: &dyn RecombiningTree,
    mut values: Vec<Real>,
    from: usize,
    to: usize,
    exercise: Option<&EarlyExercise<'_>>,
    interrupt: &Interrupt,
) -> Interruptible<Vec<Real>> {
    for i in (to..from).rev() {
        poll!(interrupt);
        step_back(tree, i, &mut values, exercise);
    }
    Interruptible::Finished(values)
}

fn step_back(
    tree: &dyn RecombiningTree,
    i: usize,
    values: &mut Vec<Real>,
    exercise: Option<&EarlyExercise<'_>>,
) {
    // Children of node j are j..j+branches, so overwriting in increasing j
    // never clobbers a value still needed.
    for j in 0..tree.size(i) {
        let v = tree.continuation(i, j, &values[..]);
        values[j] = v;
    }
    values.truncate(tree.size(i));
    if let Some(ex) = exercise {
        ex.project(i, values, |j| tree.underlying(i, j));
    }
}

/// Terminal values `payoff(S_N)` at the last layer.
pub fn terminal_values(tree: &dyn RecombiningTree, payoff: &dyn Fn(Real) -> Real) -> Vec<Real> {
    let n = tree.steps();
    (0..tree.size(n))
        .map(|j| payoff(tree.underlying(n, j)))
        .collect()
}

/// Roll `values` at step `from` back to the root, extracting delta, gamma
/// and theta from the first layer with three nodes.
pub fn value_from(
    tree: &dyn RecombiningTree,
    values: Vec<Real>,
    from: usize,
    exercise: Option<&EarlyExercise<'_>>,
    interrupt: &Interrupt,
) -> Interruptible<TreeValuation> {
    let greek_layer = (0..=from).find(|&i| tree.size(i) >= 3);
    let Some(g) = greek_layer else {
        let root = finish!(roll_back(tree, values, from, 0, exercise, interrupt));
        return Interruptible::Finished(TreeValuation {
            value: root[0],
            greeks: None,
            max_states: 1,
        });
    };
    let layer = finish!(roll_back(tree, values, from, g, exercise, interrupt));
    let root = finish!(roll_back(tree, layer.clone(), g, 0, exercise, interrupt));
    let value = root[0];

    let s: Vec<Real> = (0..3).map(|j| tree.underlying(g, j)).collect();
    let v = &layer[..3];
    let delta = (v[2] - v[0]) / (s[2] - s[0]);
    let gamma = 2.0 * ((v[2] - v[1]) / (s[2] - s[1]) - (v[1] - v[0]) / (s[1] - s[0]))
        / (s[2] - s[0]);
    // The middle node need not sit at the root spot; shift it back along the
    // local quadratic before differencing in time.
    let shift = tree.underlying(0, 0) - s[1];
    let v_at_spot = v[1] + delta * shift + 0.5 * gamma * shift * shift;
    let theta = (v_at_spot - value) / (g as Real * tree.dt());
    Interruptible::Finished(TreeValuation {
        value,
        greeks: Some(Greeks::spot_and_time(delta, gamma, theta)),
        max_states: 1,
    })
}

/// Backward induction for a payoff depending on the terminal spot only.
pub fn induce(
    tree: &dyn RecombiningTree,
    payoff: &dyn Fn(Real) -> Real,
    exercise: Option<&EarlyExercise<'_>>,
    interrupt: &Interrupt,
) -> Interruptible<TreeValuation> {
    let values = terminal_values(tree, payoff);
    value_from(tree, values, tree.steps(), exercise, interrupt)
}

/// Linear interpolation on ascending `xs`, extrapolating the end segments.
pub fn interpolate(xs: &[Real], ys: &[Real], x: Real) -> Real {
    if xs.len() < 2 {
        return ys[0];
    }
    let i = xs.partition_point(|&v| v <= x).clamp(1, xs.len() - 1) - 1;
    let w = (x - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + w * (ys[i + 1] - ys[i])
}

/// Backward induction carrying path states per node.
///
/// Each node holds the states listed by `model.states`; the value of a state
/// is the discounted expectation over the children of the child's value at
/// the advanced state, interpolated linearly in the child's state list.
/// Nodes within one layer are independent and are evaluated in parallel.
pub fn induce_with_states(
    tree: &dyn RecombiningTree,
    model: &dyn NodeStateModel,
    interrupt: &Interrupt,
) -> Interruptible<TreeValuation> {
    let n = tree.steps();
    let mut max_states = 0;

    let mut states: Vec<Vec<Real>> = (0..tree.size(n)).map(|j| model.states(tree, n, j)).collect();
    let mut values: Vec<Vec<Real>> = states
        .iter()
        .enumerate()
        .map(|(j, node_states)| {
            let spot = tree.underlying(n, j);
            node_states
                .iter()
                .map(|&a| {
                    model
                        .node_override(a, n, spot)
                        .unwrap_or_else(|| model.terminal_value(a, spot))
                })
                .collect()
        })
        .collect();

    for i in (0..n).rev() {
        poll!(interrupt);
        let layer: Vec<(Vec<Real>, Vec<Real>)> = (0..tree.size(i))
            .into_par_iter()
            .map(|j| {
                let spot = tree.underlying(i, j);
                let node_states = model.states(tree, i, j);
                let node_values = node_states
                    .iter()
                    .map(|&a| {
                        if let Some(v) = model.node_override(a, i, spot) {
                            return v;
                        }
                        let expected: Real = (0..tree.branches())
                            .map(|b| {
                                let child = j + b;
                                let child_spot = tree.underlying(i + 1, child);
                                let next = model.advance(a, i + 1, child_spot);
                                tree.probability(i, j, b)
                                    * interpolate(&states[child], &values[child], next)
                            })
                            .sum();
                        tree.discount() * expected
                    })
                    .collect();
                (node_states, node_values)
            })
            .collect();
        let (s, v): (Vec<_>, Vec<_>) = layer.into_iter().unzip();
        max_states = s.iter().map(Vec::len).fold(max_states, usize::max);
        states = s;
        values = v;
    }

    let root = interpolate(
        &states[0],
        &values[0],
        model.initial_state(tree.underlying(0, 0)),
    );
    Interruptible::Finished(TreeValuation {
        value: root,
        greeks: None,
        max_states,
    })
}
