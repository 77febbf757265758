//! Early-exercise schedules.
//!
//! Lattices and finite-difference grids both step backwards through a set of
//! time levels and, where exercise is allowed, replace the continuation value
//! by the exercise value when the latter is larger. [`ExercisePolicy`]
//! describes when exercise is allowed; [`EarlyExercise`] binds a policy to a
//! concrete time grid and an exercise-value function and performs the
//! projection.

use ol_core::{errors::Result, Real, Time};
use ol_instruments::ExerciseStyle;

/// When the holder may exercise before maturity.
#[derive(Debug, Clone, PartialEq)]
pub enum ExercisePolicy {
    /// Only at maturity.
    European,
    /// At every time level.
    American,
    /// At the levels nearest to the given times.
    Bermudan(Vec<Time>),
}

impl ExercisePolicy {
    /// Policy for a contract's exercise style.
    ///
    /// Perpetual exercise has no finite grid and is rejected.
    pub fn from_style(style: &ExerciseStyle) -> Result<Self> {
        match style {
            ExerciseStyle::European => Ok(ExercisePolicy::European),
            ExerciseStyle::American => Ok(ExercisePolicy::American),
            ExerciseStyle::Bermudan { exercise_times } => {
                Ok(ExercisePolicy::Bermudan(exercise_times.clone()))
            }
            ExerciseStyle::Perpetual => Err(ol_core::Error::InvalidParameter(
                "perpetual exercise cannot be placed on a finite grid".into(),
            )),
        }
    }

    /// Whether the policy never exercises early.
    pub fn is_european(&self) -> bool {
        matches!(self, ExercisePolicy::European)
    }

    /// Exercise flags for each level of an ascending time grid.
    ///
    /// Bermudan times map to the nearest grid level.
    pub fn schedule(&self, grid: &[Time]) -> Vec<bool> {
        let mut flags = vec![false; grid.len()];
        match self {
            ExercisePolicy::European => {}
            ExercisePolicy::American => flags.iter_mut().for_each(|f| *f = true),
            ExercisePolicy::Bermudan(times) => {
                for &t in times {
                    if let Some(i) = nearest_level(grid, t) {
                        flags[i] = true;
                    }
                }
            }
        }
        flags
    }
}

/// Index of the grid level closest to `t`.
pub fn nearest_level(grid: &[Time], t: Time) -> Option<usize> {
    let upper = grid.partition_point(|&g| g < t);
    match (upper.checked_sub(1), grid.get(upper)) {
        (Some(lo), Some(&hi)) if t - grid[lo] <= hi - t => Some(lo),
        (_, Some(_)) => Some(upper),
        (Some(lo), None) => Some(lo),
        (None, None) => None,
    }
}

/// An exercise policy bound to a time grid and an exercise-value function.
pub struct EarlyExercise<'a> {
    flags: Vec<bool>,
    times: Vec<Time>,
    value: &'a (dyn Fn(Time, Real) -> Real + Sync),
}

impl<'a> EarlyExercise<'a> {
    /// Bind `policy` to `grid`; `value(t, S)` is the exercise value at time
    /// `t` and spot `S`.
    pub fn new(
        policy: &ExercisePolicy,
        grid: &[Time],
        value: &'a (dyn Fn(Time, Real) -> Real + Sync),
    ) -> Self {
        Self {
            flags: policy.schedule(grid),
            times: grid.to_vec(),
            value,
        }
    }

    /// Whether exercise is allowed at level `level`.
    pub fn is_active(&self, level: usize) -> bool {
        self.flags.get(level).copied().unwrap_or(false)
    }

    /// Exercise value at level `level` and spot `spot`.
    pub fn value(&self, level: usize, spot: Real) -> Real {
        (self.value)(self.times[level], spot)
    }

    /// Replace `values[j]` by `max(values[j], exercise value at spot(j))`
    /// when exercise is allowed at `level`.
    pub fn project(&self, level: usize, values: &mut [Real], spot: impl Fn(usize) -> Real) {
        if !self.is_active(level) {
            return;
        }
        let t = self.times[level];
        for (j, v) in values.iter_mut().enumerate() {
            *v = v.max((self.value)(t, spot(j)));
        }
    }
}
