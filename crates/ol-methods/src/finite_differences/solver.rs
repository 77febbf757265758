//! θ-scheme time stepping.
//!
//! In `x = ln S` the Black–Scholes operator has constant coefficients,
//!
//! `L V = ½σ² V_xx + (r − q − ½σ²) V_x − r V`,
//!
//! discretised with central differences. Each step backwards in time solves
//! `(I − θΔt L) V^n = (I + (1 − θ)Δt L) V^{n+1}` with Dirichlet rows at both
//! ends, then applies the early-exercise projection.

use std::ops::{Add, Mul, Sub};

use ol_core::{errors::Result, Interrupt, Real, Time};

use super::{FdScheme, LogGrid, TridiagonalOperator};
use crate::exercise::{nearest_level, EarlyExercise};
use crate::process::BlackScholesProcess;
use crate::Interruptible;

/// Dirichlet values at the two ends of the grid as functions of
/// `(t, S)`, where `t` is the time from the valuation date.
pub struct Boundaries<'a> {
    /// Value at the lowest node.
    pub lower: &'a (dyn Fn(Time, Real) -> Real + Sync),
    /// Value at the highest node.
    pub upper: &'a (dyn Fn(Time, Real) -> Real + Sync),
}

/// Value and sensitivities read off the grid at the spot node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FdGreeks {
    /// Value at the spot.
    pub value: Real,
    /// ∂V/∂S.
    pub delta: Real,
    /// ∂²V/∂S².
    pub gamma: Real,
    /// ∂V/∂t from the first time step.
    pub theta: Real,
}

impl Add for FdGreeks {
    type Output = FdGreeks;

    fn add(self, rhs: FdGreeks) -> FdGreeks {
        FdGreeks {
            value: self.value + rhs.value,
            delta: self.delta + rhs.delta,
            gamma: self.gamma + rhs.gamma,
            theta: self.theta + rhs.theta,
        }
    }
}

impl Sub for FdGreeks {
    type Output = FdGreeks;

    fn sub(self, rhs: FdGreeks) -> FdGreeks {
        self + rhs * -1.0
    }
}

impl Mul<Real> for FdGreeks {
    type Output = FdGreeks;

    fn mul(self, factor: Real) -> FdGreeks {
        FdGreeks {
            value: self.value * factor,
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
        }
    }
}

/// θ-scheme solver on a fixed [`LogGrid`] and a uniform time grid over
/// `[0, horizon]`.
#[derive(Debug, Clone)]
pub struct ThetaSolver<'a> {
    grid: &'a LogGrid,
    process: BlackScholesProcess,
    dt: Time,
    steps: usize,
    requested_steps: usize,
    scheme: FdScheme,
    rannacher_steps: usize,
}

impl<'a> ThetaSolver<'a> {
    /// Solver with `time_steps` steps over `[0, horizon]`.
    ///
    /// The explicit scheme is checked against its stability bound
    /// `Δt ≤ 1/(σ²/Δx² + max(r, 0))`; a violating step count is raised to the
    /// smallest stable one when `auto_adjust` is set and rejected with
    /// `StabilityViolation` otherwise.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grid: &'a LogGrid,
        process: BlackScholesProcess,
        horizon: Time,
        time_steps: usize,
        scheme: FdScheme,
        rannacher_steps: usize,
        auto_adjust: bool,
    ) -> Result<Self> {
        ol_core::ensure!(time_steps > 0, "time_steps must be positive");
        ol_core::ensure!(horizon > 0.0, "horizon must be positive, got {horizon}");
        let mut steps = time_steps;
        if scheme == FdScheme::Explicit {
            let dt = horizon / steps as Real;
            let max_dt = Self::max_stable_dt(grid, &process);
            if dt > max_dt {
                if !auto_adjust {
                    return Err(ol_core::Error::StabilityViolation { dt, max_dt });
                }
                steps = (horizon / max_dt).ceil() as usize;
            }
        }
        Ok(Self {
            grid,
            process,
            dt: horizon / steps as Real,
            steps,
            requested_steps: time_steps,
            scheme,
            rannacher_steps: if scheme == FdScheme::CrankNicolson {
                rannacher_steps
            } else {
                0
            },
        })
    }

    /// Largest stable explicit time step on `grid`.
    pub fn max_stable_dt(grid: &LogGrid, process: &BlackScholesProcess) -> Time {
        let dx = grid.dx();
        let variance = process.volatility * process.volatility;
        1.0 / (variance / (dx * dx) + process.rate.max(0.0))
    }

    /// Number of time steps actually used.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of time steps requested.
    pub fn requested_steps(&self) -> usize {
        self.requested_steps
    }

    /// Whether the stability check raised the step count.
    pub fn time_step_adjusted(&self) -> bool {
        self.steps != self.requested_steps
    }

    /// Time step.
    pub fn dt(&self) -> Time {
        self.dt
    }

    /// Time levels `0, Δt, …, horizon`.
    pub fn times(&self) -> Vec<Time> {
        (0..=self.steps).map(|n| n as Time * self.dt).collect()
    }

    /// Level closest to time `t`.
    pub fn level_at(&self, t: Time) -> usize {
        nearest_level(&self.times(), t).unwrap_or(0)
    }

    /// The grid.
    pub fn grid(&self) -> &LogGrid {
        self.grid
    }

    fn operators(&self, theta: Real) -> (TridiagonalOperator, [Real; 3]) {
        let dx = self.grid.dx();
        let variance = self.process.volatility * self.process.volatility;
        let drift = self.process.log_drift();
        let a = 0.5 * variance / (dx * dx) - 0.5 * drift / dx;
        let b = -variance / (dx * dx) - self.process.rate;
        let c = 0.5 * variance / (dx * dx) + 0.5 * drift / dx;
        let dt = self.dt;
        let implicit = TridiagonalOperator::interior(
            self.grid.len(),
            -theta * dt * a,
            1.0 - theta * dt * b,
            -theta * dt * c,
        );
        let w = (1.0 - theta) * dt;
        (implicit, [w * a, w * b, w * c])
    }

    /// Step `values` from level `from` back to level `to`.
    ///
    /// The first `rannacher_steps` steps of a Crank–Nicolson march are fully
    /// implicit to damp the oscillations a non-smooth starting profile
    /// would otherwise excite. The interrupt is polled once per step.
    pub fn march(
        &self,
        values: Vec<Real>,
        from: usize,
        to: usize,
        boundaries: &Boundaries<'_>,
        exercise: Option<&EarlyExercise<'_>>,
        interrupt: &Interrupt,
    ) -> Result<Interruptible<Vec<Real>>> {
        self.step_range(
            values,
            from,
            to,
            self.rannacher_steps,
            boundaries,
            exercise,
            interrupt,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn step_range(
        &self,
        mut values: Vec<Real>,
        from: usize,
        to: usize,
        damped_steps: usize,
        boundaries: &Boundaries<'_>,
        exercise: Option<&EarlyExercise<'_>>,
        interrupt: &Interrupt,
    ) -> Result<Interruptible<Vec<Real>>> {
        let main = self.operators(self.scheme.theta());
        let damped = (damped_steps > 0).then(|| self.operators(1.0));
        let spots = self.grid.spots();
        let n = spots.len();
        let mut rhs = vec![0.0; n];

        for (k, level) in (to..from).rev().enumerate() {
            if let Some(reason) = interrupt.check() {
                return Ok(Interruptible::Stopped(reason));
            }
            let (implicit, [a, b, c]) = match &damped {
                Some(ops) if k < damped_steps => ops,
                _ => &main,
            };
            for i in 1..n - 1 {
                rhs[i] = values[i] + a * values[i - 1] + b * values[i] + c * values[i + 1];
            }
            let t = level as Time * self.dt;
            rhs[0] = (boundaries.lower)(t, spots[0]);
            rhs[n - 1] = (boundaries.upper)(t, spots[n - 1]);
            values = implicit.solve(&rhs)?;
            if let Some(ex) = exercise {
                ex.project(level, &mut values, |i| spots[i]);
            }
        }
        Ok(Interruptible::Finished(values))
    }

    /// March from level `from` to the valuation date and read off the value,
    /// delta, gamma and theta at the spot node.
    pub fn solve(
        &self,
        values: Vec<Real>,
        from: usize,
        boundaries: &Boundaries<'_>,
        exercise: Option<&EarlyExercise<'_>>,
        interrupt: &Interrupt,
    ) -> Result<Interruptible<FdGreeks>> {
        if from == 0 {
            return Ok(Interruptible::Finished(self.read_off(&values, None)));
        }
        let damped = self.rannacher_steps;
        let first =
            match self.step_range(values, from, 1, damped, boundaries, exercise, interrupt)? {
                Interruptible::Finished(v) => v,
                Interruptible::Stopped(reason) => return Ok(Interruptible::Stopped(reason)),
            };
        let remaining = damped.saturating_sub(from - 1);
        let root = match self.step_range(
            first.clone(),
            1,
            0,
            remaining,
            boundaries,
            exercise,
            interrupt,
        )? {
            Interruptible::Finished(v) => v,
            Interruptible::Stopped(reason) => return Ok(Interruptible::Stopped(reason)),
        };
        Ok(Interruptible::Finished(self.read_off(&root, Some(&first))))
    }

    /// Value, delta, gamma (and theta when the next layer is given) at the
    /// spot node.
    pub fn read_off(&self, root: &[Real], next: Option<&[Real]>) -> FdGreeks {
        let i = self.grid.spot_index();
        let s = self.grid.spots();
        let (s0, s1, s2) = (s[i - 1], s[i], s[i + 1]);
        let (v0, v1, v2) = (root[i - 1], root[i], root[i + 1]);
        let delta = (v2 - v0) / (s2 - s0);
        let gamma = 2.0 * ((v2 - v1) / (s2 - s1) - (v1 - v0) / (s1 - s0)) / (s2 - s0);
        let theta = next.map_or(0.0, |n| (n[i] - v1) / self.dt);
        FdGreeks {
            value: v1,
            delta,
            gamma,
            theta,
        }
    }
}

/// Dirichlet value `e^{−r(T−t)} · payoff(S e^{(r−q)(T−t)})`: the payoff at
/// the forward, discounted. Exact far from the strike for payoffs linear in
/// the terminal spot there.
pub fn forward_intrinsic(
    process: &BlackScholesProcess,
    maturity: Time,
    t: Time,
    spot: Real,
    payoff: impl Fn(Real) -> Real,
) -> Real {
    let tau = (maturity - t).max(0.0);
    process.discount(tau) * payoff(spot * (process.carry() * tau).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::ExercisePolicy;

    // S=100, K=100, r=5%, q=0, σ=20%, T=1.
    const BS_CALL: Real = 10.450_583_572_185_565;
    const BS_PUT: Real = 5.573_526_022_256_971;

    fn process() -> BlackScholesProcess {
        BlackScholesProcess::new(100.0, 0.05, 0.0, 0.20)
    }

    fn price(
        scheme: FdScheme,
        steps: usize,
        payoff: &(dyn Fn(Real) -> Real + Sync),
        policy: ExercisePolicy,
    ) -> (FdGreeks, usize) {
        let p = process();
        let grid = LogGrid::centered(100.0, 5.0 * 0.2, 201).unwrap();
        let solver = ThetaSolver::new(&grid, p, 1.0, steps, scheme, 2, true).unwrap();
        let edge = |t: Time, s: Real| forward_intrinsic(&p, 1.0, t, s, payoff);
        let boundaries = Boundaries {
            lower: &edge,
            upper: &edge,
        };
        let times = solver.times();
        let exercise_value = |_t: Time, s: Real| payoff(s);
        let ex = EarlyExercise::new(&policy, &times, &exercise_value);
        let exercise = (!policy.is_european()).then_some(&ex);
        let terminal = grid.cell_average(payoff);
        let greeks = solver
            .solve(terminal, solver.steps(), &boundaries, exercise, &Interrupt::default())
            .unwrap()
            .finished()
            .unwrap();
        (greeks, solver.steps())
    }

    fn call(s: Real) -> Real {
        (s - 100.0).max(0.0)
    }

    fn put(s: Real) -> Real {
        (100.0 - s).max(0.0)
    }

    #[test]
    fn crank_nicolson_matches_black_scholes() {
        let (g, _) = price(FdScheme::CrankNicolson, 100, &call, ExercisePolicy::European);
        assert!((g.value - BS_CALL).abs() < 2e-3, "{}", g.value);
        assert!((g.delta - 0.636_831).abs() < 1e-3);
        assert!((g.gamma - 0.018_762).abs() < 1e-4);
        assert!((g.theta + 6.414_028).abs() < 0.05);
        let (p, _) = price(FdScheme::CrankNicolson, 100, &put, ExercisePolicy::European);
        assert!((p.value - BS_PUT).abs() < 2e-3, "{}", p.value);
    }

    #[test]
    fn implicit_is_first_order_close() {
        let (g, _) = price(FdScheme::Implicit, 100, &call, ExercisePolicy::European);
        assert!((g.value - BS_CALL).abs() < 0.02, "{}", g.value);
    }

    #[test]
    fn explicit_step_is_raised_to_stable_count() {
        let (g, steps) = price(FdScheme::Explicit, 100, &call, ExercisePolicy::European);
        // dx = 0.01 so Δt ≤ 1/(400 + 0.05); 401 steps are needed.
        assert_eq!(steps, 401);
        assert!((g.value - BS_CALL).abs() < 5e-3, "{}", g.value);
    }

    #[test]
    fn explicit_violation_without_adjustment_fails() {
        let grid = LogGrid::centered(100.0, 1.0, 201).unwrap();
        let err = ThetaSolver::new(&grid, process(), 1.0, 100, FdScheme::Explicit, 0, false)
            .unwrap_err();
        match err {
            ol_core::Error::StabilityViolation { dt, max_dt } => {
                assert!((dt - 0.01).abs() < 1e-12);
                assert!(max_dt < dt);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cash_digital_with_cell_averaging() {
        let digital = |s: Real| if s > 100.0 { 10.0 } else { 0.0 };
        let (g, _) = price(FdScheme::CrankNicolson, 100, &digital, ExercisePolicy::European);
        // 10 e^{−rT} N(d2) = 5.323248.
        assert!((g.value - 5.323_248).abs() < 2e-3, "{}", g.value);
    }

    #[test]
    fn american_put_with_projection() {
        let (g, _) = price(FdScheme::CrankNicolson, 200, &put, ExercisePolicy::American);
        assert!((g.value - 6.0904).abs() < 0.01, "{}", g.value);
        assert!(g.value > BS_PUT);
    }

    #[test]
    fn greeks_combine_linearly() {
        let a = FdGreeks {
            value: 1.0,
            delta: 0.5,
            gamma: 0.1,
            theta: -1.0,
        };
        let b = a * 2.0 - a;
        assert_eq!(b, a);
    }

    #[test]
    fn cancelled_march_stops() {
        use std::sync::{atomic::AtomicBool, Arc};
        let grid = LogGrid::centered(100.0, 1.0, 51).unwrap();
        let solver =
            ThetaSolver::new(&grid, process(), 1.0, 10, FdScheme::Implicit, 0, false).unwrap();
        let zero = |_t: Time, _s: Real| 0.0;
        let boundaries = Boundaries {
            lower: &zero,
            upper: &zero,
        };
        let interrupt = Interrupt::default().with_cancel_flag(Arc::new(AtomicBool::new(true)));
        let outcome = solver
            .march(vec![0.0; 51], 10, 0, &boundaries, None, &interrupt)
            .unwrap();
        assert!(matches!(outcome, Interruptible::Stopped(_)));
    }
}
