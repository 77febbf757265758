//! Longstaff–Schwartz least-squares Monte Carlo for early exercise.
//!
//! Each batch simulates its paths, then walks the exercise dates backwards.
//! On every date the discounted realised cash flows of the in-the-money
//! paths are regressed on `{1, x, x²}` with `x = S/K`, and a path exercises
//! when its exercise value beats the fitted continuation value.

use nalgebra::{DMatrix, DVector};
use ol_core::{errors::Result, Real, Time};
use ol_math::{
    matrix_utilities::least_squares, random_numbers::NormalRng,
    statistics::ControlVariateStatistics,
};

use super::model::BatchSampler;
use super::path::{PathGenerator, TimeGrid};
use crate::exercise::ExercisePolicy;
use crate::process::BlackScholesProcess;

const BASIS: usize = 3;

/// Least-squares Monte Carlo sampler for a single-asset contract with an
/// exercise schedule.
pub struct LongstaffSchwartz<'a> {
    generator: PathGenerator,
    times: Vec<Time>,
    exercisable: Vec<bool>,
    exercise_value: &'a (dyn Fn(Time, Real) -> Real + Sync),
    scale: Real,
    rate: Real,
    antithetic: bool,
    control_mean: Option<Real>,
}

impl<'a> LongstaffSchwartz<'a> {
    /// Sampler on `grid` exercising per `policy`; the exercise value at the
    /// last grid time is paid on every path that has not exercised earlier.
    ///
    /// `scale` normalises the regressor (typically the strike).
    /// `control_mean`, when given, is the exact value of the European
    /// contract paying `exercise_value` at maturity; that contract is then
    /// used as the control variate.
    pub fn new(
        process: &BlackScholesProcess,
        grid: &TimeGrid,
        policy: &ExercisePolicy,
        exercise_value: &'a (dyn Fn(Time, Real) -> Real + Sync),
        scale: Real,
        antithetic: bool,
        control_mean: Option<Real>,
    ) -> Self {
        Self {
            generator: PathGenerator::new(process, grid),
            times: grid.times().to_vec(),
            exercisable: policy.schedule(grid.times()),
            exercise_value,
            scale,
            rate: process.rate,
            antithetic,
            control_mean,
        }
    }

    fn simulate(&self, rng: &mut NormalRng, samples: usize) -> Vec<Vec<Real>> {
        let per_sample = if self.antithetic { 2 } else { 1 };
        let mut normals = vec![0.0; self.generator.dimension()];
        let mut paths = Vec::with_capacity(samples * per_sample);
        for _ in 0..samples {
            rng.fill(&mut normals);
            let mut path = Vec::new();
            self.generator.fill(&normals, false, &mut path);
            paths.push(path);
            if self.antithetic {
                let mut mirror = Vec::new();
                self.generator.fill(&normals, true, &mut mirror);
                paths.push(mirror);
            }
        }
        paths
    }

    /// Discounted cash flow of every path under the regression policy.
    fn cash_flows(&self, paths: &[Vec<Real>]) -> Result<Vec<Real>> {
        let last = self.times.len() - 1;
        let maturity = self.times[last];
        let mut value: Vec<Real> = paths
            .iter()
            .map(|p| (self.exercise_value)(maturity, p[last]))
            .collect();
        let mut when = vec![last; paths.len()];

        for level in (1..last).rev() {
            if !self.exercisable[level] {
                continue;
            }
            let t = self.times[level];
            let itm: Vec<(usize, Real)> = paths
                .iter()
                .enumerate()
                .filter_map(|(k, p)| {
                    let e = (self.exercise_value)(t, p[level]);
                    (e > 0.0).then_some((k, e))
                })
                .collect();
            if itm.len() <= BASIS {
                continue;
            }
            let x = DMatrix::from_fn(itm.len(), BASIS, |row, col| {
                let s = paths[itm[row].0][level] / self.scale;
                s.powi(col as i32)
            });
            let y = DVector::from_iterator(
                itm.len(),
                itm.iter().map(|&(k, _)| {
                    value[k] * (-self.rate * (self.times[when[k]] - t)).exp()
                }),
            );
            let beta = least_squares(&x, &y)?;
            for (row, &(k, exercise)) in itm.iter().enumerate() {
                let continuation: Real = (0..BASIS).map(|c| beta[c] * x[(row, c)]).sum();
                if exercise > continuation {
                    value[k] = exercise;
                    when[k] = level;
                }
            }
        }

        Ok(value
            .iter()
            .zip(&when)
            .map(|(v, &level)| v * (-self.rate * self.times[level]).exp())
            .collect())
    }
}

impl BatchSampler for LongstaffSchwartz<'_> {
    fn sample_batch(
        &self,
        rng: &mut NormalRng,
        samples: usize,
    ) -> Result<ControlVariateStatistics> {
        let paths = self.simulate(rng, samples);
        let flows = self.cash_flows(&paths)?;
        let last = self.times.len() - 1;
        let maturity = self.times[last];
        let df = (-self.rate * maturity).exp();
        let per_sample = self.paths_per_sample();

        let mut stats = ControlVariateStatistics::new();
        for (group, flow) in paths.chunks(per_sample).zip(flows.chunks(per_sample)) {
            let n = group.len() as Real;
            let y = flow.iter().sum::<Real>() / n;
            let c = group
                .iter()
                .map(|p| df * (self.exercise_value)(maturity, p[last]))
                .sum::<Real>()
                / n;
            stats.add(y, c);
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
        self.control_mean
    }
}
