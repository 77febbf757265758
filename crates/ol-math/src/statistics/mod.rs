//! Sample statistics accumulators.
//!
//! Both accumulators keep only power sums, so two accumulators built on
//! disjoint samples merge exactly by adding their sums. Monte Carlo batches
//! run on separate threads and are merged afterwards in batch order.

use ol_core::Real;

/// Two-sided 95% normal quantile.
pub const Z_95: Real = 1.959_963_984_540_054;

/// Incremental statistics accumulator.
///
/// Accumulates samples and computes mean, variance, standard deviation,
/// standard error of the mean, min and max.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    count: usize,
    sum: Real,
    sum_sq: Real,
    min: Real,
    max: Real,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    /// Create a new empty accumulator.
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: Real::INFINITY,
            max: Real::NEG_INFINITY,
        }
    }

    /// Add a single sample.
    pub fn add(&mut self, x: Real) {
        self.count += 1;
        self.sum += x;
        self.sum_sq += x * x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &Statistics) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Number of samples.
    pub fn samples(&self) -> usize {
        self.count
    }

    /// Sample mean.  Returns `None` if no samples have been added.
    pub fn mean(&self) -> Option<Real> {
        (self.count > 0).then(|| self.sum / self.count as Real)
    }

    /// Unbiased (Bessel-corrected) variance.  Returns `None` for fewer than
    /// 2 samples.
    pub fn variance(&self) -> Option<Real> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as Real;
        let centred = self.sum_sq - self.sum * self.sum / n;
        Some((centred / (n - 1.0)).max(0.0))
    }

    /// Standard deviation.  Returns `None` for fewer than 2 samples.
    pub fn std_dev(&self) -> Option<Real> {
        self.variance().map(Real::sqrt)
    }

    /// Standard error of the mean, `σ̂ / √n`.
    pub fn std_error(&self) -> Option<Real> {
        self.variance().map(|v| (v / self.count as Real).sqrt())
    }

    /// 95% confidence interval for the mean.
    pub fn confidence_interval(&self) -> Option<(Real, Real)> {
        let mean = self.mean()?;
        let se = self.std_error()?;
        Some((mean - Z_95 * se, mean + Z_95 * se))
    }

    /// Minimum sample value.  Returns `None` if no samples have been added.
    pub fn minimum(&self) -> Option<Real> {
        (self.count > 0).then_some(self.min)
    }

    /// Maximum sample value.  Returns `None` if no samples have been added.
    pub fn maximum(&self) -> Option<Real> {
        (self.count > 0).then_some(self.max)
    }
}

/// Accumulator for a target `y` and a control `c` with known mean.
///
/// Keeps `Σy, Σc, Σy², Σc², Σyc`. The control-variate estimate is
/// `ȳ − β (c̄ − E[c])` with `β = Cov(y, c) / Var(c)` fitted on the merged
/// sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlVariateStatistics {
    count: usize,
    sum_y: Real,
    sum_c: Real,
    sum_yy: Real,
    sum_cc: Real,
    sum_yc: Real,
}

/// A point estimate with its standard error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Estimated mean.
    pub mean: Real,
    /// Standard error of the estimate.
    pub std_error: Real,
}

impl Estimate {
    /// 95% confidence interval around the mean.
    pub fn confidence_interval(&self) -> (Real, Real) {
        (self.mean - Z_95 * self.std_error, self.mean + Z_95 * self.std_error)
    }
}

impl ControlVariateStatistics {
    /// Create a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one `(target, control)` observation.
    pub fn add(&mut self, y: Real, c: Real) {
        self.count += 1;
        self.sum_y += y;
        self.sum_c += c;
        self.sum_yy += y * y;
        self.sum_cc += c * c;
        self.sum_yc += y * c;
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &ControlVariateStatistics) {
        self.count += other.count;
        self.sum_y += other.sum_y;
        self.sum_c += other.sum_c;
        self.sum_yy += other.sum_yy;
        self.sum_cc += other.sum_cc;
        self.sum_yc += other.sum_yc;
    }

    /// Number of observations.
    pub fn samples(&self) -> usize {
        self.count
    }

    /// Plain sample mean of the target and its standard error, ignoring
    /// the control.
    pub fn plain(&self) -> Option<Estimate> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as Real;
        let var_y = ((self.sum_yy - self.sum_y * self.sum_y / n) / (n - 1.0)).max(0.0);
        Some(Estimate {
            mean: self.sum_y / n,
            std_error: (var_y / n).sqrt(),
        })
    }

    /// Regression coefficient of the target on the control.
    pub fn beta(&self) -> Option<Real> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as Real;
        let cov = self.sum_yc - self.sum_y * self.sum_c / n;
        let var_c = self.sum_cc - self.sum_c * self.sum_c / n;
        Some(if var_c > 0.0 { cov / var_c } else { 0.0 })
    }

    /// Control-variate adjusted mean and standard error given the exact
    /// expectation of the control.
    pub fn adjusted(&self, control_mean: Real) -> Option<Estimate> {
        if self.count < 3 {
            return None;
        }
        let n = self.count as Real;
        let syy = self.sum_yy - self.sum_y * self.sum_y / n;
        let scc = self.sum_cc - self.sum_c * self.sum_c / n;
        let syc = self.sum_yc - self.sum_y * self.sum_c / n;
        let (beta, residual) = if scc > 0.0 {
            (syc / scc, syy - syc * syc / scc)
        } else {
            (0.0, syy)
        };
        // One degree of freedom goes to the mean, one to β.
        let var = (residual / (n - 2.0)).max(0.0);
        Some(Estimate {
            mean: self.sum_y / n - beta * (self.sum_c / n - control_mean),
            std_error: (var / n).sqrt(),
        })
    }
}
