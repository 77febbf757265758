//! Pricing results.
//!
//! Every engine returns a [`PricingResult`]: the price, optional Greeks, a
//! standard error and 95% confidence interval for simulation methods,
//! method-specific [`Diagnostics`], and a [`ResultStatus`] that marks
//! estimates cut short by a deadline, a cancellation or the path cap.

use ol_core::{errors::Error, errors::Result, Real};
use ol_math::statistics::Z_95;

/// Price sensitivities. Each entry is `None` when the engine cannot
/// extract it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Greeks {
    /// ∂V/∂S.
    pub delta: Option<Real>,
    /// ∂²V/∂S².
    pub gamma: Option<Real>,
    /// ∂V/∂σ.
    pub vega: Option<Real>,
    /// ∂V/∂t (calendar time, per year).
    pub theta: Option<Real>,
    /// ∂V/∂r.
    pub rho: Option<Real>,
}

impl Greeks {
    /// All five sensitivities.
    pub fn full(delta: Real, gamma: Real, vega: Real, theta: Real, rho: Real) -> Self {
        Self {
            delta: Some(delta),
            gamma: Some(gamma),
            vega: Some(vega),
            theta: Some(theta),
            rho: Some(rho),
        }
    }

    /// Delta, gamma and theta only, as lattice and grid methods provide.
    pub fn spot_and_time(delta: Real, gamma: Real, theta: Real) -> Self {
        Self {
            delta: Some(delta),
            gamma: Some(gamma),
            theta: Some(theta),
            ..Self::default()
        }
    }
}

/// Method-specific convergence information.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Diagnostics {
    /// Closed form.
    Analytic {
        /// Name of the formula used.
        formula: String,
    },
    /// Tree induction.
    Lattice {
        /// Tree parameterisation used.
        tree: String,
        /// Number of time steps.
        steps: usize,
        /// Largest number of path states carried by a node.
        max_states: usize,
    },
    /// PDE grid.
    FiniteDifference {
        /// Time-stepping scheme.
        scheme: String,
        /// Number of spot nodes.
        price_nodes: usize,
        /// Time steps actually taken.
        time_steps: usize,
        /// Time steps requested by the configuration.
        requested_time_steps: usize,
        /// Whether the time step was refined to satisfy the stability bound.
        time_step_adjusted: bool,
        /// Lowest spot on the grid.
        lower_bound: Real,
        /// Highest spot on the grid.
        upper_bound: Real,
    },
    /// Path simulation.
    MonteCarlo {
        /// Number of samples (an antithetic pair counts once).
        paths: usize,
        /// Number of simulation dates per path.
        time_steps: usize,
        /// Number of batches run.
        batches: usize,
        /// Antithetic variates were used.
        antithetic: bool,
        /// A control variate was applied.
        control_variate: bool,
        /// Early exercise was priced by regression.
        regression: bool,
        /// Requested standard error, if any.
        target_std_error: Option<Real>,
    },
}

/// Why an estimate is partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PartialReason {
    /// The caller's deadline passed.
    DeadlineReached,
    /// The caller cancelled the computation.
    Cancelled,
    /// The path cap was hit before the target standard error.
    MaxPathsReached,
}

impl From<ol_core::InterruptReason> for PartialReason {
    fn from(reason: ol_core::InterruptReason) -> Self {
        match reason {
            ol_core::InterruptReason::DeadlineReached => PartialReason::DeadlineReached,
            ol_core::InterruptReason::Cancelled => PartialReason::Cancelled,
        }
    }
}

/// Completion status of a pricing call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResultStatus {
    /// The computation ran as configured.
    #[default]
    Complete,
    /// The best estimate available when the computation stopped early.
    Partial(PartialReason),
}

/// Output of a pricing call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricingResult {
    /// Present value.
    pub price: Real,
    /// Sensitivities, when the engine extracts them.
    pub greeks: Option<Greeks>,
    /// Standard error of the estimate (Monte Carlo only).
    pub standard_error: Option<Real>,
    /// 95% confidence interval (Monte Carlo only).
    pub confidence_interval: Option<(Real, Real)>,
    /// Method-specific diagnostics.
    pub diagnostics: Diagnostics,
    /// Whether the computation completed.
    pub status: ResultStatus,
}

impl PricingResult {
    /// A complete result with just a price.
    pub fn new(price: Real, diagnostics: Diagnostics) -> Self {
        Self {
            price,
            greeks: None,
            standard_error: None,
            confidence_interval: None,
            diagnostics,
            status: ResultStatus::Complete,
        }
    }

    /// Attach Greeks.
    pub fn with_greeks(mut self, greeks: Greeks) -> Self {
        self.greeks = Some(greeks);
        self
    }

    /// Attach a standard error and the matching 95% interval.
    pub fn with_standard_error(mut self, std_error: Real) -> Self {
        self.standard_error = Some(std_error);
        self.confidence_interval = Some((
            self.price - Z_95 * std_error,
            self.price + Z_95 * std_error,
        ));
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: ResultStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the computation stopped early.
    pub fn is_partial(&self) -> bool {
        matches!(self.status, ResultStatus::Partial(_))
    }

    /// Multiply price, error and interval by a positive `factor`.
    ///
    /// Greeks are dropped; callers that know how sensitivities transform
    /// reattach them.
    pub fn scaled(mut self, factor: Real) -> Self {
        self.price *= factor;
        self.standard_error = self.standard_error.map(|se| se * factor.abs());
        self.confidence_interval = self.confidence_interval.map(|(lo, hi)| {
            let (a, b) = (lo * factor, hi * factor);
            (a.min(b), a.max(b))
        });
        self.greeks = None;
        self
    }

    /// Turn a partial result into `ConvergenceNotReached`.
    pub fn require_converged(self) -> Result<Self> {
        if !self.is_partial() {
            return Ok(self);
        }
        let (paths, target) = match self.diagnostics {
            Diagnostics::MonteCarlo {
                paths,
                target_std_error,
                ..
            } => (paths, target_std_error.unwrap_or(0.0)),
            _ => (0, 0.0),
        };
        Err(Error::ConvergenceNotReached {
            paths,
            std_error: self.standard_error.unwrap_or(Real::NAN),
            target,
        })
    }
}
