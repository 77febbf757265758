//! Monte Carlo simulation.
//!
//! # Overview
//!
//! * [`TimeGrid`]: uniform steps merged with a payoff's monitoring times
//! * [`PathGenerator`] / [`MultiPathGenerator`]: exact log-normal paths,
//!   correlated through a Cholesky factor
//! * [`PathPricer`] and [`Pathwise`]: path-by-path payoffs with antithetic
//!   pairs and control variates as flags on the same core
//! * [`LongstaffSchwartz`]: least-squares early exercise
//! * [`MonteCarloModel`]: batched, seeded, optionally parallel estimation
//!   with a target standard error

pub mod lsm;
pub mod model;
pub mod path;

pub use lsm::LongstaffSchwartz;
pub use model::{
    BatchSampler, McEstimate, McSettings, MonteCarloModel, MultiAssetPricer, PathPricer,
    Pathwise, Sample, SingleAssetPricer,
};
pub use path::{
    crossing_probability, shifted_barrier, MultiPathGenerator, PathGenerator, TimeGrid,
};
