//! Probability distributions.

pub mod bivariate;
pub mod normal;

pub use bivariate::bivariate_normal_cdf;
pub use normal::{normal_cdf, normal_cdf_inverse, normal_pdf};
