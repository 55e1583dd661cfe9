//! Data-generating process for the linear model `y = X beta + noise`.
//!
//! Designs carry AR(1) correlation between predictors, coefficients are
//! standard normal, and the noise is Gaussian or variance-corrected
//! Student-t, scaled to a target signal-to-noise ratio.
//!
//! Every sampler takes the random source as an argument, so a single seeded
//! generator (or any other [`rand::Rng`]) drives a whole draw.

pub mod covariance;
pub mod dataset;
pub mod design;
pub mod noise;

pub use covariance::ar1_covariance;
pub use dataset::{
    feature_count, simulate_dataset, simulate_dataset_with_rng, Dataset, SimulationParameters,
};
pub use design::{sample_design_matrix, sample_true_coefficients};
pub use noise::{compute_sigma_for_snr, sample_error_vector, TailModel, SIGMA2_FLOOR};
