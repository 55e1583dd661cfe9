use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::{Result, RobregError};
use crate::sim::design::{sample_design_matrix, sample_true_coefficients};
use crate::sim::noise::{compute_sigma_for_snr, sample_error_vector, TailModel};

/// Inputs of one simulated regression problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationParameters {
    pub n: usize,
    pub p: usize,
    pub gamma: f64,
    pub rho: f64,
    pub tail: TailModel,
    pub snr: f64,
    pub seed: Option<u64>,
}

impl SimulationParameters {
    /// Build parameters with `p = round(gamma * n)`, ties to even.
    pub fn new(
        n: usize,
        gamma: f64,
        rho: f64,
        tail: TailModel,
        snr: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        if n == 0 {
            return Err(RobregError::InvalidConfig("n must be > 0".to_string()));
        }
        let p = feature_count(n, gamma)?;
        Ok(Self {
            n,
            p,
            gamma,
            rho,
            tail,
            snr,
            seed,
        })
    }
}

/// Number of features implied by the aspect ratio `gamma = p / n`.
pub fn feature_count(n: usize, gamma: f64) -> Result<usize> {
    if !(gamma.is_finite() && gamma > 0.0) {
        return Err(RobregError::InvalidConfig(format!(
            "gamma must be a positive finite number, got {gamma}"
        )));
    }
    let p = (gamma * n as f64).round_ties_even();
    if p < 1.0 {
        return Err(RobregError::InvalidConfig(format!(
            "gamma={gamma} with n={n} yields p < 1"
        )));
    }
    Ok(p as usize)
}

/// One draw of `y = X beta + noise`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
    pub beta: DVector<f64>,
    pub sigma: f64,
    pub params: SimulationParameters,
}

/// Simulate a dataset from its own generator.
///
/// With a seed the output is bit-for-bit reproducible and independent of any
/// other generator in the process. Without one the generator is seeded from
/// OS entropy.
pub fn simulate_dataset(params: &SimulationParameters) -> Result<Dataset> {
    let mut rng = match params.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    simulate_dataset_with_rng(params, &mut rng)
}

/// Simulate a dataset, drawing design, coefficients and noise from `rng` in
/// that order.
pub fn simulate_dataset_with_rng<R: Rng + ?Sized>(
    params: &SimulationParameters,
    rng: &mut R,
) -> Result<Dataset> {
    let x = sample_design_matrix(params.n, params.p, params.rho, rng)?;
    let beta = sample_true_coefficients(params.p, rng);
    let sigma = compute_sigma_for_snr(&x, &beta, params.snr)?;
    let errors = sample_error_vector(params.n, params.tail, sigma, rng)?;

    let y = &x * &beta + errors;

    Ok(Dataset {
        x,
        y,
        beta,
        sigma,
        params: *params,
    })
}
