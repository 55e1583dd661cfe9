use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Result, RobregError};
use crate::sim::covariance::ar1_covariance;

/// Draw an `n x p` design whose rows are i.i.d. `N(0, Sigma)` with AR(1)
/// correlation `rho`, as `X = Z * L^T` where `L * L^T = Sigma`.
///
/// `Z` is filled row by row so a given random stream always lands in the
/// same cells. A covariance that fails Cholesky is reported, never patched.
pub fn sample_design_matrix<R: Rng + ?Sized>(
    n: usize,
    p: usize,
    rho: f64,
    rng: &mut R,
) -> Result<DMatrix<f64>> {
    let sigma = ar1_covariance(p, rho);
    let chol = sigma
        .cholesky()
        .ok_or(RobregError::NotPositiveDefinite { p, rho })?;
    let l = chol.l();
    if (0..p).any(|i| !(l[(i, i)].is_finite() && l[(i, i)] > 0.0)) {
        return Err(RobregError::NotPositiveDefinite { p, rho });
    }

    let z = standard_normal_matrix(n, p, rng);
    Ok(z * l.transpose())
}

/// True coefficients `beta ~ N(0, I_p)`.
pub fn sample_true_coefficients<R: Rng + ?Sized>(p: usize, rng: &mut R) -> DVector<f64> {
    let draws: Vec<f64> = (0..p).map(|_| rng.sample(StandardNormal)).collect();
    DVector::from_vec(draws)
}

fn standard_normal_matrix<R: Rng + ?Sized>(n: usize, p: usize, rng: &mut R) -> DMatrix<f64> {
    let draws: Vec<f64> = (0..n * p).map(|_| rng.sample(StandardNormal)).collect();
    DMatrix::from_row_slice(n, p, &draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::covariance::ar1_covariance;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn design_has_requested_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let x = sample_design_matrix(30, 7, 0.4, &mut rng).unwrap();
        assert_eq!(x.shape(), (30, 7));
    }

    #[test]
    fn empirical_covariance_tracks_ar1() {
        let (n, p, rho) = (50_000, 5, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let x = sample_design_matrix(n, p, rho, &mut rng).unwrap();

        let empirical = (x.transpose() * &x) / n as f64;
        let target = ar1_covariance(p, rho);
        for i in 0..p {
            for j in 0..p {
                let diff = (empirical[(i, j)] - target[(i, j)]).abs();
                assert!(diff < 0.03, "cell ({i},{j}) off by {diff}");
            }
        }
    }

    #[test]
    fn rho_outside_unit_interval_is_surfaced() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let err = sample_design_matrix(10, 4, 1.5, &mut rng).unwrap_err();
        assert!(matches!(err, RobregError::NotPositiveDefinite { p: 4, .. }));
    }

    #[test]
    fn unit_rho_is_singular() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let err = sample_design_matrix(10, 3, 1.0, &mut rng).unwrap_err();
        assert!(matches!(err, RobregError::NotPositiveDefinite { .. }));
    }

    #[test]
    fn coefficients_are_reproducible() {
        let a = sample_true_coefficients(9, &mut ChaCha8Rng::seed_from_u64(11));
        let b = sample_true_coefficients(9, &mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(a, b);
        assert_eq!(a.len(), 9);
    }
}
