use nalgebra::DMatrix;

/// AR(1) correlation matrix with entries `rho^|i-j|`.
///
/// Any real `rho` is accepted; whether the result is positive definite is
/// left to the factorization in [`crate::sim::design`]. `p == 0` yields an
/// empty matrix.
pub fn ar1_covariance(p: usize, rho: f64) -> DMatrix<f64> {
    DMatrix::from_fn(p, p, |i, j| rho.powi(i.abs_diff(j) as i32))
}
