use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::methods::{check_dims, irls, least_squares, median, MethodFit, RegressionMethod};

/// Consistency factor turning the median absolute residual into a standard
/// deviation under Gaussian noise.
const MAD_TO_SIGMA: f64 = 1.4826;
const SCALE_FLOOR: f64 = 1e-12;

/// Huber M-estimator.
///
/// Residuals are standardized by a normalized MAD scale that is re-estimated
/// every iteration. Standardized residuals within `epsilon` keep full weight,
/// larger ones are downweighted by `epsilon / |z|`.
#[derive(Debug, Clone, Copy)]
pub struct HuberMethod {
    epsilon: f64,
    max_iter: usize,
    tol: f64,
}

impl HuberMethod {
    pub fn new(epsilon: f64, max_iter: usize, tol: f64) -> Self {
        Self {
            epsilon,
            max_iter,
            tol,
        }
    }
}

impl RegressionMethod for HuberMethod {
    fn name(&self) -> &'static str {
        "Huber"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<MethodFit> {
        check_dims(self.name(), x, y)?;
        let epsilon = self.epsilon;
        let start = least_squares(self.name(), x, y)?;
        irls(self.name(), x, y, start, self.max_iter, self.tol, |residual| {
            let scale = robust_scale(residual);
            residual.map(|r| {
                let z = (r / scale).abs();
                if z <= epsilon {
                    1.0
                } else {
                    epsilon / z
                }
            })
        })
    }
}

fn robust_scale(residual: &DVector<f64>) -> f64 {
    let mut abs: Vec<f64> = residual.iter().map(|r| r.abs()).collect();
    (MAD_TO_SIGMA * median(&mut abs)).max(SCALE_FLOOR)
}
