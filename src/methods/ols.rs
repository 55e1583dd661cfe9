use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::methods::{check_dims, least_squares, MethodFit, RegressionMethod};

/// Ordinary least squares; rank-deficient designs get the minimum-norm fit.
#[derive(Debug, Default, Clone, Copy)]
pub struct OlsMethod;

impl RegressionMethod for OlsMethod {
    fn name(&self) -> &'static str {
        "OLS"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<MethodFit> {
        check_dims(self.name(), x, y)?;
        least_squares(self.name(), x, y).map(MethodFit::closed_form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::test_support::noiseless_problem;

    #[test]
    fn exact_on_noiseless_data() {
        let (x, y, beta) = noiseless_problem(40, 6, 21);
        let est = OlsMethod.fit(&x, &y).unwrap().coefficients;
        assert!((est - beta).norm() < 1e-10);
    }

    #[test]
    fn wide_design_gets_minimum_norm_solution() {
        let (x, y, _) = noiseless_problem(4, 8, 22);
        let est = OlsMethod.fit(&x, &y).unwrap().coefficients;
        assert!((&x * &est - &y).norm() < 1e-8);

        let pinv = x.clone().pseudo_inverse(1e-12).unwrap();
        assert!((pinv * &y - est).norm() < 1e-8);
    }
}
