use nalgebra::{DMatrix, DVector};

use crate::error::{Result, RobregError};

pub mod huber;
pub mod lad;
pub mod ols;

pub use huber::HuberMethod;
pub use lad::LadMethod;
pub use ols::OlsMethod;

/// Registered estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Ols,
    Lad,
    Huber,
}

impl MethodKind {
    pub const ALL: [MethodKind; 3] = [MethodKind::Ols, MethodKind::Lad, MethodKind::Huber];

    pub const fn name(self) -> &'static str {
        match self {
            MethodKind::Ols => "OLS",
            MethodKind::Lad => "LAD",
            MethodKind::Huber => "Huber",
        }
    }

    /// Resolve a user-supplied method name, in any case.
    pub fn parse(raw: &str) -> Result<Self> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RobregError::UnknownMethod {
                name: raw.to_string(),
                valid: METHOD_ORDER.join(", "),
            })
    }
}

pub const METHOD_ORDER: [&str; 3] = [
    MethodKind::Ols.name(),
    MethodKind::Lad.name(),
    MethodKind::Huber.name(),
];

/// Residuals below this magnitude are clamped before reweighting.
const RESIDUAL_FLOOR: f64 = 1e-8;

/// Coefficient estimate plus solver bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodFit {
    pub coefficients: DVector<f64>,
    /// Reweighting iterations spent; zero for closed-form fits.
    pub iterations: usize,
    /// False when an iterative solver stopped at its iteration cap.
    pub converged: bool,
}

impl MethodFit {
    pub fn closed_form(coefficients: DVector<f64>) -> Self {
        Self {
            coefficients,
            iterations: 0,
            converged: true,
        }
    }
}

/// A no-intercept linear regression estimator.
pub trait RegressionMethod {
    fn name(&self) -> &'static str;
    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<MethodFit>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodSettings {
    pub huber_epsilon: f64,
    pub huber_max_iter: usize,
    pub lad_max_iter: usize,
    pub tol: f64,
}

impl Default for MethodSettings {
    fn default() -> Self {
        Self {
            huber_epsilon: 1.35,
            huber_max_iter: 1000,
            lad_max_iter: 1000,
            tol: 1e-8,
        }
    }
}

/// Resolve a user-supplied method name (any case) to its registry spelling.
pub fn canonical_method_name(raw: &str) -> Result<&'static str> {
    MethodKind::parse(raw).map(MethodKind::name)
}

pub fn build_method(name: &str, settings: &MethodSettings) -> Result<Box<dyn RegressionMethod>> {
    let method: Box<dyn RegressionMethod> = match MethodKind::parse(name)? {
        MethodKind::Ols => Box::new(OlsMethod),
        MethodKind::Lad => Box::new(LadMethod::new(settings.lad_max_iter, settings.tol)),
        MethodKind::Huber => Box::new(HuberMethod::new(
            settings.huber_epsilon,
            settings.huber_max_iter,
            settings.tol,
        )),
    };
    Ok(method)
}

/// Fit `y ~ X` with the named method and return the coefficient estimate.
pub fn fit_model(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    method: &str,
    settings: &MethodSettings,
) -> Result<DVector<f64>> {
    build_method(method, settings)?
        .fit(x, y)
        .map(|fit| fit.coefficients)
}

pub(crate) fn check_dims(method: &'static str, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(RobregError::DimensionMismatch {
            context: "design rows vs response",
            expected: x.nrows(),
            got: y.len(),
        });
    }
    if x.ncols() == 0 || x.nrows() == 0 {
        return Err(RobregError::Solver {
            method,
            reason: format!("empty design {}x{}", x.nrows(), x.ncols()),
        });
    }
    Ok(())
}

/// Minimum-norm least squares through the SVD of `x`.
pub(crate) fn least_squares(
    method: &'static str,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
) -> Result<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let eps = s_max * x.nrows().max(x.ncols()) as f64 * f64::EPSILON;
    svd.solve(y, eps).map_err(|reason| RobregError::Solver {
        method,
        reason: reason.to_string(),
    })
}

/// Solve the row-weighted normal equations `X^T W X b = X^T W y`.
pub(crate) fn weighted_least_squares(
    method: &'static str,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    weights: &DVector<f64>,
) -> Result<DVector<f64>> {
    let mut xw = x.clone();
    for (mut row, &w) in xw.row_iter_mut().zip(weights.iter()) {
        row *= w;
    }
    let normal = x.tr_mul(&xw);
    let rhs = xw.tr_mul(y);

    if let Some(chol) = normal.clone().cholesky() {
        return Ok(chol.solve(&rhs));
    }
    least_squares(method, &normal, &rhs)
}

/// Iteratively reweighted least squares from `start`.
///
/// `reweight` maps the current residuals to row weights. Iteration stops once
/// `||step|| < tol * (1 + ||beta||)`, or after `max_iter` reweightings with
/// `converged` left false.
pub(crate) fn irls<F>(
    method: &'static str,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    start: DVector<f64>,
    max_iter: usize,
    tol: f64,
    mut reweight: F,
) -> Result<MethodFit>
where
    F: FnMut(&DVector<f64>) -> DVector<f64>,
{
    let mut beta = start;

    for iter in 1..=max_iter {
        let residual = y - x * &beta;
        let weights = reweight(&residual);
        let next = weighted_least_squares(method, x, y, &weights)?;
        if next.iter().any(|v| !v.is_finite()) {
            return Err(RobregError::Solver {
                method,
                reason: "non-finite coefficients during reweighting".to_string(),
            });
        }

        let step = (&next - &beta).norm();
        let scale = 1.0 + beta.norm();
        beta = next;
        if step < tol * scale {
            return Ok(MethodFit {
                coefficients: beta,
                iterations: iter,
                converged: true,
            });
        }
    }

    Ok(MethodFit {
        coefficients: beta,
        iterations: max_iter,
        converged: false,
    })
}

pub(crate) fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use nalgebra::{DMatrix, DVector};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, StandardNormal};

    pub fn noiseless_problem(n: usize, p: usize, seed: u64) -> (DMatrix<f64>, DVector<f64>, DVector<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let x = DMatrix::<f64>::from_fn(n, p, |_, _| StandardNormal.sample(&mut rng));
        let beta = DVector::from_fn(p, |i, _| i as f64 - 1.5);
        let y = &x * &beta;
        (x, y, beta)
    }

    /// Noiseless response with a handful of gross outliers.
    pub fn contaminated_problem(n: usize, p: usize, seed: u64) -> (DMatrix<f64>, DVector<f64>, DVector<f64>) {
        let (x, mut y, beta) = noiseless_problem(n, p, seed);
        for i in (0..n).step_by(10) {
            y[i] += 250.0;
        }
        (x, y, beta)
    }
}
