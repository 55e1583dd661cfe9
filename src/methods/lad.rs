use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::methods::{check_dims, irls, least_squares, MethodFit, RegressionMethod, RESIDUAL_FLOOR};

/// Smoothing shrink factor between continuation stages.
const SMOOTHING_SHRINK: f64 = 0.1;
/// Relative step tolerance of the intermediate (still smoothed) stages.
const STAGE_TOL: f64 = 1e-6;
/// Slack on the dual bound `|d_i| <= 1` of the optimality check.
const DUAL_SLACK: f64 = 1e-9;

/// Least absolute deviations (median regression, no penalty).
///
/// IRLS with weights `1 / max(|r_i|, delta)`, i.e. a Huber-smoothed L1 loss,
/// with `delta` shrunk from the OLS residual scale down to `1e-8`. After every
/// stage the `p` smallest residuals are taken as a basis: the exact basic
/// solution through them is returned as soon as its sign pattern admits dual
/// multipliers in `[-1, 1]`, which proves it minimizes the L1 loss.
///
/// Designs with `p >= n` are interpolated exactly by the minimum-norm least
/// squares fit, which is then a (non-unique) LAD solution.
#[derive(Debug, Clone, Copy)]
pub struct LadMethod {
    max_iter: usize,
    tol: f64,
}

impl LadMethod {
    pub fn new(max_iter: usize, tol: f64) -> Self {
        Self { max_iter, tol }
    }
}

impl RegressionMethod for LadMethod {
    fn name(&self) -> &'static str {
        "LAD"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<MethodFit> {
        check_dims(self.name(), x, y)?;
        let mut beta = least_squares(self.name(), x, y)?;
        if x.ncols() >= x.nrows() {
            return Ok(MethodFit::closed_form(beta));
        }

        let mean_abs = (y - x * &beta).lp_norm(1) / x.nrows() as f64;
        let mut delta = mean_abs.max(RESIDUAL_FLOOR);
        let mut iterations = 0;

        loop {
            if let Some(vertex) = certified_vertex(x, y, &beta) {
                return Ok(MethodFit {
                    coefficients: vertex,
                    iterations,
                    converged: true,
                });
            }

            let final_stage = delta <= RESIDUAL_FLOOR;
            let stage_tol = if final_stage { self.tol } else { self.tol.max(STAGE_TOL) };
            let stage = irls(
                self.name(),
                x,
                y,
                beta,
                self.max_iter - iterations,
                stage_tol,
                |residual| residual.map(|r| 1.0 / r.abs().max(delta)),
            )?;
            iterations += stage.iterations;
            beta = stage.coefficients;

            if !stage.converged {
                return Ok(MethodFit {
                    coefficients: beta,
                    iterations,
                    converged: false,
                });
            }
            if final_stage {
                let coefficients = certified_vertex(x, y, &beta).unwrap_or(beta);
                return Ok(MethodFit {
                    coefficients,
                    iterations,
                    converged: true,
                });
            }
            delta = (delta * SMOOTHING_SHRINK).max(RESIDUAL_FLOOR);
        }
    }
}

/// Basic solution through the `p` rows with the smallest residuals under
/// `beta`, if it passes the L1 optimality check.
///
/// With basis `B` and non-basic residual signs `s_N`, the basic solution is
/// optimal when `X_B^T d = -X_N^T s_N` has a solution with `|d|_inf <= 1`.
fn certified_vertex(x: &DMatrix<f64>, y: &DVector<f64>, beta: &DVector<f64>) -> Option<DVector<f64>> {
    let (n, p) = x.shape();
    let residual = y - x * beta;
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| residual[a].abs().total_cmp(&residual[b].abs()));
    let (basis, rest) = order.split_at(p);

    let x_b = x.select_rows(basis);
    let vertex = x_b.clone().lu().solve(&y.select_rows(basis))?;
    if vertex.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let x_n = x.select_rows(rest);
    let signs = (y.select_rows(rest) - &x_n * &vertex).map(|r| {
        if r > 0.0 {
            1.0
        } else if r < 0.0 {
            -1.0
        } else {
            0.0
        }
    });
    let dual = x_b.transpose().lu().solve(&(-x_n.tr_mul(&signs)))?;
    if dual.iter().any(|d| !(d.abs() <= 1.0 + DUAL_SLACK)) {
        return None;
    }

    let loss = (y - x * &vertex).lp_norm(1);
    let current = residual.lp_norm(1);
    (loss <= current + DUAL_SLACK * (1.0 + current)).then_some(vertex)
}
