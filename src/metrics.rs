use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::error::{Result, RobregError};
use crate::sim::{SimulationParameters, TailModel};

/// One estimator's accuracy on one simulated dataset.
///
/// Field order is the column order of the result table.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub n: usize,
    pub p: usize,
    pub gamma: f64,
    pub rho: f64,
    #[serde_as(as = "DisplayFromStr")]
    pub df: TailModel,
    pub snr: f64,
    pub rep: usize,
    pub method: String,
    pub mse: f64,
}

/// Mean squared error between estimated and true coefficients.
pub fn compute_mse(beta_hat: &DVector<f64>, beta_true: &DVector<f64>) -> Result<f64> {
    if beta_hat.len() != beta_true.len() {
        return Err(RobregError::DimensionMismatch {
            context: "estimated vs true coefficients",
            expected: beta_true.len(),
            got: beta_hat.len(),
        });
    }
    if beta_true.is_empty() {
        return Ok(0.0);
    }
    let diff = beta_hat - beta_true;
    Ok(diff.norm_squared() / diff.len() as f64)
}

pub fn record_result(
    method: &str,
    params: &SimulationParameters,
    rep: usize,
    mse: f64,
) -> EstimationResult {
    EstimationResult {
        n: params.n,
        p: params.p,
        gamma: params.gamma,
        rho: params.rho,
        df: params.tail,
        snr: params.snr,
        rep,
        method: method.to_string(),
        mse,
    }
}

/// Mean MSE of one (method, gamma, snr, df) cell, pooled over rho and
/// replicates.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub method: String,
    pub gamma: f64,
    pub snr: f64,
    #[serde_as(as = "DisplayFromStr")]
    pub df: TailModel,
    pub mean_mse: f64,
    pub count: usize,
}

#[derive(Debug, Clone)]
struct CellAgg {
    method: String,
    gamma: f64,
    snr: f64,
    df: TailModel,
    mse_sum: f64,
    count: usize,
}

/// Group results by (method, gamma, snr, df) and average the MSE.
///
/// Methods keep their order of first appearance; within a method cells are
/// sorted by gamma, snr, then df with the Gaussian tail last.
pub fn summarize(rows: &[EstimationResult]) -> Vec<SummaryRow> {
    let mut method_order: Vec<&str> = Vec::new();
    let mut aggs: Vec<CellAgg> = Vec::new();

    for row in rows {
        if !method_order.contains(&row.method.as_str()) {
            method_order.push(row.method.as_str());
        }

        let existing = aggs.iter_mut().find(|agg| {
            agg.method == row.method && agg.gamma == row.gamma && agg.snr == row.snr && agg.df == row.df
        });
        match existing {
            Some(agg) => {
                agg.mse_sum += row.mse;
                agg.count += 1;
            }
            None => aggs.push(CellAgg {
                method: row.method.clone(),
                gamma: row.gamma,
                snr: row.snr,
                df: row.df,
                mse_sum: row.mse,
                count: 1,
            }),
        }
    }

    let rank = |method: &str| method_order.iter().position(|m| *m == method).unwrap_or(usize::MAX);
    aggs.sort_by(|a, b| {
        rank(&a.method)
            .cmp(&rank(&b.method))
            .then(a.gamma.total_cmp(&b.gamma))
            .then(a.snr.total_cmp(&b.snr))
            .then(a.df.df().total_cmp(&b.df.df()))
    });

    aggs.into_iter()
        .map(|agg| SummaryRow {
            mean_mse: agg.mse_sum / agg.count as f64,
            method: agg.method,
            gamma: agg.gamma,
            snr: agg.snr,
            df: agg.df,
            count: agg.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(method: &str, gamma: f64, df: TailModel, rho: f64, mse: f64) -> EstimationResult {
        EstimationResult {
            n: 100,
            p: (gamma * 100.0) as usize,
            gamma,
            rho,
            df,
            snr: 5.0,
            rep: 1,
            method: method.to_string(),
            mse,
        }
    }

    #[test]
    fn mse_is_mean_of_squared_differences() {
        let hat = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let truth = DVector::from_vec(vec![0.0, 2.0, 5.0]);
        let mse = compute_mse(&hat, &truth).unwrap();
        assert!((mse - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn mse_rejects_length_mismatch() {
        let hat = DVector::from_vec(vec![1.0, 2.0]);
        let truth = DVector::from_vec(vec![1.0]);
        assert!(compute_mse(&hat, &truth).is_err());
    }

    #[test]
    fn record_flattens_parameters() {
        let params =
            SimulationParameters::new(200, 0.5, 0.9, TailModel::StudentT { df: 3.0 }, 10.0, Some(4))
                .unwrap();
        let r = record_result("LAD", &params, 2, 0.25);
        assert_eq!(r.p, 100);
        assert_eq!(r.rep, 2);
        assert_eq!(r.method, "LAD");
        assert_eq!(r.df, TailModel::StudentT { df: 3.0 });
    }

    #[test]
    fn summary_pools_rho_and_orders_cells() {
        let t3 = TailModel::StudentT { df: 3.0 };
        let rows = vec![
            row("OLS", 0.5, TailModel::Gaussian, 0.1, 1.0),
            row("OLS", 0.5, t3, 0.1, 2.0),
            row("LAD", 0.5, t3, 0.1, 4.0),
            row("OLS", 0.5, t3, 0.9, 4.0),
            row("OLS", 0.2, TailModel::Gaussian, 0.9, 8.0),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.len(), 4);

        assert_eq!(summary[0].method, "OLS");
        assert_eq!(summary[0].gamma, 0.2);
        assert_eq!(summary[1].df, t3);
        assert_eq!(summary[1].mean_mse, 3.0);
        assert_eq!(summary[1].count, 2);
        assert_eq!(summary[2].df, TailModel::Gaussian);
        assert_eq!(summary[3].method, "LAD");
    }
}
