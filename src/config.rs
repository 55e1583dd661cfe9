use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RobregError};
use crate::methods::{canonical_method_name, MethodSettings, METHOD_ORDER};
use crate::sim::{feature_count, TailModel};

pub const DEFAULT_OUT_PATH: &str = "results/raw/simulation_results.csv";

/// Settings of one Monte Carlo study.
///
/// Loaded from TOML; any key left out keeps its default. `dfs` entries are
/// numbers or the string `"inf"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub n: usize,
    pub gammas: Vec<f64>,
    pub rhos: Vec<f64>,
    pub dfs: Vec<TailModel>,
    pub snrs: Vec<f64>,
    pub reps: usize,
    pub seed: u64,
    pub methods: Vec<String>,
    pub huber_epsilon: f64,
    pub huber_max_iter: usize,
    pub lad_max_iter: usize,
    pub tol: f64,
    pub out_path: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n: 200,
            gammas: vec![0.2, 0.5, 0.8],
            rhos: vec![0.1, 0.5, 0.9],
            dfs: vec![
                TailModel::StudentT { df: 1.0 },
                TailModel::StudentT { df: 2.0 },
                TailModel::StudentT { df: 3.0 },
                TailModel::StudentT { df: 20.0 },
                TailModel::Gaussian,
            ],
            snrs: vec![1.0, 5.0, 10.0],
            reps: 5,
            seed: 123,
            methods: METHOD_ORDER.iter().map(|m| m.to_string()).collect(),
            huber_epsilon: 1.35,
            huber_max_iter: 1000,
            lad_max_iter: 1000,
            tol: 1e-8,
            out_path: PathBuf::from(DEFAULT_OUT_PATH),
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: ExperimentConfig = toml::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(invalid("n must be > 0"));
        }
        if self.reps == 0 {
            return Err(invalid("reps must be > 0"));
        }
        if self.gammas.is_empty() || self.rhos.is_empty() || self.dfs.is_empty() || self.snrs.is_empty() {
            return Err(invalid("gammas, rhos, dfs and snrs must all be non-empty"));
        }
        for &gamma in &self.gammas {
            feature_count(self.n, gamma)?;
        }
        if self.rhos.iter().any(|rho| !rho.is_finite()) {
            return Err(invalid("rhos must be finite"));
        }
        if let Some(snr) = self.snrs.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(RobregError::InvalidSnr(*snr));
        }
        if self.methods.is_empty() {
            return Err(invalid("methods list cannot be empty"));
        }
        for name in &self.methods {
            canonical_method_name(name)?;
        }
        if !(self.huber_epsilon.is_finite() && self.huber_epsilon >= 1.0) {
            return Err(invalid("huber_epsilon must be >= 1"));
        }
        if self.huber_max_iter == 0 || self.lad_max_iter == 0 {
            return Err(invalid("huber_max_iter and lad_max_iter must be > 0"));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(invalid("tol must be > 0"));
        }
        Ok(())
    }

    /// Method names in registry spelling, in configured order, without
    /// duplicates.
    pub fn resolved_methods(&self) -> Result<Vec<&'static str>> {
        let mut out = Vec::with_capacity(self.methods.len());
        for raw in &self.methods {
            let name = canonical_method_name(raw)?;
            if !out.contains(&name) {
                out.push(name);
            }
        }
        Ok(out)
    }

    pub fn method_settings(&self) -> MethodSettings {
        MethodSettings {
            huber_epsilon: self.huber_epsilon,
            huber_max_iter: self.huber_max_iter,
            lad_max_iter: self.lad_max_iter,
            tol: self.tol,
        }
    }

    /// Number of grid cells times replicates.
    pub fn total_draws(&self) -> usize {
        self.gammas.len() * self.rhos.len() * self.dfs.len() * self.snrs.len() * self.reps
    }
}

fn invalid(msg: &str) -> RobregError {
    RobregError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_full_study() {
        let cfg = ExperimentConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.total_draws(), 3 * 3 * 5 * 3 * 5);
        assert_eq!(cfg.resolved_methods().unwrap(), vec!["OLS", "LAD", "Huber"]);
        assert_eq!(cfg.out_path, PathBuf::from(DEFAULT_OUT_PATH));
    }

    #[test]
    fn toml_accepts_numeric_and_named_tails() {
        let raw = r#"
            n = 50
            gammas = [0.5]
            dfs = [1, 2.5, "inf"]
            methods = ["ols", "huber"]
        "#;
        let cfg: ExperimentConfig = toml::from_str(raw).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.n, 50);
        assert_eq!(
            cfg.dfs,
            vec![
                TailModel::StudentT { df: 1.0 },
                TailModel::StudentT { df: 2.5 },
                TailModel::Gaussian
            ]
        );
        assert_eq!(cfg.rhos, vec![0.1, 0.5, 0.9]);
        assert_eq!(cfg.resolved_methods().unwrap(), vec!["OLS", "Huber"]);
    }

    #[test]
    fn toml_rejects_non_positive_df() {
        let raw = "dfs = [0]";
        assert!(toml::from_str::<ExperimentConfig>(raw).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let cases: Vec<Box<dyn Fn(&mut ExperimentConfig)>> = vec![
            Box::new(|c| c.n = 0),
            Box::new(|c| c.reps = 0),
            Box::new(|c| c.gammas.clear()),
            Box::new(|c| c.gammas = vec![0.001]),
            Box::new(|c| c.snrs = vec![5.0, 0.0]),
            Box::new(|c| c.rhos = vec![f64::NAN]),
            Box::new(|c| c.methods = vec!["Ridge".to_string()]),
            Box::new(|c| c.methods.clear()),
            Box::new(|c| c.tol = 0.0),
        ];
        for mutate in cases {
            let mut cfg = ExperimentConfig::default();
            mutate(&mut cfg);
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = ExperimentConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: ExperimentConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
