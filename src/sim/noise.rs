use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, StudentT};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RobregError};

/// Floor on `sigma^2` so a vanishing signal still gets a strictly positive
/// noise scale.
pub const SIGMA2_FLOOR: f64 = 1e-12;

/// Tail model of the additive noise.
///
/// Written in configs and result tables as the degrees of freedom, with
/// `inf` standing for the Gaussian limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TailRepr", into = "TailRepr")]
pub enum TailModel {
    Gaussian,
    StudentT { df: f64 },
}

impl TailModel {
    /// Map a degrees-of-freedom value onto a tail model; `+inf` is Gaussian.
    pub fn from_df(df: f64) -> Result<Self> {
        if df == f64::INFINITY {
            Ok(TailModel::Gaussian)
        } else if df.is_finite() && df > 0.0 {
            Ok(TailModel::StudentT { df })
        } else {
            Err(RobregError::InvalidTail(df))
        }
    }

    pub fn df(&self) -> f64 {
        match self {
            TailModel::Gaussian => f64::INFINITY,
            TailModel::StudentT { df } => *df,
        }
    }

    pub fn is_gaussian(&self) -> bool {
        matches!(self, TailModel::Gaussian)
    }
}

impl fmt::Display for TailModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TailModel::Gaussian => f.write_str("inf"),
            TailModel::StudentT { df } => write!(f, "{df}"),
        }
    }
}

impl FromStr for TailModel {
    type Err = RobregError;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "inf" | "+inf" | "infinity" | "gaussian" => Ok(TailModel::Gaussian),
            _ => {
                let df: f64 = trimmed.parse().map_err(|_| {
                    RobregError::InvalidConfig(format!("cannot parse df value '{raw}'"))
                })?;
                TailModel::from_df(df)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TailRepr {
    Df(f64),
    Named(String),
}

impl TryFrom<TailRepr> for TailModel {
    type Error = RobregError;

    fn try_from(repr: TailRepr) -> Result<Self> {
        match repr {
            TailRepr::Df(df) => TailModel::from_df(df),
            TailRepr::Named(name) => name.parse(),
        }
    }
}

impl From<TailModel> for TailRepr {
    fn from(tail: TailModel) -> Self {
        match tail {
            TailModel::Gaussian => TailRepr::Named("inf".to_string()),
            TailModel::StudentT { df } => TailRepr::Df(df),
        }
    }
}

/// Noise scale that puts the realized signal at `target_snr`.
///
/// The signal energy is the raw sum of squares `(X beta)^T (X beta)`, not a
/// per-sample variance, and `sigma^2` is floored at [`SIGMA2_FLOOR`].
pub fn compute_sigma_for_snr(x: &DMatrix<f64>, beta: &DVector<f64>, target_snr: f64) -> Result<f64> {
    if !(target_snr.is_finite() && target_snr > 0.0) {
        return Err(RobregError::InvalidSnr(target_snr));
    }
    if x.ncols() != beta.len() {
        return Err(RobregError::DimensionMismatch {
            context: "design columns vs coefficients",
            expected: x.ncols(),
            got: beta.len(),
        });
    }

    let signal = x * beta;
    let signal_var = signal.dot(&signal);
    let sigma2 = signal_var / target_snr;
    Ok(sigma2.max(SIGMA2_FLOOR).sqrt())
}

/// Draw `n` noise values with scale `sigma` under `tail`.
///
/// Student-t draws with `df > 2` are shrunk by the theoretical standard
/// deviation `sqrt(df / (df - 2))`. For `df <= 2` the variance does not
/// exist, so the draws are rescaled by their own population standard
/// deviation instead; the sample then has spread exactly `sigma`.
pub fn sample_error_vector<R: Rng + ?Sized>(
    n: usize,
    tail: TailModel,
    sigma: f64,
    rng: &mut R,
) -> Result<DVector<f64>> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(RobregError::InvalidSigma(sigma));
    }

    let df = match tail {
        TailModel::Gaussian => {
            let draws: Vec<f64> = (0..n)
                .map(|_| rng.sample::<f64, _>(StandardNormal) * sigma)
                .collect();
            return Ok(DVector::from_vec(draws));
        }
        TailModel::StudentT { df } => df,
    };

    let dist = StudentT::new(df).map_err(|_| RobregError::InvalidTail(df))?;
    let draws: Vec<f64> = (0..n).map(|_| dist.sample(&mut *rng)).collect();

    let scale = if df > 2.0 {
        sigma / (df / (df - 2.0)).sqrt()
    } else {
        let spread = population_std(&draws);
        if !(spread.is_finite() && spread > 0.0) {
            return Err(RobregError::DegenerateNoise { n });
        }
        sigma / spread
    };

    Ok(DVector::from_iterator(n, draws.into_iter().map(|t| t * scale)))
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let len = values.len() as f64;
    let mean = values.iter().sum::<f64>() / len;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / len).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn variance(v: &DVector<f64>) -> f64 {
        let std = population_std(v.as_slice());
        std * std
    }

    #[test]
    fn sigma_matches_target_snr() {
        let x = DMatrix::from_row_slice(2, 2, &[6.0, 0.0, 0.0, 8.0]);
        let beta = DVector::from_vec(vec![1.0, 1.0]);
        let sigma = compute_sigma_for_snr(&x, &beta, 10.0).unwrap();
        assert!((sigma - 10.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn zero_signal_hits_floor() {
        let x = DMatrix::from_element(5, 3, 1.0);
        let beta = DVector::zeros(3);
        let sigma = compute_sigma_for_snr(&x, &beta, 5.0).unwrap();
        assert_eq!(sigma, SIGMA2_FLOOR.sqrt());
        assert!(sigma > 0.0);
    }

    #[test]
    fn non_positive_snr_is_rejected() {
        let x = DMatrix::from_element(3, 2, 1.0);
        let beta = DVector::from_element(2, 1.0);
        for snr in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                compute_sigma_for_snr(&x, &beta, snr),
                Err(RobregError::InvalidSnr(_))
            ));
        }
    }

    #[test]
    fn gaussian_spread_converges_to_sigma() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let noise = sample_error_vector(100_000, TailModel::Gaussian, 2.0, &mut rng).unwrap();
        let std = population_std(noise.as_slice());
        assert!((std - 2.0).abs() < 0.03, "std = {std}");
    }

    #[test]
    fn student_t_variance_is_corrected() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let tail = TailModel::StudentT { df: 10.0 };
        let noise = sample_error_vector(200_000, tail, 3.0, &mut rng).unwrap();
        let var = variance(&noise);
        assert!((var - 9.0).abs() < 0.4, "var = {var}");
    }

    #[test]
    fn heavy_tails_use_empirical_spread() {
        for df in [1.0, 2.0] {
            let mut rng = ChaCha8Rng::seed_from_u64(9);
            let noise =
                sample_error_vector(5_000, TailModel::StudentT { df }, 1.5, &mut rng).unwrap();
            let std = population_std(noise.as_slice());
            assert!((std - 1.5).abs() < 1e-9, "df={df} std={std}");
        }
    }

    #[test]
    fn invalid_sigma_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        for sigma in [0.0, -2.0, f64::INFINITY] {
            assert!(matches!(
                sample_error_vector(10, TailModel::Gaussian, sigma, &mut rng),
                Err(RobregError::InvalidSigma(_))
            ));
        }
    }

    #[test]
    fn single_heavy_tailed_draw_cannot_be_rescaled() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let err = sample_error_vector(1, TailModel::StudentT { df: 1.0 }, 1.0, &mut rng);
        assert!(matches!(err, Err(RobregError::DegenerateNoise { n: 1 })));
    }

    #[test]
    fn tail_model_parses_and_prints() {
        assert_eq!("inf".parse::<TailModel>().unwrap(), TailModel::Gaussian);
        assert_eq!(
            "3".parse::<TailModel>().unwrap(),
            TailModel::StudentT { df: 3.0 }
        );
        assert_eq!(TailModel::StudentT { df: 20.0 }.to_string(), "20");
        assert_eq!(TailModel::StudentT { df: 2.5 }.to_string(), "2.5");
        assert_eq!(TailModel::Gaussian.to_string(), "inf");
        assert!("0".parse::<TailModel>().is_err());
        assert!("-3".parse::<TailModel>().is_err());
        assert!("heavy".parse::<TailModel>().is_err());
    }

    #[test]
    fn from_df_maps_infinity_to_gaussian() {
        assert_eq!(TailModel::from_df(f64::INFINITY).unwrap(), TailModel::Gaussian);
        assert!(TailModel::from_df(f64::NAN).is_err());
        assert!(TailModel::from_df(f64::NEG_INFINITY).is_err());
        assert_eq!(TailModel::Gaussian.df(), f64::INFINITY);
    }
}
