use thiserror::Error;

#[derive(Debug, Error)]
pub enum RobregError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown method '{name}': choose one of {valid}")]
    UnknownMethod { name: String, valid: String },
    #[error("AR(1) covariance with p={p}, rho={rho} is not positive definite")]
    NotPositiveDefinite { p: usize, rho: f64 },
    #[error("target snr must be a positive finite number, got {0}")]
    InvalidSnr(f64),
    #[error("noise scale sigma must be a positive finite number, got {0}")]
    InvalidSigma(f64),
    #[error("degrees of freedom must be positive (or inf for gaussian), got {0}")]
    InvalidTail(f64),
    #[error("cannot rescale {n} student-t draws with zero spread")]
    DegenerateNoise { n: usize },
    #[error("{context} dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{method} solver failed: {reason}")]
    Solver { method: &'static str, reason: String },
    #[error("plot error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, RobregError>;
