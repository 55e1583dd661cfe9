use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::{ReaderBuilder, WriterBuilder};
use log::info;
use serde::Serialize;

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::experiment::ResultTable;
use crate::metrics::{EstimationResult, SummaryRow};

pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

pub const RESULT_COLUMNS: [&str; 9] = ["n", "p", "gamma", "rho", "df", "snr", "rep", "method", "mse"];

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub schema_version: String,
    pub crate_version: String,
    pub created_utc: String,
    pub rows: usize,
    pub results_csv: PathBuf,
    pub summary_csv: Option<PathBuf>,
    pub figures: Vec<PathBuf>,
    pub config: ExperimentConfig,
}

impl Manifest {
    pub fn new(config: &ExperimentConfig, rows: usize, results_csv: &Path) -> Self {
        Self {
            schema_version: OUTPUT_SCHEMA_VERSION.to_string(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_utc: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            rows,
            results_csv: results_csv.to_path_buf(),
            summary_csv: None,
            figures: Vec::new(),
            config: config.clone(),
        }
    }
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write the result table as CSV: a header row, then one row per result in
/// [`RESULT_COLUMNS`] order.
pub fn write_results_csv(path: &Path, table: &ResultTable) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;

    wtr.write_record(RESULT_COLUMNS)?;
    for row in table.rows() {
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    info!("wrote {} result rows to {}", table.len(), path.display());
    Ok(())
}

pub fn read_results_csv(path: &Path) -> Result<ResultTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let rows = rdr
        .deserialize::<EstimationResult>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ResultTable::from(rows))
}

pub fn write_summary_csv(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!("wrote {} summary rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_manifest_json(outdir: &Path, manifest: &Manifest) -> Result<PathBuf> {
    fs::create_dir_all(outdir)?;
    let path = outdir.join("manifest.json");
    let payload = serde_json::to_string_pretty(manifest)?;
    fs::write(&path, payload)?;
    info!("wrote manifest to {}", path.display());
    Ok(path)
}
