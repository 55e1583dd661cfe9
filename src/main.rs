use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use robreg_mc::io::{write_manifest_json, write_results_csv, write_summary_csv, Manifest};
use robreg_mc::{run_experiment, summarize, ExperimentConfig};

#[derive(Debug, Parser)]
#[command(name = "robreg-mc")]
#[command(version, about = "Monte Carlo study of OLS, LAD and Huber regression under heavy-tailed noise")]
struct Cli {
    /// TOML file with experiment settings; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sample size per simulated dataset
    #[arg(long)]
    n: Option<usize>,

    /// Replicates per grid cell
    #[arg(long)]
    reps: Option<usize>,

    /// Top-level random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated estimators, e.g. "OLS,Huber"
    #[arg(long)]
    methods: Option<String>,

    /// Destination of the result table
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for the MSE-vs-df figures
    #[arg(long, default_value = "results/figures")]
    figures: PathBuf,

    /// Skip figure rendering
    #[arg(long, default_value_t = false)]
    no_plots: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

fn parse_methods(raw: &str) -> Result<Vec<String>> {
    let methods: Vec<String> = raw
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if methods.is_empty() {
        bail!("methods list cannot be empty");
    }
    Ok(methods)
}

fn resolve_config(cli: &Cli) -> Result<ExperimentConfig> {
    let mut cfg = match &cli.config {
        Some(path) => ExperimentConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };

    if let Some(v) = cli.n {
        cfg.n = v;
    }
    if let Some(v) = cli.reps {
        cfg.reps = v;
    }
    if let Some(v) = cli.seed {
        cfg.seed = v;
    }
    if let Some(raw) = cli.methods.as_deref() {
        cfg.methods = parse_methods(raw)?;
    }
    if let Some(v) = &cli.out {
        cfg.out_path = v.clone();
    }

    cfg.validate().context("invalid experiment configuration")?;
    Ok(cfg)
}

fn summary_path_for(out_path: &Path) -> PathBuf {
    let stem = out_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "simulation_results".to_string());
    out_path.with_file_name(format!("{stem}_summary.csv"))
}

#[cfg(feature = "plots")]
fn render_figures(summary: &[robreg_mc::SummaryRow], dir: &Path) -> Result<Vec<PathBuf>> {
    robreg_mc::plot::plot_mse_vs_df(summary, dir)
        .with_context(|| format!("failed to render figures into {}", dir.display()))
}

#[cfg(not(feature = "plots"))]
fn render_figures(_summary: &[robreg_mc::SummaryRow], _dir: &Path) -> Result<Vec<PathBuf>> {
    log::warn!("built without the `plots` feature; skipping figures");
    Ok(Vec::new())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    if cli.print_config {
        print!("{}", toml::to_string(&cfg).context("failed to serialize config")?);
        return Ok(());
    }

    info!(
        "running {} draws x {} methods (n={}, seed={})",
        cfg.total_draws(),
        cfg.methods.len(),
        cfg.n,
        cfg.seed
    );
    let table = run_experiment(&cfg).context("simulation failed")?;

    write_results_csv(&cfg.out_path, &table)
        .with_context(|| format!("failed to write {}", cfg.out_path.display()))?;

    let summary = summarize(table.rows());
    let summary_path = summary_path_for(&cfg.out_path);
    write_summary_csv(&summary_path, &summary)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;

    let figures = if cli.no_plots {
        Vec::new()
    } else {
        render_figures(&summary, &cli.figures)?
    };

    let mut manifest = Manifest::new(&cfg, table.len(), &cfg.out_path);
    manifest.summary_csv = Some(summary_path);
    manifest.figures = figures;
    let manifest_dir = cfg
        .out_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    write_manifest_json(manifest_dir, &manifest).context("failed to write manifest")?;

    println!(
        "Saved results to {} ({} rows)",
        cfg.out_path.display(),
        table.len()
    );
    Ok(())
}
