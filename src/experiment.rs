//! Full-factorial Monte Carlo driver.
//!
//! The grid `gammas x rhos x dfs x snrs x replicates` is walked in that
//! nesting order. One top-level generator hands each draw its own sub-seed,
//! so the whole study replays from a single seed and any single draw replays
//! from its sub-seed alone.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::methods::{build_method, RegressionMethod};
use crate::metrics::{compute_mse, record_result, EstimationResult};
use crate::sim::{simulate_dataset, SimulationParameters, TailModel};

/// Sub-seeds are drawn uniformly from `[0, SUB_SEED_BOUND)`.
pub const SUB_SEED_BOUND: u64 = 1_000_000_000;

/// One (gamma, rho, df, snr, replicate) combination. `rep` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub gamma: f64,
    pub rho: f64,
    pub tail: TailModel,
    pub snr: f64,
    pub rep: usize,
}

impl GridPoint {
    pub fn parameters(&self, n: usize, seed: Option<u64>) -> Result<SimulationParameters> {
        SimulationParameters::new(n, self.gamma, self.rho, self.tail, self.snr, seed)
    }

    /// First replicate of a (gamma, rho, df, snr) cell.
    pub fn opens_cell(&self) -> bool {
        self.rep == 1
    }
}

/// Lazy walk over the Cartesian product of a config's grids.
///
/// Cloning restarts from the clone's position; the sequence is finite and its
/// length is known up front.
#[derive(Debug, Clone)]
pub struct GridPoints<'a> {
    cfg: &'a ExperimentConfig,
    next: usize,
    total: usize,
}

impl<'a> GridPoints<'a> {
    pub fn new(cfg: &'a ExperimentConfig) -> Self {
        Self {
            cfg,
            next: 0,
            total: cfg.total_draws(),
        }
    }

    fn point_at(&self, index: usize) -> GridPoint {
        let cfg = self.cfg;
        let mut rest = index;
        let rep = rest % cfg.reps;
        rest /= cfg.reps;
        let snr = rest % cfg.snrs.len();
        rest /= cfg.snrs.len();
        let df = rest % cfg.dfs.len();
        rest /= cfg.dfs.len();
        let rho = rest % cfg.rhos.len();
        rest /= cfg.rhos.len();

        GridPoint {
            gamma: cfg.gammas[rest],
            rho: cfg.rhos[rho],
            tail: cfg.dfs[df],
            snr: cfg.snrs[snr],
            rep: rep + 1,
        }
    }
}

impl Iterator for GridPoints<'_> {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.next >= self.total {
            return None;
        }
        let point = self.point_at(self.next);
        self.next += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for GridPoints<'_> {}

/// All result rows of a run, in generation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<EstimationResult>,
}

impl ResultTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: EstimationResult) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[EstimationResult] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<EstimationResult> {
        self.rows
    }
}

impl From<Vec<EstimationResult>> for ResultTable {
    fn from(rows: Vec<EstimationResult>) -> Self {
        Self { rows }
    }
}

/// Simulate one grid point from its sub-seed and score every method on it.
pub fn run_grid_point(
    point: &GridPoint,
    n: usize,
    sub_seed: u64,
    methods: &[Box<dyn RegressionMethod>],
) -> Result<Vec<EstimationResult>> {
    let params = point.parameters(n, Some(sub_seed))?;
    let data = simulate_dataset(&params)?;
    debug!(
        "gamma={} rho={} df={} snr={} rep={} seed={} sigma={:.6}",
        point.gamma, point.rho, point.tail, point.snr, point.rep, sub_seed, data.sigma
    );

    let mut rows = Vec::with_capacity(methods.len());
    for method in methods {
        let fit = method.fit(&data.x, &data.y)?;
        if !fit.converged {
            warn!(
                "{} hit its iteration cap ({}) without converging at gamma={} rho={} df={} snr={} rep={} seed={}",
                method.name(),
                fit.iterations,
                point.gamma,
                point.rho,
                point.tail,
                point.snr,
                point.rep,
                sub_seed
            );
        }
        let mse = compute_mse(&fit.coefficients, &data.beta)?;
        rows.push(record_result(method.name(), &params, point.rep, mse));
    }
    Ok(rows)
}

/// Run the whole study. The first failing draw aborts the run and no table
/// is returned.
pub fn run_experiment(cfg: &ExperimentConfig) -> Result<ResultTable> {
    cfg.validate()?;

    let settings = cfg.method_settings();
    let methods = cfg
        .resolved_methods()?
        .into_iter()
        .map(|name| build_method(name, &settings))
        .collect::<Result<Vec<_>>>()?;

    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let mut table = ResultTable::with_capacity(cfg.total_draws() * methods.len());

    for point in GridPoints::new(cfg) {
        if point.opens_cell() {
            info!(
                "cell gamma={} rho={} df={} snr={} ({} reps)",
                point.gamma, point.rho, point.tail, point.snr, cfg.reps
            );
        }
        let sub_seed = rng.gen_range(0..SUB_SEED_BOUND);
        for row in run_grid_point(&point, cfg.n, sub_seed, &methods)? {
            table.push(row);
        }
    }

    info!("simulation finished with {} rows", table.len());
    Ok(table)
}
