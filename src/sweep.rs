//! Parameter sweeps over many independent runs.
//!
//! Every combination runs on the blocking pool; runs share nothing, so the
//! only ordering that matters is the seed assigned to each one.

use crate::{
    config::{Algorithm, Params, SimulationConfig},
    error::{SimError, SimResult},
    failure::{FailureKind, FailureModel},
    simulation::Simulation,
    topology::Topology,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::info;

/// CSV header matching [`SweepRecord`]'s columns.
pub const CSV_HEADER: &str =
    "network_size,algorithm,topology,failure_model,failure_rate,convergence_time,converged";

/// Cartesian product of run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// Population sizes.
    pub sizes: Vec<usize>,

    /// Topologies.
    pub topologies: Vec<Topology>,

    /// Algorithms.
    pub algorithms: Vec<Algorithm>,

    /// Failure models, each with its own rate.
    pub failures: Vec<FailureModel>,

    /// Constants shared by every run.
    pub params: Params,
}

impl SweepPlan {
    /// Plan over `sizes` with every topology and algorithm and no failures.
    pub fn new(sizes: Vec<usize>) -> Self {
        Self {
            sizes,
            topologies: Topology::ALL.to_vec(),
            algorithms: Algorithm::ALL.to_vec(),
            failures: vec![FailureModel::None],
            params: Params::default(),
        }
    }

    /// Replaces the failure axis with one model at several rates.
    pub fn with_failure_rates(mut self, kind: FailureKind, rates: &[f64]) -> SimResult<Self> {
        self.failures = if kind == FailureKind::None {
            vec![FailureModel::None]
        } else {
            rates
                .iter()
                .map(|&rate| FailureModel::new(kind, rate))
                .collect::<SimResult<_>>()?
        };
        Ok(self)
    }

    /// Expands the plan into validated configurations, sizes outermost.
    pub fn configs(&self) -> SimResult<Vec<SimulationConfig>> {
        let mut configs = Vec::new();
        for &size in &self.sizes {
            for &algorithm in &self.algorithms {
                for &topology in &self.topologies {
                    for &failure in &self.failures {
                        let config = SimulationConfig::new(size, topology, algorithm)?
                            .with_failure(failure)?
                            .with_params(self.params.clone())?;
                        configs.push(config);
                    }
                }
            }
        }
        Ok(configs)
    }
}

/// One row of sweep output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub network_size: usize,
    pub algorithm: Algorithm,
    pub topology: Topology,
    pub failure_model: FailureKind,
    pub failure_rate: f64,

    /// Rounds taken, or the round cap when the run did not converge.
    pub convergence_time: u64,
    pub converged: bool,
}

impl SweepRecord {
    /// Renders the record as a CSV line without a trailing newline.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.network_size,
            self.algorithm,
            self.topology,
            self.failure_model,
            self.failure_rate,
            self.convergence_time,
            self.converged
        )
    }
}

/// Runs every configuration of `plan` concurrently.
///
/// Run `i` is seeded with `base_seed + i`, so the same plan and base seed
/// always produce the same records. Records come back in plan order.
pub async fn run_sweep(plan: &SweepPlan, base_seed: u64) -> SimResult<Vec<SweepRecord>> {
    let configs = plan.configs()?;
    info!(runs = configs.len(), base_seed, "Starting sweep");

    let mut handles = Vec::with_capacity(configs.len());
    for (index, config) in configs.into_iter().enumerate() {
        let seed = base_seed.wrapping_add(index as u64);
        handles.push(tokio::task::spawn_blocking(move || {
            let result = Simulation::new(config.clone()).run_with_seed(seed)?;
            Ok::<_, SimError>(SweepRecord {
                network_size: config.num_nodes,
                algorithm: config.algorithm,
                topology: config.topology,
                failure_model: config.failure.kind(),
                failure_rate: config.failure.rate(),
                convergence_time: result.rounds_taken,
                converged: result.converged,
            })
        }));
    }

    let mut records = Vec::with_capacity(handles.len());
    for handle in handles {
        records.push(handle.await??);
    }
    info!(runs = records.len(), "Sweep finished");
    Ok(records)
}

/// Writes `records` as CSV with a header line.
pub fn write_csv(records: &[SweepRecord], mut out: impl Write) -> SimResult<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for record in records {
        writeln!(out, "{}", record.to_csv_row())?;
    }
    out.flush()?;
    Ok(())
}
