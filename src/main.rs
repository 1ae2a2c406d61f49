//! Rumor CLI
//!
//! Runs a single gossip or push-sum simulation, or a sweep over many
//! configurations.
//!
//! # Example
//!
//! ```bash
//! # Rounds for push-sum on a 100-node imperfect grid
//! rumor run 100 imp3D push-sum
//!
//! # Gossip on a line with 20% node failures and a fixed seed
//! rumor run 50 line gossip node 0.2 --seed 42
//!
//! # Seed from the OS random generator
//! rumor run 100 full push-sum --entropy
//!
//! # Sweep every topology and algorithm into a CSV file
//! rumor sweep --sizes 10,50,100,500 --output convergence_data.csv
//! ```

use clap::{Args, Parser, Subcommand};
use rumor::{
    run_sweep, write_csv, ClockSeed, EntropySeed, FailureKind, FixedSeed, Params, SeedProvider, SimError,
    SimResult, Simulation, SimulationConfig, SweepPlan,
};
use std::{
    fs::File,
    io::{self, BufWriter},
    path::PathBuf,
    process::ExitCode,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Gossip and push-sum propagation simulator.
#[derive(Parser, Debug)]
#[command(name = "rumor")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one simulation and print the rounds taken.
    Run(RunArgs),

    /// Run a parameter sweep and emit CSV.
    Sweep(SweepArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Number of nodes
    num_nodes: String,

    /// Topology: full, line, 3D, imp3D
    topology: String,

    /// Algorithm: gossip, push-sum
    algorithm: String,

    /// Failure model: none, node, connection
    failure_model: Option<String>,

    /// Failure rate in [0, 1]
    failure_rate: Option<String>,

    /// Seed for reproducible runs. When omitted, the system clock is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Draw the seed from the OS-backed random generator instead of the clock
    #[arg(long, conflicts_with = "seed")]
    entropy: bool,

    /// JSON file overriding protocol parameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// Print the full result as JSON instead of the round count
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Network sizes
    #[arg(long, value_delimiter = ',', default_values_t = [10usize, 50, 100, 500])]
    sizes: Vec<usize>,

    /// Topologies (defaults to all)
    #[arg(long, value_delimiter = ',')]
    topologies: Vec<String>,

    /// Algorithms (defaults to all)
    #[arg(long, value_delimiter = ',')]
    algorithms: Vec<String>,

    /// Failure model applied to every run
    #[arg(long, default_value = "none")]
    failure_model: String,

    /// Failure rates swept for the failure model
    #[arg(long, value_delimiter = ',', default_values_t = [0.0f64])]
    failure_rates: Vec<f64>,

    /// Base seed; run i uses base + i. When omitted, the system clock is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Draw the base seed from the OS-backed random generator instead of the clock
    #[arg(long, conflicts_with = "seed")]
    entropy: bool,

    /// JSON file overriding protocol parameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// CSV destination. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only results.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,rumor=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Run(args) => run(args),
        Command::Sweep(args) => sweep(args).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_params(path: Option<&PathBuf>) -> SimResult<Params> {
    match path {
        Some(path) => Params::load(path),
        None => Ok(Params::default()),
    }
}

fn pick_seed(seed: Option<u64>, entropy: bool) -> u64 {
    let seed = match (seed, entropy) {
        (Some(seed), _) => FixedSeed(seed).seed(),
        (None, true) => EntropySeed.seed(),
        (None, false) => ClockSeed.seed(),
    };
    info!(seed, "Seed selected");
    seed
}

fn run(args: RunArgs) -> SimResult<()> {
    let failure = match (args.failure_model.as_deref(), args.failure_rate.as_deref()) {
        (None, _) => None,
        (Some(model), Some(rate)) => Some((model, rate)),
        (Some(model), None) if model.eq_ignore_ascii_case("none") => Some((model, "0")),
        (Some(model), None) => {
            return Err(SimError::InvalidParameter(format!(
                "failure model {model} requires a failure rate"
            )))
        }
    };
    let config = SimulationConfig::from_tokens(
        &args.num_nodes,
        &args.topology,
        &args.algorithm,
        failure,
    )?
    .with_params(load_params(args.params.as_ref())?)?;

    let result = Simulation::new(config).run_with_seed(pick_seed(args.seed, args.entropy))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.rounds_taken);
    }
    Ok(())
}

async fn sweep(args: SweepArgs) -> SimResult<()> {
    let mut plan = SweepPlan::new(args.sizes)
        .with_failure_rates(args.failure_model.parse::<FailureKind>()?, &args.failure_rates)?;
    if !args.topologies.is_empty() {
        plan.topologies = args
            .topologies
            .iter()
            .map(|t| t.parse())
            .collect::<SimResult<_>>()?;
    }
    if !args.algorithms.is_empty() {
        plan.algorithms = args
            .algorithms
            .iter()
            .map(|a| a.parse())
            .collect::<SimResult<_>>()?;
    }
    plan.params = load_params(args.params.as_ref())?;

    let records = run_sweep(&plan, pick_seed(args.seed, args.entropy)).await?;
    match args.output {
        Some(path) => {
            write_csv(&records, BufWriter::new(File::create(&path)?))?;
            info!(path = %path.display(), rows = records.len(), "Wrote sweep results");
        }
        None => write_csv(&records, io::stdout().lock())?,
    }
    Ok(())
}
