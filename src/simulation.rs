use crate::{
    config::{Algorithm, SimulationConfig},
    consensus::{GossipConvergence, PushSumConvergence},
    error::SimResult,
    failure::inject,
    network::Network,
    rng::SeedProvider,
    state_machine::{spawn_actors, ActorStateMachine},
    topology::build_with_width,
    types::SimulationResult,
};
use tracing::info;

/// Composes topology construction, failure injection and the round
/// scheduler for one configuration.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    /// Creates an orchestrator for a validated configuration.
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Configuration this simulation runs.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs once, drawing the seed from `seeds`.
    pub fn run(&self, seeds: &impl SeedProvider) -> SimResult<SimulationResult> {
        self.run_with_seed(seeds.seed())
    }

    /// Runs once with an explicit seed.
    ///
    /// # Errors
    /// Returns an error only if the configuration's parameters are invalid;
    /// non-convergence is reported through the result.
    pub fn run_with_seed(&self, seed: u64) -> SimResult<SimulationResult> {
        let config = &self.config;
        let params = &config.params;
        params.validate()?;

        info!(
            nodes = config.num_nodes,
            topology = %config.topology,
            algorithm = %config.algorithm,
            failure_model = %config.failure.kind(),
            failure_rate = config.failure.rate(),
            seed,
            "Starting simulation"
        );

        let adjacency = build_with_width(config.num_nodes, config.topology, params.grid_width);
        let mut actors = spawn_actors(&adjacency);
        let report = inject(&mut actors, config.failure, seed);

        let state_machine = ActorStateMachine::new(params.gossip_threshold, params.weight_floor)?
            .with_local_termination(params.local_delta, params.local_stable_rounds)?;
        let mut network = Network::new(actors, state_machine, seed, params.round_cap);
        let outcome = match config.algorithm {
            Algorithm::Gossip => network.run_gossip(&GossipConvergence),
            Algorithm::PushSum => {
                let criterion = PushSumConvergence::new(params.epsilon, params.exempt_weight)?
                    .for_population(network.actors());
                network.run_push_sum(&criterion)
            }
        };

        let result = SimulationResult {
            rounds_taken: outcome.rounds_taken,
            nodes_converged: network.nodes_converged(),
            total_nodes: config.num_nodes,
            failed_nodes: report.failed_nodes,
            converged: outcome.converged,
        };
        info!(
            rounds = result.rounds_taken,
            converged = result.converged,
            nodes_converged = result.nodes_converged,
            "Simulation finished"
        );
        Ok(result)
    }
}

/// Runs `config` once with a seed from `seeds`.
pub fn simulate(config: &SimulationConfig, seeds: &impl SeedProvider) -> SimResult<SimulationResult> {
    Simulation::new(config.clone()).run(seeds)
}
