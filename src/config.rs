use crate::{
    consensus::{DEFAULT_EPSILON, DEFAULT_EXEMPT_WEIGHT},
    error::{SimError, SimResult},
    failure::{FailureKind, FailureModel},
    state_machine::{
        DEFAULT_GOSSIP_THRESHOLD, DEFAULT_LOCAL_DELTA, DEFAULT_LOCAL_STABLE_ROUNDS,
        DEFAULT_WEIGHT_FLOOR,
    },
    topology::{Topology, DEFAULT_GRID_WIDTH},
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// Hard bound on rounds per run.
pub const DEFAULT_ROUND_CAP: u64 = 50_000;

/// Propagation protocol to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Rumor spreading.
    Gossip,

    /// Distributed averaging.
    PushSum,
}

impl Algorithm {
    /// All algorithms, in reporting order.
    pub const ALL: [Algorithm; 2] = [Algorithm::Gossip, Algorithm::PushSum];
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::Gossip => "gossip",
            Algorithm::PushSum => "push-sum",
        })
    }
}

impl FromStr for Algorithm {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gossip" => Ok(Algorithm::Gossip),
            "push-sum" | "pushsum" | "push_sum" => Ok(Algorithm::PushSum),
            _ => Err(SimError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Protocol constants. Defaults reproduce the reference behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Rumor receipts after which a gossip actor terminates.
    pub gossip_threshold: u32,

    /// Rounds after which a run stops unconverged.
    pub round_cap: u64,

    /// Push-sum convergence bound around the population average.
    pub epsilon: f64,

    /// Push-sum weight below which an actor is left out of the check.
    pub exempt_weight: f64,

    /// Floor applied to a push-sum weight after halving.
    pub weight_floor: f64,

    /// Ratio change below which a push-sum delivery counts as stable.
    /// Zero turns local termination off.
    pub local_delta: f64,

    /// Stable deliveries in a row after which a push-sum actor stops sending.
    pub local_stable_rounds: u32,

    /// Row width of the grid topologies.
    pub grid_width: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            gossip_threshold: DEFAULT_GOSSIP_THRESHOLD,
            round_cap: DEFAULT_ROUND_CAP,
            epsilon: DEFAULT_EPSILON,
            exempt_weight: DEFAULT_EXEMPT_WEIGHT,
            weight_floor: DEFAULT_WEIGHT_FLOOR,
            local_delta: DEFAULT_LOCAL_DELTA,
            local_stable_rounds: DEFAULT_LOCAL_STABLE_ROUNDS,
            grid_width: DEFAULT_GRID_WIDTH,
        }
    }
}

impl Params {
    /// Checks every constant is usable.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> SimResult<()> {
        if self.gossip_threshold == 0 {
            return Err(SimError::InvalidParameter("gossip_threshold must be positive".into()));
        }
        if self.round_cap == 0 {
            return Err(SimError::InvalidParameter("round_cap must be positive".into()));
        }
        if !(self.epsilon > 0.0) {
            return Err(SimError::InvalidParameter("epsilon must be positive".into()));
        }
        if !(self.exempt_weight > 0.0) || !(self.weight_floor > 0.0) {
            return Err(SimError::InvalidParameter("weights must be positive".into()));
        }
        if !(self.local_delta >= 0.0) {
            return Err(SimError::InvalidParameter("local_delta must be non-negative".into()));
        }
        if self.local_stable_rounds == 0 {
            return Err(SimError::InvalidParameter("local_stable_rounds must be positive".into()));
        }
        if self.grid_width < 2 {
            return Err(SimError::InvalidParameter("grid_width must be at least 2".into()));
        }
        Ok(())
    }

    /// Parses parameters from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let params: Params = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Loads parameters from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Validated input to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Population size.
    pub num_nodes: usize,

    /// Neighbor structure.
    pub topology: Topology,

    /// Protocol to run.
    pub algorithm: Algorithm,

    /// Failure perturbation.
    pub failure: FailureModel,

    /// Protocol constants.
    pub params: Params,
}

impl SimulationConfig {
    /// Creates a configuration with default parameters and no failures.
    ///
    /// # Errors
    /// Returns an error if `num_nodes` is zero.
    pub fn new(num_nodes: usize, topology: Topology, algorithm: Algorithm) -> SimResult<Self> {
        if num_nodes == 0 {
            return Err(SimError::InvalidNodeCount(num_nodes));
        }
        Ok(Self {
            num_nodes,
            topology,
            algorithm,
            failure: FailureModel::None,
            params: Params::default(),
        })
    }

    /// Parses the positional command-line tokens.
    ///
    /// `failure` is `None` or a `(model, rate)` token pair.
    pub fn from_tokens(
        num_nodes: &str,
        topology: &str,
        algorithm: &str,
        failure: Option<(&str, &str)>,
    ) -> SimResult<Self> {
        let count = num_nodes
            .trim()
            .parse::<usize>()
            .map_err(|_| SimError::InvalidParameter(format!("node count: {num_nodes}")))?;
        let config = Self::new(count, topology.parse()?, algorithm.parse()?)?;
        match failure {
            None => Ok(config),
            Some((kind, rate)) => {
                let kind: FailureKind = kind.parse()?;
                let rate = rate
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| SimError::InvalidParameter(format!("failure rate: {rate}")))?;
                config.with_failure(FailureModel::new(kind, rate)?)
            }
        }
    }

    /// Sets the failure model after re-checking its rate.
    pub fn with_failure(mut self, failure: FailureModel) -> SimResult<Self> {
        self.failure = FailureModel::new(failure.kind(), failure.rate())?;
        Ok(self)
    }

    /// Replaces the protocol constants.
    pub fn with_params(mut self, params: Params) -> SimResult<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }
}
