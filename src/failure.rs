use crate::{
    error::{SimError, SimResult},
    rng::sample_per_ten_thousand,
    state_machine::NodeActor,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::debug;

/// Stride separating the per-actor key ranges of connection sampling.
const CONNECTION_KEY_STRIDE: u64 = 1_000_003;

/// Failure model tokens, without a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    None,
    Node,
    Connection,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::None => "none",
            FailureKind::Node => "node",
            FailureKind::Connection => "connection",
        })
    }
}

impl FromStr for FailureKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(FailureKind::None),
            "node" => Ok(FailureKind::Node),
            "connection" => Ok(FailureKind::Connection),
            _ => Err(SimError::UnknownFailureModel(s.to_string())),
        }
    }
}

/// Post-construction perturbation applied once before the first round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureModel {
    /// Identity.
    #[default]
    None,

    /// Each actor fails with probability `rate`.
    Node { rate: f64 },

    /// Each directed link is dropped with probability `rate`.
    Connection { rate: f64 },
}

impl FailureModel {
    /// Builds a model from a token and rate. The rate is ignored for
    /// [`FailureKind::None`].
    ///
    /// # Errors
    /// Returns an error if `rate` is outside `[0, 1]`.
    pub fn new(kind: FailureKind, rate: f64) -> SimResult<Self> {
        if kind == FailureKind::None {
            return Ok(FailureModel::None);
        }
        if !(0.0..=1.0).contains(&rate) {
            return Err(SimError::FailureRateOutOfRange(rate));
        }
        Ok(match kind {
            FailureKind::None => FailureModel::None,
            FailureKind::Node => FailureModel::Node { rate },
            FailureKind::Connection => FailureModel::Connection { rate },
        })
    }

    /// Token of this model.
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureModel::None => FailureKind::None,
            FailureModel::Node { .. } => FailureKind::Node,
            FailureModel::Connection { .. } => FailureKind::Connection,
        }
    }

    /// Configured rate; zero for [`FailureModel::None`].
    pub fn rate(&self) -> f64 {
        match self {
            FailureModel::None => 0.0,
            FailureModel::Node { rate } | FailureModel::Connection { rate } => *rate,
        }
    }
}

/// What the injector changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureReport {
    /// Actors marked failed.
    pub failed_nodes: usize,

    /// Directed links removed.
    pub pruned_links: usize,
}

/// Applies `model` to a freshly spawned population.
///
/// Sampling is stateless per `(seed, id)` or `(seed, id, neighbor)`, so it
/// never consumes draws from the run's generator. Node failure keeps the
/// neighbor lists intact; the scheduler must skip failed actors. Connection
/// failure removes the link only on the sampled side.
pub fn inject(actors: &mut [NodeActor], model: FailureModel, seed: u64) -> FailureReport {
    let mut report = FailureReport::default();
    match model {
        FailureModel::None => {}
        FailureModel::Node { rate } => {
            for actor in actors.iter_mut() {
                let value = sample_per_ten_thousand(seed.wrapping_add(actor.id as u64));
                if below_rate(value, rate) {
                    actor.is_failed = true;
                    report.failed_nodes += 1;
                }
            }
        }
        FailureModel::Connection { rate } => {
            for actor in actors.iter_mut() {
                let base = seed.wrapping_add((actor.id as u64).wrapping_mul(CONNECTION_KEY_STRIDE));
                let (kept, dropped): (Vec<_>, Vec<_>) =
                    actor.neighbors.iter().copied().partition(|&nb| {
                        !below_rate(sample_per_ten_thousand(base.wrapping_add(nb as u64)), rate)
                    });
                report.pruned_links += dropped.len();
                actor.dead_neighbors.extend(dropped);
                actor.neighbors = kept;
            }
        }
    }
    debug!(
        model = %model.kind(),
        rate = model.rate(),
        failed_nodes = report.failed_nodes,
        pruned_links = report.pruned_links,
        "Failure injection applied"
    );
    report
}

fn below_rate(value: u64, rate: f64) -> bool {
    (value as f64) < rate * 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state_machine::spawn_actors,
        topology::{build, Topology},
    };

    fn population(n: usize) -> Vec<NodeActor> {
        spawn_actors(&build(n, Topology::Full))
    }

    #[test]
    fn test_no_failure_is_identity() {
        let mut actors = population(8);
        let before = actors.clone();
        let report = inject(&mut actors, FailureModel::None, 99);
        assert_eq!(actors, before);
        assert_eq!(report, FailureReport::default());
    }

    #[test]
    fn test_node_failure_extremes() {
        let mut actors = population(20);
        let report = inject(&mut actors, FailureModel::Node { rate: 1.0 }, 5);
        assert_eq!(report.failed_nodes, 20);
        assert!(actors.iter().all(|a| a.is_failed));
        // Neighbor lists are kept as built.
        assert!(actors.iter().all(|a| a.neighbors.len() == 19));

        let mut actors = population(20);
        let report = inject(&mut actors, FailureModel::Node { rate: 0.0 }, 5);
        assert_eq!(report.failed_nodes, 0);
    }

    #[test]
    fn test_connection_failure_extremes() {
        let mut actors = population(6);
        let report = inject(&mut actors, FailureModel::Connection { rate: 1.0 }, 3);
        assert_eq!(report.pruned_links, 30);
        for actor in &actors {
            assert!(actor.neighbors.is_empty());
            assert_eq!(actor.dead_neighbors.len(), 5);
            assert!(!actor.is_failed);
        }

        let mut actors = population(6);
        let report = inject(&mut actors, FailureModel::Connection { rate: 0.0 }, 3);
        assert_eq!(report.pruned_links, 0);
    }

    #[test]
    fn test_connection_failure_partitions_neighbors() {
        let mut actors = population(30);
        let original = actors.clone();
        inject(&mut actors, FailureModel::Connection { rate: 0.5 }, 11);
        for (actor, before) in actors.iter().zip(&original) {
            assert_eq!(
                actor.neighbors.len() + actor.dead_neighbors.len(),
                before.neighbors.len()
            );
            assert!(actor.neighbors.iter().all(|nb| !actor.dead_neighbors.contains(nb)));
        }
    }

    #[test]
    fn test_injection_is_deterministic() {
        let mut a = population(40);
        let mut b = population(40);
        inject(&mut a, FailureModel::Node { rate: 0.3 }, 1234);
        inject(&mut b, FailureModel::Node { rate: 0.3 }, 1234);
        assert_eq!(a, b);
    }

    #[test]
    fn test_model_validation() {
        assert!(FailureModel::new(FailureKind::Node, 1.5).is_err());
        assert!(FailureModel::new(FailureKind::Connection, -0.1).is_err());
        assert_eq!(
            FailureModel::new(FailureKind::None, 7.0).unwrap(),
            FailureModel::None
        );
        let model = FailureModel::new(FailureKind::Connection, 0.25).unwrap();
        assert_eq!(model.kind(), FailureKind::Connection);
        assert_eq!(model.rate(), 0.25);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Node".parse::<FailureKind>().unwrap(), FailureKind::Node);
        assert!("partition".parse::<FailureKind>().is_err());
    }
}
