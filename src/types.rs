use serde::{Deserialize, Serialize};

/// Identifier of a simulated node, assigned `0..n` at creation.
pub type NodeId = usize;

/// Messages routed between actors by the round scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Marks the actor as the rumor's origin.
    StartGossip,

    /// One copy of the rumor.
    GossipMessage,

    /// Starts the push-sum protocol on this actor.
    StartPushSum,

    /// Half of the sender's sum and weight.
    PushSumMessage {
        /// Sum share.
        s: f64,

        /// Weight share.
        w: f64,
    },

    /// Forced shutdown.
    Terminate,
}

/// A message in flight, addressed to a single actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Receiving actor.
    pub to: NodeId,

    /// Payload.
    pub message: Message,
}

impl Envelope {
    /// Addresses `message` to actor `to`.
    pub fn new(to: NodeId, message: Message) -> Self {
        Self { to, message }
    }
}

/// Outcome of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Rounds executed; equals the round cap when the run did not converge.
    pub rounds_taken: u64,

    /// Terminated actors at the end of the run (failed actors excluded).
    pub nodes_converged: usize,

    /// Population size.
    pub total_nodes: usize,

    /// Actors marked failed by the failure injector.
    pub failed_nodes: usize,

    /// Whether the protocol's global convergence predicate held.
    pub converged: bool,
}
