use crate::{
    error::{SimError, SimResult},
    types::{Message, NodeId},
};
use std::collections::BTreeSet;

/// Rumor receipts after which a gossip actor terminates.
pub const DEFAULT_GOSSIP_THRESHOLD: u32 = 10;

/// Lower bound applied to a push-sum weight after halving.
pub const DEFAULT_WEIGHT_FLOOR: f64 = 1e-6;

/// Ratio change below which a push-sum delivery counts as stable.
pub const DEFAULT_LOCAL_DELTA: f64 = 1e-5;

/// Consecutive stable deliveries after which a push-sum actor terminates.
pub const DEFAULT_LOCAL_STABLE_ROUNDS: u32 = 3;

/// Trait for message-driven actor state machines.
///
/// Implementors define how an actor's state evolves on one input. `apply`
/// mutates in place (used by the round scheduler); `transition` is the pure
/// form returning a fresh state.
pub trait StateMachine: Send + Sync + Clone + 'static {
    /// Type of input delivered to the state machine.
    type Input;

    /// Type of state maintained by each actor.
    type State: Clone;

    /// Folds one input into `state`.
    fn apply(&self, state: &mut Self::State, input: Self::Input);

    /// Returns the state that results from folding `input` into `state`.
    fn transition(&self, state: &Self::State, input: Self::Input) -> Self::State {
        let mut next = state.clone();
        self.apply(&mut next, input);
        next
    }
}

/// Per-node record for both protocols.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeActor {
    /// Stable identifier.
    pub id: NodeId,

    /// Effective neighbor list (topology minus pruned links).
    pub neighbors: Vec<NodeId>,

    /// Rumor copies received.
    pub heard_count: u32,

    /// Push-sum running sum; starts at the node's id.
    pub sum: f64,

    /// Push-sum running weight; starts at 1.
    pub weight: f64,

    /// `sum / weight` after the last push-sum delivery.
    pub last_ratio: f64,

    /// Push-sum deliveries since start, counting the start itself.
    pub rounds_since_start: u64,

    /// Consecutive push-sum deliveries that moved the ratio by less than
    /// the local delta.
    pub stable_deliveries: u32,

    /// Monotone termination flag.
    pub terminated: bool,

    /// Node is excluded from message exchange entirely.
    pub is_failed: bool,

    /// Neighbors whose link from this node was pruned.
    pub dead_neighbors: BTreeSet<NodeId>,
}

impl NodeActor {
    /// Creates a fresh actor with the given topology neighbors.
    pub fn new(id: NodeId, neighbors: Vec<NodeId>) -> Self {
        let sum = id as f64;
        Self {
            id,
            neighbors,
            heard_count: 0,
            sum,
            weight: 1.0,
            last_ratio: sum,
            rounds_since_start: 0,
            stable_deliveries: 0,
            terminated: false,
            is_failed: false,
            dead_neighbors: BTreeSet::new(),
        }
    }

    /// Current push-sum estimate.
    pub fn ratio(&self) -> f64 {
        self.sum / self.weight
    }

    /// Whether the actor takes part in message exchange.
    pub fn is_live(&self) -> bool {
        !self.is_failed
    }

    /// Whether the actor has received the rumor at least once.
    pub fn is_informed(&self) -> bool {
        self.heard_count > 0
    }
}

/// Creates one fresh actor per adjacency entry.
pub fn spawn_actors(adjacency: &[Vec<NodeId>]) -> Vec<NodeActor> {
    adjacency
        .iter()
        .enumerate()
        .map(|(id, neighbors)| NodeActor::new(id, neighbors.clone()))
        .collect()
}

/// Default actor state machine covering gossip and push-sum.
#[derive(Debug, Clone)]
pub struct ActorStateMachine {
    /// Receipts required before a gossip actor terminates.
    gossip_threshold: u32,

    /// Floor applied to push-sum weights after halving.
    weight_floor: f64,

    /// Ratio change below which a push-sum delivery is stable.
    local_delta: f64,

    /// Stable deliveries in a row that terminate a push-sum actor.
    local_stable_rounds: u32,
}

impl ActorStateMachine {
    /// Creates a state machine with the given thresholds.
    ///
    /// # Errors
    /// Returns an error if `gossip_threshold` is zero or `weight_floor` is
    /// not positive.
    pub fn new(gossip_threshold: u32, weight_floor: f64) -> SimResult<Self> {
        if gossip_threshold == 0 {
            return Err(SimError::InvalidParameter(
                "gossip threshold must be positive".into(),
            ));
        }
        if !(weight_floor > 0.0) {
            return Err(SimError::InvalidParameter(
                "weight floor must be positive".into(),
            ));
        }
        Ok(Self {
            gossip_threshold,
            weight_floor,
            local_delta: DEFAULT_LOCAL_DELTA,
            local_stable_rounds: DEFAULT_LOCAL_STABLE_ROUNDS,
        })
    }

    /// Replaces the push-sum local termination rule. A `delta` of zero
    /// disables it.
    ///
    /// # Errors
    /// Returns an error if `delta` is negative or `stable_rounds` is zero.
    pub fn with_local_termination(mut self, delta: f64, stable_rounds: u32) -> SimResult<Self> {
        if !(delta >= 0.0) {
            return Err(SimError::InvalidParameter(
                "local delta must be non-negative".into(),
            ));
        }
        if stable_rounds == 0 {
            return Err(SimError::InvalidParameter(
                "local stable rounds must be positive".into(),
            ));
        }
        self.local_delta = delta;
        self.local_stable_rounds = stable_rounds;
        Ok(self)
    }

    /// Halves the actor's sum and weight and returns the share to send.
    ///
    /// The retained weight is clamped to the floor so repeated halving
    /// never underflows.
    pub fn emit_push_sum(&self, actor: &mut NodeActor) -> Message {
        actor.sum /= 2.0;
        actor.weight = (actor.weight / 2.0).max(self.weight_floor);
        Message::PushSumMessage {
            s: actor.sum,
            w: actor.weight,
        }
    }
}

impl Default for ActorStateMachine {
    fn default() -> Self {
        Self {
            gossip_threshold: DEFAULT_GOSSIP_THRESHOLD,
            weight_floor: DEFAULT_WEIGHT_FLOOR,
            local_delta: DEFAULT_LOCAL_DELTA,
            local_stable_rounds: DEFAULT_LOCAL_STABLE_ROUNDS,
        }
    }
}

impl StateMachine for ActorStateMachine {
    type Input = Message;
    type State = NodeActor;

    fn apply(&self, actor: &mut NodeActor, input: Message) {
        match input {
            Message::StartGossip => {
                actor.heard_count = 1;
            }
            Message::GossipMessage => {
                actor.heard_count = actor.heard_count.saturating_add(1);
                actor.terminated |= actor.heard_count >= self.gossip_threshold;
            }
            Message::StartPushSum => {
                actor.rounds_since_start = 1;
            }
            Message::PushSumMessage { s, w } => {
                actor.sum += s;
                actor.weight += w;
                let ratio = actor.ratio();
                if (ratio - actor.last_ratio).abs() < self.local_delta {
                    actor.stable_deliveries = actor.stable_deliveries.saturating_add(1);
                } else {
                    actor.stable_deliveries = 0;
                }
                actor.last_ratio = ratio;
                actor.rounds_since_start += 1;
                // A locally settled actor stops sending but keeps absorbing.
                actor.terminated |= actor.stable_deliveries >= self.local_stable_rounds;
            }
            Message::Terminate => {
                actor.terminated = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ActorStateMachine {
        ActorStateMachine::default()
    }

    #[test]
    fn test_new_actor() {
        let actor = NodeActor::new(4, vec![3, 5]);
        assert_eq!(actor.sum, 4.0);
        assert_eq!(actor.weight, 1.0);
        assert_eq!(actor.last_ratio, 4.0);
        assert_eq!(actor.heard_count, 0);
        assert!(!actor.terminated);
        assert!(actor.is_live());
        assert!(!actor.is_informed());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(ActorStateMachine::new(0, 1e-6).is_err());
        assert!(ActorStateMachine::new(10, 0.0).is_err());
        assert!(ActorStateMachine::new(10, f64::NAN).is_err());
        assert!(ActorStateMachine::new(3, 1e-6).is_ok());
    }

    #[test]
    fn test_gossip_terminates_at_threshold() {
        let sm = machine();
        let mut actor = NodeActor::new(0, vec![1]);
        for i in 1..DEFAULT_GOSSIP_THRESHOLD {
            sm.apply(&mut actor, Message::GossipMessage);
            assert_eq!(actor.heard_count, i);
            assert!(!actor.terminated);
        }
        sm.apply(&mut actor, Message::GossipMessage);
        assert!(actor.terminated);
    }

    #[test]
    fn test_start_gossip() {
        let actor = machine().transition(&NodeActor::new(0, vec![]), Message::StartGossip);
        assert_eq!(actor.heard_count, 1);
        assert!(!actor.terminated);
    }

    #[test]
    fn test_transition_is_pure() {
        let sm = machine();
        let before = NodeActor::new(2, vec![1]);
        let after = sm.transition(&before, Message::PushSumMessage { s: 1.0, w: 1.0 });
        assert_eq!(before.sum, 2.0);
        assert_eq!(after.sum, 3.0);
        assert_eq!(after.weight, 2.0);
        assert_eq!(after.last_ratio, 1.5);
        assert_eq!(after.rounds_since_start, 1);
    }

    #[test]
    fn test_push_sum_start_resets_counter() {
        let sm = machine();
        let mut actor = NodeActor::new(1, vec![0]);
        actor.rounds_since_start = 9;
        sm.apply(&mut actor, Message::StartPushSum);
        assert_eq!(actor.rounds_since_start, 1);
        assert_eq!(actor.sum, 1.0);
        assert_eq!(actor.weight, 1.0);
    }

    #[test]
    fn test_push_sum_local_termination() {
        let sm = machine();
        let mut actor = NodeActor::new(2, vec![1]);

        // Ratio moves from 2.0 to 1.5: not stable.
        sm.apply(&mut actor, Message::PushSumMessage { s: 1.0, w: 1.0 });
        assert_eq!(actor.stable_deliveries, 0);

        // Shares with the same ratio leave it unchanged.
        for expected in 1..DEFAULT_LOCAL_STABLE_ROUNDS {
            sm.apply(&mut actor, Message::PushSumMessage { s: 0.75, w: 0.5 });
            assert_eq!(actor.stable_deliveries, expected);
            assert!(!actor.terminated);
        }
        sm.apply(&mut actor, Message::PushSumMessage { s: 0.75, w: 0.5 });
        assert!(actor.terminated);
    }

    #[test]
    fn test_unstable_delivery_resets_streak() {
        let sm = machine();
        let mut actor = NodeActor::new(2, vec![1]);
        sm.apply(&mut actor, Message::PushSumMessage { s: 2.0, w: 1.0 });
        sm.apply(&mut actor, Message::PushSumMessage { s: 2.0, w: 1.0 });
        assert_eq!(actor.stable_deliveries, 2);
        sm.apply(&mut actor, Message::PushSumMessage { s: 10.0, w: 1.0 });
        assert_eq!(actor.stable_deliveries, 0);
        assert!(!actor.terminated);
    }

    #[test]
    fn test_local_termination_can_be_disabled() {
        let sm = machine().with_local_termination(0.0, 3).unwrap();
        let mut actor = NodeActor::new(2, vec![1]);
        for _ in 0..10 {
            sm.apply(&mut actor, Message::PushSumMessage { s: 2.0, w: 1.0 });
        }
        assert!(!actor.terminated);

        assert!(machine().with_local_termination(-1.0, 3).is_err());
        assert!(machine().with_local_termination(1e-5, 0).is_err());
    }

    #[test]
    fn test_emit_halves_and_clamps() {
        let sm = ActorStateMachine::new(10, 0.25).unwrap();
        let mut actor = NodeActor::new(6, vec![0]);
        let msg = sm.emit_push_sum(&mut actor);
        assert_eq!(msg, Message::PushSumMessage { s: 3.0, w: 0.5 });
        assert_eq!(actor.sum, 3.0);
        assert_eq!(actor.weight, 0.5);

        let msg = sm.emit_push_sum(&mut actor);
        assert_eq!(msg, Message::PushSumMessage { s: 1.5, w: 0.25 });
        let msg = sm.emit_push_sum(&mut actor);
        assert_eq!(msg, Message::PushSumMessage { s: 0.75, w: 0.25 });
    }

    #[test]
    fn test_terminated_is_monotone() {
        let sm = machine();
        let mut actor = NodeActor::new(0, vec![1]);
        sm.apply(&mut actor, Message::Terminate);
        assert!(actor.terminated);

        let inputs = [
            Message::StartGossip,
            Message::GossipMessage,
            Message::StartPushSum,
            Message::PushSumMessage { s: 1.0, w: 0.5 },
            Message::Terminate,
        ];
        for input in inputs {
            actor = sm.transition(&actor, input);
            assert!(actor.terminated);
        }
    }

    #[test]
    fn test_spawn_actors() {
        let actors = spawn_actors(&[vec![1], vec![0]]);
        assert_eq!(actors.len(), 2);
        assert_eq!(actors[1].id, 1);
        assert_eq!(actors[1].neighbors, vec![0]);
    }
}
