use crate::{
    consensus::{ConvergenceCriterion, GossipConvergence, PushSumConvergence},
    rng::Lcg,
    state_machine::{ActorStateMachine, NodeActor, StateMachine},
    types::{Envelope, Message, NodeId},
};
use tracing::{debug, trace};

/// Rounds between progress traces.
const TRACE_INTERVAL: u64 = 1_000;

/// How a scheduler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Rounds executed.
    pub rounds_taken: u64,

    /// Whether the convergence predicate held when the run stopped.
    pub converged: bool,
}

/// Synchronous round scheduler over a population of actors.
///
/// Each round first delivers every in-flight message, then lets every
/// eligible actor schedule its outgoing message for the next round. Sends
/// only observe state as it stood after the round's deliveries, and all
/// random draws come from one generator in actor-id order.
pub struct Network {
    /// Actors indexed by id.
    actors: Vec<NodeActor>,

    /// Transition function shared by all actors.
    state_machine: ActorStateMachine,

    /// Generator for neighbor selection.
    rng: Lcg,

    /// Maximum rounds per run.
    round_cap: u64,
}

impl Network {
    /// Creates a scheduler over `actors`, which must be indexed by id.
    pub fn new(
        actors: Vec<NodeActor>,
        state_machine: ActorStateMachine,
        seed: u64,
        round_cap: u64,
    ) -> Self {
        Self {
            actors,
            state_machine,
            rng: Lcg::new(seed),
            round_cap,
        }
    }

    /// Current actor states.
    pub fn actors(&self) -> &[NodeActor] {
        &self.actors
    }

    /// Live actors that have terminated.
    pub fn nodes_converged(&self) -> usize {
        self.actors
            .iter()
            .filter(|a| a.is_live() && a.terminated)
            .count()
    }

    /// Actors marked failed.
    pub fn failed_nodes(&self) -> usize {
        self.actors.iter().filter(|a| a.is_failed).count()
    }

    /// Runs gossip from node 0 until every live actor terminates, no
    /// message is scheduled, or the round cap is hit.
    ///
    /// Senders skip failed and terminated peers. An informed actor left
    /// with no live peer is terminated at the end of the round.
    pub fn run_gossip(&mut self, criterion: &GossipConvergence) -> RoundOutcome {
        if self.actors.is_empty() {
            return RoundOutcome {
                rounds_taken: 0,
                converged: false,
            };
        }

        let mut in_flight = vec![Envelope::new(0, Message::GossipMessage)];
        let mut round = 0;
        while !in_flight.is_empty() && round < self.round_cap {
            round += 1;
            self.deliver(&mut in_flight);
            if criterion.is_converged(&self.actors) {
                debug!(round, "Gossip converged");
                break;
            }

            let mut stranded = Vec::new();
            for actor in &self.actors {
                if !actor.is_live() || actor.terminated || !actor.is_informed() {
                    continue;
                }
                let candidates = reachable(&self.actors, actor, true);
                match self.rng.pick(&candidates) {
                    Some(to) => in_flight.push(Envelope::new(to, Message::GossipMessage)),
                    None => stranded.push(actor.id),
                }
            }
            for id in stranded {
                self.state_machine.apply(&mut self.actors[id], Message::Terminate);
            }

            if round % TRACE_INTERVAL == 0 {
                trace!(round, in_flight = in_flight.len(), "Gossip progress");
            }
        }

        self.finish(round, criterion.is_converged(&self.actors))
    }

    /// Runs push-sum until every live, non-exempt ratio is within epsilon
    /// of the target or the round cap is hit.
    ///
    /// Every live, unterminated actor with a live neighbor sends each round.
    /// Locally settled actors keep receiving. On convergence all live actors
    /// receive [`Message::Terminate`].
    pub fn run_push_sum(&mut self, criterion: &PushSumConvergence) -> RoundOutcome {
        if self.actors.is_empty() {
            return RoundOutcome {
                rounds_taken: 0,
                converged: false,
            };
        }

        for actor in self.actors.iter_mut().filter(|a| a.is_live()) {
            self.state_machine.apply(actor, Message::StartPushSum);
        }

        let mut in_flight = Vec::with_capacity(self.actors.len());
        let mut round = 0;
        let mut converged = false;
        while round < self.round_cap {
            round += 1;
            self.deliver(&mut in_flight);
            if criterion.is_converged(&self.actors) {
                converged = true;
                debug!(round, target = criterion.target(), "Push-sum converged");
                break;
            }

            for id in 0..self.actors.len() {
                let actor = &self.actors[id];
                if !actor.is_live() || actor.terminated {
                    continue;
                }
                let candidates = reachable(&self.actors, actor, false);
                if let Some(to) = self.rng.pick(&candidates) {
                    let message = self.state_machine.emit_push_sum(&mut self.actors[id]);
                    in_flight.push(Envelope::new(to, message));
                }
            }

            if round % TRACE_INTERVAL == 0 {
                trace!(round, "Push-sum progress");
            }
        }

        if converged {
            for actor in self.actors.iter_mut().filter(|a| a.is_live()) {
                self.state_machine.apply(actor, Message::Terminate);
            }
        }
        self.finish(round, converged)
    }

    /// Folds every in-flight message into its target, in send order.
    /// Messages to failed actors are dropped.
    fn deliver(&mut self, in_flight: &mut Vec<Envelope>) {
        for envelope in in_flight.drain(..) {
            let actor = &mut self.actors[envelope.to];
            if actor.is_failed {
                continue;
            }
            self.state_machine.apply(actor, envelope.message);
        }
    }

    fn finish(&self, rounds_taken: u64, converged: bool) -> RoundOutcome {
        let live = self.actors.iter().any(|a| a.is_live());
        if rounds_taken >= self.round_cap && !converged {
            debug!(rounds_taken, "Round cap reached without convergence");
        }
        RoundOutcome {
            rounds_taken,
            converged: converged && live,
        }
    }
}

/// Neighbors of `actor` that may be chosen as a target.
fn reachable(actors: &[NodeActor], actor: &NodeActor, skip_terminated: bool) -> Vec<NodeId> {
    actor
        .neighbors
        .iter()
        .copied()
        .filter(|&nb| {
            let peer = &actors[nb];
            peer.is_live() && !(skip_terminated && peer.terminated)
        })
        .collect()
}
