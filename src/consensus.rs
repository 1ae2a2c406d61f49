use crate::{
    error::{SimError, SimResult},
    state_machine::NodeActor,
};

/// Push-sum convergence threshold.
pub const DEFAULT_EPSILON: f64 = 0.001;

/// Weight below which a push-sum ratio is ignored as numerically unstable.
pub const DEFAULT_EXEMPT_WEIGHT: f64 = 1e-5;

/// Trait for global convergence predicates evaluated between rounds.
///
/// Failed actors never count towards or against convergence.
pub trait ConvergenceCriterion: Send + Sync + Clone + 'static {
    /// Checks whether the population has converged.
    fn is_converged(&self, actors: &[NodeActor]) -> bool;
}

/// Gossip convergence: every live actor has terminated.
#[derive(Debug, Clone, Copy, Default)]
pub struct GossipConvergence;

impl ConvergenceCriterion for GossipConvergence {
    fn is_converged(&self, actors: &[NodeActor]) -> bool {
        actors
            .iter()
            .filter(|a| a.is_live())
            .all(|a| a.terminated)
    }
}

/// Push-sum convergence: every live, non-exempt actor's ratio lies within
/// `epsilon` of the population average.
#[derive(Debug, Clone)]
pub struct PushSumConvergence {
    /// Analytic average of the live actors' initial values.
    target: f64,

    /// Convergence threshold.
    epsilon: f64,

    /// Actors whose weight decayed below this are skipped.
    exempt_weight: f64,
}

impl PushSumConvergence {
    /// Creates a predicate with a target of zero; call [`Self::for_population`]
    /// before use.
    ///
    /// # Errors
    /// Returns an error if `epsilon` or `exempt_weight` is not positive.
    pub fn new(epsilon: f64, exempt_weight: f64) -> SimResult<Self> {
        if !(epsilon > 0.0) {
            return Err(SimError::InvalidParameter("epsilon must be positive".into()));
        }
        if !(exempt_weight > 0.0) {
            return Err(SimError::InvalidParameter(
                "exempt weight must be positive".into(),
            ));
        }
        Ok(Self {
            target: 0.0,
            epsilon,
            exempt_weight,
        })
    }

    /// Fixes the target to the mean id of the live actors.
    ///
    /// With no failed actors this is `(n - 1) / 2`, since initial sums are
    /// exactly `0..n` with unit weights.
    pub fn for_population(mut self, actors: &[NodeActor]) -> Self {
        let (count, total) = actors
            .iter()
            .filter(|a| a.is_live())
            .fold((0usize, 0.0f64), |(c, t), a| (c + 1, t + a.id as f64));
        self.target = if count == 0 { 0.0 } else { total / count as f64 };
        self
    }

    /// Average the population is converging to.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Convergence threshold.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Whether `actor` is skipped by the check.
    pub fn is_exempt(&self, actor: &NodeActor) -> bool {
        actor.weight < self.exempt_weight
    }

    /// Whether `actor` alone satisfies the bound.
    pub fn within_bound(&self, actor: &NodeActor) -> bool {
        (actor.ratio() - self.target).abs() < self.epsilon
    }
}

impl Default for PushSumConvergence {
    fn default() -> Self {
        Self {
            target: 0.0,
            epsilon: DEFAULT_EPSILON,
            exempt_weight: DEFAULT_EXEMPT_WEIGHT,
        }
    }
}

impl ConvergenceCriterion for PushSumConvergence {
    fn is_converged(&self, actors: &[NodeActor]) -> bool {
        actors
            .iter()
            .filter(|a| a.is_live() && !self.is_exempt(a))
            .all(|a| self.within_bound(a))
    }
}
