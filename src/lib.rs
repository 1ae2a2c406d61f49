//! Rumor: a Rust library simulating two canonical information-propagation
//! protocols, gossip (rumor spreading) and push-sum (distributed averaging),
//! over configurable network topologies with optional node or link failure
//! injection. A run reports the number of synchronous rounds the population
//! needed to reach the protocol's convergence criterion.
//!
//! # Features
//! - Full, line, grid and imperfect-grid topologies.
//! - Pure actor state machine driven by routed messages.
//! - Deterministic, seed-driven round scheduler with a hard round cap.
//! - Node and connection failure models.
//! - Concurrent parameter sweeps with CSV export, run on Tokio's blocking pool.
//!
//! # Example
//! ```
//! use rumor::{simulate, Algorithm, FixedSeed, SimError, SimulationConfig, Topology};
//!
//! # fn example() -> Result<(), SimError> {
//! let config = SimulationConfig::new(10, Topology::Full, Algorithm::PushSum)?;
//! let result = simulate(&config, &FixedSeed(42))?;
//! println!("converged in {} rounds", result.rounds_taken);
//! # Ok(())
//! # }
//! ```

mod config;
mod consensus;
mod error;
mod failure;
mod network;
mod rng;
mod simulation;
mod state_machine;
mod sweep;
mod topology;
mod types;

pub use config::{Algorithm, Params, SimulationConfig, DEFAULT_ROUND_CAP};
pub use consensus::{ConvergenceCriterion, GossipConvergence, PushSumConvergence};
pub use error::{SimError, SimResult};
pub use failure::{inject, FailureKind, FailureModel, FailureReport};
pub use network::{Network, RoundOutcome};
pub use rng::{lcg_next, ClockSeed, EntropySeed, FixedSeed, Lcg, SeedProvider};
pub use simulation::{simulate, Simulation};
pub use state_machine::{spawn_actors, ActorStateMachine, NodeActor, StateMachine};
pub use sweep::{run_sweep, write_csv, SweepPlan, SweepRecord, CSV_HEADER};
pub use topology::{build, build_with_width, Adjacency, Topology};
pub use types::{Envelope, Message, NodeId, SimulationResult};
