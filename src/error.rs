use thiserror::Error;

/// Errors that can occur while configuring or running simulations.
///
/// The round engine itself is infallible; every variant here comes from
/// configuration, task orchestration or I/O around it.
#[derive(Error, Debug)]
pub enum SimError {
    /// Node count must be at least one.
    #[error("invalid node count: {0}")]
    InvalidNodeCount(usize),

    /// Topology token not recognised.
    #[error("unknown topology: {0}")]
    UnknownTopology(String),

    /// Algorithm token not recognised.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Failure model token not recognised.
    #[error("unknown failure model: {0}")]
    UnknownFailureModel(String),

    /// Failure rate outside [0, 1].
    #[error("failure rate out of range: {0}")]
    FailureRateOutOfRange(f64),

    /// A protocol parameter failed validation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Task execution failed.
    #[error("task execution failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Reading parameters or writing results failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Parameter file or result could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
