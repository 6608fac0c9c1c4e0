use thiserror::Error;

use ta_core::NodeId;

#[derive(Debug, Error)]
pub enum DemandError {
    #[error("demand parse error: {0}")]
    Parse(String),

    #[error("invalid flow {flow} for {origin} → {destination}")]
    InvalidFlow {
        origin:      NodeId,
        destination: NodeId,
        flow:        f64,
    },

    #[error("allocation ratio {0} outside (0, 1)")]
    InvalidRatio(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DemandResult<T> = Result<T, DemandError>;
