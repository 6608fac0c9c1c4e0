//! Network error type.

use thiserror::Error;

use ta_core::{CoreError, EdgeId, NodeId};

/// Errors produced by `ta-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("invalid link #{index}: {reason}")]
    InvalidLink { index: usize, reason: String },

    #[error("surviving link {edge} has no valid speed ({speed}); network is congested or disconnected")]
    UndefinedSpeed { edge: EdgeId, speed: f64 },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
