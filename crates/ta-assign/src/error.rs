use thiserror::Error;

use ta_core::{CoreError, EdgeId, NodeId};
use ta_demand::DemandError;
use ta_network::NetworkError;

use crate::state::FailureKind;

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("assignment configuration error: {0}")]
    Config(String),

    #[error("calibration error: {0}")]
    Configuration(#[from] CoreError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Demand(#[from] DemandError),

    #[error("iteration {iteration}: binding ratio {ratio} outside (0, 1) although capacity overflowed")]
    RoutingInvariant { iteration: u32, ratio: f64 },

    #[error("iteration {iteration}: {edge} has no resolvable speed (got {speed} mph)")]
    CongestionInconsistency {
        iteration: u32,
        edge:      EdgeId,
        speed:     f64,
    },

    #[error("run cancelled before iteration {iteration}")]
    Cancelled { iteration: u32 },

    #[error("iteration limit {limit} reached with {pending} vehicles/day still pending")]
    IterationLimit { limit: u32, pending: f64 },

    #[error("demand references {0}, which is not in the network")]
    UnknownNode(NodeId),

    #[error("disruption references {0}, which is not in the network")]
    UnknownEdge(EdgeId),

    #[error("reports cover different networks ({baseline} vs {disrupted} links)")]
    NetworkMismatch { baseline: usize, disrupted: usize },

    #[error("engine already failed ({0}); build a new engine to run again")]
    Terminated(FailureKind),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssignError {
    /// The terminal failure this error puts the engine into, if any.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::RoutingInvariant { .. }        => Some(FailureKind::RoutingInvariant),
            Self::CongestionInconsistency { .. } => Some(FailureKind::CongestionInconsistency),
            Self::Cancelled { .. }               => Some(FailureKind::Cancelled),
            Self::IterationLimit { .. }          => Some(FailureKind::IterationLimit),
            Self::Network(_) | Self::Demand(_)   => Some(FailureKind::Internal),
            _                                    => None,
        }
    }
}

pub type AssignResult<T> = Result<T, AssignError>;
