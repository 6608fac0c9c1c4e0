//! Run status and the flow/cost ledger carried across iterations.

use std::fmt;

use serde::Serialize;

/// Why a run stopped without converging.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    RoutingInvariant,
    CongestionInconsistency,
    Cancelled,
    IterationLimit,
    /// A network or demand error escaped an iteration.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RoutingInvariant        => "routing invariant violated",
            Self::CongestionInconsistency => "congestion inconsistency",
            Self::Cancelled               => "cancelled",
            Self::IterationLimit          => "iteration limit reached",
            Self::Internal                => "internal network or demand error",
        })
    }
}

/// Engine state machine: `Running → Converged | Failed`, both terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Running,
    Converged,
    Failed(FailureKind),
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running      => f.write_str("running"),
            Self::Converged    => f.write_str("converged"),
            Self::Failed(kind) => write!(f, "failed: {kind}"),
        }
    }
}

/// Totals as of the last fully committed iteration.
///
/// Flows are vehicles/day, cost is £/day.  At every iteration boundary
///
/// ```text
/// committed_flow + pending + stranded_flow + pruned_flow == initial_demand
/// ```
///
/// where `pending` is the demand pool's remaining total.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunState {
    /// Completed iterations.
    pub iteration:      u32,
    pub total_cost:     f64,
    pub committed_flow: f64,
    /// Demand that found no path and was dropped permanently.
    pub stranded_flow:  f64,
    /// Demand dropped for falling below the minimum flow.
    pub pruned_flow:    f64,
    pub initial_demand: f64,
    pub status:         RunStatus,
}

impl RunState {
    pub(crate) fn new(initial_demand: f64, pruned_flow: f64) -> Self {
        Self {
            iteration: 0,
            total_cost: 0.0,
            committed_flow: 0.0,
            stranded_flow: 0.0,
            pruned_flow,
            initial_demand,
            status: RunStatus::Running,
        }
    }

    /// `initial − (committed + pending + stranded + pruned)`; zero up to
    /// rounding when the ledger balances.
    pub fn conservation_residual(&self, pending: f64) -> f64 {
        self.initial_demand
            - (self.committed_flow + pending + self.stranded_flow + self.pruned_flow)
    }
}
