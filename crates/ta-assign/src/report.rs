//! Read-only results: per-iteration summaries, per-link results, and the
//! OD path ledger.

use serde::Serialize;

use ta_core::{EdgeId, NodeId, RoadType};
use ta_network::RoadNetwork;

use crate::state::{RunState, RunStatus};

// ── Iteration summary ─────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Branch {
    Accept,
    Throttle,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept   => "accept",
            Self::Throttle => "throttle",
        }
    }
}

/// What one iteration did.  Flows are vehicles/day, cost £/day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationSummary {
    /// 1-based.
    pub iteration:      u32,
    pub branch:         Branch,
    /// Share of routed demand committed: 1 on accept, the binding ratio on
    /// throttle.
    pub ratio:          f64,
    pub binding_edge:   Option<EdgeId>,
    pub pending_before: f64,
    pub committed:      f64,
    pub stranded:       f64,
    pub pruned:         f64,
    pub loaded_links:   usize,
    pub links_removed:  usize,
    pub cost:           f64,
    pub pending_after:  f64,
}

// ── OD ledger ─────────────────────────────────────────────────────────────────

/// The flow one OD pair committed in one iteration and the path it took.
///
/// `path` is `None` for demand stranded in that iteration; `flow` is then
/// the stranded amount.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OdPathRecord {
    pub iteration:   u32,
    pub origin:      NodeId,
    pub destination: NodeId,
    pub flow:        f64,
    /// Route cost per vehicle (£) under the weights the path was chosen on.
    pub cost:        f64,
    pub path:        Option<Vec<EdgeId>>,
}

impl OdPathRecord {
    pub fn is_stranded(&self) -> bool {
        self.path.is_none()
    }

    pub fn crosses(&self, edge: EdgeId) -> bool {
        self.path.as_ref().is_some_and(|p| p.contains(&edge))
    }
}

// ── Final report ──────────────────────────────────────────────────────────────

/// Final state of one link.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkResult {
    pub edge:      EdgeId,
    pub from:      NodeId,
    pub to:        NodeId,
    pub road_type: RoadType,
    pub urban:     bool,
    pub length:    f64,
    pub capacity:  f64,
    pub flow:      f64,
    pub remaining: f64,
    pub speed:     f64,
    pub weight:    f64,
    pub removed:   bool,
}

/// Everything a caller needs after a run, detached from the engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssignmentReport {
    pub status:         RunStatus,
    pub iterations:     u32,
    pub total_cost:     f64,
    pub committed_flow: f64,
    pub stranded_flow:  f64,
    pub pruned_flow:    f64,
    pub pending_flow:   f64,
    pub initial_demand: f64,
    pub links:          Vec<LinkResult>,
}

impl AssignmentReport {
    pub(crate) fn new(state: &RunState, pending_flow: f64, network: &RoadNetwork) -> Self {
        Self {
            status:         state.status,
            iterations:     state.iteration,
            total_cost:     state.total_cost,
            committed_flow: state.committed_flow,
            stranded_flow:  state.stranded_flow,
            pruned_flow:    state.pruned_flow,
            pending_flow,
            initial_demand: state.initial_demand,
            links:          link_results(network),
        }
    }

    pub fn removed_links(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.links.iter().filter(|l| l.removed).map(|l| l.edge)
    }
}

pub fn link_results(network: &RoadNetwork) -> Vec<LinkResult> {
    network
        .links()
        .map(|(edge, a, s)| LinkResult {
            edge,
            from:      a.from,
            to:        a.to,
            road_type: a.road_type,
            urban:     a.urban,
            length:    a.length,
            capacity:  a.capacity,
            flow:      s.flow,
            remaining: s.remaining,
            speed:     s.speed,
            weight:    s.weight,
            removed:   s.removed,
        })
        .collect()
}
