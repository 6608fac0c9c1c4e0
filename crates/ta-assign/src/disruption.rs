//! Baseline-versus-disrupted comparison.
//!
//! A disruption is a set of links closed before the run (e.g. the links a
//! flood extent intersects).  Two complete runs, one on the intact network
//! and one on the disrupted network, are compared by
//! [`DisruptionImpact::compare`].  [`affected_demand`] extracts the OD flow
//! whose baseline path crossed a closed link, ready for a rerouting run.

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::info;

use ta_core::EdgeId;
use ta_demand::{DemandPool, OdFlow};
use ta_network::{LinkAttrs, RoadNetwork};

use crate::report::{AssignmentReport, OdPathRecord};
use crate::{AssignError, AssignResult};

// ── Disruption ────────────────────────────────────────────────────────────────

/// Links closed for the whole run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Disruption {
    edges: Vec<EdgeId>,
}

impl Disruption {
    pub fn new(edges: impl IntoIterator<Item = EdgeId>) -> Self {
        let mut edges: Vec<EdgeId> = edges.into_iter().collect();
        edges.sort_unstable();
        edges.dedup();
        Self { edges }
    }

    /// Every link of `network` for which `closed` returns `true`.
    pub fn select(network: &RoadNetwork, mut closed: impl FnMut(EdgeId, &LinkAttrs) -> bool) -> Self {
        Self::new(network.links().filter(|(e, a, _)| closed(*e, *a)).map(|(e, _, _)| e))
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Remove the closed links from `network`.  Returns how many were still
    /// open.
    pub fn apply(&self, network: &mut RoadNetwork) -> AssignResult<usize> {
        if let Some(&bad) = self.edges.iter().find(|e| e.index() >= network.edge_count()) {
            return Err(AssignError::UnknownEdge(bad));
        }
        let closed = network.remove_edges(&self.edges);
        info!(requested = self.edges.len(), closed, "disruption applied");
        Ok(closed)
    }
}

// ── Impact ────────────────────────────────────────────────────────────────────

/// How a disruption changes the outcome of an assignment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisruptionImpact {
    pub baseline_cost:       f64,
    pub disrupted_cost:      f64,
    /// `disrupted_cost − baseline_cost` (£/day).
    pub cost_escalation:     f64,
    /// Escalation as a percentage of the baseline; `None` for a zero-cost
    /// baseline.
    pub cost_escalation_pct: Option<f64>,
    pub baseline_stranded:   f64,
    pub disrupted_stranded:  f64,
    /// `disrupted_stranded − baseline_stranded` (vehicles/day).
    pub stranded_delta:      f64,
    /// Links removed at the end of the disrupted run but open at the end of
    /// the baseline run.
    pub links_lost:          usize,
}

impl DisruptionImpact {
    /// Compare two runs over the same network.
    ///
    /// # Errors
    ///
    /// [`AssignError::NetworkMismatch`] if the reports have different link
    /// counts.
    pub fn compare(baseline: &AssignmentReport, disrupted: &AssignmentReport) -> AssignResult<Self> {
        if baseline.links.len() != disrupted.links.len() {
            return Err(AssignError::NetworkMismatch {
                baseline:  baseline.links.len(),
                disrupted: disrupted.links.len(),
            });
        }

        let cost_escalation = disrupted.total_cost - baseline.total_cost;
        let cost_escalation_pct = (baseline.total_cost > 0.0)
            .then(|| 100.0 * cost_escalation / baseline.total_cost);

        let links_lost = baseline
            .links
            .iter()
            .zip(&disrupted.links)
            .filter(|(b, d)| !b.removed && d.removed)
            .count();

        Ok(Self {
            baseline_cost:      baseline.total_cost,
            disrupted_cost:     disrupted.total_cost,
            cost_escalation,
            cost_escalation_pct,
            baseline_stranded:  baseline.stranded_flow,
            disrupted_stranded: disrupted.stranded_flow,
            stranded_delta:     disrupted.stranded_flow - baseline.stranded_flow,
            links_lost,
        })
    }
}

// ── Affected demand ───────────────────────────────────────────────────────────

/// OD flow whose recorded path crossed any of `removed`, summed per pair.
///
/// Stranded records have no path and are never affected.
pub fn affected_demand(ledger: &[OdPathRecord], removed: &[EdgeId]) -> AssignResult<DemandPool> {
    let removed: FxHashSet<EdgeId> = removed.iter().copied().collect();
    let flows = ledger
        .iter()
        .filter(|rec| rec.path.as_ref().is_some_and(|p| p.iter().any(|e| removed.contains(e))))
        .map(|rec| OdFlow::new(rec.origin, rec.destination, rec.flow));
    DemandPool::from_flows(flows).map_err(AssignError::from)
}
