//! Plain data row types written by output backends.

use ta_assign::{IterationSummary, LinkResult, OdPathRecord};

/// One line of `iterations.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRow {
    pub iteration:      u32,
    /// `"accept"` or `"throttle"`.
    pub branch:         &'static str,
    pub ratio:          f64,
    /// `u32::MAX` when no link bound the ratio.
    pub binding_edge:   u32,
    pub pending_before: f64,
    pub committed:      f64,
    pub stranded:       f64,
    pub pruned:         f64,
    pub links_removed:  u64,
    pub cost:           f64,
    pub pending_after:  f64,
}

impl From<&IterationSummary> for IterationRow {
    fn from(s: &IterationSummary) -> Self {
        Self {
            iteration:      s.iteration,
            branch:         s.branch.as_str(),
            ratio:          s.ratio,
            binding_edge:   s.binding_edge.map_or(u32::MAX, |e| e.0),
            pending_before: s.pending_before,
            committed:      s.committed,
            stranded:       s.stranded,
            pruned:         s.pruned,
            links_removed:  s.links_removed as u64,
            cost:           s.cost,
            pending_after:  s.pending_after,
        }
    }
}

/// Final state of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRow {
    pub edge_id:   u32,
    pub from_node: u32,
    pub to_node:   u32,
    pub road_type: &'static str,
    pub urban:     bool,
    pub length:    f64,
    pub capacity:  f64,
    pub flow:      f64,
    pub remaining: f64,
    pub speed:     f64,
    pub removed:   bool,
}

impl From<&LinkResult> for LinkRow {
    fn from(l: &LinkResult) -> Self {
        Self {
            edge_id:   l.edge.0,
            from_node: l.from.0,
            to_node:   l.to.0,
            road_type: l.road_type.as_str(),
            urban:     l.urban,
            length:    l.length,
            capacity:  l.capacity,
            flow:      l.flow,
            remaining: l.remaining,
            speed:     l.speed,
            removed:   l.removed,
        }
    }
}

/// One OD pair's committed (or stranded) flow in one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct OdPathRow {
    pub iteration:   u32,
    pub origin:      u32,
    pub destination: u32,
    pub flow:        f64,
    pub cost:        f64,
    pub stranded:    bool,
    /// Edge ids joined with `;`; empty when stranded or origin = destination.
    pub path:        String,
}

impl From<&OdPathRecord> for OdPathRow {
    fn from(r: &OdPathRecord) -> Self {
        let path = r
            .path
            .as_ref()
            .map(|edges| edges.iter().map(|e| e.0.to_string()).collect::<Vec<_>>().join(";"))
            .unwrap_or_default();
        Self {
            iteration:   r.iteration,
            origin:      r.origin.0,
            destination: r.destination.0,
            flow:        r.flow,
            cost:        r.cost,
            stranded:    r.is_stranded(),
            path,
        }
    }
}
