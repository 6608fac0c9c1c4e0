//! Pending origin-destination demand.
//!
//! Flows are held per origin in two index-aligned vectors so that one
//! shortest-path search per origin can be answered with a single slice of
//! destinations.  Origins are kept in a `BTreeMap` so that iteration order,
//! and therefore every downstream aggregate, is deterministic.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use ta_core::NodeId;

use crate::{DemandError, DemandResult};

/// Pending flows below this many vehicles/day are dropped.
pub const MIN_FLOW: f64 = 1.0;

// ── OdFlow ────────────────────────────────────────────────────────────────────

/// One origin-destination request with its pending flow (vehicles/day).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OdFlow {
    pub origin:      NodeId,
    pub destination: NodeId,
    pub flow:        f64,
}

impl OdFlow {
    pub fn new(origin: NodeId, destination: NodeId, flow: f64) -> Self {
        Self { origin, destination, flow }
    }
}

// ── OdList ────────────────────────────────────────────────────────────────────

/// Destinations of one origin and their pending flows, index-aligned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OdList {
    destinations: Vec<NodeId>,
    flows:        Vec<f64>,
}

impl OdList {
    pub fn destinations(&self) -> &[NodeId] {
        &self.destinations
    }

    pub fn flows(&self) -> &[f64] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.flows.iter().sum()
    }

    fn position(&self, destination: NodeId) -> Option<usize> {
        self.destinations.iter().position(|&d| d == destination)
    }

    /// Drop every entry for which `keep` returns `false`, preserving order.
    /// Returns the total flow removed.
    fn retain(&mut self, mut keep: impl FnMut(NodeId, f64) -> bool) -> f64 {
        let mut removed = 0.0;
        let mut w = 0;
        for r in 0..self.destinations.len() {
            let (d, f) = (self.destinations[r], self.flows[r]);
            if keep(d, f) {
                self.destinations[w] = d;
                self.flows[w] = f;
                w += 1;
            } else {
                removed += f;
            }
        }
        self.destinations.truncate(w);
        self.flows.truncate(w);
        removed
    }
}

// ── DemandPool ────────────────────────────────────────────────────────────────

/// The demand still waiting to be assigned.
///
/// Every mutating operation returns the flow it took out of the pool so the
/// caller can keep an exact conservation ledger.
#[derive(Clone, Debug)]
pub struct DemandPool {
    by_origin: BTreeMap<NodeId, OdList>,
    min_flow:  f64,
}

impl Default for DemandPool {
    fn default() -> Self {
        Self::new()
    }
}

impl DemandPool {
    pub fn new() -> Self {
        Self { by_origin: BTreeMap::new(), min_flow: MIN_FLOW }
    }

    /// Use a pruning threshold other than [`MIN_FLOW`].
    pub fn with_min_flow(mut self, min_flow: f64) -> Self {
        self.min_flow = min_flow;
        self
    }

    pub fn min_flow(&self) -> f64 {
        self.min_flow
    }

    /// Build a pool from a flat list, merging duplicate pairs by summing.
    pub fn from_flows(flows: impl IntoIterator<Item = OdFlow>) -> DemandResult<Self> {
        let mut pool = Self::new();
        let mut slot: FxHashMap<(NodeId, NodeId), usize> = FxHashMap::default();
        for od in flows {
            validate(&od)?;
            let list = pool.by_origin.entry(od.origin).or_default();
            match slot.get(&(od.origin, od.destination)) {
                Some(&i) => list.flows[i] += od.flow,
                None => {
                    slot.insert((od.origin, od.destination), list.len());
                    list.destinations.push(od.destination);
                    list.flows.push(od.flow);
                }
            }
        }
        Ok(pool)
    }

    /// Add `flow` for one pair, merging with any existing entry.
    pub fn insert(&mut self, origin: NodeId, destination: NodeId, flow: f64) -> DemandResult<()> {
        validate(&OdFlow::new(origin, destination, flow))?;
        let list = self.by_origin.entry(origin).or_default();
        match list.position(destination) {
            Some(i) => list.flows[i] += flow,
            None => {
                list.destinations.push(destination);
                list.flows.push(flow);
            }
        }
        Ok(())
    }

    /// Origins with pending demand, in ascending `NodeId` order.
    pub fn origins(&self) -> impl Iterator<Item = (NodeId, &OdList)> + '_ {
        self.by_origin.iter().map(|(&o, list)| (o, list))
    }

    /// Flat list of every pending request, ordered by origin then insertion.
    pub fn snapshot(&self) -> Vec<OdFlow> {
        self.origins()
            .flat_map(|(o, list)| {
                list.destinations
                    .iter()
                    .zip(&list.flows)
                    .map(move |(&d, &f)| OdFlow::new(o, d, f))
            })
            .collect()
    }

    /// Pending flow for one pair, if present.
    pub fn flow(&self, origin: NodeId, destination: NodeId) -> Option<f64> {
        let list = self.by_origin.get(&origin)?;
        list.position(destination).map(|i| list.flows[i])
    }

    /// Take the allocated share `r` of every flow out of the pool.
    ///
    /// The pending share `1 − r` remains.  Entries that fall below the
    /// pruning threshold are dropped and their flow is returned.
    pub fn apply_ratio(&mut self, r: f64) -> DemandResult<f64> {
        if !(r > 0.0 && r < 1.0) {
            return Err(DemandError::InvalidRatio(r));
        }
        let keep = 1.0 - r;
        for list in self.by_origin.values_mut() {
            for f in &mut list.flows {
                *f *= keep;
            }
        }
        Ok(self.prune())
    }

    /// Remove pairs that had no path and return their total flow.
    ///
    /// Pairs not present in the pool are ignored.
    pub fn drop_unroutable(&mut self, pairs: &[(NodeId, NodeId)]) -> f64 {
        self.remove_set(pairs)
    }

    /// Remove pairs whose flow was fully allocated and return their total.
    pub fn remove_pairs(&mut self, pairs: &[(NodeId, NodeId)]) -> f64 {
        self.remove_set(pairs)
    }

    /// Drop entries below the pruning threshold and empty origins.
    /// Returns the flow dropped.
    pub fn prune(&mut self) -> f64 {
        let min = self.min_flow;
        let mut dropped = 0.0;
        for list in self.by_origin.values_mut() {
            dropped += list.retain(|_, f| f >= min);
        }
        self.by_origin.retain(|_, list| !list.is_empty());
        dropped
    }

    pub fn total_flow(&self) -> f64 {
        self.by_origin.values().map(OdList::total).sum()
    }

    pub fn pair_count(&self) -> usize {
        self.by_origin.values().map(OdList::len).sum()
    }

    pub fn origin_count(&self) -> usize {
        self.by_origin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_origin.is_empty()
    }

    fn remove_set(&mut self, pairs: &[(NodeId, NodeId)]) -> f64 {
        if pairs.is_empty() {
            return 0.0;
        }
        let mut by_origin: FxHashMap<NodeId, FxHashSet<NodeId>> = FxHashMap::default();
        for &(o, d) in pairs {
            by_origin.entry(o).or_default().insert(d);
        }
        let mut removed = 0.0;
        for (o, dests) in &by_origin {
            if let Some(list) = self.by_origin.get_mut(o) {
                removed += list.retain(|d, _| !dests.contains(&d));
                if list.is_empty() {
                    self.by_origin.remove(o);
                }
            }
        }
        removed
    }
}

fn validate(od: &OdFlow) -> DemandResult<()> {
    if od.flow.is_finite() && od.flow >= 0.0 {
        Ok(())
    } else {
        Err(DemandError::InvalidFlow {
            origin:      od.origin,
            destination: od.destination,
            flow:        od.flow,
        })
    }
}
