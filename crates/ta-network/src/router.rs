//! Shortest-path trait and default multi-target Dijkstra.
//!
//! # Pluggability
//!
//! The assignment engine routes through the [`ShortestPathRouter`] trait, so
//! a contraction hierarchy or bidirectional search can replace the default
//! [`DijkstraRouter`] without touching the engine.
//!
//! # One search per origin
//!
//! Demand is grouped by origin, and a single search from the origin answers
//! every destination of that origin.  The search stops as soon as all
//! requested destinations are settled.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ta_core::{EdgeId, NodeId};

use crate::network::RoadNetwork;

// ── Route ─────────────────────────────────────────────────────────────────────

/// An ordered list of links from an origin to a destination and its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Links to traverse in order, from origin to destination.
    pub edges: Vec<EdgeId>,
    /// Sum of link weights along the route (£).
    pub cost: f64,
}

impl Route {
    /// `true` if origin and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable shortest-path engine.
///
/// Implementations must be `Send + Sync`: the engine calls them from Rayon
/// workers, one origin per task, against a shared immutable network.
pub trait ShortestPathRouter: Send + Sync {
    /// Cheapest route from `origin` to each of `destinations` under the
    /// current link weights.
    ///
    /// The result is index-aligned with `destinations`; `None` means the
    /// destination is unreachable over the links not yet removed.
    fn shortest_paths(
        &self,
        network:      &RoadNetwork,
        origin:       NodeId,
        destinations: &[NodeId],
    ) -> Vec<Option<Route>>;
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Dijkstra's algorithm over the CSR arcs, weighted by current link weights.
pub struct DijkstraRouter;

impl ShortestPathRouter for DijkstraRouter {
    fn shortest_paths(
        &self,
        network:      &RoadNetwork,
        origin:       NodeId,
        destinations: &[NodeId],
    ) -> Vec<Option<Route>> {
        dijkstra(network, origin, destinations)
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// Heap key: total order on non-negative finite costs.
#[derive(Copy, Clone, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

fn dijkstra(network: &RoadNetwork, origin: NodeId, destinations: &[NodeId]) -> Vec<Option<Route>> {
    let n = network.node_count();
    if !network.contains_node(origin) {
        return vec![None; destinations.len()];
    }

    // Targets still to settle.  Duplicates and the origin itself count once.
    let mut is_target = vec![false; n];
    let mut pending = 0usize;
    for &d in destinations {
        if network.contains_node(d) && d != origin && !is_target[d.index()] {
            is_target[d.index()] = true;
            pending += 1;
        }
    }

    let mut dist      = vec![f64::INFINITY; n];
    let mut settled   = vec![false; n];
    // (link, predecessor node) that reached each node.
    let mut prev      = vec![(EdgeId::INVALID, NodeId::INVALID); n];

    dist[origin.index()] = 0.0;

    // Min-heap on (cost, node); NodeId breaks ties deterministically.
    let mut heap: BinaryHeap<Reverse<(Cost, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((Cost(0.0), origin)));

    while pending > 0 {
        let Some(Reverse((Cost(cost), node))) = heap.pop() else {
            break;
        };
        if settled[node.index()] {
            continue;
        }
        settled[node.index()] = true;
        if is_target[node.index()] {
            pending -= 1;
        }

        for (edge, head) in network.out_arcs(node) {
            if settled[head.index()] {
                continue;
            }
            let new_cost = cost + network.state(edge).weight;
            if new_cost < dist[head.index()] {
                dist[head.index()] = new_cost;
                prev[head.index()] = (edge, node);
                heap.push(Reverse((Cost(new_cost), head)));
            }
        }
    }

    destinations
        .iter()
        .map(|&d| {
            if d == origin {
                Some(Route { edges: vec![], cost: 0.0 })
            } else if network.contains_node(d) && settled[d.index()] {
                Some(reconstruct(&prev, origin, d, dist[d.index()]))
            } else {
                None
            }
        })
        .collect()
}

fn reconstruct(prev: &[(EdgeId, NodeId)], origin: NodeId, to: NodeId, cost: f64) -> Route {
    let mut edges = Vec::new();
    let mut cur = to;
    while cur != origin {
        let (e, p) = prev[cur.index()];
        edges.push(e);
        cur = p;
    }
    edges.reverse();
    Route { edges, cost }
}
