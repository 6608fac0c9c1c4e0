//! Road network representation, link state, and builder.
//!
//! # Data layout
//!
//! Links keep the `EdgeId` they were added with.  Traversal uses a
//! **Compressed Sparse Row (CSR)** array of *arcs*: an undirected link
//! contributes one arc from each endpoint, a one-way link a single arc.
//! Given a `NodeId n`, its outgoing arcs occupy
//!
//! ```text
//! arc_edge[ node_arc_start[n] .. node_arc_start[n+1] ]
//! ```
//!
//! so a Dijkstra relaxation is a contiguous memory scan.  Both directions of
//! an undirected link share one capacity and one flow.
//!
//! # Link state
//!
//! Static attributes ([`LinkAttrs`]) never change after `build()`.  The
//! mutable part ([`LinkState`]: accumulated flow, remaining capacity, speed,
//! weight, removal flag) lives next to them and is written only through
//! `apply_load`, `remove_edges` and `recompute_weights`.  Removal is
//! terminal: a removed link is skipped by routing and never restored.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

use ta_core::{Calibration, CostModel, EdgeId, GeoPoint, NodeId, RoadType};

use crate::{NetworkError, NetworkResult};

/// A link whose remaining capacity drops below this many vehicles/day is
/// removed from the network.
pub const REMOVAL_THRESHOLD: f64 = 1.0;

// ── R-tree node entry ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct NodeEntry {
    point: [f32; 2], // [lat, lon]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lon space.
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── Link records ──────────────────────────────────────────────────────────────

/// Immutable attributes of a link.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkAttrs {
    pub from:      NodeId,
    pub to:        NodeId,
    /// Length in miles.
    pub length:    f64,
    pub road_type: RoadType,
    pub urban:     bool,
    /// Toll charge in £ per passage.
    pub toll:      f64,
    /// Original daily capacity (vehicles/day).
    pub capacity:  f64,
    /// `true` for a one-way link (`from → to` only).
    pub directed:  bool,
}

/// Mutable per-link state carried across iterations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkState {
    /// Flow committed so far (vehicles/day).
    pub flow:      f64,
    /// Capacity still available (vehicles/day).
    pub remaining: f64,
    /// Current speed (mph).
    pub speed:     f64,
    /// Generalised cost of traversing the link at `speed` (£).
    pub weight:    f64,
    pub removed:   bool,
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Road graph in CSR form plus per-link state and a spatial index.
///
/// Do not construct directly; use [`RoadNetworkBuilder`].
pub struct RoadNetwork {
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    /// CSR row pointer, length `node_count + 1`.
    node_arc_start: Vec<u32>,
    /// Link traversed by each arc.
    arc_edge: Vec<EdgeId>,
    /// Head node of each arc.
    arc_head: Vec<NodeId>,

    links: Vec<LinkAttrs>,
    state: Vec<LinkState>,
    live:  usize,

    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    /// Number of links ever added, removed ones included.
    pub fn edge_count(&self) -> usize {
        self.links.len()
    }

    /// Number of links not yet removed.
    pub fn live_edge_count(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    #[inline]
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.node_pos.len()
    }

    // ── Link access ───────────────────────────────────────────────────────

    #[inline]
    pub fn link(&self, edge: EdgeId) -> &LinkAttrs {
        &self.links[edge.index()]
    }

    #[inline]
    pub fn state(&self, edge: EdgeId) -> &LinkState {
        &self.state[edge.index()]
    }

    #[inline]
    pub fn is_removed(&self, edge: EdgeId) -> bool {
        self.state[edge.index()].removed
    }

    /// Iterator over every link (removed ones included) in `EdgeId` order.
    pub fn links(&self) -> impl Iterator<Item = (EdgeId, &LinkAttrs, &LinkState)> + '_ {
        self.links
            .iter()
            .zip(self.state.iter())
            .enumerate()
            .map(|(i, (attrs, state))| (EdgeId(i as u32), attrs, state))
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Outgoing `(link, head node)` arcs of `node` on links not yet removed.
    #[inline]
    pub fn out_arcs(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId)> + '_ {
        let start = self.node_arc_start[node.index()] as usize;
        let end   = self.node_arc_start[node.index() + 1] as usize;
        (start..end)
            .map(|i| (self.arc_edge[i], self.arc_head[i]))
            .filter(|&(e, _)| !self.state[e.index()].removed)
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the `NodeId` of the nearest node to `pos` (zone centroid
    /// snapping).  `None` only if the network has no nodes.
    pub fn snap_to_node(&self, pos: GeoPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lat, pos.lon])
            .map(|e| e.id)
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Commit `load` vehicles/day onto `edge` and set its new `speed`.
    ///
    /// Flow is clamped to the original capacity and remaining capacity to
    /// zero, so `flow <= capacity` and `remaining >= 0` always hold.  The
    /// weight is left stale until [`recompute_weights`](Self::recompute_weights).
    pub fn apply_load(&mut self, edge: EdgeId, load: f64, speed: f64) {
        let capacity = self.links[edge.index()].capacity;
        let s = &mut self.state[edge.index()];
        s.flow      = (s.flow + load).min(capacity);
        s.remaining = (s.remaining - load).max(0.0);
        s.speed     = speed;
    }

    /// Permanently remove `edges`.  Already-removed links are ignored.
    ///
    /// Returns the number of links removed by this call.
    pub fn remove_edges(&mut self, edges: &[EdgeId]) -> usize {
        let mut removed = 0;
        for &e in edges {
            let s = &mut self.state[e.index()];
            if !s.removed {
                s.removed = true;
                removed += 1;
            }
        }
        self.live -= removed;
        removed
    }

    /// Live links whose remaining capacity is below `threshold`.
    pub fn links_below_capacity(&self, threshold: f64) -> Vec<EdgeId> {
        self.links()
            .filter(|(_, _, s)| !s.removed && s.remaining < threshold)
            .map(|(e, _, _)| e)
            .collect()
    }

    /// Re-derive the weight of every surviving link from its current speed.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UndefinedSpeed`] for the first survivor whose speed
    /// cannot produce a travel time.  No weight is written in that case.
    pub fn recompute_weights(&mut self, cost: &CostModel) -> NetworkResult<()> {
        let mut weights = Vec::with_capacity(self.live);
        for (e, attrs, s) in self.links() {
            if s.removed {
                continue;
            }
            let w = cost
                .link_weight(attrs.length, s.speed, attrs.toll)
                .map_err(|_| NetworkError::UndefinedSpeed { edge: e, speed: s.speed })?;
            weights.push((e, w));
        }
        for (e, w) in weights {
            self.state[e.index()].weight = w;
        }
        Ok(())
    }
}

// ── LinkSpec ──────────────────────────────────────────────────────────────────

/// Input description of one link, consumed by [`RoadNetworkBuilder`].
///
/// Capacity and free-flow speed default to the calibration values for the
/// link's road type.
#[derive(Clone, Debug)]
pub struct LinkSpec {
    pub from:            NodeId,
    pub to:              NodeId,
    pub length:          f64,
    pub road_type:       RoadType,
    pub urban:           bool,
    pub toll:            f64,
    pub capacity:        Option<f64>,
    pub free_flow_speed: Option<f64>,
    pub directed:        bool,
}

impl LinkSpec {
    /// An undirected, non-urban, toll-free link.
    pub fn new(from: NodeId, to: NodeId, length: f64, road_type: RoadType) -> Self {
        Self {
            from,
            to,
            length,
            road_type,
            urban:           false,
            toll:            0.0,
            capacity:        None,
            free_flow_speed: None,
            directed:        false,
        }
    }

    pub fn urban(mut self, urban: bool) -> Self {
        self.urban = urban;
        self
    }

    pub fn toll(mut self, toll: f64) -> Self {
        self.toll = toll;
        self
    }

    pub fn capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn free_flow_speed(mut self, speed: f64) -> Self {
        self.free_flow_speed = Some(speed);
        self
    }

    pub fn one_way(mut self) -> Self {
        self.directed = true;
        self
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use ta_core::{Calibration, CostModel, GeoPoint, RoadType};
/// use ta_network::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_node(GeoPoint::new(51.50, -0.12));
/// let c = b.add_node(GeoPoint::new(51.52, -0.10));
/// b.add_road(a, c, 1.5, RoadType::ADual);
/// let net = b.build(&Calibration::indicative(), &CostModel::default()).unwrap();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 1);
/// ```
pub struct RoadNetworkBuilder {
    nodes: Vec<GeoPoint>,
    links: Vec<LinkSpec>,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), links: Vec::new() }
    }

    /// Pre-allocate for the expected number of nodes and links.
    pub fn with_capacity(nodes: usize, links: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            links: Vec::with_capacity(links),
        }
    }

    /// Add a node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a link and return its `EdgeId` (sequential from 0).
    pub fn add_link(&mut self, spec: LinkSpec) -> EdgeId {
        let id = EdgeId(self.links.len() as u32);
        self.links.push(spec);
        id
    }

    /// Convenience: an undirected link with calibration defaults.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, length: f64, road_type: RoadType) -> EdgeId {
        self.add_link(LinkSpec::new(a, b, length, road_type))
    }

    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.links.len() }

    /// Validate links, derive initial state, and produce a [`RoadNetwork`].
    ///
    /// Each link starts with zero flow, its full capacity, the free-flow
    /// speed of its class and the matching weight.  A link whose capacity is
    /// already below [`REMOVAL_THRESHOLD`] starts removed.
    pub fn build(self, calibration: &Calibration, cost: &CostModel) -> NetworkResult<RoadNetwork> {
        let node_count = self.nodes.len();
        let mut links = Vec::with_capacity(self.links.len());
        let mut state = Vec::with_capacity(self.links.len());

        for (index, spec) in self.links.into_iter().enumerate() {
            for node in [spec.from, spec.to] {
                if node.index() >= node_count {
                    return Err(NetworkError::NodeNotFound(node));
                }
            }
            if !(spec.length.is_finite() && spec.length >= 0.0) {
                return Err(invalid(index, format!("length {}", spec.length)));
            }
            if !(spec.toll.is_finite() && spec.toll >= 0.0) {
                return Err(invalid(index, format!("toll {}", spec.toll)));
            }
            let capacity = spec.capacity.unwrap_or(calibration.initial_capacity[spec.road_type]);
            if !(capacity.is_finite() && capacity >= 0.0) {
                return Err(invalid(index, format!("capacity {capacity}")));
            }
            let speed  = spec.free_flow_speed.unwrap_or(calibration.free_flow_speed[spec.road_type]);
            let weight = cost.link_weight(spec.length, speed, spec.toll)?;
            let removed = capacity < REMOVAL_THRESHOLD;
            if removed {
                debug!(link = index, capacity, "link starts without usable capacity");
            }

            state.push(LinkState { flow: 0.0, remaining: capacity, speed, weight, removed });
            links.push(LinkAttrs {
                from:      spec.from,
                to:        spec.to,
                length:    spec.length,
                road_type: spec.road_type,
                urban:     spec.urban,
                toll:      spec.toll,
                capacity,
                directed:  spec.directed,
            });
        }

        // Arcs: (tail, link, head), one per traversable direction.
        let mut arcs: Vec<(NodeId, EdgeId, NodeId)> = Vec::with_capacity(links.len() * 2);
        for (i, l) in links.iter().enumerate() {
            let e = EdgeId(i as u32);
            arcs.push((l.from, e, l.to));
            if !l.directed {
                arcs.push((l.to, e, l.from));
            }
        }
        arcs.sort_by_key(|&(tail, e, _)| (tail.0, e.0));

        let mut node_arc_start = vec![0u32; node_count + 1];
        for &(tail, _, _) in &arcs {
            node_arc_start[tail.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_arc_start[i] += node_arc_start[i - 1];
        }
        let arc_edge = arcs.iter().map(|&(_, e, _)| e).collect();
        let arc_head = arcs.iter().map(|&(_, _, h)| h).collect();

        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry { point: [pos.lat, pos.lon], id: NodeId(i as u32) })
            .collect();

        let live = state.iter().filter(|s| !s.removed).count();

        Ok(RoadNetwork {
            node_pos: self.nodes,
            node_arc_start,
            arc_edge,
            arc_head,
            links,
            state,
            live,
            spatial_idx: RTree::bulk_load(entries),
        })
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(index: usize, reason: String) -> NetworkError {
    NetworkError::InvalidLink { index, reason }
}
