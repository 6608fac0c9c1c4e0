//! The `AssignmentEngine` and its iteration loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;
use tracing::{debug, error, info, warn};

use ta_core::{CostModel, EdgeId, NodeId, SpeedFlowModel};
use ta_demand::{DemandPool, OdList};
use ta_network::{NetworkError, RoadNetwork, Route, ShortestPathRouter};

use crate::policy::{LoadDecision, LoadPolicy, UniformThrottle};
use crate::report::{AssignmentReport, Branch, IterationSummary, OdPathRecord};
use crate::state::{RunState, RunStatus};
use crate::{AssignError, AssignResult, AssignmentConfig, AssignmentObserver, NoopObserver};

// ── Per-iteration records ─────────────────────────────────────────────────────

/// One OD pair's routing outcome for the current iteration.
///
/// `route` is `None` when the destination is unreachable.  `flow` is the
/// pair's whole pending demand.
#[derive(Clone, Debug)]
pub struct PathAssignment {
    pub origin:      NodeId,
    pub destination: NodeId,
    pub route:       Option<Route>,
    pub flow:        f64,
}

/// A validated link update, written only once the whole iteration checks out.
struct StagedLoad {
    edge:  EdgeId,
    load:  f64,
    speed: f64,
    cost:  f64,
}

// ── AssignmentEngine ──────────────────────────────────────────────────────────

/// Capacity-restrained all-or-nothing assignment.
///
/// Each iteration:
///
/// 1. **Route** every pending OD pair on its cheapest path (one search per
///    origin, parallel with the `parallel` feature).
/// 2. **Aggregate** proposed loads per link.
/// 3. **Decide** via the [`LoadPolicy`]: accept everything, or throttle all
///    flows by one ratio `0 < r < 1`.
/// 4. **Stage** the new flow, speed, and cost of every loaded link and
///    check that every surviving link still has a usable speed.
/// 5. **Shrink demand**: strand unroutable pairs, then remove allocated
///    pairs (accept) or keep the unallocated share (throttle).
/// 6. **Commit** the staged link updates and the cost.
/// 7. **Mutate graph**: remove exhausted links, recompute weights.
/// 8. **Converge** once no demand is pending.
///
/// Every fallible check runs before step 5 writes anything, so a fatal
/// error leaves the last committed iteration intact.  Errors that still
/// escape an iteration put the engine into a terminal failed state.
///
/// Create via [`AssignmentBuilder`][crate::AssignmentBuilder].
pub struct AssignmentEngine<R: ShortestPathRouter, P: LoadPolicy = UniformThrottle> {
    pub(crate) config:     AssignmentConfig,
    pub(crate) network:    RoadNetwork,
    pub(crate) demand:     DemandPool,
    pub(crate) speed_flow: SpeedFlowModel,
    pub(crate) cost:       CostModel,
    pub(crate) router:     R,
    pub(crate) policy:     P,
    pub(crate) state:      RunState,
    pub(crate) ledger:     Vec<OdPathRecord>,
    pub(crate) history:    Vec<IterationSummary>,
    pub(crate) cancel:     Arc<AtomicBool>,
    #[cfg(feature = "parallel")]
    pub(crate) pool:       Option<rayon::ThreadPool>,
}

impl<R: ShortestPathRouter, P: LoadPolicy> AssignmentEngine<R, P> {
    // ── Public API ────────────────────────────────────────────────────────

    /// Iterate until the demand pool is empty.
    ///
    /// A converged engine returns immediately without calling the observer.
    /// A failed engine returns [`AssignError::Terminated`].
    pub fn run<O: AssignmentObserver>(&mut self, observer: &mut O) -> AssignResult<&RunState> {
        match self.state.status {
            RunStatus::Converged    => return Ok(&self.state),
            RunStatus::Failed(kind) => return Err(AssignError::Terminated(kind)),
            RunStatus::Running      => {}
        }

        let result = loop {
            match self.advance(observer) {
                Ok(Some(_)) => {}
                Ok(None)    => break Ok(()),
                Err(e)      => break Err(e),
            }
        };

        observer.on_run_end(&self.state, &self.network, &self.ledger);
        result.map(|()| &self.state)
    }

    /// Run exactly one iteration.
    ///
    /// Returns `None` once the run has converged.
    pub fn step(&mut self) -> AssignResult<Option<IterationSummary>> {
        self.advance(&mut NoopObserver)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn status(&self) -> RunStatus {
        self.state.status
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// Demand still waiting to be assigned.
    pub fn demand(&self) -> &DemandPool {
        &self.demand
    }

    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    /// Every committed OD path so far (empty unless `record_paths`).
    pub fn ledger(&self) -> &[OdPathRecord] {
        &self.ledger
    }

    pub fn history(&self) -> &[IterationSummary] {
        &self.history
    }

    /// Flag checked at each iteration boundary; set it to stop the run.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn report(&self) -> AssignmentReport {
        AssignmentReport::new(&self.state, self.demand.total_flow(), &self.network)
    }

    // ── Iteration driver ──────────────────────────────────────────────────

    fn advance<O: AssignmentObserver>(
        &mut self,
        observer: &mut O,
    ) -> AssignResult<Option<IterationSummary>> {
        match self.state.status {
            RunStatus::Converged    => return Ok(None),
            RunStatus::Failed(kind) => return Err(AssignError::Terminated(kind)),
            RunStatus::Running      => {}
        }
        if self.demand.is_empty() {
            self.converge();
            return Ok(None);
        }

        let iteration = self.state.iteration + 1;
        if self.cancel.load(Ordering::Relaxed) {
            return Err(self.fail(AssignError::Cancelled { iteration }));
        }
        if let Some(limit) = self.config.max_iterations {
            if self.state.iteration >= limit {
                let pending = self.demand.total_flow();
                return Err(self.fail(AssignError::IterationLimit { limit, pending }));
            }
        }

        observer.on_iteration_start(iteration, self.demand.total_flow());
        let summary = self.iterate(iteration).map_err(|e| self.fail(e))?;
        observer.on_iteration_end(&summary, &self.network);
        self.history.push(summary.clone());

        if self.demand.is_empty() {
            self.converge();
        }
        Ok(Some(summary))
    }

    fn iterate(&mut self, iteration: u32) -> AssignResult<IterationSummary> {
        let pending_before = self.demand.total_flow();

        // ── ① Route ───────────────────────────────────────────────────────
        let assignments = self.route_all();

        // ── ② Aggregate ───────────────────────────────────────────────────
        let mut routed      = Vec::with_capacity(assignments.len());
        let mut unroutable  = Vec::new();
        let mut routed_flow = 0.0;
        let mut by_edge: FxHashMap<EdgeId, f64> = FxHashMap::default();
        for a in &assignments {
            match &a.route {
                Some(route) => {
                    routed_flow += a.flow;
                    routed.push((a.origin, a.destination));
                    for &e in &route.edges {
                        *by_edge.entry(e).or_insert(0.0) += a.flow;
                    }
                }
                None => unroutable.push((a.origin, a.destination)),
            }
        }
        let mut loads: Vec<(EdgeId, f64)> = by_edge.into_iter().filter(|&(_, l)| l > 0.0).collect();
        loads.sort_unstable_by_key(|&(e, _)| e);

        // ── ③ Decide ──────────────────────────────────────────────────────
        let (branch, ratio, binding_edge) = match self.policy.decide(&self.network, &loads) {
            LoadDecision::Accept => (Branch::Accept, 1.0, None),
            LoadDecision::Throttle { ratio, binding } => {
                if !(ratio > 0.0 && ratio < 1.0) {
                    return Err(AssignError::RoutingInvariant { iteration, ratio });
                }
                (Branch::Throttle, ratio, Some(binding))
            }
        };
        debug!(iteration, loaded = loads.len(), ?branch, ratio, "load decision");

        // ── ④ Stage ───────────────────────────────────────────────────────
        let staged = self.stage(iteration, &loads, ratio)?;

        // ── ⑤ Shrink demand ───────────────────────────────────────────────
        // `apply_ratio` is the last fallible write; it checks before mutating.
        let pruned = match branch {
            Branch::Accept   => 0.0,
            Branch::Throttle => self.demand.apply_ratio(ratio)?,
        };
        let stranded  = self.demand.drop_unroutable(&unroutable);
        let committed = match branch {
            Branch::Accept   => self.demand.remove_pairs(&routed),
            Branch::Throttle => routed_flow * ratio,
        };

        // ── ⑥ Commit links ────────────────────────────────────────────────
        let mut cost = 0.0;
        for s in &staged {
            self.network.apply_load(s.edge, s.load, s.speed);
            cost += s.cost;
        }
        if stranded > 0.0 {
            warn!(iteration, pairs = unroutable.len(), flow = stranded, "demand stranded: no path");
        }

        if self.config.record_paths {
            self.ledger.extend(assignments.into_iter().map(|a| match a.route {
                Some(route) => OdPathRecord {
                    iteration,
                    origin:      a.origin,
                    destination: a.destination,
                    flow:        a.flow * ratio,
                    cost:        route.cost,
                    path:        Some(route.edges),
                },
                None => OdPathRecord {
                    iteration,
                    origin:      a.origin,
                    destination: a.destination,
                    flow:        a.flow,
                    cost:        0.0,
                    path:        None,
                },
            }));
        }

        // ── ⑦ Mutate graph ────────────────────────────────────────────────
        let exhausted     = self.network.links_below_capacity(self.config.min_capacity);
        let links_removed = self.network.remove_edges(&exhausted);
        self.network.recompute_weights(&self.cost).map_err(|e| match e {
            NetworkError::UndefinedSpeed { edge, speed } => {
                AssignError::CongestionInconsistency { iteration, edge, speed }
            }
            other => other.into(),
        })?;

        // ── Ledger ────────────────────────────────────────────────────────
        self.state.iteration       = iteration;
        self.state.total_cost     += cost;
        self.state.committed_flow += committed;
        self.state.stranded_flow  += stranded;
        self.state.pruned_flow    += pruned;

        let pending_after = self.demand.total_flow();
        info!(
            iteration,
            branch = branch.as_str(),
            ratio,
            pending = pending_after,
            committed,
            links_removed,
            "iteration committed"
        );

        Ok(IterationSummary {
            iteration,
            branch,
            ratio,
            binding_edge,
            pending_before,
            committed,
            stranded,
            pruned,
            loaded_links: loads.len(),
            links_removed,
            cost,
            pending_after,
        })
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    /// Shortest paths for every pending pair, in origin order.
    fn route_all(&self) -> Vec<PathAssignment> {
        let origins: Vec<(NodeId, &OdList)> = self.demand.origins().collect();
        let network = &self.network;
        let router  = &self.router;

        let route_origin = |&(origin, list): &(NodeId, &OdList)| -> Vec<PathAssignment> {
            let routes = router.shortest_paths(network, origin, list.destinations());
            list.destinations()
                .iter()
                .zip(list.flows())
                .zip(routes)
                .map(|((&destination, &flow), route)| PathAssignment { origin, destination, route, flow })
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let per_origin: Vec<Vec<PathAssignment>> = origins.iter().map(route_origin).collect();

        #[cfg(feature = "parallel")]
        let per_origin: Vec<Vec<PathAssignment>> = {
            use rayon::prelude::*;

            // `collect` on an indexed parallel iterator keeps origin order.
            let route = || origins.par_iter().map(route_origin).collect::<Vec<_>>();
            match &self.pool {
                Some(pool) => pool.install(route),
                None       => route(),
            }
        };

        debug!(origins = origins.len(), "routing complete");
        per_origin.into_iter().flatten().collect()
    }

    /// New flow, speed, and accrued cost for every loaded link at `ratio`.
    ///
    /// Fails if any link that will survive this iteration, loaded or not,
    /// ends up with a speed the cost model cannot weight.  Passing this check
    /// means the weight recomputation after the commit cannot fail.
    fn stage(&self, iteration: u32, loads: &[(EdgeId, f64)], ratio: f64) -> AssignResult<Vec<StagedLoad>> {
        let min_capacity = self.config.min_capacity;

        // `loads` is sorted by edge.
        let unloaded = self
            .network
            .links()
            .filter(|(e, _, s)| !s.removed && loads.binary_search_by_key(e, |&(le, _)| le).is_err());
        for (edge, attrs, s) in unloaded {
            if self.cost.link_weight(attrs.length, s.speed, attrs.toll).is_err() {
                return Err(AssignError::CongestionInconsistency { iteration, edge, speed: s.speed });
            }
        }

        loads
            .iter()
            .map(|&(edge, load)| {
                let scaled = load * ratio;
                let attrs  = self.network.link(edge);
                let state  = self.network.state(edge);
                let flow   = (state.flow + scaled).min(attrs.capacity);
                let speed  = self.speed_flow.speed(attrs.road_type, attrs.urban, flow);

                let survives = state.remaining - scaled >= min_capacity;
                if survives && self.cost.link_weight(attrs.length, speed, attrs.toll).is_err() {
                    return Err(AssignError::CongestionInconsistency { iteration, edge, speed });
                }
                Ok(StagedLoad { edge, load: scaled, speed, cost: state.weight * scaled })
            })
            .collect()
    }

    fn converge(&mut self) {
        self.state.status = RunStatus::Converged;
        info!(
            iterations = self.state.iteration,
            total_cost = self.state.total_cost,
            stranded   = self.state.stranded_flow,
            "assignment converged"
        );
    }

    fn fail(&mut self, err: AssignError) -> AssignError {
        if let Some(kind) = err.failure_kind() {
            self.state.status = RunStatus::Failed(kind);
        }
        error!(iteration = self.state.iteration, error = %err, "assignment stopped");
        err
    }
}
