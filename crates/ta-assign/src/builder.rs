//! Fluent builder for constructing an [`AssignmentEngine`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::info;

use ta_core::{Calibration, CostModel, SpeedFlowModel};
use ta_demand::DemandPool;
use ta_network::{RoadNetwork, ShortestPathRouter};

use crate::policy::{LoadPolicy, UniformThrottle};
use crate::state::RunState;
use crate::{AssignError, AssignResult, AssignmentConfig, AssignmentEngine};

/// Fluent builder for [`AssignmentEngine<R, P>`].
///
/// # Required inputs
///
/// - [`RoadNetwork`] — built with the same calibration
/// - [`DemandPool`] — pending OD flows
/// - [`Calibration`] — speed-flow tables
/// - `R: ShortestPathRouter` — e.g. [`ta_network::DijkstraRouter`]
///
/// # Optional inputs (have defaults)
///
/// | Method              | Default                          |
/// |---------------------|----------------------------------|
/// | `.config(c)`        | `AssignmentConfig::default()`    |
/// | `.cost_model(m)`    | `CostModel::default()`           |
/// | `.policy(p)`        | [`UniformThrottle`]              |
/// | `.cancel_flag(f)`   | a fresh, unset flag              |
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = AssignmentBuilder::new(network, demand, calibration, DijkstraRouter)
///     .config(config)
///     .build()?;
/// engine.run(&mut NoopObserver)?;
/// ```
pub struct AssignmentBuilder<R: ShortestPathRouter, P: LoadPolicy = UniformThrottle> {
    network:     RoadNetwork,
    demand:      DemandPool,
    calibration: Calibration,
    router:      R,
    policy:      P,
    cost:        CostModel,
    config:      AssignmentConfig,
    cancel:      Option<Arc<AtomicBool>>,
}

impl<R: ShortestPathRouter> AssignmentBuilder<R, UniformThrottle> {
    pub fn new(network: RoadNetwork, demand: DemandPool, calibration: Calibration, router: R) -> Self {
        Self {
            network,
            demand,
            calibration,
            router,
            policy: UniformThrottle,
            cost:   CostModel::default(),
            config: AssignmentConfig::default(),
            cancel: None,
        }
    }
}

impl<R: ShortestPathRouter, P: LoadPolicy> AssignmentBuilder<R, P> {
    pub fn config(mut self, config: AssignmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Cost model used for link weights.  Weights are recomputed with it at
    /// build time, so it need not match the one the network was built with.
    pub fn cost_model(mut self, cost: CostModel) -> Self {
        self.cost = cost;
        self
    }

    /// Replace the load decision.
    pub fn policy<Q: LoadPolicy>(self, policy: Q) -> AssignmentBuilder<R, Q> {
        AssignmentBuilder {
            network:     self.network,
            demand:      self.demand,
            calibration: self.calibration,
            router:      self.router,
            policy,
            cost:        self.cost,
            config:      self.config,
            cancel:      self.cancel,
        }
    }

    /// Share a cancellation flag with the caller.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Validate inputs, prune demand, and return a ready-to-run engine.
    pub fn build(self) -> AssignResult<AssignmentEngine<R, P>> {
        self.config.validate()?;
        self.calibration.validate()?;

        let mut network = self.network;
        let mut demand  = self.demand.with_min_flow(self.config.min_flow);

        // ── Validate demand endpoints ─────────────────────────────────────
        for od in demand.snapshot() {
            for node in [od.origin, od.destination] {
                if !network.contains_node(node) {
                    return Err(AssignError::UnknownNode(node));
                }
            }
        }

        // ── Initial graph and demand state ────────────────────────────────
        let initial_demand = demand.total_flow();
        let pruned         = demand.prune();
        let exhausted      = network.links_below_capacity(self.config.min_capacity);
        network.remove_edges(&exhausted);
        network.recompute_weights(&self.cost)?;

        info!(
            nodes   = network.node_count(),
            links   = network.live_edge_count(),
            pairs   = demand.pair_count(),
            origins = demand.origin_count(),
            demand  = initial_demand,
            "assignment ready"
        );

        #[cfg(not(feature = "parallel"))]
        if let Some(n) = self.config.num_threads {
            tracing::warn!(num_threads = n, "num_threads ignored: built without the `parallel` feature");
        }

        #[cfg(feature = "parallel")]
        let pool = match self.config.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| AssignError::Config(e.to_string()))?,
            ),
            None => None,
        };

        Ok(AssignmentEngine {
            speed_flow: SpeedFlowModel::new(self.calibration),
            cost:       self.cost,
            router:     self.router,
            policy:     self.policy,
            state:      RunState::new(initial_demand, pruned),
            ledger:     Vec::new(),
            history:    Vec::new(),
            cancel:     self.cancel.unwrap_or_default(),
            config:     self.config,
            network,
            demand,
            #[cfg(feature = "parallel")]
            pool,
        })
    }
}
