//! Unit tests for ta-assign.
//!
//! Networks are small ADual lines and diamonds with explicit capacities so
//! that every ratio and flow can be worked out by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ta_core::{Calibration, CostModel, EdgeId, GeoPoint, NodeId, RoadType};
use ta_demand::{DemandPool, OdFlow};
use ta_network::{DijkstraRouter, LinkSpec, RoadNetwork, RoadNetworkBuilder};

use crate::{AssignmentBuilder, AssignmentConfig, AssignmentEngine, UniformThrottle};

const EPS: f64 = 1e-6;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn n(i: u32) -> NodeId {
    NodeId(i)
}

/// Nodes 0..=k in a line; link i joins i and i+1 (1 mile, ADual) with
/// capacity `caps[i]`.
fn line(caps: &[f64]) -> RoadNetwork {
    let mut b = RoadNetworkBuilder::new();
    let nodes: Vec<NodeId> = (0..=caps.len())
        .map(|i| b.add_node(GeoPoint::new(0.0, i as f32)))
        .collect();
    for (i, &cap) in caps.iter().enumerate() {
        b.add_link(LinkSpec::new(nodes[i], nodes[i + 1], 1.0, RoadType::ADual).capacity(cap));
    }
    b.build(&Calibration::indicative(), &CostModel::default()).unwrap()
}

/// Diamond 0 → {1, 2} → 3.
///
/// Links in insertion order: 0:(0,1) 1:(1,3) 2:(0,2) 3:(2,3).  The route via
/// node 1 is 2 miles, via node 2 is 4 miles.
fn diamond(caps: [f64; 4]) -> RoadNetwork {
    let mut b = RoadNetworkBuilder::new();
    let v: Vec<NodeId> = (0..4).map(|i| b.add_node(GeoPoint::new(i as f32, 0.0))).collect();
    for (i, (a, c, len)) in [(0, 1, 1.0), (1, 3, 1.0), (0, 2, 2.0), (2, 3, 2.0)].into_iter().enumerate() {
        b.add_link(LinkSpec::new(v[a], v[c], len, RoadType::ADual).capacity(caps[i]));
    }
    b.build(&Calibration::indicative(), &CostModel::default()).unwrap()
}

fn demand(entries: &[(u32, u32, f64)]) -> DemandPool {
    DemandPool::from_flows(entries.iter().map(|&(o, d, f)| OdFlow::new(n(o), n(d), f))).unwrap()
}

fn engine(network: RoadNetwork, pool: DemandPool) -> AssignmentEngine<DijkstraRouter> {
    AssignmentBuilder::new(network, pool, Calibration::indicative(), DijkstraRouter)
        .build()
        .unwrap()
}

fn residual<P: crate::LoadPolicy>(e: &AssignmentEngine<DijkstraRouter, P>) -> f64 {
    e.state().conservation_residual(e.demand().total_flow())
}

fn assert_capacity_invariant(net: &RoadNetwork) {
    for (edge, attrs, s) in net.links() {
        assert!(s.flow <= attrs.capacity + EPS, "{edge}: flow {} > capacity {}", s.flow, attrs.capacity);
        let expected = (attrs.capacity - s.flow).max(0.0);
        assert!((s.remaining - expected).abs() < EPS, "{edge}: remaining {} != {expected}", s.remaining);
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use super::*;
    use crate::{Branch, NoopObserver, RunStatus};

    #[test]
    fn demand_within_capacity_converges_in_one_iteration() {
        let mut e = engine(line(&[100.0]), demand(&[(0, 1, 50.0)]));
        let w0 = e.network().state(EdgeId(0)).weight;

        let state = e.run(&mut NoopObserver).unwrap().clone();
        assert_eq!(state.status, RunStatus::Converged);
        assert_eq!(state.iteration, 1);
        assert_eq!(state.stranded_flow, 0.0);
        assert!((state.total_cost - w0 * 50.0).abs() < 1e-9);

        let s = e.network().state(EdgeId(0));
        assert_eq!(s.flow, 50.0);
        assert_eq!(s.remaining, 50.0);
        assert!(!s.removed);
        assert_eq!(e.history()[0].branch, Branch::Accept);
    }

    #[test]
    fn overflow_throttles_then_strands_leftover() {
        let mut e = engine(line(&[100.0]), demand(&[(0, 1, 150.0)]));

        let first = e.step().unwrap().unwrap();
        assert_eq!(first.branch, Branch::Throttle);
        assert!((first.ratio - 100.0 / 150.0).abs() < 1e-12);
        assert_eq!(first.binding_edge, Some(EdgeId(0)));
        assert_eq!(first.links_removed, 1);

        let s = e.network().state(EdgeId(0));
        assert!((s.flow - 100.0).abs() < EPS);
        assert!(s.remaining < EPS);
        assert!(s.removed);
        assert!((e.demand().total_flow() - 50.0).abs() < EPS);

        let second = e.step().unwrap().unwrap();
        assert!((second.stranded - 50.0).abs() < EPS);
        assert_eq!(second.loaded_links, 0);

        assert_eq!(e.status(), RunStatus::Converged);
        assert_eq!(e.state().iteration, 2);
        assert!((e.state().stranded_flow - 50.0).abs() < EPS);
        assert!((e.state().committed_flow - 100.0).abs() < EPS);
        assert!(e.step().unwrap().is_none());
    }

    #[test]
    fn unreachable_destination_is_stranded_immediately() {
        // Node 2 is isolated.
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(GeoPoint::new(0.0, 0.0));
        let c = b.add_node(GeoPoint::new(0.0, 1.0));
        b.add_node(GeoPoint::new(5.0, 5.0));
        b.add_link(LinkSpec::new(a, c, 1.0, RoadType::BRoad).capacity(1000.0));
        let net = b.build(&Calibration::indicative(), &CostModel::default()).unwrap();

        let mut e = engine(net, demand(&[(0, 2, 40.0), (0, 1, 10.0)]));
        let state = e.run(&mut NoopObserver).unwrap().clone();

        assert_eq!(state.status, RunStatus::Converged);
        assert_eq!(state.iteration, 1);
        assert_eq!(state.stranded_flow, 40.0);
        assert_eq!(state.committed_flow, 10.0);
        assert_eq!(e.history()[0].stranded, 40.0);
    }

    #[test]
    fn load_equal_to_capacity_takes_accept_branch() {
        let mut e = engine(line(&[100.0, 100.0]), demand(&[(0, 2, 100.0)]));
        let summary = e.step().unwrap().unwrap();

        assert_eq!(summary.branch, Branch::Accept);
        assert_eq!(summary.ratio, 1.0);
        assert_eq!(summary.links_removed, 2);
        assert_eq!(e.status(), RunStatus::Converged);
        for edge in [EdgeId(0), EdgeId(1)] {
            assert_eq!(e.network().state(edge).flow, 100.0);
            assert!(e.network().is_removed(edge));
        }
    }

    #[test]
    fn same_origin_and_destination_commits_at_zero_cost() {
        let mut e = engine(line(&[100.0]), demand(&[(1, 1, 30.0)]));
        let state = e.run(&mut NoopObserver).unwrap().clone();
        assert_eq!(state.status, RunStatus::Converged);
        assert_eq!(state.committed_flow, 30.0);
        assert_eq!(state.total_cost, 0.0);
        assert_eq!(e.network().state(EdgeId(0)).flow, 0.0);
    }

    #[test]
    fn congested_speed_feeds_next_iteration_weights() {
        // 72 000/day on one A-dual link: 3000/h, 1920 over the breakpoint.
        let mut e = engine(line(&[100_000.0]), demand(&[(0, 1, 72_000.0)]));
        e.run(&mut NoopObserver).unwrap();
        let s = e.network().state(EdgeId(0));
        assert!((s.speed - 20.0).abs() < 1e-9, "speed floored at min: {}", s.speed);
        let expected = CostModel::default().link_weight(1.0, 20.0, 0.0).unwrap();
        assert!((s.weight - expected).abs() < 1e-9);
    }
}

// ── Properties ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use super::*;
    use crate::{NoopObserver, RunStatus};

    fn busy_diamond() -> AssignmentEngine<DijkstraRouter> {
        engine(
            diamond([300.0, 300.0, 200.0, 200.0]),
            demand(&[(0, 3, 1000.0), (1, 3, 100.0), (0, 2, 60.0)]),
        )
    }

    #[test]
    fn conservation_at_every_boundary() {
        let mut e = busy_diamond();
        assert!(residual(&e).abs() < EPS);
        while let Some(summary) = e.step().unwrap() {
            assert!(residual(&e).abs() < EPS, "iteration {}: residual {}", summary.iteration, residual(&e));
        }
        assert_eq!(e.status(), RunStatus::Converged);
        assert!(e.state().stranded_flow > 0.0);
    }

    #[test]
    fn capacity_holds_at_every_boundary() {
        let mut e = busy_diamond();
        while e.step().unwrap().is_some() {
            assert_capacity_invariant(e.network());
        }
    }

    #[test]
    fn remaining_and_pending_never_increase() {
        let mut e = busy_diamond();
        let mut remaining: Vec<f64> = e.network().links().map(|(_, _, s)| s.remaining).collect();
        let mut removed:   Vec<bool> = e.network().links().map(|(_, _, s)| s.removed).collect();
        let mut pending = e.demand().total_flow();

        while let Some(summary) = e.step().unwrap() {
            assert!(summary.pending_after <= summary.pending_before + EPS);
            assert!(e.demand().total_flow() <= pending + EPS);
            pending = e.demand().total_flow();

            for (i, (_, _, s)) in e.network().links().enumerate() {
                assert!(s.remaining <= remaining[i] + EPS);
                assert!(s.removed || !removed[i], "link {i} reappeared");
                remaining[i] = s.remaining;
                removed[i]   = s.removed;
            }
        }
    }

    #[test]
    fn rerun_after_convergence_is_noop() {
        let mut e = busy_diamond();
        let first = e.run(&mut NoopObserver).unwrap().clone();
        let history = e.history().len();

        let second = e.run(&mut NoopObserver).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(e.history().len(), history);
        assert!(e.step().unwrap().is_none());
    }

    #[test]
    fn throttle_ratio_strictly_inside_unit_interval() {
        let mut e = busy_diamond();
        e.run(&mut NoopObserver).unwrap();
        for s in e.history() {
            assert!(s.ratio > 0.0 && s.ratio <= 1.0);
            if s.binding_edge.is_some() {
                assert!(s.ratio < 1.0);
            }
        }
    }
}

// ── Builder and configuration ─────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;
    use crate::{AssignError, NoopObserver, RunStatus};

    #[test]
    fn unknown_demand_node_rejected() {
        let result = AssignmentBuilder::new(line(&[10.0]), demand(&[(0, 9, 5.0)]), Calibration::indicative(), DijkstraRouter)
            .build();
        assert!(matches!(result, Err(AssignError::UnknownNode(NodeId(9)))));
    }

    #[test]
    fn invalid_calibration_rejected() {
        let mut cal = Calibration::indicative();
        cal.min_speed[RoadType::Motorway] = 0.0;
        let result = AssignmentBuilder::new(line(&[10.0]), demand(&[(0, 1, 5.0)]), cal, DijkstraRouter).build();
        assert!(matches!(result, Err(AssignError::Configuration(_))));
    }

    #[test]
    fn sub_vehicle_demand_pruned_at_build() {
        let mut e = engine(line(&[100.0]), demand(&[(0, 1, 0.5), (1, 0, 20.0)]));
        assert_eq!(e.state().pruned_flow, 0.5);
        assert_eq!(e.state().initial_demand, 20.5);
        assert_eq!(e.demand().pair_count(), 1);

        e.run(&mut NoopObserver).unwrap();
        assert!(residual(&e).abs() < EPS);
    }

    #[test]
    fn empty_demand_converges_without_iterating() {
        let mut e = engine(line(&[100.0]), DemandPool::new());
        let state = e.run(&mut NoopObserver).unwrap();
        assert_eq!(state.status, RunStatus::Converged);
        assert_eq!(state.iteration, 0);
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let json = r#"{ "max_iterations": 25, "record_paths": false }"#;
        let c = AssignmentConfig::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(c.max_iterations, Some(25));
        assert!(!c.record_paths);
        assert_eq!(c.min_flow, 1.0);
        assert_eq!(c.min_capacity, 1.0);
        assert_eq!(c.num_threads, None);
    }

    #[test]
    fn config_rejects_non_positive_thresholds() {
        let bad = AssignmentConfig { min_flow: 0.0, ..AssignmentConfig::default() };
        assert!(matches!(bad.validate(), Err(AssignError::Config(_))));
        let json = r#"{ "min_capacity": -1.0 }"#;
        assert!(AssignmentConfig::from_json_reader(json.as_bytes()).is_err());
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn num_threads_ignored_without_parallel_feature() {
        let config = AssignmentConfig { num_threads: Some(4), ..AssignmentConfig::default() };
        let mut threaded = AssignmentBuilder::new(line(&[100.0]), demand(&[(0, 1, 150.0)]), Calibration::indicative(), DijkstraRouter)
            .config(config)
            .build()
            .unwrap();
        let mut plain = engine(line(&[100.0]), demand(&[(0, 1, 150.0)]));

        threaded.run(&mut NoopObserver).unwrap();
        plain.run(&mut NoopObserver).unwrap();
        assert_eq!(threaded.report(), plain.report());
    }

    #[test]
    fn record_paths_off_keeps_ledger_empty() {
        let config = AssignmentConfig { record_paths: false, ..AssignmentConfig::default() };
        let mut e = AssignmentBuilder::new(line(&[100.0]), demand(&[(0, 1, 50.0)]), Calibration::indicative(), DijkstraRouter)
            .config(config)
            .build()
            .unwrap();
        e.run(&mut NoopObserver).unwrap();
        assert!(e.ledger().is_empty());
    }

    #[test]
    fn ledger_records_paths_and_strandings() {
        let mut e = engine(line(&[100.0]), demand(&[(0, 1, 150.0)]));
        e.run(&mut NoopObserver).unwrap();
        let ledger = e.ledger();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].path.as_deref(), Some(&[EdgeId(0)][..]));
        assert!((ledger[0].flow - 100.0).abs() < EPS);
        assert!(ledger[1].is_stranded());
        assert!((ledger[1].flow - 50.0).abs() < EPS);
    }
}

// ── Failure handling ──────────────────────────────────────────────────────────

#[cfg(test)]
mod failures {
    use super::*;
    use ta_core::SpeedFlowModel;

    use crate::{AssignError, FailureKind, LoadDecision, LoadPolicy, NoopObserver, RunStatus};

    /// Always throttles with a fixed ratio, valid or not.
    struct FixedThrottle(f64);

    impl LoadPolicy for FixedThrottle {
        fn decide(&self, _network: &RoadNetwork, _loads: &[(EdgeId, f64)]) -> LoadDecision {
            LoadDecision::Throttle { ratio: self.0, binding: EdgeId(0) }
        }
    }

    #[test]
    fn ratio_out_of_bounds_fails_without_partial_commit() {
        for ratio in [1.0, 0.0, 1.5] {
            let mut e = AssignmentBuilder::new(line(&[100.0]), demand(&[(0, 1, 150.0)]), Calibration::indicative(), DijkstraRouter)
                .policy(FixedThrottle(ratio))
                .build()
                .unwrap();

            let err = e.run(&mut NoopObserver).unwrap_err();
            assert!(matches!(err, AssignError::RoutingInvariant { iteration: 1, .. }));
            assert_eq!(e.status(), RunStatus::Failed(FailureKind::RoutingInvariant));
            assert_eq!(e.state().iteration, 0);
            assert_eq!(e.network().state(EdgeId(0)).flow, 0.0);
            assert_eq!(e.demand().total_flow(), 150.0);

            assert!(matches!(
                e.run(&mut NoopObserver),
                Err(AssignError::Terminated(FailureKind::RoutingInvariant))
            ));
        }
    }

    #[test]
    fn unusable_speed_on_survivor_is_congestion_inconsistency() {
        let mut e = engine(line(&[1000.0]), demand(&[(0, 1, 100.0)]));
        // Any load drives A-dual speed to zero.
        let mut cal = Calibration::indicative();
        cal.flow_breakpoint[RoadType::ADual]  = 0.0;
        cal.speed_flow_slope[RoadType::ADual] = 100.0;
        cal.min_speed[RoadType::ADual]        = 0.0;
        e.speed_flow = SpeedFlowModel::new(cal);

        let err = e.step().unwrap_err();
        match err {
            AssignError::CongestionInconsistency { iteration, edge, speed } => {
                assert_eq!(iteration, 1);
                assert_eq!(edge, EdgeId(0));
                assert_eq!(speed, 0.0);
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(e.status(), RunStatus::Failed(FailureKind::CongestionInconsistency));
        assert_eq!(e.network().state(EdgeId(0)).flow, 0.0);
        assert_eq!(e.state().total_cost, 0.0);
    }

    #[test]
    fn unusable_speed_on_unloaded_survivor_fails_before_commit() {
        let mut e = engine(diamond([1000.0; 4]), demand(&[(0, 1, 50.0)]));
        // Link 3 carries nothing this iteration but can no longer be weighted.
        e.network.apply_load(EdgeId(3), 0.0, 0.0);

        let err = e.step().unwrap_err();
        assert!(matches!(
            err,
            AssignError::CongestionInconsistency { iteration: 1, edge: EdgeId(3), .. }
        ));
        assert_eq!(e.status(), RunStatus::Failed(FailureKind::CongestionInconsistency));
        assert_eq!(e.state().iteration, 0);
        assert_eq!(e.network().state(EdgeId(0)).flow, 0.0);
        assert_eq!(e.demand().total_flow(), 50.0);
    }

    #[test]
    fn network_and_demand_errors_are_terminal() {
        let demand_err = AssignError::from(ta_demand::DemandError::InvalidRatio(1.5));
        assert_eq!(demand_err.failure_kind(), Some(FailureKind::Internal));

        let network_err = AssignError::from(ta_network::NetworkError::NodeNotFound(n(7)));
        assert_eq!(network_err.failure_kind(), Some(FailureKind::Internal));

        assert_eq!(AssignError::UnknownNode(n(7)).failure_kind(), None);
        assert_eq!(AssignError::Config("x".into()).failure_kind(), None);
    }

    #[test]
    fn cancellation_checked_at_iteration_boundary() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut e = AssignmentBuilder::new(line(&[100.0]), demand(&[(0, 1, 150.0)]), Calibration::indicative(), DijkstraRouter)
            .cancel_flag(Arc::clone(&flag))
            .build()
            .unwrap();

        e.step().unwrap();
        flag.store(true, Ordering::Relaxed);

        let err = e.run(&mut NoopObserver).unwrap_err();
        assert!(matches!(err, AssignError::Cancelled { iteration: 2 }));
        assert_eq!(e.status(), RunStatus::Failed(FailureKind::Cancelled));
        assert_eq!(e.state().iteration, 1);
        assert!(residual(&e).abs() < EPS);
    }

    #[test]
    fn cancel_handle_shares_engine_flag() {
        let mut e = engine(line(&[100.0]), demand(&[(0, 1, 10.0)]));
        e.cancel_handle().store(true, Ordering::Relaxed);
        assert!(matches!(e.step(), Err(AssignError::Cancelled { iteration: 1 })));
    }

    #[test]
    fn iteration_ceiling_stops_non_converged_run() {
        let config = AssignmentConfig { max_iterations: Some(1), ..AssignmentConfig::default() };
        let mut e = AssignmentBuilder::new(line(&[100.0]), demand(&[(0, 1, 150.0)]), Calibration::indicative(), DijkstraRouter)
            .config(config)
            .build()
            .unwrap();

        let err = e.run(&mut NoopObserver).unwrap_err();
        match err {
            AssignError::IterationLimit { limit, pending } => {
                assert_eq!(limit, 1);
                assert!((pending - 50.0).abs() < EPS);
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(e.state().iteration, 1);
        assert_eq!(e.status(), RunStatus::Failed(FailureKind::IterationLimit));
        assert!(residual(&e).abs() < EPS);
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use super::*;
    use crate::{AssignmentObserver, IterationSummary, OdPathRecord, RunState};

    #[derive(Default)]
    struct Recorder {
        starts:   Vec<u32>,
        ends:     Vec<u32>,
        run_ends: usize,
        ledger:   usize,
    }

    impl AssignmentObserver for Recorder {
        fn on_iteration_start(&mut self, iteration: u32, _pending: f64) {
            self.starts.push(iteration);
        }
        fn on_iteration_end(&mut self, summary: &IterationSummary, _network: &RoadNetwork) {
            self.ends.push(summary.iteration);
        }
        fn on_run_end(&mut self, _state: &RunState, _network: &RoadNetwork, ledger: &[OdPathRecord]) {
            self.run_ends += 1;
            self.ledger = ledger.len();
        }
    }

    #[test]
    fn callbacks_in_order() {
        let mut e = engine(line(&[100.0]), demand(&[(0, 1, 150.0)]));
        let mut rec = Recorder::default();
        e.run(&mut rec).unwrap();
        assert_eq!(rec.starts, vec![1, 2]);
        assert_eq!(rec.ends, vec![1, 2]);
        assert_eq!(rec.run_ends, 1);
        assert_eq!(rec.ledger, 2);

        // Converged: no further callbacks.
        e.run(&mut rec).unwrap();
        assert_eq!(rec.run_ends, 1);
    }

    #[test]
    fn run_end_called_on_failure() {
        let config = AssignmentConfig { max_iterations: Some(1), ..AssignmentConfig::default() };
        let mut e = AssignmentBuilder::new(line(&[100.0]), demand(&[(0, 1, 150.0)]), Calibration::indicative(), DijkstraRouter)
            .config(config)
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        assert!(e.run(&mut rec).is_err());
        assert_eq!(rec.ends, vec![1]);
        assert_eq!(rec.run_ends, 1);
    }
}

// ── Disruption ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod disruption_tests {
    use super::*;
    use crate::{affected_demand, AssignError, Disruption, DisruptionImpact, NoopObserver};

    fn run(network: RoadNetwork) -> AssignmentEngine<DijkstraRouter> {
        let mut e = engine(network, demand(&[(0, 3, 100.0)]));
        e.run(&mut NoopObserver).unwrap();
        e
    }

    fn big_diamond() -> RoadNetwork {
        diamond([100_000.0; 4])
    }

    #[test]
    fn closing_short_route_escalates_cost() {
        let baseline = run(big_diamond());

        let mut net = big_diamond();
        let closed = Disruption::new([EdgeId(1)]).apply(&mut net).unwrap();
        assert_eq!(closed, 1);
        let disrupted = run(net);

        let impact = DisruptionImpact::compare(&baseline.report(), &disrupted.report()).unwrap();
        assert!(impact.cost_escalation > 0.0);
        assert!(impact.cost_escalation_pct.is_some_and(|p| p > 0.0));
        assert_eq!(impact.stranded_delta, 0.0);
        assert_eq!(impact.links_lost, 1);
        assert_eq!(disrupted.network().state(EdgeId(3)).flow, 100.0);
    }

    #[test]
    fn disconnecting_destination_strands_demand() {
        let baseline = run(big_diamond());
        let mut net = big_diamond();
        Disruption::new([EdgeId(1), EdgeId(3)]).apply(&mut net).unwrap();
        let disrupted = run(net);

        let impact = DisruptionImpact::compare(&baseline.report(), &disrupted.report()).unwrap();
        assert_eq!(impact.stranded_delta, 100.0);
        assert_eq!(impact.disrupted_cost, 0.0);
        assert_eq!(impact.links_lost, 2);
    }

    #[test]
    fn zero_cost_baseline_has_no_percentage() {
        let mut net = big_diamond();
        Disruption::new([EdgeId(1), EdgeId(3)]).apply(&mut net).unwrap();
        let stranded = run(net).report();
        let impact = DisruptionImpact::compare(&stranded, &stranded).unwrap();
        assert_eq!(impact.cost_escalation_pct, None);
    }

    #[test]
    fn compare_rejects_reports_from_different_networks() {
        let diamond_run = run(big_diamond());
        let mut line_run = engine(line(&[100.0]), demand(&[(0, 1, 10.0)]));
        line_run.run(&mut NoopObserver).unwrap();

        let err = DisruptionImpact::compare(&diamond_run.report(), &line_run.report()).unwrap_err();
        assert!(matches!(err, AssignError::NetworkMismatch { baseline: 4, disrupted: 1 }));
    }

    #[test]
    fn apply_is_idempotent_and_checks_ids() {
        let mut net = big_diamond();
        let d = Disruption::new([EdgeId(2), EdgeId(2), EdgeId(0)]);
        assert_eq!(d.edges(), &[EdgeId(0), EdgeId(2)]);
        assert_eq!(d.apply(&mut net).unwrap(), 2);
        assert_eq!(d.apply(&mut net).unwrap(), 0);

        let bad = Disruption::new([EdgeId(99)]);
        assert!(matches!(bad.apply(&mut net), Err(AssignError::UnknownEdge(EdgeId(99)))));
    }

    #[test]
    fn select_by_link_attributes() {
        let net = big_diamond();
        let d = Disruption::select(&net, |_, attrs| attrs.length > 1.5);
        assert_eq!(d.edges(), &[EdgeId(2), EdgeId(3)]);
    }

    #[test]
    fn affected_demand_follows_baseline_paths() {
        let baseline = run(big_diamond());

        let hit = affected_demand(baseline.ledger(), &[EdgeId(0)]).unwrap();
        assert_eq!(hit.flow(n(0), n(3)), Some(100.0));

        let missed = affected_demand(baseline.ledger(), &[EdgeId(2)]).unwrap();
        assert!(missed.is_empty());
    }
}

// ── Property tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::{NoopObserver, RunStatus};
    use proptest::prelude::*;

    const NODES: u32 = 6;

    fn random_network(links: &[(u32, u32, f64, f64)]) -> RoadNetwork {
        let mut b = RoadNetworkBuilder::new();
        for i in 0..NODES {
            b.add_node(GeoPoint::new(i as f32, (i * i) as f32));
        }
        for &(a, c, len, cap) in links.iter().filter(|l| l.0 != l.1) {
            b.add_link(LinkSpec::new(n(a), n(c), len, RoadType::ASingle).capacity(cap));
        }
        b.build(&Calibration::indicative(), &CostModel::default()).unwrap()
    }

    proptest! {
        #[test]
        fn random_runs_conserve_flow_and_respect_capacity(
            links in prop::collection::vec((0..NODES, 0..NODES, 0.5f64..5.0, 20.0f64..400.0), 2..12),
            flows in prop::collection::vec((0..NODES, 0..NODES, 1.0f64..300.0), 1..8),
        ) {
            let network = random_network(&links);
            let edges = network.edge_count() as u32;
            let pool = demand(&flows.iter().map(|&(o, d, f)| (o, d, f)).collect::<Vec<_>>());

            let mut e = AssignmentBuilder::new(network, pool, Calibration::indicative(), DijkstraRouter)
                .policy(UniformThrottle)
                .build()
                .unwrap();

            while e.step().unwrap().is_some() {
                prop_assert!(residual(&e).abs() < EPS);
            }
            prop_assert_eq!(e.status(), RunStatus::Converged);
            prop_assert!(e.state().iteration <= edges + 1);
            assert_capacity_invariant(e.network());

            // Converged engines ignore further runs.
            let before = e.state().clone();
            e.run(&mut NoopObserver).unwrap();
            prop_assert_eq!(&before, e.state());
        }
    }
}

// ── Parallel routing ──────────────────────────────────────────────────────────

#[cfg(all(test, feature = "parallel"))]
mod parallel {
    use super::*;
    use crate::{AssignmentReport, NoopObserver, OdPathRecord, RunStatus};

    /// Several origins competing for the short route so that the run
    /// throttles, removes links, and strands part of the demand.
    fn contested() -> (RoadNetwork, DemandPool) {
        let network = diamond([400.0, 300.0, 1000.0, 600.0]);
        let pool = demand(&[
            (0, 3, 900.0),
            (1, 2, 200.0),
            (3, 0, 150.0),
            (2, 1, 120.0),
            (1, 3, 80.0),
        ]);
        (network, pool)
    }

    fn run_with_threads(num_threads: Option<usize>) -> (AssignmentReport, Vec<OdPathRecord>) {
        let (network, pool) = contested();
        let config = AssignmentConfig { num_threads, ..AssignmentConfig::default() };
        let mut e = AssignmentBuilder::new(network, pool, Calibration::indicative(), DijkstraRouter)
            .config(config)
            .build()
            .unwrap();
        e.run(&mut NoopObserver).unwrap();
        assert_eq!(e.status(), RunStatus::Converged);
        (e.report(), e.ledger().to_vec())
    }

    #[test]
    fn result_independent_of_thread_count() {
        let (reference, reference_ledger) = run_with_threads(Some(1));
        assert!(reference.iterations > 1);

        for threads in [2, 4, 8] {
            let (report, ledger) = run_with_threads(Some(threads));
            assert_eq!(report, reference, "{threads} threads");
            assert_eq!(ledger, reference_ledger, "{threads} threads");
        }
    }

    #[test]
    fn global_pool_matches_dedicated_pool() {
        assert_eq!(run_with_threads(None), run_with_threads(Some(3)));
    }
}
