//! Assignment observer trait for progress reporting and data collection.

use ta_network::RoadNetwork;

use crate::report::{IterationSummary, OdPathRecord};
use crate::state::RunState;

/// Callbacks invoked by [`AssignmentEngine::run`][crate::AssignmentEngine::run].
///
/// All methods default to no-ops.
///
/// # Example — progress printer
///
/// ```rust,ignore
/// struct Progress;
///
/// impl AssignmentObserver for Progress {
///     fn on_iteration_end(&mut self, s: &IterationSummary, _net: &RoadNetwork) {
///         println!("iteration {}: {} pending", s.iteration, s.pending_after);
///     }
/// }
/// ```
pub trait AssignmentObserver {
    /// Called before routing; `pending` is the demand still to assign.
    fn on_iteration_start(&mut self, _iteration: u32, _pending: f64) {}

    /// Called after an iteration has been fully committed.
    fn on_iteration_end(&mut self, _summary: &IterationSummary, _network: &RoadNetwork) {}

    /// Called once when the run stops, converged or not.
    ///
    /// `ledger` is empty unless `record_paths` is set.
    fn on_run_end(
        &mut self,
        _state:   &RunState,
        _network: &RoadNetwork,
        _ledger:  &[OdPathRecord],
    ) {}
}

/// An [`AssignmentObserver`] that does nothing.
pub struct NoopObserver;

impl AssignmentObserver for NoopObserver {}
