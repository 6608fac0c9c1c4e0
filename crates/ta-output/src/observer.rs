//! `AssignmentOutputObserver<W>` — bridges `AssignmentObserver` to an
//! `OutputWriter`.

use ta_assign::report::link_results;
use ta_assign::{AssignmentObserver, IterationSummary, OdPathRecord, RunState};
use ta_network::RoadNetwork;

use crate::row::{IterationRow, LinkRow, OdPathRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// An [`AssignmentObserver`] that writes one row per iteration as it
/// completes, then the final link state and the OD ledger when the run ends.
///
/// Errors from the writer are stored internally because observer methods
/// have no return value.  After `engine.run()` returns, check for errors with
/// [`take_error`][Self::take_error].
pub struct AssignmentOutputObserver<W: OutputWriter> {
    writer:     W,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> AssignmentOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, last_error: None }
    }

    /// Take the stored write error (if any) after `engine.run()` returns.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> AssignmentObserver for AssignmentOutputObserver<W> {
    fn on_iteration_end(&mut self, summary: &IterationSummary, _network: &RoadNetwork) {
        let result = self.writer.write_iteration(&IterationRow::from(summary));
        self.store_err(result);
    }

    fn on_run_end(&mut self, _state: &RunState, network: &RoadNetwork, ledger: &[OdPathRecord]) {
        let links: Vec<LinkRow> = link_results(network).iter().map(LinkRow::from).collect();
        let result = self.writer.write_links(&links);
        self.store_err(result);

        if !ledger.is_empty() {
            let rows: Vec<OdPathRow> = ledger.iter().map(OdPathRow::from).collect();
            let result = self.writer.write_od_paths(&rows);
            self.store_err(result);
        }

        let result = self.writer.finish();
        self.store_err(result);
    }
}
