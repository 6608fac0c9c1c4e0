//! The `OutputWriter` trait implemented by backend writers.

use crate::{IterationRow, LinkRow, OdPathRow, OutputResult};

/// Sink for assignment results.
///
/// Errors are stored by the observer and retrieved with
/// [`AssignmentOutputObserver::take_error`][crate::AssignmentOutputObserver::take_error].
pub trait OutputWriter {
    /// Write one iteration summary row.
    fn write_iteration(&mut self, row: &IterationRow) -> OutputResult<()>;

    /// Write the final state of a batch of links.
    fn write_links(&mut self, rows: &[LinkRow]) -> OutputResult<()>;

    /// Write a batch of OD ledger rows.
    fn write_od_paths(&mut self, rows: &[OdPathRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
