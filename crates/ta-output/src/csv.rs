//! CSV output backend.
//!
//! Creates three files in the configured output directory:
//! - `link_results.csv`
//! - `od_paths.csv`
//! - `iterations.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{IterationRow, LinkRow, OdPathRow, OutputResult};

/// Writes assignment output to three CSV files.
pub struct CsvWriter {
    links:      Writer<File>,
    od_paths:   Writer<File>,
    iterations: Writer<File>,
    finished:   bool,
}

impl CsvWriter {
    /// Open (or create) the three CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut links = Writer::from_path(dir.join("link_results.csv"))?;
        links.write_record([
            "edge_id", "from_node", "to_node", "road_type", "urban", "length_mi",
            "capacity", "flow", "remaining", "speed_mph", "removed",
        ])?;

        let mut od_paths = Writer::from_path(dir.join("od_paths.csv"))?;
        od_paths.write_record(["iteration", "origin", "destination", "flow", "cost", "stranded", "path"])?;

        let mut iterations = Writer::from_path(dir.join("iterations.csv"))?;
        iterations.write_record([
            "iteration", "branch", "ratio", "binding_edge", "pending_before", "committed",
            "stranded", "pruned", "links_removed", "cost", "pending_after",
        ])?;

        Ok(Self { links, od_paths, iterations, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_iteration(&mut self, row: &IterationRow) -> OutputResult<()> {
        self.iterations.write_record(&[
            row.iteration.to_string(),
            row.branch.to_string(),
            row.ratio.to_string(),
            row.binding_edge.to_string(),
            row.pending_before.to_string(),
            row.committed.to_string(),
            row.stranded.to_string(),
            row.pruned.to_string(),
            row.links_removed.to_string(),
            row.cost.to_string(),
            row.pending_after.to_string(),
        ])?;
        Ok(())
    }

    fn write_links(&mut self, rows: &[LinkRow]) -> OutputResult<()> {
        for row in rows {
            self.links.write_record(&[
                row.edge_id.to_string(),
                row.from_node.to_string(),
                row.to_node.to_string(),
                row.road_type.to_string(),
                (row.urban as u8).to_string(),
                row.length.to_string(),
                row.capacity.to_string(),
                row.flow.to_string(),
                row.remaining.to_string(),
                row.speed.to_string(),
                (row.removed as u8).to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_od_paths(&mut self, rows: &[OdPathRow]) -> OutputResult<()> {
        for row in rows {
            self.od_paths.write_record(&[
                row.iteration.to_string(),
                row.origin.to_string(),
                row.destination.to_string(),
                row.flow.to_string(),
                row.cost.to_string(),
                (row.stranded as u8).to_string(),
                row.path.clone(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.links.flush()?;
        self.od_paths.flush()?;
        self.iterations.flush()?;
        Ok(())
    }
}
