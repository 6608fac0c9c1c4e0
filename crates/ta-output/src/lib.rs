//! `ta-output` — assignment output writers.
//!
//! | Backend | Files created                                          |
//! |---------|--------------------------------------------------------|
//! | CSV     | `link_results.csv`, `od_paths.csv`, `iterations.csv`   |
//!
//! Writers implement [`OutputWriter`] and are driven by
//! [`AssignmentOutputObserver`], which implements
//! `ta_assign::AssignmentObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ta_output::{AssignmentOutputObserver, CsvWriter};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = AssignmentOutputObserver::new(writer);
//! engine.run(&mut obs)?;
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::AssignmentOutputObserver;
pub use row::{IterationRow, LinkRow, OdPathRow};
pub use writer::OutputWriter;
