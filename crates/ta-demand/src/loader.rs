//! CSV demand loader.
//!
//! # CSV format
//!
//! One row per origin-destination pair, flow in vehicles/day.  Repeated pairs
//! are summed.
//!
//! ```csv
//! origin,destination,flow
//! 0,4,1200
//! 0,7,350.5
//! 3,4,80
//! ```
//!
//! Flows are not pruned here; the assignment builder prunes once the
//! threshold in effect is known.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use ta_core::NodeId;

use crate::pool::{DemandPool, OdFlow};
use crate::{DemandError, DemandResult};

#[derive(Deserialize)]
struct DemandRecord {
    origin:      u32,
    destination: u32,
    flow:        f64,
}

/// Load a [`DemandPool`] from a CSV file.
pub fn load_demand_csv(path: &Path) -> DemandResult<DemandPool> {
    let file = std::fs::File::open(path).map_err(DemandError::Io)?;
    load_demand_reader(file)
}

/// Like [`load_demand_csv`] but accepts any `Read` source.
pub fn load_demand_reader<R: Read>(reader: R) -> DemandResult<DemandPool> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv_reader.deserialize::<DemandRecord>() {
        let r = result.map_err(|e| DemandError::Parse(e.to_string()))?;
        rows.push(OdFlow::new(NodeId(r.origin), NodeId(r.destination), r.flow));
    }
    DemandPool::from_flows(rows)
}
