//! Engine configuration.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ta_demand::MIN_FLOW;
use ta_network::REMOVAL_THRESHOLD;

use crate::{AssignError, AssignResult};

/// Tunables for one assignment run.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "max_iterations": 500, "num_threads": 8 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    /// Stop with `IterationLimit` after this many iterations.  `None` runs
    /// until the demand pool is empty.
    pub max_iterations: Option<u32>,

    /// Pending flows below this (vehicles/day) are pruned.
    pub min_flow: f64,

    /// Links whose remaining capacity falls below this (vehicles/day) are
    /// removed from the network.
    pub min_capacity: f64,

    /// Keep the per-OD path ledger for disruption analysis.
    pub record_paths: bool,

    /// Rayon worker count for routing (`parallel` feature).  `None` uses the
    /// global pool.  Without the feature it is ignored with a warning.
    pub num_threads: Option<usize>,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            min_flow:       MIN_FLOW,
            min_capacity:   REMOVAL_THRESHOLD,
            record_paths:   true,
            num_threads:    None,
        }
    }
}

impl AssignmentConfig {
    pub fn from_json_reader<R: Read>(reader: R) -> AssignResult<Self> {
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| AssignError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: &Path) -> AssignResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    pub fn validate(&self) -> AssignResult<()> {
        if !(self.min_flow.is_finite() && self.min_flow > 0.0) {
            return Err(AssignError::Config(format!(
                "min_flow must be positive, got {}", self.min_flow
            )));
        }
        if !(self.min_capacity.is_finite() && self.min_capacity > 0.0) {
            return Err(AssignError::Config(format!(
                "min_capacity must be positive, got {}", self.min_capacity
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(AssignError::Config("max_iterations must be at least 1".into()));
        }
        if self.num_threads == Some(0) {
            return Err(AssignError::Config("num_threads must be at least 1".into()));
        }
        Ok(())
    }
}
