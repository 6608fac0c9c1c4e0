//! Per-road-type calibration tables.
//!
//! # JSON format
//!
//! A single document holding the five required tables (and the optional
//! speed-flow slope table), each keyed by road-type symbol:
//!
//! ```json
//! {
//!   "free_flow_speed":  { "M": 67.0, "A_dual": 57.0, "A_single": 43.0, "B": 36.0 },
//!   "flow_breakpoint":  { "M": 1200.0, "A_dual": 1080.0, "A_single": 1000.0, "B": 1000.0 },
//!   "min_speed":        { "M": 20.0, "A_dual": 20.0, "A_single": 15.0, "B": 10.0 },
//!   "urban_speed_cap":  { "M": 60.0, "A_dual": 40.0, "A_single": 30.0, "B": 30.0 },
//!   "initial_capacity": { "M": 120000.0, "A_dual": 80000.0, "A_single": 40000.0, "B": 20000.0 }
//! }
//! ```
//!
//! [`Calibration::from_table_dir`] instead reads one file per table, using
//! the file names of the original parameter set.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::{CoreError, CoreResult, RoadTable, RoadType};

/// Calibration parameters of the speed-flow and capacity models.
///
/// Speeds are in miles/hour, the flow breakpoint in vehicles/hour and the
/// initial capacity in vehicles/day.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    pub free_flow_speed:  RoadTable<f64>,
    pub flow_breakpoint:  RoadTable<f64>,
    pub min_speed:        RoadTable<f64>,
    pub urban_speed_cap:  RoadTable<f64>,
    pub initial_capacity: RoadTable<f64>,
    /// Speed lost per vehicle/hour above the breakpoint.  B roads ignore it.
    pub speed_flow_slope: RoadTable<f64>,
}

/// Slopes of the linear speed-flow segment above the breakpoint.
pub fn default_speed_flow_slope() -> RoadTable<f64> {
    RoadTable::new(0.033, 0.033, 0.05, 0.0)
}

#[derive(Deserialize)]
struct RawCalibration {
    free_flow_speed:  BTreeMap<String, f64>,
    flow_breakpoint:  BTreeMap<String, f64>,
    min_speed:        BTreeMap<String, f64>,
    urban_speed_cap:  BTreeMap<String, f64>,
    initial_capacity: BTreeMap<String, f64>,
    #[serde(default)]
    speed_flow_slope: Option<BTreeMap<String, f64>>,
}

impl Calibration {
    /// Indicative parameters for the British strategic road network.
    ///
    /// Useful for tests and synthetic scenarios; production runs load their
    /// own tables.
    pub fn indicative() -> Self {
        Self {
            free_flow_speed:  RoadTable::new(67.0, 57.0, 43.0, 36.0),
            flow_breakpoint:  RoadTable::new(1_200.0, 1_080.0, 1_000.0, 1_000.0),
            min_speed:        RoadTable::new(20.0, 20.0, 15.0, 10.0),
            urban_speed_cap:  RoadTable::new(60.0, 40.0, 30.0, 30.0),
            initial_capacity: RoadTable::new(120_000.0, 80_000.0, 40_000.0, 20_000.0),
            speed_flow_slope: default_speed_flow_slope(),
        }
    }

    /// Parse a calibration document from any `Read` source and validate it.
    pub fn from_json_reader<R: Read>(reader: R) -> CoreResult<Self> {
        let raw: RawCalibration = serde_json::from_reader(reader)?;
        let calibration = Self {
            free_flow_speed:  RoadTable::from_symbols("free_flow_speed", raw.free_flow_speed)?,
            flow_breakpoint:  RoadTable::from_symbols("flow_breakpoint", raw.flow_breakpoint)?,
            min_speed:        RoadTable::from_symbols("min_speed", raw.min_speed)?,
            urban_speed_cap:  RoadTable::from_symbols("urban_speed_cap", raw.urban_speed_cap)?,
            initial_capacity: RoadTable::from_symbols("initial_capacity", raw.initial_capacity)?,
            speed_flow_slope: match raw.speed_flow_slope {
                Some(slopes) => RoadTable::from_symbols("speed_flow_slope", slopes)?,
                None => default_speed_flow_slope(),
            },
        };
        calibration.validate()?;
        Ok(calibration)
    }

    /// Like [`from_json_reader`](Self::from_json_reader) for a file path.
    pub fn from_json_path(path: &Path) -> CoreResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    /// Read the five tables from separate JSON files in `dir`:
    /// `free_flow_speed_dict.json`, `flow_breakpoint_dict.json`,
    /// `min_speed_cap.json`, `urban_speed_cap.json`, `flow_cap_dict.json`.
    pub fn from_table_dir(dir: &Path) -> CoreResult<Self> {
        let calibration = Self {
            free_flow_speed:  read_table(dir, "free_flow_speed_dict.json", "free_flow_speed")?,
            flow_breakpoint:  read_table(dir, "flow_breakpoint_dict.json", "flow_breakpoint")?,
            min_speed:        read_table(dir, "min_speed_cap.json", "min_speed")?,
            urban_speed_cap:  read_table(dir, "urban_speed_cap.json", "urban_speed_cap")?,
            initial_capacity: read_table(dir, "flow_cap_dict.json", "initial_capacity")?,
            speed_flow_slope: default_speed_flow_slope(),
        };
        calibration.validate()?;
        Ok(calibration)
    }

    /// Check every value is finite and physically meaningful.
    ///
    /// Minimum and urban-cap speeds must be strictly positive so that the
    /// speed-flow model can never return a zero travel speed.
    pub fn validate(&self) -> CoreResult<()> {
        for road_type in RoadType::ALL {
            let free = self.free_flow_speed[road_type];
            let min  = self.min_speed[road_type];
            check(free.is_finite() && free > 0.0, "free_flow_speed", road_type, free)?;
            check(min.is_finite() && min > 0.0, "min_speed", road_type, min)?;
            check(min <= free, "min_speed above free_flow_speed", road_type, min)?;
            let cap = self.urban_speed_cap[road_type];
            check(cap.is_finite() && cap > 0.0, "urban_speed_cap", road_type, cap)?;
            let bp = self.flow_breakpoint[road_type];
            check(bp.is_finite() && bp >= 0.0, "flow_breakpoint", road_type, bp)?;
            let capacity = self.initial_capacity[road_type];
            check(capacity.is_finite() && capacity >= 0.0, "initial_capacity", road_type, capacity)?;
            let slope = self.speed_flow_slope[road_type];
            check(slope.is_finite() && slope >= 0.0, "speed_flow_slope", road_type, slope)?;
        }
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_table(dir: &Path, file: &str, table: &'static str) -> CoreResult<RoadTable<f64>> {
    let reader = std::io::BufReader::new(std::fs::File::open(dir.join(file))?);
    let raw: BTreeMap<String, f64> = serde_json::from_reader(reader)?;
    RoadTable::from_symbols(table, raw)
}

fn check(ok: bool, what: &str, road_type: RoadType, value: f64) -> CoreResult<()> {
    if ok {
        Ok(())
    } else {
        Err(CoreError::InvalidCalibration(format!("{what} for {road_type}: {value}")))
    }
}
