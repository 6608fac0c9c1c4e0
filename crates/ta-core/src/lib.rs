//! `ta-core` — foundational types for capacity-restrained traffic assignment.
//!
//! This crate is a dependency of every other `ta-*` crate.  It has no `ta-*`
//! dependencies and only `thiserror` and `serde`/`serde_json` externally.
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `NodeId`, `EdgeId`                                    |
//! | [`geo`]         | `GeoPoint`                                            |
//! | [`road`]        | `RoadType`, `RoadTable<T>`                            |
//! | [`calibration`] | `Calibration` (the five per-road-type tables)         |
//! | [`cost`]        | `CostParams`, `CostModel`                             |
//! | [`speed_flow`]  | `SpeedFlowModel`                                      |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Units
//!
//! Lengths are in miles, speeds in miles/hour, flows and capacities in
//! vehicles/day, and every cost in pounds sterling.

pub mod calibration;
pub mod cost;
pub mod error;
pub mod geo;
pub mod ids;
pub mod road;
pub mod speed_flow;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use calibration::Calibration;
pub use cost::{CostModel, CostParams};
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{EdgeId, NodeId};
pub use road::{RoadTable, RoadType};
pub use speed_flow::SpeedFlowModel;
