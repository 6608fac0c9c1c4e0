//! Core error type.
//!
//! Sub-crates wrap `CoreError` as one variant of their own enums via `#[from]`.

use thiserror::Error;

use crate::RoadType;

/// Configuration and model errors shared by every `ta-*` crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown road type {0:?}: expected one of \"M\", \"A_dual\", \"A_single\", \"B\"")]
    UnknownRoadType(String),

    #[error("calibration table {table:?} has no entry for road type {road_type}")]
    MissingCalibration {
        table:     &'static str,
        road_type: RoadType,
    },

    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("speed {speed} is not a valid travel speed")]
    InvalidSpeed { speed: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shorthand result type for `ta-core`.
pub type CoreResult<T> = Result<T, CoreError>;
