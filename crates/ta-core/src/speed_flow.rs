//! Speed-flow relationship per road class.
//!
//! ```text
//! q = daily volume / 24                                  (veh/hour)
//! v = free_flow                                  if q <= breakpoint
//! v = max(free_flow − slope·(q − breakpoint), min) if q >  breakpoint
//! v = min(urban_cap, v)                          if the link is urban
//! ```
//!
//! B roads keep their free-flow speed at any volume.

use crate::{Calibration, RoadType};

/// Maps an accumulated daily volume to the achievable speed on a link.
#[derive(Clone, Debug)]
pub struct SpeedFlowModel {
    calibration: Calibration,
}

impl SpeedFlowModel {
    pub fn new(calibration: Calibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Speed in mph for `daily_volume` vehicles/day.
    ///
    /// Always within `[min_speed, free_flow_speed]` of the class (or the
    /// urban cap, when lower), hence strictly positive for a validated
    /// calibration.
    pub fn speed(&self, road_type: RoadType, is_urban: bool, daily_volume: f64) -> f64 {
        let c = &self.calibration;
        let free_flow = c.free_flow_speed[road_type];

        let speed = match road_type {
            RoadType::BRoad => free_flow,
            _ => {
                let hourly     = daily_volume / 24.0;
                let breakpoint = c.flow_breakpoint[road_type];
                if hourly > breakpoint {
                    let degraded = free_flow - c.speed_flow_slope[road_type] * (hourly - breakpoint);
                    degraded.max(c.min_speed[road_type])
                } else {
                    free_flow
                }
            }
        };

        if is_urban {
            speed.min(c.urban_speed_cap[road_type])
        } else {
            speed
        }
    }
}
