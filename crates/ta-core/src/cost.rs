//! Generalised travel cost of a link.
//!
//! ```text
//! litres/km      = a + b·s + c·s²            (s in km/h)
//! operating cost = litres/km × fuel price    (£/km)
//! travel cost    = time × occupancy × value of time
//!                + distance_km × operating cost
//!                + toll                      (£)
//! ```
//!
//! The same cost is used as the Dijkstra weight of a link and, multiplied by
//! the flow loaded onto it, to accrue the total system cost.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

const KM_PER_MILE: f64 = 1.609_344;

/// Constants of the cost model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParams {
    /// Average fuel price, £/litre.
    pub fuel_price:     f64,
    /// Average car occupancy (persons/vehicle).
    pub occupancy:      f64,
    /// Value of time, £/person-hour.
    pub value_of_time:  f64,
    /// Constant term of the fuel-consumption curve (litres/km).
    pub fuel_a:         f64,
    /// Linear term of the fuel-consumption curve.
    pub fuel_b:         f64,
    /// Quadratic term of the fuel-consumption curve.
    pub fuel_c:         f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            fuel_price:    1.40,
            occupancy:     1.6,
            value_of_time: 20.0,
            fuel_a:        0.178,
            fuel_b:        -0.002_99,
            fuel_c:        0.000_020_5,
        }
    }
}

/// Pure cost functions parameterised by [`CostParams`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CostModel {
    pub params: CostParams,
}

impl CostModel {
    pub fn new(params: CostParams) -> Self {
        Self { params }
    }

    /// Vehicle operating cost in £/km at `speed_mph`.
    pub fn operating_cost(&self, speed_mph: f64) -> f64 {
        let s = speed_mph * KM_PER_MILE;
        let p = &self.params;
        let litres_per_km = p.fuel_a + p.fuel_b * s + p.fuel_c * s * s;
        litres_per_km * p.fuel_price
    }

    /// Generalised cost in £ of driving `distance_miles` in `time_hours`.
    pub fn travel_cost(
        &self,
        time_hours:     f64,
        distance_miles: f64,
        operating_cost: f64,
        toll:           f64,
    ) -> f64 {
        let p = &self.params;
        time_hours * p.occupancy * p.value_of_time
            + distance_miles * KM_PER_MILE * operating_cost
            + toll
    }

    /// Weight of a link of `length_miles` driven at `speed_mph`.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidSpeed`] if the speed is zero, negative or not
    /// finite: a link without a defined travel time has no weight.
    pub fn link_weight(&self, length_miles: f64, speed_mph: f64, toll: f64) -> CoreResult<f64> {
        if !(speed_mph.is_finite() && speed_mph > 0.0) {
            return Err(CoreError::InvalidSpeed { speed: speed_mph });
        }
        let time = length_miles / speed_mph;
        Ok(self.travel_cost(time, length_miles, self.operating_cost(speed_mph), toll))
    }
}
