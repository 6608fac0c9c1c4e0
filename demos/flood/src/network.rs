//! Synthetic road network, demand, and flood extent.
//!
//! An 8 × 8 grid around York with a motorway along the southern edge, an
//! A-dual spine north–south, single-carriageway A roads every third row and
//! column, and B roads elsewhere.  Links within the city core are urban.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use ta_assign::Disruption;
use ta_core::{Calibration, CostModel, GeoPoint, NodeId, RoadType};
use ta_demand::{DemandPool, OdFlow};
use ta_network::{LinkSpec, NetworkResult, RoadNetwork, RoadNetworkBuilder};

const GRID:         usize = 8;
const ORIGIN:       GeoPoint = GeoPoint { lat: 53.925, lon: -1.14 };
const STEP_LAT:     f32 = 0.010;
const STEP_LON:     f32 = 0.016;
const CENTRE:       GeoPoint = GeoPoint { lat: 53.960, lon: -1.084 };
const URBAN_RADIUS: f64 = 1.5;

const ZONES:        usize = 14;
const TRIP_PROB:    f64 = 0.45;

/// Flood centred on the river crossing south-east of the centre.
const FLOOD_CENTRE: GeoPoint = GeoPoint { lat: 53.952, lon: -1.070 };
const FLOOD_RADIUS: f64 = 0.8;

fn node_at(row: usize, col: usize) -> NodeId {
    NodeId((row * GRID + col) as u32)
}

fn road_type(row: usize, col: usize, horizontal: bool) -> RoadType {
    if horizontal && row == 0 {
        RoadType::Motorway
    } else if !horizontal && col == 4 {
        RoadType::ADual
    } else if (horizontal && row % 3 == 0) || (!horizontal && col % 3 == 0) {
        RoadType::ASingle
    } else {
        RoadType::BRoad
    }
}

/// Build the grid.  Deterministic, so two builds share every `EdgeId`.
pub fn build_network(calibration: &Calibration, cost: &CostModel) -> NetworkResult<RoadNetwork> {
    let mut b = RoadNetworkBuilder::with_capacity(GRID * GRID, 2 * GRID * (GRID - 1));
    for row in 0..GRID {
        for col in 0..GRID {
            b.add_node(GeoPoint::new(
                ORIGIN.lat + row as f32 * STEP_LAT,
                ORIGIN.lon + col as f32 * STEP_LON,
            ));
        }
    }

    let urban = |n: NodeId, b: &RoadNetworkBuilder| b.node_pos(n).distance_miles(CENTRE) < URBAN_RADIUS;

    for row in 0..GRID {
        for col in 0..GRID {
            let a = node_at(row, col);
            let mut neighbours = Vec::with_capacity(2);
            if col + 1 < GRID {
                neighbours.push((row, col + 1));
            }
            if row + 1 < GRID {
                neighbours.push((row + 1, col));
            }
            for (r, c) in neighbours {
                let z = node_at(r, c);
                let length = b.node_pos(a).distance_miles(b.node_pos(z));
                let is_urban = urban(a, &b) && urban(z, &b);
                b.add_link(LinkSpec::new(a, z, length, road_type(row, col, r == row)).urban(is_urban));
            }
        }
    }

    b.build(calibration, cost)
}

/// Random zone-to-zone trips.  Zone centroids are scattered over the grid
/// and snapped to their nearest node.
pub fn synthetic_demand(network: &RoadNetwork, seed: u64) -> anyhow::Result<DemandPool> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let span_lat = STEP_LAT * (GRID - 1) as f32;
    let span_lon = STEP_LON * (GRID - 1) as f32;

    let zones: Vec<NodeId> = (0..ZONES)
        .filter_map(|_| {
            let centroid = GeoPoint::new(
                ORIGIN.lat + rng.gen_range(0.0..span_lat),
                ORIGIN.lon + rng.gen_range(0.0..span_lon),
            );
            network.snap_to_node(centroid)
        })
        .collect();

    let mut flows = Vec::new();
    for &o in &zones {
        for &d in &zones {
            if o != d && rng.gen_bool(TRIP_PROB) {
                flows.push(OdFlow::new(o, d, rng.gen_range(500.0..9_000.0)));
            }
        }
    }
    Ok(DemandPool::from_flows(flows)?)
}

/// Every link with an endpoint inside the flood circle.
pub fn flood_extent(network: &RoadNetwork) -> Disruption {
    let wet = |n: NodeId| network.node_pos[n.index()].distance_miles(FLOOD_CENTRE) < FLOOD_RADIUS;
    Disruption::select(network, |_, link| wet(link.from) || wet(link.to))
}
