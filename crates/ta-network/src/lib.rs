//! `ta-network` — road network graph, link state, and routing.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`network`] | `RoadNetwork` (CSR + R-tree + link state), `RoadNetworkBuilder`, `LinkSpec` |
//! | [`router`]  | `ShortestPathRouter` trait, `Route`, `DijkstraRouter`       |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                          |

pub mod error;
pub mod network;
pub mod router;


pub use error::{NetworkError, NetworkResult};
pub use network::{LinkAttrs, LinkSpec, LinkState, RoadNetwork, RoadNetworkBuilder, REMOVAL_THRESHOLD};
pub use router::{DijkstraRouter, Route, ShortestPathRouter};
