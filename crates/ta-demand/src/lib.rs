//! `ta-demand` — origin-destination demand bookkeeping and CSV loading.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                  |
//! |------------|-----------------------------------------------------------|
//! | [`pool`]   | `DemandPool`, `OdList`, `OdFlow`, `MIN_FLOW`              |
//! | [`loader`] | `load_demand_csv`, `load_demand_reader`                   |
//! | [`error`]  | `DemandError`, `DemandResult<T>`                          |
//!
//! # Shrinking model
//!
//! The pool only ever shrinks.  Each assignment iteration either takes a
//! uniform share of every flow out of it (`apply_ratio`), removes fully
//! allocated pairs (`remove_pairs`), or drops pairs that have no path
//! (`drop_unroutable`).  Entries falling below [`MIN_FLOW`] are pruned and
//! origins left without destinations disappear.

pub mod error;
pub mod loader;
pub mod pool;


pub use error::{DemandError, DemandResult};
pub use loader::{load_demand_csv, load_demand_reader};
pub use pool::{DemandPool, OdFlow, OdList, MIN_FLOW};
