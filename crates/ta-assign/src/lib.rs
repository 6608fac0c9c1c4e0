//! `ta-assign` — capacity-restrained traffic assignment.
//!
//! # Iteration loop
//!
//! ```text
//! while demand pending:
//!   ① Route      — cheapest path for every pending OD pair, one search per
//!                  origin (parallel with the `parallel` feature).
//!   ② Aggregate  — proposed load per link.
//!   ③ Decide     — LoadPolicy: accept, or throttle every flow by 0 < r < 1.
//!   ④ Stage      — new flow/speed/cost per loaded link, validated.
//!   ⑤ Demand     — strand unroutable pairs; remove (accept) or keep the
//!                  unallocated share (throttle).
//!   ⑥ Commit     — link state and total cost.
//!   ⑦ Graph      — remove exhausted links, recompute weights.
//!   ⑧ Converge   — stop when the pool is empty.
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Runs per-origin routing on Rayon's thread pool.        |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ta_assign::{AssignmentBuilder, NoopObserver};
//! use ta_network::DijkstraRouter;
//!
//! let mut engine = AssignmentBuilder::new(network, demand, calibration, DijkstraRouter)
//!     .build()?;
//! engine.run(&mut NoopObserver)?;
//! let report = engine.report();
//! ```

pub mod builder;
pub mod config;
pub mod disruption;
pub mod engine;
pub mod error;
pub mod observer;
pub mod policy;
pub mod report;
pub mod state;

#[cfg(test)]
mod tests;

pub use builder::AssignmentBuilder;
pub use config::AssignmentConfig;
pub use disruption::{affected_demand, Disruption, DisruptionImpact};
pub use engine::{AssignmentEngine, PathAssignment};
pub use error::{AssignError, AssignResult};
pub use observer::{AssignmentObserver, NoopObserver};
pub use policy::{LoadDecision, LoadPolicy, UniformThrottle};
pub use report::{AssignmentReport, Branch, IterationSummary, LinkResult, OdPathRecord};
pub use state::{FailureKind, RunState, RunStatus};
