//! Multi-year equipment budget planner for storage and computing capacity.

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
/// Bounded minimiser and the per-scenario fraction optimizer.
pub mod optim;
pub mod report;
pub mod runner;
/// Capacity simulation, trace records, and KPIs.
pub mod sim;
pub mod telemetry;

pub use error::{PlanError, PlanResult};
