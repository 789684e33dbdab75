/// Scenario resolution against the planning and site tables.
pub mod horizon;
pub mod kpi;
pub mod simulator;
pub mod types;

pub use horizon::Horizon;
pub use simulator::simulate;
pub use types::{ResourceYear, Simulation, YearRecord};
