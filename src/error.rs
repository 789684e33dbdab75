//! Error type shared by the simulator, optimizer, and export layers.

use thiserror::Error;

use crate::model::Resource;

/// Errors raised while resolving, simulating, or exporting a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A scenario year has no entry in one of the input tables.
    #[error("year {year} is missing from {table}")]
    ConfigurationMismatch { year: u32, table: &'static str },

    /// Target capacity (`target_ratio * size_constant`) is zero, negative, or not finite.
    #[error("{resource} target for year {year} must be > 0, got {target}")]
    InvalidTarget {
        year: u32,
        resource: Resource,
        target: f64,
    },

    #[error("{resource} unit cost for year {year} must be > 0, got {cost}")]
    InvalidUnitCost {
        year: u32,
        resource: Resource,
        cost: f64,
    },

    #[error("expected {expected} fractions (one per planning year), got {actual}")]
    FractionCountMismatch { expected: usize, actual: usize },

    #[error("storage fraction for year {year} must lie in [0, 1], got {value}")]
    FractionOutOfRange { year: u32, value: f64 },

    /// A simulated quantity left its valid domain.
    #[error("invariant violated in year {year}: {message}")]
    InvariantViolation { year: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_names_year_and_table() {
        let err = PlanError::ConfigurationMismatch {
            year: 2027,
            table: "site state",
        };
        assert_eq!(err.to_string(), "year 2027 is missing from site state");
    }

    #[test]
    fn invalid_target_names_resource() {
        let err = PlanError::InvalidTarget {
            year: 2025,
            resource: Resource::Computing,
            target: 0.0,
        };
        assert!(err.to_string().starts_with("computing target for year 2025"));
    }
}
