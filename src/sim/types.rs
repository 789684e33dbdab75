//! Simulation output types: per-year records and the full run.

use std::fmt;

use crate::model::Resource;

use super::simulator::CARRY_FORWARD_WEIGHT;

/// Share of a year's target above which carried-forward capacity is flagged.
pub const CARRY_FORWARD_ALERT_RATIO: f64 = 0.1;

/// One resource class's outcome for one planning year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceYear {
    /// Budget spent on this class.
    pub spend: f64,
    /// Target capacity (`target_ratio * size_constant`).
    pub target: f64,
    /// Capacity in service at year end, including carry-forward.
    pub capacity: f64,
    /// Retired capacity kept in service past end-of-life.
    pub carry_forward: f64,
    /// Effective retirement: scheduled retirement plus last year's carry-forward.
    pub retired: f64,
}

impl ResourceYear {
    pub fn below_target(&self) -> bool {
        self.capacity < self.target
    }

    pub fn carry_forward_alert(&self) -> bool {
        self.carry_forward > CARRY_FORWARD_ALERT_RATIO * self.target
    }

    pub fn capacity_ratio(&self) -> f64 {
        self.capacity / self.target
    }

    pub fn carry_forward_ratio(&self) -> f64 {
        self.carry_forward / self.target
    }

    /// Squared relative deviation from target plus the weighted carry-forward penalty.
    pub fn loss(&self) -> f64 {
        let deviation = (self.target - self.capacity) / self.target;
        let carried = self.carry_forward / self.target;
        deviation * deviation + CARRY_FORWARD_WEIGHT * carried * carried
    }
}

/// Complete record of one simulated planning year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearRecord {
    pub year: u32,
    /// Scenario budget per unit of site size.
    pub budget: f64,
    /// Absolute budget left for equipment after overhead.
    pub available_budget: f64,
    /// Storage share of `available_budget`.
    pub fraction: f64,
    pub storage: ResourceYear,
    pub computing: ResourceYear,
    /// Loss contribution of this year, both classes.
    pub loss: f64,
}

impl YearRecord {
    pub fn resource(&self, resource: Resource) -> &ResourceYear {
        match resource {
            Resource::Storage => &self.storage,
            Resource::Computing => &self.computing,
        }
    }

    /// Storage spend over total equipment spend; 1.0 when nothing went to computing.
    pub fn storage_budget_share(&self) -> f64 {
        if self.computing.spend != 0.0 {
            self.storage.spend / (self.storage.spend + self.computing.spend)
        } else {
            1.0
        }
    }
}

impl fmt::Display for YearRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | budget={:.2} frac={:.3} | storage {:.2}/{:.2} (oow={:.2}) | \
             computing {:.2}/{:.2} (oow={:.2}) | loss={:.5}",
            self.year,
            self.available_budget,
            self.fraction,
            self.storage.capacity,
            self.storage.target,
            self.storage.carry_forward,
            self.computing.capacity,
            self.computing.target,
            self.computing.carry_forward,
            self.loss,
        )
    }
}

/// Result of simulating one fraction vector over a horizon.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Simulation {
    pub total_loss: f64,
    /// One record per planning year, in horizon order.
    pub trace: Vec<YearRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(capacity: f64, carry_forward: f64) -> ResourceYear {
        ResourceYear {
            spend: 0.0,
            target: 100.0,
            capacity,
            carry_forward,
            retired: 20.0,
        }
    }

    #[test]
    fn flags_follow_target_and_alert_ratio() {
        assert!(resource(99.0, 0.0).below_target());
        assert!(!resource(100.0, 0.0).below_target());
        assert!(resource(100.0, 10.5).carry_forward_alert());
        assert!(!resource(100.0, 10.0).carry_forward_alert());
    }

    #[test]
    fn loss_of_carry_forward_only() {
        // ((100-100)/100)^2 + 0.5*(20/100)^2
        let loss = resource(100.0, 20.0).loss();
        assert!((loss - 0.02).abs() < 1e-12);
    }

    #[test]
    fn storage_share_defaults_to_one_without_computing_spend() {
        let mut record = YearRecord {
            year: 2025,
            budget: 0.0,
            available_budget: 0.0,
            fraction: 0.5,
            storage: resource(100.0, 0.0),
            computing: resource(100.0, 0.0),
            loss: 0.0,
        };
        assert_eq!(record.storage_budget_share(), 1.0);
        record.storage.spend = 30.0;
        record.computing.spend = 10.0;
        assert!((record.storage_budget_share() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn year_record_display_does_not_panic() {
        let record = YearRecord {
            year: 2025,
            budget: 0.2,
            available_budget: 20.0,
            fraction: 1.0,
            storage: resource(100.0, 0.0),
            computing: resource(80.0, 20.0),
            loss: 0.02,
        };
        let s = format!("{record}");
        assert!(s.starts_with("2025"));
    }
}
