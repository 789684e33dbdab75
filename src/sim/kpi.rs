//! Post-hoc KPI computation from a scenario trace.

use std::fmt;

use crate::model::{PerResource, Resource};

use super::types::{ResourceYear, YearRecord};

/// Aggregate indicators derived from a complete scenario trace.
///
/// Computed from `&[YearRecord]` so reported figures always agree with the
/// per-year table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioKpis {
    /// Sum of per-year loss contributions.
    pub total_loss: f64,
    /// Years where end-of-year capacity is below target.
    pub years_below_target: PerResource<usize>,
    /// Years where carry-forward exceeds the alert share of target.
    pub years_over_carry_alert: PerResource<usize>,
    /// Largest carry-forward to target ratio over the horizon.
    pub peak_carry_forward_ratio: PerResource<f64>,
    /// Mean storage share of the available budget.
    pub mean_storage_fraction: f64,
    /// Total equipment spend over the horizon.
    pub total_spend: f64,
}

impl ScenarioKpis {
    /// Computes all KPIs from the trace.
    pub fn from_trace(trace: &[YearRecord]) -> Self {
        if trace.is_empty() {
            return Self {
                total_loss: 0.0,
                years_below_target: PerResource::default(),
                years_over_carry_alert: PerResource::default(),
                peak_carry_forward_ratio: PerResource::default(),
                mean_storage_fraction: 0.0,
                total_spend: 0.0,
            };
        }

        let count = |pred: fn(&ResourceYear) -> bool| {
            PerResource::from_fn(|r: Resource| {
                trace.iter().filter(|rec| pred(rec.resource(r))).count()
            })
        };
        let years_below_target = count(ResourceYear::below_target);
        let years_over_carry_alert = count(ResourceYear::carry_forward_alert);

        let peak_carry_forward_ratio = PerResource::from_fn(|r| {
            trace
                .iter()
                .map(|rec| rec.resource(r).carry_forward_ratio())
                .fold(0.0, f64::max)
        });

        let n = trace.len() as f64;
        Self {
            total_loss: trace.iter().map(|r| r.loss).sum(),
            years_below_target,
            years_over_carry_alert,
            peak_carry_forward_ratio,
            mean_storage_fraction: trace.iter().map(|r| r.fraction).sum::<f64>() / n,
            total_spend: trace
                .iter()
                .map(|r| r.storage.spend + r.computing.spend)
                .sum(),
        }
    }
}

impl fmt::Display for ScenarioKpis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Total loss:               {:.6}", self.total_loss)?;
        writeln!(f, "Total equipment spend:    {:.2}", self.total_spend)?;
        writeln!(
            f,
            "Mean storage fraction:    {:.3}",
            self.mean_storage_fraction
        )?;
        writeln!(
            f,
            "Years below target:       storage={} computing={}",
            self.years_below_target.storage, self.years_below_target.computing
        )?;
        writeln!(
            f,
            "Years over OOW alert:     storage={} computing={}",
            self.years_over_carry_alert.storage, self.years_over_carry_alert.computing
        )?;
        write!(
            f,
            "Peak OOW / target:        storage={:.3} computing={:.3}",
            self.peak_carry_forward_ratio.storage, self.peak_carry_forward_ratio.computing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(fraction: f64, storage_capacity: f64, computing_carry: f64) -> YearRecord {
        let base = ResourceYear {
            spend: 10.0,
            target: 100.0,
            capacity: 100.0,
            carry_forward: 0.0,
            retired: 20.0,
        };
        YearRecord {
            year: 2025,
            budget: 0.2,
            available_budget: 20.0,
            fraction,
            storage: ResourceYear {
                capacity: storage_capacity,
                ..base
            },
            computing: ResourceYear {
                carry_forward: computing_carry,
                ..base
            },
            loss: 0.01,
        }
    }

    #[test]
    fn counts_shortfalls_and_alerts() {
        let trace = vec![
            make_record(0.5, 90.0, 0.0),
            make_record(0.5, 100.0, 15.0),
            make_record(0.5, 95.0, 5.0),
        ];
        let kpi = ScenarioKpis::from_trace(&trace);
        assert_eq!(kpi.years_below_target.storage, 2);
        assert_eq!(kpi.years_below_target.computing, 0);
        assert_eq!(kpi.years_over_carry_alert.computing, 1);
        assert!((kpi.peak_carry_forward_ratio.computing - 0.15).abs() < 1e-12);
    }

    #[test]
    fn mean_fraction_and_totals() {
        let trace = vec![make_record(0.2, 100.0, 0.0), make_record(0.8, 100.0, 0.0)];
        let kpi = ScenarioKpis::from_trace(&trace);
        assert!((kpi.mean_storage_fraction - 0.5).abs() < 1e-12);
        assert!((kpi.total_loss - 0.02).abs() < 1e-12);
        assert!((kpi.total_spend - 40.0).abs() < 1e-12);
    }

    #[test]
    fn empty_trace() {
        let kpi = ScenarioKpis::from_trace(&[]);
        assert_eq!(kpi.total_loss, 0.0);
        assert_eq!(kpi.years_below_target.storage, 0);
    }
}
