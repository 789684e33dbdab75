//! Plain-text per-scenario allocation table.

use std::fmt;

use crate::model::{PerResource, Resource};
use crate::optim::ConvergenceWarning;
use crate::runner::{ScenarioOutcome, SiteOutcome};
use crate::sim::kpi::ScenarioKpis;
use crate::sim::{ResourceYear, YearRecord};

const LABEL_WIDTH: usize = 18;
const CELL_WIDTH: usize = 11;

/// Marker appended to a cell that fails its check.
pub const FLAG: char = '*';

/// One site/scenario table.
///
/// Rows per resource class: `Total` (flagged below target), `Target`,
/// `Budget` (equipment spend), and `Junk` (carry-forward, flagged above the
/// alert share of target). The `Initial` column holds starting capacity.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioReport<'a> {
    pub site: &'a str,
    pub scenario: &'a str,
    pub initial_capacity: PerResource<f64>,
    pub trace: &'a [YearRecord],
    pub warning: Option<&'a ConvergenceWarning>,
}

impl<'a> ScenarioReport<'a> {
    pub fn new(site: &'a SiteOutcome, outcome: &'a ScenarioOutcome) -> Self {
        Self {
            site: &site.site.name,
            scenario: &outcome.scenario.name,
            initial_capacity: site.site.initial_capacity,
            trace: &outcome.allocation.simulation.trace,
            warning: outcome.allocation.warning.as_ref(),
        }
    }

    pub fn kpis(&self) -> ScenarioKpis {
        ScenarioKpis::from_trace(self.trace)
    }
}

/// Reports for every scenario of every site, in run order.
pub fn reports(outcomes: &[SiteOutcome]) -> Vec<ScenarioReport<'_>> {
    outcomes
        .iter()
        .flat_map(|site| site.scenarios.iter().map(move |s| ScenarioReport::new(site, s)))
        .collect()
}

fn cell(f: &mut fmt::Formatter<'_>, value: f64, flagged: bool) -> fmt::Result {
    let mark = if flagged { FLAG } else { ' ' };
    write!(f, "{:>width$}{mark}", format!("{value:.2}"), width = CELL_WIDTH - 1)
}

fn blank(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:>width$}", "", width = CELL_WIDTH)
}

impl ScenarioReport<'_> {
    fn resource_rows(&self, f: &mut fmt::Formatter<'_>, resource: Resource) -> fmt::Result {
        let name = match resource {
            Resource::Storage => "Storage",
            Resource::Computing => "Computing",
        };
        let rows: [(&str, fn(&ResourceYear) -> (f64, bool)); 4] = [
            ("Total", |r| (r.capacity, r.below_target())),
            ("Target", |r| (r.target, false)),
            ("Budget", |r| (r.spend, false)),
            ("Junk", |r| (r.carry_forward, r.carry_forward_alert())),
        ];

        for (label, value) in rows {
            write!(f, "{:<width$}", format!("{name} {label}"), width = LABEL_WIDTH)?;
            if label == "Total" {
                cell(f, *self.initial_capacity.get(resource), false)?;
            } else {
                blank(f)?;
            }
            for record in self.trace {
                let (v, flagged) = value(record.resource(resource));
                cell(f, v, flagged)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for ScenarioReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} / {} ===", self.site, self.scenario)?;

        write!(f, "{:<width$}", "Year", width = LABEL_WIDTH)?;
        write!(f, "{:>width$}", "Initial ", width = CELL_WIDTH)?;
        for record in self.trace {
            write!(f, "{:>width$} ", record.year, width = CELL_WIDTH - 1)?;
        }
        writeln!(f)?;

        write!(f, "{:<width$}", "Storage fraction", width = LABEL_WIDTH)?;
        blank(f)?;
        for record in self.trace {
            write!(f, "{:>width$.3} ", record.fraction, width = CELL_WIDTH - 1)?;
        }
        writeln!(f)?;

        for resource in Resource::ALL {
            self.resource_rows(f, resource)?;
        }

        let loss: f64 = self.trace.iter().map(|r| r.loss).sum();
        write!(f, "Loss: {loss:.6}")?;
        if let Some(warning) = self.warning {
            write!(f, "\nWarning: {warning}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: u32, storage_capacity: f64, computing_carry: f64) -> YearRecord {
        let base = ResourceYear {
            spend: 12.5,
            target: 100.0,
            capacity: 100.0,
            carry_forward: 0.0,
            retired: 20.0,
        };
        YearRecord {
            year,
            budget: 0.25,
            available_budget: 25.0,
            fraction: 0.5,
            storage: ResourceYear {
                capacity: storage_capacity,
                ..base
            },
            computing: ResourceYear {
                carry_forward: computing_carry,
                ..base
            },
            loss: 0.0,
        }
    }

    fn report(trace: &[YearRecord]) -> String {
        ScenarioReport {
            site: "north",
            scenario: "flat",
            initial_capacity: PerResource::new(100.0, 90.0),
            trace,
            warning: None,
        }
        .to_string()
    }

    fn row<'s>(text: &'s str, label: &str) -> &'s str {
        text.lines()
            .find(|l| l.starts_with(label))
            .unwrap_or_else(|| panic!("row {label} missing in\n{text}"))
    }

    #[test]
    fn table_has_header_and_eight_resource_rows() {
        let text = report(&[record(2025, 100.0, 0.0), record(2026, 100.0, 0.0)]);
        let header = row(&text, "Year");
        assert!(header.contains("Initial"));
        assert!(header.contains("2025") && header.contains("2026"));
        for label in ["Total", "Target", "Budget", "Junk"] {
            row(&text, &format!("Storage {label}"));
            row(&text, &format!("Computing {label}"));
        }
    }

    #[test]
    fn shortfall_and_alert_cells_are_flagged() {
        let text = report(&[record(2025, 95.0, 0.0), record(2026, 100.0, 15.0)]);
        assert!(row(&text, "Storage Total").contains("95.00*"));
        assert!(!row(&text, "Storage Total").contains("100.00*"));
        assert!(row(&text, "Computing Junk").contains("15.00*"));
        assert!(!row(&text, "Storage Junk").contains(FLAG));
    }

    #[test]
    fn initial_column_shows_starting_capacity() {
        let text = report(&[record(2025, 100.0, 0.0)]);
        assert!(row(&text, "Computing Total").contains("90.00"));
    }

    #[test]
    fn junk_at_exactly_ten_percent_is_not_flagged() {
        let text = report(&[record(2025, 100.0, 10.0)]);
        assert!(!row(&text, "Computing Junk").contains(FLAG));
    }
}
