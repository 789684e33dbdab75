//! CSV export for scenario traces and ratio series.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::PlanResult;
use crate::runner::SiteOutcome;
use crate::sim::{ResourceYear, YearRecord};

/// Column header for per-scenario trace export.
pub const TRACE_HEADER: &str = "year,budget,available_budget,storage_fraction,\
                                storage_spend,storage_target,storage_capacity,\
                                storage_oow,storage_retired,\
                                computing_spend,computing_target,computing_capacity,\
                                computing_oow,computing_retired,\
                                loss";

/// Column header for the ratio series across sites and scenarios.
pub const RATIO_HEADER: &str = "site,scenario,year,storage_ratio,storage_oow_ratio,\
                                computing_ratio,computing_oow_ratio,storage_budget_fraction";

/// Exports one scenario trace to a CSV file at the given path.
///
/// # Errors
///
/// Returns `PlanError::Io` or `PlanError::Csv` if file creation or writing fails.
pub fn export_trace_csv(trace: &[YearRecord], path: &Path) -> PlanResult<()> {
    let file = File::create(path)?;
    write_trace_csv(trace, io::BufWriter::new(file))
}

/// Writes a scenario trace as CSV to any writer, one row per planning year.
///
/// # Errors
///
/// Returns `PlanError::Io` or `PlanError::Csv` if writing fails.
pub fn write_trace_csv(trace: &[YearRecord], writer: impl Write) -> PlanResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRACE_HEADER.split(',').map(str::trim))?;

    let resource_cells = |r: &ResourceYear| {
        [r.spend, r.target, r.capacity, r.carry_forward, r.retired].map(|v| format!("{v:.4}"))
    };
    for r in trace {
        let mut row = vec![
            r.year.to_string(),
            format!("{:.4}", r.budget),
            format!("{:.4}", r.available_budget),
            format!("{:.6}", r.fraction),
        ];
        row.extend(resource_cells(&r.storage));
        row.extend(resource_cells(&r.computing));
        row.push(format!("{:.8}", r.loss));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports capacity and carry-forward ratios for every site and scenario.
///
/// # Errors
///
/// Returns `PlanError::Io` or `PlanError::Csv` if file creation or writing fails.
pub fn export_ratio_csv(outcomes: &[SiteOutcome], path: &Path) -> PlanResult<()> {
    let file = File::create(path)?;
    write_ratio_csv(outcomes, io::BufWriter::new(file))
}

/// Writes one row per (site, scenario, year), all ratios relative to target.
///
/// # Errors
///
/// Returns `PlanError::Io` or `PlanError::Csv` if writing fails.
pub fn write_ratio_csv(outcomes: &[SiteOutcome], writer: impl Write) -> PlanResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(RATIO_HEADER.split(',').map(str::trim))?;

    for site in outcomes {
        for outcome in &site.scenarios {
            for r in &outcome.allocation.simulation.trace {
                wtr.write_record(&[
                    site.site.name.clone(),
                    outcome.scenario.name.clone(),
                    r.year.to_string(),
                    format!("{:.6}", r.storage.capacity_ratio()),
                    format!("{:.6}", r.storage.carry_forward_ratio()),
                    format!("{:.6}", r.computing.capacity_ratio()),
                    format!("{:.6}", r.computing.carry_forward_ratio()),
                    format!("{:.6}", r.storage_budget_share()),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// File name for a site/scenario trace, as `<site>.<scenario>.csv`.
///
/// Bytes outside `[A-Za-z0-9-]` are written as `_xx` (lower-case hex), so
/// `.` only ever appears as the separator and distinct pairs never share a
/// file.
pub fn trace_file_name(site: &str, scenario: &str) -> String {
    format!("{}.{}.csv", escape_component(site), escape_component(scenario))
}

fn escape_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("_{b:02x}"));
        }
    }
    out
}
