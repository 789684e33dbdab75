//! Capacity planner entry point.

use std::fs;
use std::process;

use clap::Parser;
use tracing::info;

use capacity_planner::cli::CliOptions;
use capacity_planner::io::export::{export_ratio_csv, export_trace_csv, trace_file_name};
use capacity_planner::report::reports;
use capacity_planner::runner::run_plan;
use capacity_planner::telemetry::init_tracing;

fn main() {
    let cli = CliOptions::parse();
    init_tracing(cli.json_logs);

    let config = match cli.load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    // Validate and convert
    let plan = match config.build() {
        Ok(plan) => plan,
        Err(errors) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
    };

    let outcomes = match run_plan(&plan) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    for report in reports(&outcomes) {
        println!("{report}\n");
        println!("{}\n", report.kpis());
    }

    if let Some(ref dir) = cli.trace_dir {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("error: cannot create \"{}\": {e}", dir.display());
            process::exit(1);
        }
        for site in &outcomes {
            for outcome in &site.scenarios {
                let path = dir.join(trace_file_name(&site.site.name, &outcome.scenario.name));
                if let Err(e) = export_trace_csv(&outcome.allocation.simulation.trace, &path) {
                    eprintln!("error: failed to write \"{}\": {e}", path.display());
                    process::exit(1);
                }
            }
        }
        info!(dir = %dir.display(), "traces written");
    }

    if let Some(ref path) = cli.ratio_out {
        if let Err(e) = export_ratio_csv(&outcomes, path) {
            eprintln!("error: failed to write \"{}\": {e}", path.display());
            process::exit(1);
        }
        info!(path = %path.display(), "ratio series written");
    }
}
