use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, PlanConfig};

/// Default preset when neither `--plan` nor `--preset` is given.
pub const DEFAULT_PRESET: &str = "demo";

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "capacity-planner")]
#[command(version)]
#[command(about = "Allocate yearly equipment budgets between storage and computing capacity")]
pub struct CliOptions {
    /// Path to a TOML plan file
    #[arg(long, value_name = "FILE", conflicts_with = "preset")]
    pub plan: Option<PathBuf>,

    /// Built-in plan preset (demo, austerity)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Directory for one trace CSV per site and scenario
    #[arg(long, value_name = "DIR")]
    pub trace_dir: Option<PathBuf>,

    /// CSV file for capacity and carry-forward ratio series
    #[arg(long, value_name = "FILE")]
    pub ratio_out: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub json_logs: bool,
}

/// Where the plan comes from once defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSource {
    File(PathBuf),
    Preset(String),
}

impl CliOptions {
    pub fn source(&self) -> PlanSource {
        match (&self.plan, &self.preset) {
            (Some(path), _) => PlanSource::File(path.clone()),
            (None, Some(name)) => PlanSource::Preset(name.clone()),
            (None, None) => PlanSource::Preset(DEFAULT_PRESET.to_string()),
        }
    }

    /// Loads the selected plan configuration without validating it.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unreadable file, invalid TOML, or an
    /// unknown preset.
    pub fn load_config(&self) -> Result<PlanConfig, ConfigError> {
        match self.source() {
            PlanSource::File(path) => PlanConfig::from_toml_file(&path),
            PlanSource::Preset(name) => PlanConfig::from_preset(&name),
        }
    }
}
