//! TOML-based plan configuration and preset definitions.
//!
//! The layout keeps one key per input row: every per-year quantity is an
//! array aligned with the `years` array of its table.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::model::{
    BudgetYear, PerResource, PlanningParameters, PlanningYear, ResourceParameters, ScenarioPlan,
    SiteState, SiteYear,
};
use crate::optim::MinimizerConfig;
use crate::runner::Plan;

/// Top-level plan configuration parsed from TOML.
///
/// Load with [`PlanConfig::from_toml_file`] or start from a preset such as
/// [`PlanConfig::demo`]. Call [`PlanConfig::build`] to validate and convert
/// into model types.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    /// Planning parameter table shared by every site.
    pub inputs: InputsConfig,
    pub sites: Vec<SiteConfig>,
    pub scenarios: Vec<ScenarioConfig>,
    /// Minimiser settings; every key is optional.
    pub optimizer: MinimizerConfig,
}

/// Per-year targets, costs, and lifetimes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputsConfig {
    pub years: Vec<u32>,
    pub storage: ResourceInputsConfig,
    pub computing: ResourceInputsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceInputsConfig {
    /// Target capacity as a multiple of site size.
    pub target: Vec<f64>,
    /// Cost per capacity unit.
    pub cost: Vec<f64>,
    /// Useful life in years.
    pub lifetime: Vec<f64>,
}

/// One facility: its size, overhead, and installed base.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub name: String,
    pub years: Vec<u32>,
    /// Scaling factor applied to budgets and target ratios.
    pub size: Vec<f64>,
    /// Non-equipment cost deducted from the scaled budget.
    pub non_equipment: Vec<f64>,
    pub storage: SiteResourceConfig,
    pub computing: SiteResourceConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteResourceConfig {
    /// Installed capacity before the first planning year.
    pub initial: f64,
    /// Capacity scheduled to leave service each year.
    pub retirement: Vec<f64>,
}

/// A named budget trajectory, per unit of site size.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub name: String,
    pub years: Vec<u32>,
    pub budget: Vec<f64>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"sites[0].storage.retirement"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const PLANNING_YEARS: [u32; 5] = [2025, 2026, 2027, 2028, 2029];

fn demo_inputs() -> InputsConfig {
    InputsConfig {
        years: PLANNING_YEARS.to_vec(),
        storage: ResourceInputsConfig {
            target: vec![1.0, 1.05, 1.1, 1.15, 1.2],
            cost: vec![1.0, 0.9, 0.8, 0.72, 0.65],
            lifetime: vec![5.0; 5],
        },
        computing: ResourceInputsConfig {
            target: vec![1.0, 1.1, 1.2, 1.3, 1.4],
            cost: vec![1.0, 0.85, 0.75, 0.65, 0.55],
            lifetime: vec![4.0; 5],
        },
    }
}

fn demo_sites() -> Vec<SiteConfig> {
    vec![
        SiteConfig {
            name: "north".to_string(),
            years: PLANNING_YEARS.to_vec(),
            size: vec![100.0; 5],
            non_equipment: vec![2.0; 5],
            storage: SiteResourceConfig {
                initial: 100.0,
                retirement: vec![20.0; 5],
            },
            computing: SiteResourceConfig {
                initial: 100.0,
                retirement: vec![25.0; 5],
            },
        },
        SiteConfig {
            name: "south".to_string(),
            years: PLANNING_YEARS.to_vec(),
            size: vec![60.0; 5],
            non_equipment: vec![1.5; 5],
            storage: SiteResourceConfig {
                initial: 55.0,
                retirement: vec![10.0, 12.0, 8.0, 15.0, 10.0],
            },
            computing: SiteResourceConfig {
                initial: 65.0,
                retirement: vec![15.0, 15.0, 20.0, 10.0, 15.0],
            },
        },
    ]
}

fn scenario(name: &str, budget: &[f64]) -> ScenarioConfig {
    ScenarioConfig {
        name: name.to_string(),
        years: PLANNING_YEARS.to_vec(),
        budget: budget.to_vec(),
    }
}

impl PlanConfig {
    /// Two sites under a flat and a ramping budget.
    pub fn demo() -> Self {
        Self {
            inputs: demo_inputs(),
            sites: demo_sites(),
            scenarios: vec![
                scenario("flat", &[0.3; 5]),
                scenario("ramp", &[0.2, 0.25, 0.3, 0.35, 0.4]),
            ],
            optimizer: MinimizerConfig::default(),
        }
    }

    /// Same sites as `demo` with budgets too small to hold the targets.
    pub fn austerity() -> Self {
        Self {
            scenarios: vec![
                scenario("cut", &[0.15; 5]),
                scenario("freeze", &[0.3, 0.1, 0.0, 0.0, 0.1]),
            ],
            ..Self::demo()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "austerity"];

    /// Loads a plan from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "austerity" => Ok(Self::austerity()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a plan from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("plan", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a plan from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let inputs = &self.inputs;
        let n = inputs.years.len();
        if n == 0 {
            errors.push(ConfigError::new("inputs.years", "must not be empty"));
        }
        check_unique_years(&mut errors, "inputs.years", &inputs.years);
        for (key, res) in [("storage", &inputs.storage), ("computing", &inputs.computing)] {
            let prefix = format!("inputs.{key}");
            check_series(&mut errors, &format!("{prefix}.target"), &res.target, n, Bound::Positive);
            check_series(&mut errors, &format!("{prefix}.cost"), &res.cost, n, Bound::Positive);
            check_series(
                &mut errors,
                &format!("{prefix}.lifetime"),
                &res.lifetime,
                n,
                Bound::Positive,
            );
        }

        if self.sites.is_empty() {
            errors.push(ConfigError::new("sites", "at least one site is required"));
        }
        let mut site_names = HashSet::new();
        for (i, site) in self.sites.iter().enumerate() {
            let prefix = format!("sites[{i}]");
            check_name(&mut errors, &prefix, &site.name, &mut site_names);
            let n = site.years.len();
            check_unique_years(&mut errors, &format!("{prefix}.years"), &site.years);
            check_series(&mut errors, &format!("{prefix}.size"), &site.size, n, Bound::Positive);
            check_series(
                &mut errors,
                &format!("{prefix}.non_equipment"),
                &site.non_equipment,
                n,
                Bound::NonNegative,
            );
            for (key, res) in [("storage", &site.storage), ("computing", &site.computing)] {
                if !(res.initial.is_finite() && res.initial >= 0.0) {
                    errors.push(ConfigError::new(
                        format!("{prefix}.{key}.initial"),
                        format!("must be >= 0, got {}", res.initial),
                    ));
                }
                check_series(
                    &mut errors,
                    &format!("{prefix}.{key}.retirement"),
                    &res.retirement,
                    n,
                    Bound::NonNegative,
                );
            }
        }

        if self.scenarios.is_empty() {
            errors.push(ConfigError::new("scenarios", "at least one scenario is required"));
        }
        let mut scenario_names = HashSet::new();
        for (i, scenario) in self.scenarios.iter().enumerate() {
            let prefix = format!("scenarios[{i}]");
            check_name(&mut errors, &prefix, &scenario.name, &mut scenario_names);
            let field = format!("{prefix}.years");
            if scenario.years.is_empty() {
                errors.push(ConfigError::new(&field, "must not be empty"));
            }
            check_unique_years(&mut errors, &field, &scenario.years);
            check_series(
                &mut errors,
                &format!("{prefix}.budget"),
                &scenario.budget,
                scenario.years.len(),
                Bound::NonNegative,
            );

            check_years_covered(
                &mut errors,
                &field,
                &scenario.years,
                "inputs.years",
                &inputs.years,
            );
            for (j, site) in self.sites.iter().enumerate() {
                check_years_covered(
                    &mut errors,
                    &field,
                    &scenario.years,
                    &format!("sites[{j}].years"),
                    &site.years,
                );
            }
        }

        let opt = &self.optimizer;
        if !(opt.pg_tol.is_finite() && opt.pg_tol >= 0.0) {
            errors.push(ConfigError::new("optimizer.pg_tol", "must be >= 0"));
        }
        if !(opt.f_tol.is_finite() && opt.f_tol >= 0.0) {
            errors.push(ConfigError::new("optimizer.f_tol", "must be >= 0"));
        }
        if !(opt.gradient_step.is_finite() && opt.gradient_step > 0.0) {
            errors.push(ConfigError::new("optimizer.gradient_step", "must be > 0"));
        }
        if !(opt.armijo_c1 > 0.0 && opt.armijo_c1 < 1.0) {
            errors.push(ConfigError::new("optimizer.armijo_c1", "must be in (0.0, 1.0)"));
        }
        if !(opt.backtrack_beta > 0.0 && opt.backtrack_beta < 1.0) {
            errors.push(ConfigError::new(
                "optimizer.backtrack_beta",
                "must be in (0.0, 1.0)",
            ));
        }
        if opt.max_line_search_trials == 0 {
            errors.push(ConfigError::new(
                "optimizer.max_line_search_trials",
                "must be > 0",
            ));
        }

        errors
    }

    /// Validates and converts the configuration into model types.
    ///
    /// # Errors
    ///
    /// Returns every validation error if the configuration is invalid.
    pub fn build(&self) -> Result<Plan, Vec<ConfigError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let inputs = &self.inputs;
        let resource_params = |res: &ResourceInputsConfig, i: usize| ResourceParameters {
            target_ratio: res.target[i],
            unit_cost: res.cost[i],
            useful_life_years: res.lifetime[i],
        };
        let parameters = PlanningParameters::new(
            inputs
                .years
                .iter()
                .enumerate()
                .map(|(i, &year)| PlanningYear {
                    year,
                    resources: PerResource::new(
                        resource_params(&inputs.storage, i),
                        resource_params(&inputs.computing, i),
                    ),
                })
                .collect(),
        );

        let sites = self
            .sites
            .iter()
            .map(|site| SiteState {
                name: site.name.clone(),
                initial_capacity: PerResource::new(site.storage.initial, site.computing.initial),
                years: site
                    .years
                    .iter()
                    .enumerate()
                    .map(|(i, &year)| SiteYear {
                        year,
                        scheduled_retirement: PerResource::new(
                            site.storage.retirement[i],
                            site.computing.retirement[i],
                        ),
                        size_constant: site.size[i],
                        non_equipment_cost: site.non_equipment[i],
                    })
                    .collect(),
            })
            .collect();

        let scenarios = self
            .scenarios
            .iter()
            .map(|s| ScenarioPlan {
                name: s.name.clone(),
                years: s
                    .years
                    .iter()
                    .zip(&s.budget)
                    .map(|(&year, &budget)| BudgetYear { year, budget })
                    .collect(),
            })
            .collect();

        Ok(Plan {
            parameters,
            sites,
            scenarios,
            optimizer: self.optimizer,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Positive,
    NonNegative,
}

impl Bound {
    fn admits(self, v: f64) -> bool {
        v.is_finite()
            && match self {
                Bound::Positive => v > 0.0,
                Bound::NonNegative => v >= 0.0,
            }
    }

    fn describe(self) -> &'static str {
        match self {
            Bound::Positive => "must be > 0",
            Bound::NonNegative => "must be >= 0",
        }
    }
}

/// Length must match the table's years; the first bad value is reported.
fn check_series(
    errors: &mut Vec<ConfigError>,
    field: &str,
    values: &[f64],
    expected_len: usize,
    bound: Bound,
) {
    if values.len() != expected_len {
        errors.push(ConfigError::new(
            field,
            format!(
                "expected {expected_len} values (one per year), got {}",
                values.len()
            ),
        ));
    }
    if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !bound.admits(**v)) {
        errors.push(ConfigError::new(
            format!("{field}[{i}]"),
            format!("{}, got {v}", bound.describe()),
        ));
    }
}

fn check_unique_years(errors: &mut Vec<ConfigError>, field: &str, years: &[u32]) {
    let mut seen = HashSet::new();
    if let Some(dup) = years.iter().find(|y| !seen.insert(**y)) {
        errors.push(ConfigError::new(field, format!("year {dup} appears more than once")));
    }
}

fn check_years_covered(
    errors: &mut Vec<ConfigError>,
    field: &str,
    years: &[u32],
    table: &str,
    table_years: &[u32],
) {
    for year in years.iter().filter(|y| !table_years.contains(y)) {
        errors.push(ConfigError::new(field, format!("year {year} is missing from {table}")));
    }
}

fn check_name<'a>(
    errors: &mut Vec<ConfigError>,
    prefix: &str,
    name: &'a str,
    seen: &mut HashSet<&'a str>,
) {
    if name.trim().is_empty() {
        errors.push(ConfigError::new(format!("{prefix}.name"), "must not be empty"));
    } else if !seen.insert(name) {
        errors.push(ConfigError::new(
            format!("{prefix}.name"),
            format!("duplicate name \"{name}\""),
        ));
    }
}
