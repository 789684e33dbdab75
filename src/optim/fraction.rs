//! Per-scenario search for the storage budget fractions that minimise loss.

use std::fmt;

use tracing::{debug, warn};

use crate::error::PlanResult;
use crate::model::{PlanningParameters, ScenarioPlan, SiteState};
use crate::sim::{Horizon, Simulation};

use super::bounded::{BoxBounds, MinimizerConfig, Termination, minimize};

/// Start point for every year: an even split between the two classes.
pub const INITIAL_FRACTION: f64 = 0.5;

/// The minimiser stopped without meeting its convergence criteria.
///
/// The accompanying allocation is still the best point found and remains
/// usable; this only tells the caller the optimum may be degraded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceWarning {
    pub scenario: String,
    pub termination: Termination,
    pub iterations: usize,
    pub projected_gradient: f64,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scenario \"{}\" did not converge: {} after {} iterations (projected gradient {:.3e})",
            self.scenario, self.termination, self.iterations, self.projected_gradient
        )
    }
}

/// Best fraction vector for a scenario and the trace it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Storage share of each year's available budget, in horizon order.
    pub fractions: Vec<f64>,
    /// Re-run of the simulator at `fractions`.
    pub simulation: Simulation,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
    pub warning: Option<ConvergenceWarning>,
}

impl Allocation {
    pub fn total_loss(&self) -> f64 {
        self.simulation.total_loss
    }
}

/// Minimises simulated loss over `[0, 1]` per planning year.
#[derive(Debug, Clone, Default)]
pub struct FractionOptimizer {
    config: MinimizerConfig,
}

impl FractionOptimizer {
    pub fn new(config: MinimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MinimizerConfig {
        &self.config
    }

    /// Resolves the scenario and searches for the loss-minimising fractions.
    ///
    /// # Errors
    ///
    /// Resolution errors (`ConfigurationMismatch`, `InvalidTarget`,
    /// `InvalidUnitCost`) before any simulation, or the first simulation
    /// error met during the search or the final re-run. Non-convergence is
    /// not an error; see [`Allocation::warning`].
    pub fn optimize(
        &self,
        parameters: &PlanningParameters,
        site: &SiteState,
        scenario: &ScenarioPlan,
    ) -> PlanResult<Allocation> {
        let horizon = Horizon::resolve(parameters, site, scenario)?;
        self.optimize_horizon(&scenario.name, &horizon)
    }

    /// Same as [`FractionOptimizer::optimize`] for an already resolved horizon.
    pub fn optimize_horizon(&self, scenario: &str, horizon: &Horizon) -> PlanResult<Allocation> {
        let n = horizon.len();
        let bounds = BoxBounds::uniform(n, 0.0, 1.0);
        let start = vec![INITIAL_FRACTION; n];

        // A failed evaluation reads as +inf so the search can wind down, but
        // the first error is still returned.
        let mut search_error = None;
        let objective = |x: &[f64]| match horizon.loss(x) {
            Ok(loss) => loss,
            Err(e) => {
                debug!(scenario, error = %e, "evaluation failed during fraction search");
                if search_error.is_none() {
                    search_error = Some(e);
                }
                f64::INFINITY
            }
        };
        let minimum = minimize(objective, &start, &bounds, &self.config);
        if let Some(e) = search_error {
            return Err(e);
        }

        let simulation = horizon.run(&minimum.x)?;
        debug!(
            scenario,
            loss = simulation.total_loss,
            iterations = minimum.iterations,
            evaluations = minimum.evaluations,
            "fraction search finished"
        );

        let warning = if minimum.converged() {
            None
        } else {
            let warning = ConvergenceWarning {
                scenario: scenario.to_string(),
                termination: minimum.termination,
                iterations: minimum.iterations,
                projected_gradient: minimum.projected_gradient,
            };
            warn!(%warning, "returning best-effort allocation");
            Some(warning)
        };

        Ok(Allocation {
            fractions: minimum.x,
            simulation,
            iterations: minimum.iterations,
            evaluations: minimum.evaluations,
            termination: minimum.termination,
            warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanError;
    use crate::model::PerResource;
    use crate::sim::horizon::{ResourceInputs, YearInputs};

    /// One year, target 100, unit cost 1, initial 100 for both classes.
    fn single_year(retirement: PerResource<f64>, budget: f64) -> Horizon {
        Horizon {
            initial_capacity: PerResource::new(100.0, 100.0),
            years: vec![YearInputs {
                year: 2025,
                budget,
                available_budget: budget,
                resources: retirement.map(|_, r| ResourceInputs {
                    target: 100.0,
                    unit_cost: 1.0,
                    scheduled_retirement: r,
                }),
            }],
        }
    }

    #[test]
    fn balanced_year_stays_at_even_split() {
        let horizon = single_year(PerResource::new(20.0, 20.0), 20.0);
        let alloc = FractionOptimizer::default()
            .optimize_horizon("balanced", &horizon)
            .expect("optimize should succeed");
        assert!((alloc.fractions[0] - 0.5).abs() < 1e-6);
        // each class: 0.5 * (10 / 100)^2
        assert!((alloc.total_loss() - 0.01).abs() < 1e-9);
        assert!(alloc.warning.is_none());
    }

    #[test]
    fn retiring_class_gets_the_budget() {
        // Storage retires nothing, computing retires 20: every unit spent on
        // storage overshoots while computing falls back on carry-forward.
        let horizon = single_year(PerResource::new(0.0, 20.0), 20.0);
        let alloc = FractionOptimizer::default()
            .optimize_horizon("skewed", &horizon)
            .expect("optimize should succeed");
        assert!(alloc.fractions[0] < 1e-4, "fraction {}", alloc.fractions[0]);
        assert!(alloc.total_loss() < 1e-8);
    }

    #[test]
    fn iteration_cap_yields_warning_not_error() {
        let horizon = single_year(PerResource::new(0.0, 20.0), 20.0);
        let optimizer = FractionOptimizer::new(MinimizerConfig {
            max_iterations: 0,
            ..MinimizerConfig::default()
        });
        let alloc = optimizer
            .optimize_horizon("capped", &horizon)
            .expect("optimize should succeed");
        let warning = alloc.warning.expect("warning expected");
        assert_eq!(warning.termination, Termination::MaxIterations);
        assert_eq!(alloc.fractions, vec![INITIAL_FRACTION]);
        assert!(warning.to_string().contains("capped"));
    }

    #[test]
    fn trace_matches_reported_fractions() {
        let horizon = single_year(PerResource::new(5.0, 30.0), 25.0);
        let alloc = FractionOptimizer::default()
            .optimize_horizon("trace", &horizon)
            .expect("optimize should succeed");
        assert_eq!(alloc.simulation.trace.len(), 1);
        assert_eq!(alloc.simulation.trace[0].fraction, alloc.fractions[0]);
    }

    #[test]
    fn invariant_violation_during_search_is_an_error() {
        // Storage capacity is exactly zero at the even split and negative
        // for any larger fraction, so only the gradient step fails.
        let mut horizon = single_year(PerResource::new(0.0, 0.0), 200.0);
        horizon.years[0].resources.storage.unit_cost = -1.0;
        assert!(horizon.run(&[INITIAL_FRACTION]).is_ok());

        let err = FractionOptimizer::default()
            .optimize_horizon("negative-cost", &horizon)
            .err();
        assert!(
            matches!(err, Some(PlanError::InvariantViolation { year: 2025, .. })),
            "got {err:?}"
        );
    }
}
