use tracing::{info, info_span};

use crate::error::PlanResult;
use crate::model::{PlanningParameters, ScenarioPlan, SiteState};
use crate::optim::{Allocation, FractionOptimizer, MinimizerConfig};

/// A validated plan: the shared planning table, every site, every scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub parameters: PlanningParameters,
    pub sites: Vec<SiteState>,
    pub scenarios: Vec<ScenarioPlan>,
    pub optimizer: MinimizerConfig,
}

pub struct ScenarioOutcome {
    pub scenario: ScenarioPlan,
    pub allocation: Allocation,
}

pub struct SiteOutcome {
    pub site: SiteState,
    pub scenarios: Vec<ScenarioOutcome>,
}

impl SiteOutcome {
    pub fn warnings(&self) -> usize {
        self.scenarios
            .iter()
            .filter(|s| s.allocation.warning.is_some())
            .count()
    }
}

/// Optimises every scenario at every site, in configuration order.
///
/// Runs are independent; the first error aborts the whole plan.
pub fn run_plan(plan: &Plan) -> PlanResult<Vec<SiteOutcome>> {
    let optimizer = FractionOptimizer::new(plan.optimizer);
    let mut outcomes = Vec::with_capacity(plan.sites.len());

    for site in &plan.sites {
        let _site_span = info_span!("site", name = %site.name).entered();
        let mut scenarios = Vec::with_capacity(plan.scenarios.len());

        for scenario in &plan.scenarios {
            let allocation = optimizer.optimize(&plan.parameters, site, scenario)?;
            info!(
                scenario = %scenario.name,
                loss = allocation.total_loss(),
                iterations = allocation.iterations,
                converged = allocation.warning.is_none(),
                "scenario optimised"
            );
            scenarios.push(ScenarioOutcome {
                scenario: scenario.clone(),
                allocation,
            });
        }

        outcomes.push(SiteOutcome {
            site: site.clone(),
            scenarios,
        });
    }

    Ok(outcomes)
}
