//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use capacity_planner::model::{
    BudgetYear, PerResource, PlanningParameters, PlanningYear, ResourceParameters, ScenarioPlan,
    SiteState, SiteYear,
};

/// Site size used by every fixture; budgets are expressed per unit of it.
pub const SIZE: f64 = 100.0;

/// Same target ratio and unit cost for both classes in every year.
pub fn parameters(years: &[u32], target_ratio: f64, unit_cost: f64) -> PlanningParameters {
    PlanningParameters::new(
        years
            .iter()
            .map(|&year| PlanningYear {
                year,
                resources: PerResource::from_fn(|_| ResourceParameters {
                    target_ratio,
                    unit_cost,
                    useful_life_years: 5.0,
                }),
            })
            .collect(),
    )
}

/// Site of size [`SIZE`] with no non-equipment cost and constant retirement.
pub fn site(years: &[u32], initial: PerResource<f64>, retirement: PerResource<f64>) -> SiteState {
    SiteState {
        name: "fixture".to_string(),
        initial_capacity: initial,
        years: years
            .iter()
            .map(|&year| SiteYear {
                year,
                scheduled_retirement: retirement,
                size_constant: SIZE,
                non_equipment_cost: 0.0,
            })
            .collect(),
    }
}

pub fn scenario(years: &[u32], budgets: &[f64]) -> ScenarioPlan {
    ScenarioPlan {
        name: "fixture".to_string(),
        years: years
            .iter()
            .zip(budgets)
            .map(|(&year, &budget)| BudgetYear { year, budget })
            .collect(),
    }
}

/// One year, target 100 and unit cost 1 for both classes.
///
/// `budget` is per unit of site size, so `0.2` makes 20 available.
pub fn single_year(
    initial: PerResource<f64>,
    retirement: PerResource<f64>,
    budget: f64,
) -> (PlanningParameters, SiteState, ScenarioPlan) {
    let years = [2025];
    (
        parameters(&years, 1.0, 1.0),
        site(&years, initial, retirement),
        scenario(&years, &[budget]),
    )
}

/// Five years with growing targets and uneven retirement.
pub fn five_year_plan() -> (PlanningParameters, SiteState, ScenarioPlan) {
    let years = [2025, 2026, 2027, 2028, 2029];
    let mut parameters = parameters(&years, 1.0, 1.0);
    for (i, y) in parameters.years.iter_mut().enumerate() {
        y.resources.storage.target_ratio = 1.0 + 0.05 * i as f64;
        y.resources.computing.target_ratio = 1.0 + 0.1 * i as f64;
        y.resources.computing.unit_cost = 1.0 - 0.1 * i as f64;
    }
    let mut site = site(
        &years,
        PerResource::new(100.0, 100.0),
        PerResource::new(20.0, 25.0),
    );
    site.years[2].scheduled_retirement.storage = 35.0;
    let scenario = scenario(&years, &[0.25, 0.3, 0.3, 0.35, 0.4]);
    (parameters, site, scenario)
}
