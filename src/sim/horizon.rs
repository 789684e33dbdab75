//! Resolution of a scenario against the planning and site tables.

use crate::error::{PlanError, PlanResult};
use crate::model::{PerResource, PlanningParameters, Resource, ScenarioPlan, SiteState};

/// Inputs for one resource class in one year, already matched by year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceInputs {
    /// Absolute target capacity.
    pub target: f64,
    pub unit_cost: f64,
    pub scheduled_retirement: f64,
}

/// Everything the simulator needs for one planning year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearInputs {
    pub year: u32,
    pub budget: f64,
    /// `max(budget * size_constant - non_equipment_cost, 0)`.
    pub available_budget: f64,
    pub resources: PerResource<ResourceInputs>,
}

/// A scenario's planning horizon with every lookup done up front.
///
/// Resolution is where `ConfigurationMismatch`, `InvalidTarget`, and
/// `InvalidUnitCost` surface, so a resolved horizon can be simulated
/// any number of times without touching the tables again.
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    pub initial_capacity: PerResource<f64>,
    pub years: Vec<YearInputs>,
}

impl Horizon {
    /// Matches every scenario year against both tables by year value.
    ///
    /// # Errors
    ///
    /// * `ConfigurationMismatch` if a year is absent from either table
    /// * `InvalidTarget` if `target_ratio * size_constant` is not strictly positive
    /// * `InvalidUnitCost` if a unit cost is not strictly positive
    pub fn resolve(
        parameters: &PlanningParameters,
        site: &SiteState,
        scenario: &ScenarioPlan,
    ) -> PlanResult<Self> {
        let mut years = Vec::with_capacity(scenario.len());

        for entry in &scenario.years {
            let planning = parameters
                .year(entry.year)
                .ok_or(PlanError::ConfigurationMismatch {
                    year: entry.year,
                    table: "planning parameters",
                })?;
            let site_year = site
                .year(entry.year)
                .ok_or(PlanError::ConfigurationMismatch {
                    year: entry.year,
                    table: "site state",
                })?;

            let resolve_resource = |resource: Resource| -> PlanResult<ResourceInputs> {
                let p = planning.resources.get(resource);
                let target = p.target_ratio * site_year.size_constant;
                if !(target.is_finite() && target > 0.0) {
                    return Err(PlanError::InvalidTarget {
                        year: entry.year,
                        resource,
                        target,
                    });
                }
                if !(p.unit_cost.is_finite() && p.unit_cost > 0.0) {
                    return Err(PlanError::InvalidUnitCost {
                        year: entry.year,
                        resource,
                        cost: p.unit_cost,
                    });
                }
                Ok(ResourceInputs {
                    target,
                    unit_cost: p.unit_cost,
                    scheduled_retirement: *site_year.scheduled_retirement.get(resource),
                })
            };
            let storage = resolve_resource(Resource::Storage)?;
            let computing = resolve_resource(Resource::Computing)?;

            let available_budget =
                (entry.budget * site_year.size_constant - site_year.non_equipment_cost).max(0.0);

            years.push(YearInputs {
                year: entry.year,
                budget: entry.budget,
                available_budget,
                resources: PerResource::new(storage, computing),
            });
        }

        Ok(Self {
            initial_capacity: site.initial_capacity,
            years,
        })
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BudgetYear, PlanningYear, ResourceParameters, SiteYear};

    fn parameters(years: &[u32]) -> PlanningParameters {
        PlanningParameters::new(
            years
                .iter()
                .map(|&year| PlanningYear {
                    year,
                    resources: PerResource::from_fn(|_| ResourceParameters {
                        target_ratio: 1.0,
                        unit_cost: 2.0,
                        useful_life_years: 5.0,
                    }),
                })
                .collect(),
        )
    }

    fn site(years: &[u32]) -> SiteState {
        SiteState {
            name: "test".to_string(),
            initial_capacity: PerResource::new(100.0, 100.0),
            years: years
                .iter()
                .map(|&year| SiteYear {
                    year,
                    scheduled_retirement: PerResource::new(10.0, 5.0),
                    size_constant: 100.0,
                    non_equipment_cost: 30.0,
                })
                .collect(),
        }
    }

    fn scenario(years: &[u32], budget: f64) -> ScenarioPlan {
        ScenarioPlan {
            name: "s".to_string(),
            years: years.iter().map(|&year| BudgetYear { year, budget }).collect(),
        }
    }

    #[test]
    fn resolves_in_scenario_order() {
        let horizon = Horizon::resolve(
            &parameters(&[2025, 2026, 2027]),
            &site(&[2027, 2026, 2025]),
            &scenario(&[2026, 2027], 0.5),
        )
        .expect("resolve should succeed");
        let years: Vec<u32> = horizon.years.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2026, 2027]);
        // 0.5 * 100 - 30
        assert!((horizon.years[0].available_budget - 20.0).abs() < 1e-12);
        assert_eq!(horizon.years[0].resources.computing.scheduled_retirement, 5.0);
        assert_eq!(horizon.years[0].resources.storage.target, 100.0);
    }

    #[test]
    fn overhead_larger_than_budget_floors_at_zero() {
        let horizon = Horizon::resolve(
            &parameters(&[2025]),
            &site(&[2025]),
            &scenario(&[2025], 0.1),
        )
        .expect("resolve should succeed");
        assert_eq!(horizon.years[0].available_budget, 0.0);
    }

    #[test]
    fn missing_planning_year_is_mismatch() {
        let err = Horizon::resolve(
            &parameters(&[2025]),
            &site(&[2025, 2026]),
            &scenario(&[2025, 2026], 0.5),
        )
        .expect_err("must fail");
        assert!(matches!(
            err,
            PlanError::ConfigurationMismatch {
                year: 2026,
                table: "planning parameters"
            }
        ));
    }

    #[test]
    fn missing_site_year_is_mismatch() {
        let err = Horizon::resolve(
            &parameters(&[2025, 2026]),
            &site(&[2025]),
            &scenario(&[2025, 2026], 0.5),
        )
        .expect_err("must fail");
        assert!(matches!(
            err,
            PlanError::ConfigurationMismatch {
                year: 2026,
                table: "site state"
            }
        ));
    }

    #[test]
    fn zero_target_is_rejected() {
        let mut params = parameters(&[2025]);
        params.years[0].resources.computing.target_ratio = 0.0;
        let err = Horizon::resolve(&params, &site(&[2025]), &scenario(&[2025], 0.5))
            .expect_err("must fail");
        assert!(matches!(
            err,
            PlanError::InvalidTarget {
                resource: Resource::Computing,
                ..
            }
        ));
    }

    #[test]
    fn zero_unit_cost_is_rejected() {
        let mut params = parameters(&[2025]);
        params.years[0].resources.storage.unit_cost = 0.0;
        let err = Horizon::resolve(&params, &site(&[2025]), &scenario(&[2025], 0.5))
            .expect_err("must fail");
        assert!(matches!(err, PlanError::InvalidUnitCost { year: 2025, .. }));
    }
}
