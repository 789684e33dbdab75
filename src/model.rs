//! Planning inputs: per-year parameters, site state, and scenario budgets.
//!
//! These are the immutable snapshots an optimization run works from. Every
//! table is keyed by year value; positions in one table say nothing about
//! positions in another.

use std::fmt;

/// The two resource classes that share a site's equipment budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Storage,
    Computing,
}

impl Resource {
    /// Both classes in reporting order.
    pub const ALL: [Resource; 2] = [Resource::Storage, Resource::Computing];

    /// Lower-case name used in CSV headers and config paths.
    pub fn key(self) -> &'static str {
        match self {
            Resource::Storage => "storage",
            Resource::Computing => "computing",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One value per resource class.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerResource<T> {
    pub storage: T,
    pub computing: T,
}

impl<T> PerResource<T> {
    pub fn new(storage: T, computing: T) -> Self {
        Self { storage, computing }
    }

    pub fn get(&self, resource: Resource) -> &T {
        match resource {
            Resource::Storage => &self.storage,
            Resource::Computing => &self.computing,
        }
    }

    /// Applies `f` to each class, storage first.
    pub fn map<U>(self, mut f: impl FnMut(Resource, T) -> U) -> PerResource<U> {
        let storage = f(Resource::Storage, self.storage);
        let computing = f(Resource::Computing, self.computing);
        PerResource { storage, computing }
    }

    /// Builds a value per class from `f`, storage first.
    pub fn from_fn(mut f: impl FnMut(Resource) -> T) -> Self {
        let storage = f(Resource::Storage);
        let computing = f(Resource::Computing);
        Self { storage, computing }
    }
}

/// Externally supplied economics for one resource class in one year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceParameters {
    /// Target capacity as a multiple of the site size constant.
    pub target_ratio: f64,
    /// Cost per capacity unit.
    pub unit_cost: f64,
    /// Expected service life of equipment bought this year.
    pub useful_life_years: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanningYear {
    pub year: u32,
    pub resources: PerResource<ResourceParameters>,
}

/// Planning parameters for every year the inputs table covers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanningParameters {
    pub years: Vec<PlanningYear>,
}

impl PlanningParameters {
    pub fn new(years: Vec<PlanningYear>) -> Self {
        Self { years }
    }

    /// Looks up a year by value.
    pub fn year(&self, year: u32) -> Option<&PlanningYear> {
        self.years.iter().find(|y| y.year == year)
    }
}

/// Site-specific values for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteYear {
    pub year: u32,
    /// Capacity units that must leave service this year.
    pub scheduled_retirement: PerResource<f64>,
    /// Scales budgets and target ratios to absolute units.
    pub size_constant: f64,
    /// Overhead taken off the budget before any equipment is bought.
    pub non_equipment_cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteState {
    pub name: String,
    /// Capacity in service before the first planning year.
    pub initial_capacity: PerResource<f64>,
    pub years: Vec<SiteYear>,
}

impl SiteState {
    /// Looks up a year by value.
    pub fn year(&self, year: u32) -> Option<&SiteYear> {
        self.years.iter().find(|y| y.year == year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetYear {
    pub year: u32,
    /// Budget per unit of site size.
    pub budget: f64,
}

/// A named budget sequence over a planning horizon, in horizon order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPlan {
    pub name: String,
    pub years: Vec<BudgetYear>,
}

impl ScenarioPlan {
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

    #[test]
    fn per_resource_get_matches_fields() {
        let pr = PerResource::new(1.0, 2.0);
        assert_eq!(*pr.get(Resource::Storage), 1.0);
        assert_eq!(*pr.get(Resource::Computing), 2.0);
    }

    #[test]
    fn per_resource_map_visits_storage_first() {
        let mut order = Vec::new();
        let doubled = PerResource::new(1, 2).map(|r, v| {
            order.push(r);
            v * 2
        });
        assert_eq!(doubled, PerResource::new(2, 4));
        assert_eq!(order, vec![Resource::Storage, Resource::Computing]);
    }

    #[test]
    fn lookup_is_by_year_value_not_position() {
        let params = PlanningParameters::new(vec![
            PlanningYear {
                year: 2026,
                resources: PerResource::from_fn(|_| ResourceParameters {
                    target_ratio: 2.0,
                    unit_cost: 1.0,
                    useful_life_years: 5.0,
                }),
            },
            PlanningYear {
                year: 2025,
                resources: PerResource::from_fn(|_| ResourceParameters {
                    target_ratio: 1.0,
                    unit_cost: 1.0,
                    useful_life_years: 5.0,
                }),
            },
        ]);
        let y = params.year(2025).map(|y| y.resources.storage.target_ratio);
        assert_eq!(y, Some(1.0));
        assert!(params.year(2030).is_none());
    }

    #[test]
    fn resource_display_is_lower_case() {
        assert_eq!(Resource::Storage.to_string(), "storage");
        assert_eq!(format!("{}", Resource::Computing), "computing");
    }
}
