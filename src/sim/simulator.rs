//! Year-by-year capacity fold and the loss it produces.

use crate::error::{PlanError, PlanResult};
use crate::model::{PerResource, PlanningParameters, ScenarioPlan, SiteState};

use super::horizon::{Horizon, ResourceInputs, YearInputs};
use super::types::{ResourceYear, Simulation, YearRecord};

/// Weight of the squared carry-forward ratio in the loss.
pub const CARRY_FORWARD_WEIGHT: f64 = 0.5;

/// Running state of one resource class between years.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ResourceState {
    capacity: f64,
    carry_forward: f64,
}

impl ResourceState {
    fn initial(capacity: f64) -> Self {
        Self {
            capacity,
            carry_forward: 0.0,
        }
    }

    /// Retires, purchases, then keeps retired units in service up to the shortfall.
    ///
    /// The carry-forward is computed from the post-purchase capacity and only
    /// then added back; loss values depend on this ordering.
    fn advance(self, inputs: &ResourceInputs, spend: f64) -> (Self, ResourceYear) {
        let retired = inputs.scheduled_retirement + self.carry_forward;
        let target = inputs.target;

        let mut capacity = (self.capacity - retired).max(0.0);
        capacity += spend / inputs.unit_cost;

        let carry_forward = retired.min(target - capacity).max(0.0);
        capacity += carry_forward;

        let next = Self {
            capacity,
            carry_forward,
        };
        let record = ResourceYear {
            spend,
            target,
            capacity,
            carry_forward,
            retired,
        };
        (next, record)
    }
}

fn check_invariants(year: u32, record: &ResourceYear) -> PlanResult<()> {
    if !(record.capacity.is_finite() && record.capacity >= 0.0) {
        return Err(PlanError::InvariantViolation {
            year,
            message: format!("capacity {} is negative or not finite", record.capacity),
        });
    }
    if !(record.carry_forward.is_finite() && record.carry_forward >= 0.0) {
        return Err(PlanError::InvariantViolation {
            year,
            message: format!(
                "carry-forward {} is negative or not finite",
                record.carry_forward
            ),
        });
    }
    Ok(())
}

fn step(
    state: PerResource<ResourceState>,
    inputs: &YearInputs,
    fraction: f64,
) -> PlanResult<(PerResource<ResourceState>, YearRecord)> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(PlanError::FractionOutOfRange {
            year: inputs.year,
            value: fraction,
        });
    }

    let budget = inputs.available_budget;
    let (storage_state, storage) = state
        .storage
        .advance(&inputs.resources.storage, fraction * budget);
    let (computing_state, computing) = state
        .computing
        .advance(&inputs.resources.computing, (1.0 - fraction) * budget);

    check_invariants(inputs.year, &storage)?;
    check_invariants(inputs.year, &computing)?;

    let record = YearRecord {
        year: inputs.year,
        budget: inputs.budget,
        available_budget: budget,
        fraction,
        storage,
        computing,
        loss: storage.loss() + computing.loss(),
    };
    Ok((PerResource::new(storage_state, computing_state), record))
}

impl Horizon {
    fn fold(
        &self,
        fractions: &[f64],
        mut visit: impl FnMut(YearRecord),
    ) -> PlanResult<f64> {
        if fractions.len() != self.years.len() {
            return Err(PlanError::FractionCountMismatch {
                expected: self.years.len(),
                actual: fractions.len(),
            });
        }

        let mut state = self.initial_capacity.map(|_, c| ResourceState::initial(c));
        let mut total_loss = 0.0;
        for (inputs, &fraction) in self.years.iter().zip(fractions) {
            let (next, record) = step(state, inputs, fraction)?;
            total_loss += record.loss;
            visit(record);
            state = next;
        }
        Ok(total_loss)
    }

    /// Simulates `fractions` over the horizon and returns loss and trace.
    ///
    /// # Errors
    ///
    /// * `FractionCountMismatch` if `fractions` does not have one entry per year
    /// * `FractionOutOfRange` if a fraction lies outside `[0, 1]`
    /// * `InvariantViolation` if a capacity or carry-forward leaves its domain
    pub fn run(&self, fractions: &[f64]) -> PlanResult<Simulation> {
        let mut trace = Vec::with_capacity(self.years.len());
        let total_loss = self.fold(fractions, |record| trace.push(record))?;
        Ok(Simulation { total_loss, trace })
    }

    /// Total loss only; same value as `run(fractions)?.total_loss`.
    pub fn loss(&self, fractions: &[f64]) -> PlanResult<f64> {
        self.fold(fractions, |_| {})
    }
}

/// Resolves the scenario against both tables and simulates `fractions`.
///
/// Pure function of its inputs: identical arguments give identical results.
///
/// # Errors
///
/// Any error from [`Horizon::resolve`] or [`Horizon::run`].
pub fn simulate(
    fractions: &[f64],
    parameters: &PlanningParameters,
    site: &SiteState,
    scenario: &ScenarioPlan,
) -> PlanResult<Simulation> {
    Horizon::resolve(parameters, site, scenario)?.run(fractions)
}
