//! Experiment execution simulation
//!
//! Running an experiment happens in four phases:
//!
//! 1. **Check**: every reagent of the recipe must resolve, have at least the
//!    required inventory and not be expired on the reference date, and every
//!    measurement range must be simulable. The first violation aborts the run
//!    before anything is mutated.
//! 2. **Measure**: each measurement yields `uniform(min, max) × (1 + f)`,
//!    `f` drawn from the measurement error range, rounded to two decimals.
//! 3. **Consume**: each reagent loses `required × (1 + e)`, with `e` drawn
//!    from the consumption error range. Inventory is not clamped at zero.
//! 4. **Cost**: the experiment cost is recomputed from list quantities; the
//!    random overage never reaches the cost.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use labtrack::catalog::{ReagentId, ReagentRecord, RecipeId, RecipeRecord, Registry};
//! use labtrack::execution::{execute, SimulationModel};
//!
//! let mut registry = Registry::new();
//! registry.add_reagent(ReagentRecord::builder(ReagentId(1), "Water", "mL").inventory(50.0).build()?)?;
//! registry.add_recipe(RecipeRecord::builder(RecipeId(1), "Rinse").requirement(ReagentId(1), 10.0, "mL").build()?)?;
//! let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
//! let id = registry.create_experiment(RecipeId(1), vec!["Ana".into()], today)?;
//!
//! let report = execute(&mut registry, id, today, &SimulationModel::default(), &mut rand::thread_rng())?;
//! assert_eq!(report.consumption.len(), 1);
//! assert!(registry.reagent(ReagentId(1))?.inventory() < 40.0);
//! # Ok::<(), labtrack::Error>(())
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::catalog::{ExperimentId, MeasurementSpec, ReagentId, Registry, ResultRecord};
use crate::config::{FractionRange, LabConfig};
use crate::{Error, Result};

/// Random ranges used while running an experiment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationModel {
    /// Overage fraction drawn per reagent.
    pub consumption_error: FractionRange,
    /// Error factor drawn per measurement.
    pub measurement_error: FractionRange,
}

impl Default for SimulationModel {
    fn default() -> Self {
        Self {
            consumption_error: FractionRange::CONSUMPTION_ERROR,
            measurement_error: FractionRange::MEASUREMENT_ERROR,
        }
    }
}

impl SimulationModel {
    /// Check both ranges satisfy `0 <= min <= max`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` describing the first bad range.
    pub fn validate(&self) -> Result<()> {
        self.consumption_error.validate("consumption_error")?;
        self.measurement_error.validate("measurement_error")
    }
}

impl From<&LabConfig> for SimulationModel {
    fn from(config: &LabConfig) -> Self {
        Self {
            consumption_error: config.consumption_error,
            measurement_error: config.measurement_error,
        }
    }
}

/// Inventory drawn from one reagent during a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consumption {
    /// Reagent consumed
    pub reagent: ReagentId,
    /// Quantity listed by the recipe
    pub required: f64,
    /// Overage fraction that was drawn
    pub error_fraction: f64,
    /// Quantity actually subtracted: `required × (1 + error_fraction)`
    pub consumed: f64,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    /// Experiment that ran
    pub experiment: ExperimentId,
    /// Per-reagent consumption, in recipe order
    pub consumption: Vec<Consumption>,
    /// Recomputed list-price cost
    pub cost: f64,
    /// Result appended to the registry
    pub result: ResultRecord,
}

/// Run an experiment against the registry.
///
/// On success the registry holds the mutated inventories, the recomputed
/// cost and one new result. On failure nothing in the registry has changed.
///
/// # Errors
///
/// - `Error::ExperimentNotFound`, `Error::RecipeNotFound`,
///   `Error::ReagentNotFound` for unresolved ids
/// - `Error::AlreadyExecuted` if the experiment already has a result
/// - `Error::InsufficientInventory` or `Error::ExpiredReagent` for the first
///   reagent that fails its precondition
/// - `Error::InvalidInput` if a model range is invalid, or if a measurement
///   range is not finite or so wide that sampling it would overflow
pub fn execute<R: Rng>(
    registry: &mut Registry,
    experiment_id: ExperimentId,
    reference: NaiveDate,
    model: &SimulationModel,
    rng: &mut R,
) -> Result<ExecutionReport> {
    model.validate()?;
    let recipe_id = registry.experiment(experiment_id)?.recipe_id();
    if registry.result_for(experiment_id).is_some() {
        return Err(Error::AlreadyExecuted(experiment_id));
    }
    if let Err(e) = registry.check_runnable(recipe_id, reference) {
        warn!(experiment = %experiment_id, error = %e, "experiment cannot run");
        return Err(e);
    }

    let recipe = registry.recipe(recipe_id)?;
    let requirements = recipe.requirements().to_vec();
    let measurements = recipe.measurements().to_vec();
    measurements
        .iter()
        .try_for_each(|spec| check_range(spec, model))?;
    let cost = registry.list_cost(recipe_id)?;

    // Measurements are drawn first so nothing fallible runs once inventory moves.
    let mut obtained = BTreeMap::new();
    let mut acceptable = BTreeMap::new();
    for spec in &measurements {
        let value = measure(spec, model, rng);
        debug!(measurement = spec.name(), value, "measurement taken");
        obtained.insert(spec.name().to_string(), value);
        acceptable.insert(spec.name().to_string(), spec.range());
    }

    let mut consumption = Vec::with_capacity(requirements.len());
    for requirement in &requirements {
        let error_fraction = model.consumption_error.sample(rng);
        let consumed = requirement.quantity() * (1.0 + error_fraction);
        registry.reagent_mut(requirement.reagent_id())?.consume(consumed);
        debug!(
            reagent = %requirement.reagent_id(),
            required = requirement.quantity(),
            consumed,
            "reagent consumed"
        );
        consumption.push(Consumption {
            reagent: requirement.reagent_id(),
            required: requirement.quantity(),
            error_fraction,
            consumed,
        });
    }

    registry.experiment_mut(experiment_id)?.set_cost(cost);

    let result = ResultRecord::new(experiment_id, obtained, acceptable);
    info!(
        experiment = %experiment_id,
        cost,
        valid = result.is_valid(),
        "experiment executed"
    );
    registry.push_result(result.clone());

    Ok(ExecutionReport {
        experiment: experiment_id,
        consumption,
        cost,
        result,
    })
}

/// Simulated reading for one measurement, rounded to two decimals.
fn measure<R: Rng>(spec: &MeasurementSpec, model: &SimulationModel, rng: &mut R) -> f64 {
    let (low, high) = if spec.minimum() <= spec.maximum() {
        (spec.minimum(), spec.maximum())
    } else {
        (spec.maximum(), spec.minimum())
    };
    let base = rng.gen_range(low..=high);
    let factor = model.measurement_error.sample(rng);
    round_to_cents(base * (1.0 + factor))
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reject ranges whose width or error-scaled bounds overflow `f64`.
fn check_range(spec: &MeasurementSpec, model: &SimulationModel) -> Result<()> {
    // Readings are scaled by the error factor, then by 100 for rounding.
    let scale = (1.0 + model.measurement_error.max) * 100.0;
    let (min, max) = spec.range();
    let finite = [min, max, max - min, min * scale, max * scale]
        .iter()
        .all(|v| v.is_finite());
    if finite {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "measurement '{}' range [{min}, {max}] is too wide to simulate",
            spec.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ReagentRecord, RecipeId, RecipeRecord};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn registry_with(inventory: f64) -> (Registry, ExperimentId) {
        let mut registry = Registry::new();
        registry
            .add_reagent(
                ReagentRecord::builder(ReagentId(1), "Acid", "mL")
                    .cost(0.5)
                    .inventory(inventory)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .add_recipe(
                RecipeRecord::builder(RecipeId(1), "Dilute")
                    .requirement(ReagentId(1), 4.0, "mL")
                    .measurement(MeasurementSpec::new("pH", "-log[H+]", 2.0, 3.0))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let id = registry
            .create_experiment(RecipeId(1), vec!["Ana".into()], today())
            .unwrap();
        (registry, id)
    }

    #[test]
    fn test_round_to_cents() {
        assert!((round_to_cents(1.23456) - 1.23).abs() < 1e-12);
        assert!((round_to_cents(2.005_000_1) - 2.01).abs() < 1e-12);
    }

    #[test]
    fn test_measure_within_error_envelope() {
        let spec = MeasurementSpec::new("x", "", 2.0, 4.0);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let value = measure(&spec, &SimulationModel::default(), &mut rng);
            assert!((2.0..=8.0).contains(&value));
        }
    }

    #[test]
    fn test_measure_tolerates_inverted_range() {
        let spec = MeasurementSpec::new("x", "", 4.0, 2.0);
        let mut rng = StdRng::seed_from_u64(3);
        let value = measure(&spec, &SimulationModel::default(), &mut rng);
        assert!((2.0..=8.0).contains(&value));
    }

    #[test]
    fn test_execute_records_consumption() {
        let (mut registry, id) = registry_with(10.0);
        let mut rng = StdRng::seed_from_u64(1);
        let report = execute(&mut registry, id, today(), &SimulationModel::default(), &mut rng).unwrap();

        let used = report.consumption[0];
        assert!(FractionRange::CONSUMPTION_ERROR.contains(used.error_fraction));
        assert!((used.consumed - 4.0 * (1.0 + used.error_fraction)).abs() < 1e-12);
        let left = registry.reagent(ReagentId(1)).unwrap().inventory();
        assert!((left - (10.0 - used.consumed)).abs() < 1e-12);
        assert!((report.cost - 2.0).abs() < 1e-12);
        assert_eq!(registry.results().len(), 1);
    }

    #[test]
    fn test_execute_twice_is_rejected() {
        let (mut registry, id) = registry_with(100.0);
        let mut rng = StdRng::seed_from_u64(5);
        execute(&mut registry, id, today(), &SimulationModel::default(), &mut rng).unwrap();
        let before = registry.reagent(ReagentId(1)).unwrap().inventory();

        let err = execute(&mut registry, id, today(), &SimulationModel::default(), &mut rng).unwrap_err();
        assert!(matches!(err, Error::AlreadyExecuted(_)));
        assert!((registry.reagent(ReagentId(1)).unwrap().inventory() - before).abs() < f64::EPSILON);

        registry.remove_result(id);
        assert!(execute(&mut registry, id, today(), &SimulationModel::default(), &mut rng).is_ok());
    }

    #[test]
    fn test_execute_unknown_experiment() {
        let (mut registry, _) = registry_with(10.0);
        let mut rng = StdRng::seed_from_u64(0);
        let err = execute(
            &mut registry,
            ExperimentId(42),
            today(),
            &SimulationModel::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ExperimentNotFound(ExperimentId(42))));
    }

    #[test]
    fn test_overflowing_range_rejected_before_consumption() {
        let mut registry = Registry::new();
        registry
            .add_reagent(
                ReagentRecord::builder(ReagentId(1), "Acid", "g")
                    .inventory(10.0)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .add_recipe(
                RecipeRecord::builder(RecipeId(1), "Wide")
                    .requirement(ReagentId(1), 4.0, "g")
                    .measurement(MeasurementSpec::new("x", "", -1e308, 1e308))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let id = registry
            .create_experiment(RecipeId(1), vec!["Ana".into()], today())
            .unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let err = execute(&mut registry, id, today(), &SimulationModel::default(), &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!((registry.reagent(ReagentId(1)).unwrap().inventory() - 10.0).abs() < f64::EPSILON);
        assert!(registry.results().is_empty());
    }

    #[test]
    fn test_large_bound_overflowing_after_error_rejected() {
        let spec = MeasurementSpec::new("x", "", 1e306, 1.5e306);
        assert!(check_range(&spec, &SimulationModel::default()).is_err());
        let spec = MeasurementSpec::new("x", "", 1.0, 1e300);
        assert!(check_range(&spec, &SimulationModel::default()).is_ok());
    }

    #[test]
    fn test_invalid_model_rejected() {
        let (mut registry, id) = registry_with(10.0);
        let model = SimulationModel {
            consumption_error: FractionRange::new(0.5, 0.1),
            measurement_error: FractionRange::MEASUREMENT_ERROR,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let err = execute(&mut registry, id, today(), &model, &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!((registry.reagent(ReagentId(1)).unwrap().inventory() - 10.0).abs() < f64::EPSILON);
    }
}
