//! Recipe Record - procedure definition with reagent requirements and acceptance ranges

use serde::{Deserialize, Serialize};

use super::{non_negative, ReagentId, RecipeId};
use crate::Result;

/// One reagent line of a recipe: which reagent, how much, in which unit label.
///
/// The unit label is informational; quantities are compared against
/// inventory in the reagent's base unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReagentRequirement {
    reagent_id: ReagentId,
    quantity: f64,
    unit: String,
}

impl ReagentRequirement {
    /// Create a requirement line.
    #[must_use]
    pub fn new(reagent_id: ReagentId, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            reagent_id,
            quantity,
            unit: unit.into(),
        }
    }

    /// Get the referenced reagent.
    #[must_use]
    pub const fn reagent_id(&self) -> ReagentId {
        self.reagent_id
    }

    /// Get the required quantity.
    #[must_use]
    pub const fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Get the unit label.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }
}

/// A quantity to measure, with its acceptable inclusive range.
///
/// The formula is a free-text label and is never evaluated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementSpec {
    name: String,
    formula: String,
    minimum: f64,
    maximum: f64,
}

impl MeasurementSpec {
    /// Create a measurement spec.
    #[must_use]
    pub fn new(name: impl Into<String>, formula: impl Into<String>, minimum: f64, maximum: f64) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
            minimum,
            maximum,
        }
    }

    /// Get the measurement name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the formula label.
    #[must_use]
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Get the lower bound.
    #[must_use]
    pub const fn minimum(&self) -> f64 {
        self.minimum
    }

    /// Get the upper bound.
    #[must_use]
    pub const fn maximum(&self) -> f64 {
        self.maximum
    }

    /// Get `(minimum, maximum)`.
    #[must_use]
    pub const fn range(&self) -> (f64, f64) {
        (self.minimum, self.maximum)
    }
}

/// Recipe Record describes a reusable laboratory procedure.
///
/// A recipe references reagents by id and never owns them; the
/// [`Registry`](super::Registry) resolves the ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeRecord {
    id: RecipeId,
    name: String,
    #[serde(default)]
    objective: String,
    #[serde(default)]
    procedure: Vec<String>,
    #[serde(rename = "reagents_used", default)]
    requirements: Vec<ReagentRequirement>,
    #[serde(default)]
    measurements: Vec<MeasurementSpec>,
}

impl RecipeRecord {
    /// Create a builder with the required fields.
    #[must_use]
    pub fn builder(id: RecipeId, name: impl Into<String>) -> RecipeRecordBuilder {
        RecipeRecordBuilder::new(id, name)
    }

    /// Get the recipe ID.
    #[must_use]
    pub const fn id(&self) -> RecipeId {
        self.id
    }

    /// Get the recipe name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the objective text.
    #[must_use]
    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// Get the ordered procedure steps.
    #[must_use]
    pub fn procedure(&self) -> &[String] {
        &self.procedure
    }

    /// Get the ordered reagent requirements.
    #[must_use]
    pub fn requirements(&self) -> &[ReagentRequirement] {
        &self.requirements
    }

    /// Get the measurement specs.
    #[must_use]
    pub fn measurements(&self) -> &[MeasurementSpec] {
        &self.measurements
    }

    /// Drop requirement lines rejected by `keep`, returning how many were dropped.
    pub(crate) fn retain_requirements(&mut self, mut keep: impl FnMut(&ReagentRequirement) -> bool) -> usize {
        let before = self.requirements.len();
        self.requirements.retain(|r| keep(r));
        before - self.requirements.len()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.requirements
            .iter()
            .try_for_each(|r| non_negative("required quantity", r.quantity).map(|_| ()))
    }
}

/// Builder for `RecipeRecord`.
#[derive(Debug)]
pub struct RecipeRecordBuilder {
    record: RecipeRecord,
}

impl RecipeRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: RecipeId, name: impl Into<String>) -> Self {
        Self {
            record: RecipeRecord {
                id,
                name: name.into(),
                objective: String::new(),
                procedure: Vec::new(),
                requirements: Vec::new(),
                measurements: Vec::new(),
            },
        }
    }

    /// Set the objective.
    #[must_use]
    pub fn objective(mut self, objective: impl Into<String>) -> Self {
        self.record.objective = objective.into();
        self
    }

    /// Append a procedure step.
    #[must_use]
    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.record.procedure.push(step.into());
        self
    }

    /// Append a reagent requirement.
    #[must_use]
    pub fn requirement(mut self, reagent_id: ReagentId, quantity: f64, unit: impl Into<String>) -> Self {
        self.record
            .requirements
            .push(ReagentRequirement::new(reagent_id, quantity, unit));
        self
    }

    /// Append a measurement spec.
    #[must_use]
    pub fn measurement(mut self, spec: MeasurementSpec) -> Self {
        self.record.measurements.push(spec);
        self
    }

    /// Build the `RecipeRecord`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a required quantity is negative.
    pub fn build(self) -> Result<RecipeRecord> {
        self.record.validate()?;
        Ok(self.record)
    }
}
