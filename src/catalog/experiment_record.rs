//! Experiment Record - one scheduled or performed run of a recipe

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ExperimentId, RecipeId};
use crate::{Error, Result};

/// Experiment Record represents one instance of a recipe being run.
///
/// The cost is a static list-price estimate (unit cost × required quantity
/// summed over the recipe), computed by the
/// [`Registry`](super::Registry) when the experiment is created, when its
/// recipe changes and when it is executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    id: ExperimentId,
    recipe_id: RecipeId,
    responsible: Vec<String>,
    date: NaiveDate,
    cost: f64,
    #[serde(default)]
    outcome: Option<String>,
}

impl ExperimentRecord {
    /// Create an experiment record.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique identifier for the experiment
    /// * `recipe_id` - Recipe the experiment runs
    /// * `responsible` - Names of the people responsible (at least one)
    /// * `date` - Date of the experiment
    /// * `cost` - Static cost estimate
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if no responsible name is given.
    pub fn new(
        id: ExperimentId,
        recipe_id: RecipeId,
        responsible: Vec<String>,
        date: NaiveDate,
        cost: f64,
    ) -> Result<Self> {
        Ok(Self {
            id,
            recipe_id,
            responsible: normalize_responsible(responsible)?,
            date,
            cost,
            outcome: None,
        })
    }

    /// Get the experiment ID.
    #[must_use]
    pub const fn id(&self) -> ExperimentId {
        self.id
    }

    /// Get the recipe ID.
    #[must_use]
    pub const fn recipe_id(&self) -> RecipeId {
        self.recipe_id
    }

    /// Get the responsible names.
    #[must_use]
    pub fn responsible(&self) -> &[String] {
        &self.responsible
    }

    /// Get the experiment date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Get the static cost estimate.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Get the free-text outcome, if recorded.
    #[must_use]
    pub fn outcome(&self) -> Option<&str> {
        self.outcome.as_deref()
    }

    /// Replace the responsible names.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the list is empty after trimming.
    pub fn set_responsible(&mut self, responsible: Vec<String>) -> Result<()> {
        self.responsible = normalize_responsible(responsible)?;
        Ok(())
    }

    /// Change the experiment date.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    /// Set or clear the free-text outcome.
    pub fn set_outcome(&mut self, outcome: Option<String>) {
        self.outcome = outcome;
    }

    pub(crate) fn set_cost(&mut self, cost: f64) {
        self.cost = cost;
    }

    pub(crate) fn set_recipe(&mut self, recipe_id: RecipeId, cost: f64) {
        self.recipe_id = recipe_id;
        self.cost = cost;
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.responsible.iter().all(|name| name.trim().is_empty()) {
            return Err(empty_responsible());
        }
        Ok(())
    }
}

fn normalize_responsible(responsible: Vec<String>) -> Result<Vec<String>> {
    let names: Vec<String> = responsible
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        return Err(empty_responsible());
    }
    Ok(names)
}

fn empty_responsible() -> Error {
    Error::InvalidInput("an experiment needs at least one responsible person".to_string())
}
