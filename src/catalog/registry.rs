//! Registry - owner of every catalog collection
//!
//! Collections are kept in insertion order; statistics break ties by the
//! order in which entries were first encountered, so the order is part of
//! the observable behavior.

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{
    ExperimentId, ExperimentRecord, ReagentId, ReagentRecord, RecipeId, RecipeRecord, ResultRecord,
};
use crate::{Error, Result};

/// A reference that no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DanglingReference {
    /// A recipe requirement names a missing reagent.
    Reagent {
        /// Recipe holding the requirement
        recipe: RecipeId,
        /// Missing reagent
        reagent: ReagentId,
    },
    /// An experiment names a missing recipe.
    Recipe {
        /// Experiment holding the reference
        experiment: ExperimentId,
        /// Missing recipe
        recipe: RecipeId,
    },
    /// A result names a missing experiment.
    Experiment {
        /// Missing experiment
        experiment: ExperimentId,
    },
}

/// In-memory registry of reagents, recipes, experiments and results.
///
/// ## Design
///
/// Entities reference each other through typed ids rather than pointers.
/// Every lookup goes through the registry and fails with an explicit
/// not-found error, so a removed reagent never silently disappears from a
/// recipe.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    reagents: Vec<ReagentRecord>,
    recipes: Vec<RecipeRecord>,
    experiments: Vec<ExperimentRecord>,
    results: Vec<ResultRecord>,
}

impl Registry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the registry holds no data at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reagents.is_empty()
            && self.recipes.is_empty()
            && self.experiments.is_empty()
            && self.results.is_empty()
    }

    /// Remove every entity.
    pub fn clear(&mut self) {
        self.reagents.clear();
        self.recipes.clear();
        self.experiments.clear();
        self.results.clear();
    }

    // ------------------------------------------------------------------
    // Reagents
    // ------------------------------------------------------------------

    /// Get all reagents in insertion order.
    #[must_use]
    pub fn reagents(&self) -> &[ReagentRecord] {
        &self.reagents
    }

    /// Get a reagent by ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReagentNotFound` if the id does not resolve.
    pub fn reagent(&self, id: ReagentId) -> Result<&ReagentRecord> {
        self.reagents
            .iter()
            .find(|r| r.id() == id)
            .ok_or(Error::ReagentNotFound(id))
    }

    /// Get a reagent by ID for editing.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReagentNotFound` if the id does not resolve.
    pub fn reagent_mut(&mut self, id: ReagentId) -> Result<&mut ReagentRecord> {
        self.reagents
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(Error::ReagentNotFound(id))
    }

    /// Next free reagent id (one past the highest in use).
    #[must_use]
    pub fn next_reagent_id(&self) -> ReagentId {
        ReagentId(self.reagents.iter().map(|r| r.id().0).max().map_or(1, |id| id + 1))
    }

    /// Add a reagent.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateId` if the id is taken, or `Error::InvalidInput`
    /// if a field is out of range.
    pub fn add_reagent(&mut self, reagent: ReagentRecord) -> Result<ReagentId> {
        reagent.validate()?;
        if self.reagent(reagent.id()).is_ok() {
            return Err(Error::DuplicateId(format!("reagent {}", reagent.id())));
        }
        let id = reagent.id();
        self.reagents.push(reagent);
        Ok(id)
    }

    /// Remove a reagent.
    ///
    /// Recipes that reference it are left untouched and report the reagent as
    /// missing on their next lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReagentNotFound` if the id does not resolve.
    pub fn remove_reagent(&mut self, id: ReagentId) -> Result<ReagentRecord> {
        let index = self
            .reagents
            .iter()
            .position(|r| r.id() == id)
            .ok_or(Error::ReagentNotFound(id))?;
        let removed = self.reagents.remove(index);
        let referencing = self
            .recipes
            .iter()
            .filter(|recipe| recipe.requirements().iter().any(|r| r.reagent_id() == id))
            .count();
        if referencing > 0 {
            warn!(reagent = %id, recipes = referencing, "removed reagent is still referenced");
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------

    /// Get all recipes in insertion order.
    #[must_use]
    pub fn recipes(&self) -> &[RecipeRecord] {
        &self.recipes
    }

    /// Get a recipe by ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::RecipeNotFound` if the id does not resolve.
    pub fn recipe(&self, id: RecipeId) -> Result<&RecipeRecord> {
        self.recipes
            .iter()
            .find(|r| r.id() == id)
            .ok_or(Error::RecipeNotFound(id))
    }

    /// Add a recipe. Every requirement must name a registered reagent.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateId`, `Error::ReagentNotFound` or
    /// `Error::InvalidInput`.
    pub fn add_recipe(&mut self, recipe: RecipeRecord) -> Result<RecipeId> {
        recipe.validate()?;
        if self.recipe(recipe.id()).is_ok() {
            return Err(Error::DuplicateId(format!("recipe {}", recipe.id())));
        }
        for requirement in recipe.requirements() {
            self.reagent(requirement.reagent_id())?;
        }
        let id = recipe.id();
        self.recipes.push(recipe);
        Ok(id)
    }

    /// Remove a recipe. Experiments that reference it are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::RecipeNotFound` if the id does not resolve.
    pub fn remove_recipe(&mut self, id: RecipeId) -> Result<RecipeRecord> {
        let index = self
            .recipes
            .iter()
            .position(|r| r.id() == id)
            .ok_or(Error::RecipeNotFound(id))?;
        let referencing = self.experiments.iter().filter(|e| e.recipe_id() == id).count();
        if referencing > 0 {
            warn!(recipe = %id, experiments = referencing, "removed recipe is still referenced");
        }
        Ok(self.recipes.remove(index))
    }

    /// Static list-price cost of a recipe: Σ(unit cost × required quantity).
    ///
    /// This is the single cost formula; randomized consumption overage is
    /// never included.
    ///
    /// # Errors
    ///
    /// Returns `Error::RecipeNotFound` or `Error::ReagentNotFound` for
    /// dangling ids.
    pub fn list_cost(&self, recipe_id: RecipeId) -> Result<f64> {
        self.recipe(recipe_id)?
            .requirements()
            .iter()
            .try_fold(0.0, |total, requirement| -> Result<f64> {
                let reagent = self.reagent(requirement.reagent_id())?;
                Ok(total + reagent.cost() * requirement.quantity())
            })
    }

    /// Check that a recipe can run on `reference`: every reagent resolves, has
    /// at least the required inventory and is not expired.
    ///
    /// Stops at the first violation, in requirement order.
    ///
    /// # Errors
    ///
    /// Returns `Error::RecipeNotFound`, `Error::ReagentNotFound`,
    /// `Error::InsufficientInventory` or `Error::ExpiredReagent`.
    pub fn check_runnable(&self, recipe_id: RecipeId, reference: NaiveDate) -> Result<()> {
        for requirement in self.recipe(recipe_id)?.requirements() {
            let reagent = self.reagent(requirement.reagent_id())?;
            if reagent.inventory() < requirement.quantity() {
                return Err(Error::InsufficientInventory {
                    reagent: reagent.id(),
                    name: reagent.name().to_string(),
                    available: reagent.inventory(),
                    required: requirement.quantity(),
                });
            }
            if let Some(expiry) = reagent.expiry().filter(|&expiry| expiry < reference) {
                return Err(Error::ExpiredReagent {
                    reagent: reagent.id(),
                    name: reagent.name().to_string(),
                    expired_on: expiry,
                    reference,
                });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Experiments
    // ------------------------------------------------------------------

    /// Get all experiments in insertion order.
    #[must_use]
    pub fn experiments(&self) -> &[ExperimentRecord] {
        &self.experiments
    }

    /// Get an experiment by ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExperimentNotFound` if the id does not resolve.
    pub fn experiment(&self, id: ExperimentId) -> Result<&ExperimentRecord> {
        self.experiments
            .iter()
            .find(|e| e.id() == id)
            .ok_or(Error::ExperimentNotFound(id))
    }

    pub(crate) fn experiment_mut(&mut self, id: ExperimentId) -> Result<&mut ExperimentRecord> {
        self.experiments
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or(Error::ExperimentNotFound(id))
    }

    /// Next free experiment id (one past the highest in use).
    #[must_use]
    pub fn next_experiment_id(&self) -> ExperimentId {
        ExperimentId(
            self.experiments
                .iter()
                .map(|e| e.id().0)
                .max()
                .map_or(1, |id| id + 1),
        )
    }

    /// Schedule a new experiment for `recipe_id` on `date`.
    ///
    /// The recipe must currently be runnable on `date` (see
    /// [`check_runnable`](Self::check_runnable)). The static cost is computed
    /// from the recipe and the experiment gets the next free id.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty responsible list, or any
    /// error from `check_runnable`.
    pub fn create_experiment(
        &mut self,
        recipe_id: RecipeId,
        responsible: Vec<String>,
        date: NaiveDate,
    ) -> Result<ExperimentId> {
        self.check_runnable(recipe_id, date)?;
        let cost = self.list_cost(recipe_id)?;
        let experiment =
            ExperimentRecord::new(self.next_experiment_id(), recipe_id, responsible, date, cost)?;
        let id = experiment.id();
        debug!(experiment = %id, recipe = %recipe_id, cost, "experiment created");
        self.experiments.push(experiment);
        Ok(id)
    }

    /// Add an already-built experiment, keeping its stored cost.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateId`, `Error::RecipeNotFound` or
    /// `Error::InvalidInput`.
    pub fn add_experiment(&mut self, experiment: ExperimentRecord) -> Result<ExperimentId> {
        experiment.validate()?;
        if self.experiment(experiment.id()).is_ok() {
            return Err(Error::DuplicateId(format!("experiment {}", experiment.id())));
        }
        self.recipe(experiment.recipe_id())?;
        let id = experiment.id();
        self.experiments.push(experiment);
        Ok(id)
    }

    /// Point an experiment at another recipe and recompute its cost.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExperimentNotFound`, `Error::RecipeNotFound` or
    /// `Error::ReagentNotFound`.
    pub fn set_experiment_recipe(&mut self, id: ExperimentId, recipe_id: RecipeId) -> Result<()> {
        self.experiment(id)?;
        let cost = self.list_cost(recipe_id)?;
        self.experiment_mut(id)?.set_recipe(recipe_id, cost);
        Ok(())
    }

    /// Replace an experiment's responsible names.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExperimentNotFound` or `Error::InvalidInput`.
    pub fn set_experiment_responsible(
        &mut self,
        id: ExperimentId,
        responsible: Vec<String>,
    ) -> Result<()> {
        self.experiment_mut(id)?.set_responsible(responsible)
    }

    /// Change an experiment's date.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExperimentNotFound`.
    pub fn set_experiment_date(&mut self, id: ExperimentId, date: NaiveDate) -> Result<()> {
        self.experiment_mut(id)?.set_date(date);
        Ok(())
    }

    /// Set or clear an experiment's free-text outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExperimentNotFound`.
    pub fn set_experiment_outcome(&mut self, id: ExperimentId, outcome: Option<String>) -> Result<()> {
        self.experiment_mut(id)?.set_outcome(outcome);
        Ok(())
    }

    /// Remove an experiment together with its result, if any.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExperimentNotFound` if the id does not resolve.
    pub fn remove_experiment(&mut self, id: ExperimentId) -> Result<ExperimentRecord> {
        let index = self
            .experiments
            .iter()
            .position(|e| e.id() == id)
            .ok_or(Error::ExperimentNotFound(id))?;
        self.results.retain(|r| r.experiment_id() != id);
        Ok(self.experiments.remove(index))
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Get all results in the order they were produced.
    #[must_use]
    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    /// Get the result of an experiment, if it has been executed.
    #[must_use]
    pub fn result_for(&self, id: ExperimentId) -> Option<&ResultRecord> {
        self.results.iter().find(|r| r.experiment_id() == id)
    }

    /// Remove and return the result of an experiment so it can be run again.
    pub fn remove_result(&mut self, id: ExperimentId) -> Option<ResultRecord> {
        let index = self.results.iter().position(|r| r.experiment_id() == id)?;
        Some(self.results.remove(index))
    }

    pub(crate) fn push_result(&mut self, result: ResultRecord) {
        self.results.push(result);
    }

    // ------------------------------------------------------------------
    // Integrity
    // ------------------------------------------------------------------

    /// List every reference that does not resolve.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let reagents = self.recipes.iter().flat_map(|recipe| {
            recipe
                .requirements()
                .iter()
                .filter(|r| self.reagent(r.reagent_id()).is_err())
                .map(|r| DanglingReference::Reagent {
                    recipe: recipe.id(),
                    reagent: r.reagent_id(),
                })
        });
        let recipes = self
            .experiments
            .iter()
            .filter(|e| self.recipe(e.recipe_id()).is_err())
            .map(|e| DanglingReference::Recipe {
                experiment: e.id(),
                recipe: e.recipe_id(),
            });
        let experiments = self
            .results
            .iter()
            .filter(|r| self.experiment(r.experiment_id()).is_err())
            .map(|r| DanglingReference::Experiment {
                experiment: r.experiment_id(),
            });
        reagents.chain(recipes).chain(experiments).collect()
    }

    pub(crate) fn replace_reagents(&mut self, reagents: Vec<ReagentRecord>) {
        self.reagents = reagents;
    }

    pub(crate) fn replace_recipes(&mut self, recipes: Vec<RecipeRecord>) {
        self.recipes = recipes;
    }

    pub(crate) fn replace_experiments(&mut self, experiments: Vec<ExperimentRecord>) {
        self.experiments = experiments;
    }

    pub(crate) fn replace_results(&mut self, results: Vec<ResultRecord>) {
        self.results = results;
    }
}
