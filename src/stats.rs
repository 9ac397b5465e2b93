//! Laboratory statistics
//!
//! Read-only folds over a [`Registry`]. Tallies keep the order in which keys
//! were first encountered, and rankings go through
//! [`topk`](crate::topk), so ties always resolve to the earliest entry.
//!
//! Experiments whose recipe or reagents no longer resolve are skipped and
//! logged rather than failing the whole report.

use chrono::NaiveDate;
use rand::Rng;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::catalog::{ExperimentRecord, ReagentRecord, RecipeRecord, Registry};
use crate::config::{FractionRange, LabConfig};
use crate::topk::{SortOrder, TopKSelection};
use crate::Result;

/// Insertion-ordered accumulator keyed by name.
#[derive(Debug)]
struct Tally<V> {
    index: FxHashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V: Copy + std::ops::AddAssign> Tally<V> {
    fn new() -> Self {
        Self {
            index: FxHashMap::default(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: &str, amount: V) {
        if let Some(&slot) = self.index.get(key) {
            self.entries[slot].1 += amount;
        } else {
            self.index.insert(key.to_string(), self.entries.len());
            self.entries.push((key.to_string(), amount));
        }
    }

    fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}

/// Most and least frequently run recipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFrequency {
    /// Recipe name with the highest experiment count, and the count
    pub most: (String, usize),
    /// Recipe name with the lowest experiment count, and the count
    pub least: (String, usize),
}

/// Counts of results within and outside parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValiditySummary {
    /// Results within parameters
    pub valid: usize,
    /// Results outside parameters
    pub invalid: usize,
}

/// Snapshot of every statistic, as produced by [`LabStatistics::collect`].
#[derive(Debug, Clone, PartialEq)]
pub struct LabStatistics {
    /// Investigators ranked by number of experiments
    pub top_investigators: Vec<(String, usize)>,
    /// Most and least run recipes, if any experiment exists
    pub run_frequency: Option<RunFrequency>,
    /// Reagents ranked by total required quantity
    pub most_used_reagents: Vec<(String, f64)>,
    /// Reagents ranked by simulated waste
    pub top_waste_reagents: Vec<(String, f64)>,
    /// Names of reagents expired on the reference date
    pub expired_reagents: Vec<String>,
    /// Experiments that cannot run with current inventory
    pub failed_experiments: usize,
    /// Names of reagents below their reorder threshold
    pub restock_candidates: Vec<String>,
    /// Result validity counts
    pub validity: ValiditySummary,
}

impl LabStatistics {
    /// Compute every statistic with the limits and waste range from `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a ranking limit in `config` is zero.
    pub fn collect<R: Rng>(
        registry: &Registry,
        config: &LabConfig,
        reference: NaiveDate,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self {
            top_investigators: top_investigators(registry, config.top_investigators)?,
            run_frequency: run_frequency(registry),
            most_used_reagents: most_used_reagents(registry, config.top_reagents)?,
            top_waste_reagents: top_waste_reagents(
                registry,
                config.top_waste,
                &config.waste_fraction,
                rng,
            )?,
            expired_reagents: expired_reagents(registry, reference)
                .into_iter()
                .map(|r| r.name().to_string())
                .collect(),
            failed_experiments: failed_experiment_count(registry),
            restock_candidates: restock_candidates(registry)
                .into_iter()
                .map(|r| r.name().to_string())
                .collect(),
            validity: validity_summary(registry),
        })
    }
}

/// Rank responsible people by the number of experiments they appear on.
///
/// A person listed on N experiments counts N, regardless of co-responsibility.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if `limit` is zero.
pub fn top_investigators(registry: &Registry, limit: usize) -> Result<Vec<(String, usize)>> {
    let mut tally = Tally::new();
    for experiment in registry.experiments() {
        for name in experiment.responsible() {
            tally.add(name, 1);
        }
    }
    tally.into_entries().top_k(limit, SortOrder::Descending)
}

/// Most and least run recipes by experiment count, `None` without experiments.
#[must_use]
pub fn run_frequency(registry: &Registry) -> Option<RunFrequency> {
    let mut tally = Tally::new();
    for (_, recipe) in resolved_experiments(registry) {
        tally.add(recipe.name(), 1_usize);
    }
    let counts = tally.into_entries();
    let most = counts.clone().top_k(1, SortOrder::Descending).ok()?.pop()?;
    let least = counts.top_k(1, SortOrder::Ascending).ok()?.pop()?;
    Some(RunFrequency { most, least })
}

/// Rank reagents by total required quantity over all experiments.
///
/// Uses the quantities listed by each recipe, not the randomized amounts
/// actually consumed.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if `limit` is zero.
pub fn most_used_reagents(registry: &Registry, limit: usize) -> Result<Vec<(String, f64)>> {
    let mut tally = Tally::new();
    for_each_requirement(registry, |reagent, quantity| tally.add(reagent.name(), quantity));
    tally.into_entries().top_k(limit, SortOrder::Descending)
}

/// Rank reagents by simulated waste.
///
/// Every (experiment, requirement) pair draws its own waste fraction from
/// `waste`, so two calls rarely agree.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if `limit` is zero.
pub fn top_waste_reagents<R: Rng>(
    registry: &Registry,
    limit: usize,
    waste: &FractionRange,
    rng: &mut R,
) -> Result<Vec<(String, f64)>> {
    let mut tally = Tally::new();
    for_each_requirement(registry, |reagent, quantity| {
        tally.add(reagent.name(), quantity * waste.sample(rng));
    });
    tally.into_entries().top_k(limit, SortOrder::Descending)
}

/// Reagents whose expiry is strictly before `reference`, in registry order.
#[must_use]
pub fn expired_reagents(registry: &Registry, reference: NaiveDate) -> Vec<&ReagentRecord> {
    registry
        .reagents()
        .iter()
        .filter(|r| r.is_expired_at(reference))
        .collect()
}

/// Number of experiments with at least one reagent short of its required quantity.
///
/// Checked against current inventory. A shortfall on several reagents still
/// counts the experiment once.
#[must_use]
pub fn failed_experiment_count(registry: &Registry) -> usize {
    resolved_experiments(registry)
        .filter(|(_, recipe)| {
            recipe.requirements().iter().any(|requirement| {
                registry
                    .reagent(requirement.reagent_id())
                    .is_ok_and(|reagent| reagent.inventory() < requirement.quantity())
            })
        })
        .count()
}

/// Reagents whose inventory is below their minimum reorder threshold.
#[must_use]
pub fn restock_candidates(registry: &Registry) -> Vec<&ReagentRecord> {
    registry
        .reagents()
        .iter()
        .filter(|r| r.needs_restock())
        .collect()
}

/// Count results within and outside parameters.
#[must_use]
pub fn validity_summary(registry: &Registry) -> ValiditySummary {
    registry
        .results()
        .iter()
        .fold(ValiditySummary::default(), |mut summary, result| {
            if result.is_valid() {
                summary.valid += 1;
            } else {
                summary.invalid += 1;
            }
            summary
        })
}

/// Experiments paired with their recipe; dangling recipe ids are skipped.
fn resolved_experiments(
    registry: &Registry,
) -> impl Iterator<Item = (&ExperimentRecord, &RecipeRecord)> {
    registry.experiments().iter().filter_map(|experiment| {
        match registry.recipe(experiment.recipe_id()) {
            Ok(recipe) => Some((experiment, recipe)),
            Err(e) => {
                warn!(experiment = %experiment.id(), error = %e, "skipping experiment in statistics");
                None
            }
        }
    })
}

/// Visit every (experiment, requirement) pair whose reagent resolves.
fn for_each_requirement(registry: &Registry, mut visit: impl FnMut(&ReagentRecord, f64)) {
    for (_, recipe) in resolved_experiments(registry) {
        for requirement in recipe.requirements() {
            match registry.reagent(requirement.reagent_id()) {
                Ok(reagent) => visit(reagent, requirement.quantity()),
                Err(e) => warn!(recipe = %recipe.id(), error = %e, "skipping requirement in statistics"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_keeps_first_encountered_order() {
        let mut tally = Tally::new();
        tally.add("b", 1);
        tally.add("a", 1);
        tally.add("b", 2);
        assert_eq!(
            tally.into_entries(),
            vec![("b".to_string(), 3), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(top_investigators(&registry, 5).unwrap().is_empty());
        assert!(run_frequency(&registry).is_none());
        assert!(most_used_reagents(&registry, 5).unwrap().is_empty());
        assert_eq!(failed_experiment_count(&registry), 0);
        assert_eq!(validity_summary(&registry), ValiditySummary::default());
    }

    #[test]
    fn test_zero_limit_is_error() {
        let registry = Registry::new();
        assert!(top_investigators(&registry, 0).is_err());
    }
}
