//! Catalog persistence (JSON files)
//!
//! A data directory holds one file per collection:
//!
//! ```text
//! <dir>/reagents.json     [ReagentRecord]
//! <dir>/recipes.json      [RecipeRecord]
//! <dir>/experiments.json  [ExperimentRecord]
//! <dir>/results.json      [ResultRecord]
//! ```
//!
//! Loading rules:
//! - A missing file leaves its collection unchanged and is listed in
//!   [`LoadReport::missing_files`].
//! - Once every present file is read, references are resolved across the
//!   whole staged registry in dependency order, so records kept from a
//!   missing file are checked too. Recipe lines naming an unknown reagent,
//!   experiments naming an unknown recipe and results naming an unknown
//!   experiment are dropped and counted, never silently lost.
//! - Loading is staged on a copy of the registry; if any present file fails
//!   to parse, the registry is left exactly as it was.

use std::fmt::Display;
use std::fs::{self, File};
use std::hash::Hash;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{ExperimentRecord, ReagentRecord, RecipeRecord, Registry, ResultRecord};
use crate::{Error, Result};

/// Reagent collection file name
pub const REAGENTS_FILE: &str = "reagents.json";
/// Recipe collection file name
pub const RECIPES_FILE: &str = "recipes.json";
/// Experiment collection file name
pub const EXPERIMENTS_FILE: &str = "experiments.json";
/// Result collection file name
pub const RESULTS_FILE: &str = "results.json";

/// What a load did, including everything it had to drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Reagents loaded
    pub reagents: usize,
    /// Recipes loaded
    pub recipes: usize,
    /// Experiments loaded
    pub experiments: usize,
    /// Results loaded
    pub results: usize,
    /// Files that did not exist
    pub missing_files: Vec<PathBuf>,
    /// Recipe requirement lines dropped for naming an unknown reagent
    pub dropped_requirements: usize,
    /// Experiments dropped for naming an unknown recipe
    pub dropped_experiments: usize,
    /// Results dropped for naming an unknown experiment, or a second result for one
    pub dropped_results: usize,
    /// Results whose stored validity disagreed with their values
    pub validity_mismatches: usize,
}

impl LoadReport {
    /// Total number of records or lines dropped.
    #[must_use]
    pub const fn dropped_records(&self) -> usize {
        self.dropped_requirements + self.dropped_experiments + self.dropped_results
    }

    /// True when every file was present and nothing was dropped or corrected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing_files.is_empty() && self.dropped_records() == 0 && self.validity_mismatches == 0
    }
}

/// JSON store rooted at a data directory
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Create a store for `dir`. Nothing is touched until `load` or `save`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every collection, creating the directory if needed.
    ///
    /// # Errors
    /// Returns error if the directory or a file cannot be written
    pub fn save(&self, registry: &Registry) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::StorageError(format!(
                "Failed to create data directory {}: {e}",
                self.dir.display()
            ))
        })?;

        write_json(&self.dir.join(REAGENTS_FILE), registry.reagents())?;
        write_json(&self.dir.join(RECIPES_FILE), registry.recipes())?;
        write_json(&self.dir.join(EXPERIMENTS_FILE), registry.experiments())?;
        write_json(&self.dir.join(RESULTS_FILE), registry.results())?;

        info!(
            dir = %self.dir.display(),
            reagents = registry.reagents().len(),
            recipes = registry.recipes().len(),
            experiments = registry.experiments().len(),
            results = registry.results().len(),
            "catalog saved"
        );
        Ok(())
    }

    /// Load the collections present in the directory into `registry`.
    ///
    /// # Errors
    /// Returns error if a present file cannot be read or parsed, contains
    /// duplicate ids, or holds out-of-range values. The registry is unchanged
    /// in that case.
    pub fn load(&self, registry: &mut Registry) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let mut staged = registry.clone();

        if let Some(reagents) = self.read::<ReagentRecord>(REAGENTS_FILE, &mut report)? {
            ensure_unique(&reagents, ReagentRecord::id, REAGENTS_FILE)?;
            reagents.iter().try_for_each(ReagentRecord::validate)?;
            staged.replace_reagents(reagents);
        }

        if let Some(recipes) = self.read::<RecipeRecord>(RECIPES_FILE, &mut report)? {
            ensure_unique(&recipes, RecipeRecord::id, RECIPES_FILE)?;
            recipes.iter().try_for_each(RecipeRecord::validate)?;
            staged.replace_recipes(recipes);
        }

        if let Some(experiments) = self.read::<ExperimentRecord>(EXPERIMENTS_FILE, &mut report)? {
            ensure_unique(&experiments, ExperimentRecord::id, EXPERIMENTS_FILE)?;
            experiments.iter().try_for_each(ExperimentRecord::validate)?;
            staged.replace_experiments(experiments);
        }

        if let Some(results) = self.read::<ResultRecord>(RESULTS_FILE, &mut report)? {
            staged.replace_results(results);
        }

        resolve(&mut staged, &mut report);

        report.reagents = staged.reagents().len();
        report.recipes = staged.recipes().len();
        report.experiments = staged.experiments().len();
        report.results = staged.results().len();
        *registry = staged;

        info!(
            dir = %self.dir.display(),
            reagents = report.reagents,
            recipes = report.recipes,
            experiments = report.experiments,
            results = report.results,
            dropped = report.dropped_records(),
            missing = report.missing_files.len(),
            "catalog loaded"
        );
        Ok(report)
    }

    fn read<T: DeserializeOwned>(&self, name: &str, report: &mut LoadReport) -> Result<Option<Vec<T>>> {
        let path = self.dir.join(name);
        if !path.exists() {
            warn!(file = %path.display(), "catalog file missing; collection left unchanged");
            report.missing_files.push(path);
            return Ok(None);
        }
        let file = File::open(&path)
            .map_err(|e| Error::StorageError(format!("Failed to open {}: {e}", path.display())))?;
        let records = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(records))
    }
}

/// Drop every reference the staged registry cannot resolve, whether the
/// record came from disk or was kept because its file was missing.
fn resolve(staged: &mut Registry, report: &mut LoadReport) {
    let mut recipes = staged.recipes().to_vec();
    for recipe in &mut recipes {
        let dropped = recipe.retain_requirements(|r| staged.reagent(r.reagent_id()).is_ok());
        if dropped > 0 {
            warn!(recipe = %recipe.id(), dropped, "dropped requirements naming unknown reagents");
        }
        report.dropped_requirements += dropped;
    }
    staged.replace_recipes(recipes);

    let (kept, dropped): (Vec<_>, Vec<_>) = staged
        .experiments()
        .iter()
        .cloned()
        .partition(|e| staged.recipe(e.recipe_id()).is_ok());
    for experiment in &dropped {
        warn!(
            experiment = %experiment.id(),
            recipe = %experiment.recipe_id(),
            "dropped experiment naming an unknown recipe"
        );
    }
    report.dropped_experiments = dropped.len();
    staged.replace_experiments(kept);

    let mut seen = FxHashSet::default();
    let mut kept = Vec::with_capacity(staged.results().len());
    for result in staged.results() {
        let id = result.experiment_id();
        if staged.experiment(id).is_err() || !seen.insert(id) {
            warn!(experiment = %id, "dropped result without a unique known experiment");
            report.dropped_results += 1;
            continue;
        }
        let mut result = result.clone();
        if !result.revalidate() {
            warn!(experiment = %id, "stored validity disagreed with values; recomputed");
            report.validity_mismatches += 1;
        }
        kept.push(result);
    }
    staged.replace_results(kept);
}

fn write_json<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::StorageError(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

fn ensure_unique<T, K>(records: &[T], key: impl Fn(&T) -> K, file: &str) -> Result<()>
where
    K: Eq + Hash + Display,
{
    let mut seen = FxHashSet::default();
    for record in records {
        let id = key(record);
        if !seen.insert(id) {
            return Err(Error::StorageError(format!(
                "Duplicate id {} in {file}",
                key(record)
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_report_clean() {
        let report = LoadReport::default();
        assert!(report.is_clean());
        assert_eq!(report.dropped_records(), 0);

        let report = LoadReport {
            dropped_experiments: 2,
            dropped_results: 1,
            ..LoadReport::default()
        };
        assert!(!report.is_clean());
        assert_eq!(report.dropped_records(), 3);
    }

    #[test]
    fn test_store_dir() {
        let store = JsonStore::new("somewhere");
        assert_eq!(store.dir(), Path::new("somewhere"));
    }
}
