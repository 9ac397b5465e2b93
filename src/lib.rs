//! # labtrack: Laboratory Inventory and Experiment Tracking
//!
//! labtrack keeps a catalog of reagents, recipes, experiments and results,
//! simulates running experiments against reagent stock, and derives
//! statistics over everything recorded.
//!
//! ## Design Principles
//!
//! - **Typed ids**: entities reference each other through `ReagentId`,
//!   `RecipeId` and `ExperimentId`; a dangling id is an explicit error
//! - **Check before mutate**: an experiment that fails its preconditions
//!   leaves the catalog untouched
//! - **Deterministic rankings**: ties resolve to the first-encountered entry
//! - **Injectable randomness**: every simulated draw takes a caller `Rng`
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use labtrack::catalog::{MeasurementSpec, ReagentId, ReagentRecord, RecipeId, RecipeRecord};
//! use labtrack::Lab;
//!
//! let mut lab = Lab::builder().build()?;
//! let registry = lab.registry_mut();
//! registry.add_reagent(
//!     ReagentRecord::builder(ReagentId(1), "Buffer", "mL").cost(0.2).inventory(500.0).build()?,
//! )?;
//! registry.add_recipe(
//!     RecipeRecord::builder(RecipeId(1), "Calibrate")
//!         .requirement(ReagentId(1), 25.0, "mL")
//!         .measurement(MeasurementSpec::new("pH", "-log[H+]", 6.8, 7.2))
//!         .build()?,
//! )?;
//!
//! let today = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
//! let id = lab.registry_mut().create_experiment(RecipeId(1), vec!["Ana".into()], today)?;
//! let report = lab.run_experiment(id, today)?;
//! println!("{}", report.result);
//!
//! let stats = lab.statistics(today)?;
//! assert_eq!(stats.top_investigators, vec![("Ana".to_string(), 1)]);
//! # Ok::<(), labtrack::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod stats;
pub mod storage;
pub mod topk;

use chrono::NaiveDate;
use rand::Rng;

pub use error::{Error, Result};

use catalog::{ExperimentId, Registry};
use config::LabConfig;
use execution::{ExecutionReport, SimulationModel};
use stats::LabStatistics;
use storage::{JsonStore, LoadReport};

/// Lab instance: a registry plus the configuration it runs under
#[derive(Debug, Clone)]
pub struct Lab {
    registry: Registry,
    config: LabConfig,
}

impl Lab {
    /// Create a new lab builder
    #[must_use]
    pub fn builder() -> LabBuilder {
        LabBuilder::default()
    }

    /// Get the catalog.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the catalog for editing.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Run an experiment using the thread-local random generator.
    ///
    /// # Errors
    ///
    /// See [`execution::execute`].
    pub fn run_experiment(&mut self, id: ExperimentId, today: NaiveDate) -> Result<ExecutionReport> {
        self.run_experiment_with_rng(id, today, &mut rand::thread_rng())
    }

    /// Run an experiment with a caller-supplied random generator.
    ///
    /// # Errors
    ///
    /// See [`execution::execute`].
    pub fn run_experiment_with_rng<R: Rng>(
        &mut self,
        id: ExperimentId,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<ExecutionReport> {
        let model = SimulationModel::from(&self.config);
        execution::execute(&mut self.registry, id, today, &model, rng)
    }

    /// Compute every statistic using the thread-local random generator.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a ranking limit is zero.
    pub fn statistics(&self, today: NaiveDate) -> Result<LabStatistics> {
        self.statistics_with_rng(today, &mut rand::thread_rng())
    }

    /// Compute every statistic with a caller-supplied random generator.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a ranking limit is zero.
    pub fn statistics_with_rng<R: Rng>(&self, today: NaiveDate, rng: &mut R) -> Result<LabStatistics> {
        LabStatistics::collect(&self.registry, &self.config, today, rng)
    }

    /// Load the catalog files from the configured data directory.
    ///
    /// # Errors
    ///
    /// See [`JsonStore::load`].
    pub fn load(&mut self) -> Result<LoadReport> {
        self.store().load(&mut self.registry)
    }

    /// Save the catalog files to the configured data directory.
    ///
    /// # Errors
    ///
    /// See [`JsonStore::save`].
    pub fn save(&self) -> Result<()> {
        self.store().save(&self.registry)
    }

    fn store(&self) -> JsonStore {
        JsonStore::new(&self.config.data_dir)
    }
}

/// Lab builder
#[derive(Debug, Default)]
pub struct LabBuilder {
    config: Option<LabConfig>,
    registry: Option<Registry>,
}

impl LabBuilder {
    /// Use this configuration instead of the defaults
    #[must_use]
    pub fn config(mut self, config: LabConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Start from an existing registry instead of an empty one
    #[must_use]
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the lab
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the configuration is out of range
    pub fn build(self) -> Result<Lab> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(Lab {
            registry: self.registry.unwrap_or_default(),
            config,
        })
    }
}
