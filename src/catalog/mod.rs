//! Laboratory catalog: reagents, recipes, experiments and results
//!
//! ## Schema Overview
//!
//! ```text
//! ReagentRecord (1) ──< ReagentRequirement (N) >── (1) RecipeRecord
//!                                                        │
//!                                                        └──< ExperimentRecord (N)
//!                                                                  │
//!                                                                  └── ResultRecord (0..1)
//! ```
//!
//! Records refer to each other by typed integer ids. The [`Registry`] owns
//! every collection and is the only place references are resolved, so a
//! dangling id always surfaces as an explicit not-found error.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use labtrack::catalog::{
//!     MeasurementSpec, ReagentId, ReagentRecord, RecipeId, RecipeRecord, Registry,
//! };
//!
//! let mut registry = Registry::new();
//! let reagent = ReagentRecord::builder(ReagentId(1), "Sodium chloride", "g")
//!     .cost(2.0)
//!     .inventory(100.0)
//!     .build()?;
//! registry.add_reagent(reagent)?;
//!
//! let recipe = RecipeRecord::builder(RecipeId(1), "Saline solution")
//!     .requirement(ReagentId(1), 10.0, "g")
//!     .measurement(MeasurementSpec::new("pH", "-log[H+]", 6.0, 8.0))
//!     .build()?;
//! registry.add_recipe(recipe)?;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
//! let id = registry.create_experiment(RecipeId(1), vec!["Ana".into()], date)?;
//! assert!((registry.experiment(id)?.cost() - 20.0).abs() < f64::EPSILON);
//! # Ok::<(), labtrack::Error>(())
//! ```

pub mod dates;
mod experiment_record;
mod reagent_record;
mod recipe_record;
mod registry;
mod result_record;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use experiment_record::ExperimentRecord;
pub use reagent_record::{Conversion, ReagentRecord, ReagentRecordBuilder};
pub use recipe_record::{MeasurementSpec, ReagentRequirement, RecipeRecord, RecipeRecordBuilder};
pub use registry::{DanglingReference, Registry};
pub use result_record::{evaluate, MeasurementRow, ResultRecord};

/// Stable key of a reagent within a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReagentId(pub u32);

/// Stable key of a recipe within a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(pub u32);

/// Stable key of an experiment within a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(pub u32);

impl fmt::Display for ReagentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reject negative, NaN and infinite quantities.
pub(crate) fn non_negative(field: &str, value: f64) -> crate::Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(crate::Error::InvalidInput(format!(
            "{field} must be a non-negative number, got {value}"
        )))
    }
}
