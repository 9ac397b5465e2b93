//! Error types for labtrack
//!
//! Every failure is returned to the caller; nothing here is fatal to the process.

use chrono::NaiveDate;
use thiserror::Error;

use crate::catalog::{ExperimentId, ReagentId, RecipeId};

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// labtrack error types
#[derive(Error, Debug)]
pub enum Error {
    /// Reagent id does not resolve (unknown or removed)
    #[error("Reagent {0} not found")]
    ReagentNotFound(ReagentId),

    /// Recipe id does not resolve (unknown or removed)
    #[error("Recipe {0} not found")]
    RecipeNotFound(RecipeId),

    /// Experiment id does not resolve (unknown or removed)
    #[error("Experiment {0} not found")]
    ExperimentNotFound(ExperimentId),

    /// An entity with the same id is already registered
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// Not enough stock to run a recipe requirement
    #[error(
        "Insufficient inventory for reagent {reagent} ({name}): available {available}, required {required}"
    )]
    InsufficientInventory {
        /// Offending reagent
        reagent: ReagentId,
        /// Reagent name
        name: String,
        /// Inventory at check time
        available: f64,
        /// Quantity the recipe requires
        required: f64,
    },

    /// Reagent expired before the reference date
    #[error("Reagent {reagent} ({name}) expired on {expired_on} (reference date {reference})")]
    ExpiredReagent {
        /// Offending reagent
        reagent: ReagentId,
        /// Reagent name
        name: String,
        /// Expiry date
        expired_on: NaiveDate,
        /// Date the check was made against
        reference: NaiveDate,
    },

    /// Experiment already has a result
    #[error("Experiment {0} has already been executed\nRemove its result before running it again")]
    AlreadyExecuted(ExperimentId),

    /// Validation error on caller-supplied values
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persistence error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
