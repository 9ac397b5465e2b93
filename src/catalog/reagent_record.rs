//! Reagent Record - costed inventory item with expiry and unit conversions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{non_negative, ReagentId};
use crate::{Error, Result};

/// Unit conversion relative to a reagent's base unit.
///
/// Conversions are used for reporting only; consumption is always computed
/// in the base unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversion {
    unit: String,
    factor: f64,
}

impl Conversion {
    /// Create a conversion to `unit` with a strictly positive `factor`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the factor is not a positive number.
    pub fn new(unit: impl Into<String>, factor: f64) -> Result<Self> {
        let conversion = Self {
            unit: unit.into(),
            factor,
        };
        conversion.validate()?;
        Ok(conversion)
    }

    /// Get the target unit.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Get the factor relative to the base unit.
    #[must_use]
    pub const fn factor(&self) -> f64 {
        self.factor
    }

    /// Convert a base-unit quantity into this conversion's unit.
    #[must_use]
    pub fn convert(&self, quantity: f64) -> f64 {
        quantity * self.factor
    }

    fn validate(&self) -> Result<()> {
        if self.factor.is_finite() && self.factor > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "conversion factor for '{}' must be positive, got {}",
                self.unit, self.factor
            )))
        }
    }
}

/// Reagent Record represents one inventory item.
///
/// Inventory is expressed in the base unit. It is validated as non-negative
/// when set by a caller, but experiment execution may drive it below zero
/// because consumption includes a simulated overage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReagentRecord {
    id: ReagentId,
    name: String,
    description: String,
    cost: f64,
    category: String,
    inventory: f64,
    unit: String,
    #[serde(with = "crate::catalog::dates::expiry", default)]
    expiry: Option<NaiveDate>,
    minimum: f64,
    #[serde(default)]
    conversions: Vec<Conversion>,
}

impl ReagentRecord {
    /// Create a builder with the required fields.
    #[must_use]
    pub fn builder(
        id: ReagentId,
        name: impl Into<String>,
        unit: impl Into<String>,
    ) -> ReagentRecordBuilder {
        ReagentRecordBuilder::new(id, name, unit)
    }

    /// Get the reagent ID.
    #[must_use]
    pub const fn id(&self) -> ReagentId {
        self.id
    }

    /// Get the reagent name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the cost per base unit.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Get the category.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Get the inventory in the base unit.
    #[must_use]
    pub const fn inventory(&self) -> f64 {
        self.inventory
    }

    /// Get the base unit.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Get the expiry date, `None` when it does not apply.
    #[must_use]
    pub const fn expiry(&self) -> Option<NaiveDate> {
        self.expiry
    }

    /// Get the minimum reorder threshold.
    #[must_use]
    pub const fn minimum(&self) -> f64 {
        self.minimum
    }

    /// Get the registered conversions.
    #[must_use]
    pub fn conversions(&self) -> &[Conversion] {
        &self.conversions
    }

    /// True when the expiry is set and strictly before `reference`.
    #[must_use]
    pub fn is_expired_at(&self, reference: NaiveDate) -> bool {
        self.expiry.is_some_and(|expiry| expiry < reference)
    }

    /// True when inventory has fallen below the reorder threshold.
    #[must_use]
    pub fn needs_restock(&self) -> bool {
        self.inventory < self.minimum
    }

    /// Inventory expressed in `unit`, if it is the base unit or a registered conversion.
    #[must_use]
    pub fn inventory_in(&self, unit: &str) -> Option<f64> {
        if unit == self.unit {
            return Some(self.inventory);
        }
        self.conversions
            .iter()
            .find(|c| c.unit() == unit)
            .map(|c| c.convert(self.inventory))
    }

    /// Rename the reagent.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Replace the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Set the cost per base unit.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the cost is negative or not finite.
    pub fn set_cost(&mut self, cost: f64) -> Result<()> {
        self.cost = non_negative("cost", cost)?;
        Ok(())
    }

    /// Replace the category.
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    /// Set the inventory in the base unit.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the quantity is negative or not finite.
    pub fn set_inventory(&mut self, inventory: f64) -> Result<()> {
        self.inventory = non_negative("inventory", inventory)?;
        Ok(())
    }

    /// Replace the base unit. Existing conversions are kept as-is.
    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    /// Set or clear the expiry date.
    pub fn set_expiry(&mut self, expiry: Option<NaiveDate>) {
        self.expiry = expiry;
    }

    /// Set the minimum reorder threshold.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the threshold is negative or not finite.
    pub fn set_minimum(&mut self, minimum: f64) -> Result<()> {
        self.minimum = non_negative("minimum", minimum)?;
        Ok(())
    }

    /// Append a conversion.
    pub fn add_conversion(&mut self, conversion: Conversion) {
        self.conversions.push(conversion);
    }

    /// Replace the conversion at `index`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `index` is out of bounds.
    pub fn update_conversion(&mut self, index: usize, conversion: Conversion) -> Result<()> {
        let len = self.conversions.len();
        let slot = self
            .conversions
            .get_mut(index)
            .ok_or_else(|| conversion_index_error(index, len))?;
        *slot = conversion;
        Ok(())
    }

    /// Remove and return the conversion at `index`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `index` is out of bounds.
    pub fn remove_conversion(&mut self, index: usize) -> Result<Conversion> {
        if index >= self.conversions.len() {
            return Err(conversion_index_error(index, self.conversions.len()));
        }
        Ok(self.conversions.remove(index))
    }

    /// Subtract a consumed quantity. No clamping: inventory may go negative.
    pub(crate) fn consume(&mut self, quantity: f64) {
        self.inventory -= quantity;
    }

    /// Check field invariants on records that bypassed the builder (e.g. loaded from disk).
    pub(crate) fn validate(&self) -> Result<()> {
        non_negative("cost", self.cost)?;
        non_negative("minimum", self.minimum)?;
        if !self.inventory.is_finite() {
            return Err(Error::InvalidInput(format!(
                "inventory of reagent {} must be finite",
                self.id
            )));
        }
        self.conversions.iter().try_for_each(Conversion::validate)
    }
}

fn conversion_index_error(index: usize, len: usize) -> Error {
    Error::InvalidInput(format!(
        "conversion index {index} out of bounds (reagent has {len} conversions)"
    ))
}

/// Builder for `ReagentRecord`.
#[derive(Debug)]
pub struct ReagentRecordBuilder {
    record: ReagentRecord,
}

impl ReagentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: ReagentId, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            record: ReagentRecord {
                id,
                name: name.into(),
                description: String::new(),
                cost: 0.0,
                category: String::new(),
                inventory: 0.0,
                unit: unit.into(),
                expiry: None,
                minimum: 0.0,
                conversions: Vec::new(),
            },
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.record.description = description.into();
        self
    }

    /// Set the cost per base unit.
    #[must_use]
    pub const fn cost(mut self, cost: f64) -> Self {
        self.record.cost = cost;
        self
    }

    /// Set the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.record.category = category.into();
        self
    }

    /// Set the starting inventory.
    #[must_use]
    pub const fn inventory(mut self, inventory: f64) -> Self {
        self.record.inventory = inventory;
        self
    }

    /// Set the expiry date.
    #[must_use]
    pub const fn expiry(mut self, expiry: NaiveDate) -> Self {
        self.record.expiry = Some(expiry);
        self
    }

    /// Set the minimum reorder threshold.
    #[must_use]
    pub const fn minimum(mut self, minimum: f64) -> Self {
        self.record.minimum = minimum;
        self
    }

    /// Add a conversion.
    #[must_use]
    pub fn conversion(mut self, conversion: Conversion) -> Self {
        self.record.conversions.push(conversion);
        self
    }

    /// Build the `ReagentRecord`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if cost, inventory or minimum is negative.
    pub fn build(self) -> Result<ReagentRecord> {
        non_negative("inventory", self.record.inventory)?;
        self.record.validate()?;
        Ok(self.record)
    }
}
