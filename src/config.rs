//! Lab configuration
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "data_dir": "/var/lib/lab", "waste_fraction": { "min": 0.05, "max": 0.2 } }
//! ```

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default directory for persisted catalog files.
pub const DEFAULT_DATA_DIR: &str = "lab-data";

/// Inclusive range `[min, max]` of a non-negative random fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractionRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl FractionRange {
    /// Consumption overage applied on execution: 0.1% to 22.5%.
    pub const CONSUMPTION_ERROR: Self = Self::new(0.001, 0.225);
    /// Multiplicative measurement error: 0% to 100%.
    pub const MEASUREMENT_ERROR: Self = Self::new(0.0, 1.0);
    /// Simulated waste per experiment and reagent: 1% to 30%.
    pub const WASTE_FRACTION: Self = Self::new(0.01, 0.30);

    /// Create a range without validation.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draw a uniform fraction from the range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min..=self.max)
    }

    /// True when `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub(crate) fn validate(&self, field: &str) -> Result<()> {
        if self.min.is_finite() && self.max.is_finite() && 0.0 <= self.min && self.min <= self.max {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "{field} must satisfy 0 <= min <= max, got [{}, {}]",
                self.min, self.max
            )))
        }
    }
}

/// Configuration for a [`Lab`](crate::Lab).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Directory holding `reagents.json`, `recipes.json`, `experiments.json`
    /// and `results.json`.
    pub data_dir: PathBuf,
    /// Overage fraction drawn per reagent on execution.
    pub consumption_error: FractionRange,
    /// Error factor drawn per measurement on execution.
    pub measurement_error: FractionRange,
    /// Waste fraction drawn per experiment and reagent for waste statistics.
    pub waste_fraction: FractionRange,
    /// How many investigators to rank.
    pub top_investigators: usize,
    /// How many most-used reagents to rank.
    pub top_reagents: usize,
    /// How many high-waste reagents to rank.
    pub top_waste: usize,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            consumption_error: FractionRange::CONSUMPTION_ERROR,
            measurement_error: FractionRange::MEASUREMENT_ERROR,
            waste_fraction: FractionRange::WASTE_FRACTION,
            top_investigators: 5,
            top_reagents: 5,
            top_waste: 3,
        }
    }
}

impl LabConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> LabConfigBuilder {
        LabConfigBuilder::default()
    }

    /// Read a JSON config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, `Error::Json` if it is
    /// malformed, or `Error::InvalidInput` if a value is out of range.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every range and ranking limit.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.consumption_error.validate("consumption_error")?;
        self.measurement_error.validate("measurement_error")?;
        self.waste_fraction.validate("waste_fraction")?;
        for (field, limit) in [
            ("top_investigators", self.top_investigators),
            ("top_reagents", self.top_reagents),
            ("top_waste", self.top_waste),
        ] {
            if limit == 0 {
                return Err(Error::InvalidInput(format!("{field} must be greater than 0")));
            }
        }
        Ok(())
    }
}

/// Builder for `LabConfig`.
#[derive(Debug, Default)]
pub struct LabConfigBuilder {
    config: LabConfig,
}

impl LabConfigBuilder {
    /// Set the data directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Set the consumption overage range.
    #[must_use]
    pub const fn consumption_error(mut self, range: FractionRange) -> Self {
        self.config.consumption_error = range;
        self
    }

    /// Set the measurement error range.
    #[must_use]
    pub const fn measurement_error(mut self, range: FractionRange) -> Self {
        self.config.measurement_error = range;
        self
    }

    /// Set the waste fraction range.
    #[must_use]
    pub const fn waste_fraction(mut self, range: FractionRange) -> Self {
        self.config.waste_fraction = range;
        self
    }

    /// Set the ranking limits for investigators, reagents and waste.
    #[must_use]
    pub const fn ranking_limits(mut self, investigators: usize, reagents: usize, waste: usize) -> Self {
        self.config.top_investigators = investigators;
        self.config.top_reagents = reagents;
        self.config.top_waste = waste;
        self
    }

    /// Build and validate the `LabConfig`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a value is out of range.
    pub fn build(self) -> Result<LabConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_simulation_constants() {
        let config = LabConfig::default();
        assert_eq!(config.consumption_error, FractionRange::new(0.001, 0.225));
        assert_eq!(config.measurement_error, FractionRange::new(0.0, 1.0));
        assert_eq!(config.waste_fraction, FractionRange::new(0.01, 0.30));
        assert_eq!(
            (config.top_investigators, config.top_reagents, config.top_waste),
            (5, 5, 3)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_inverted_range() {
        let result = LabConfig::builder()
            .waste_fraction(FractionRange::new(0.5, 0.1))
            .build();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_builder_rejects_zero_limit() {
        let result = LabConfig::builder().ranking_limits(5, 0, 3).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LabConfig = serde_json::from_str(r#"{"top_waste": 4}"#).unwrap();
        assert_eq!(config.top_waste, 4);
        assert_eq!(config.top_reagents, 5);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn test_sample_stays_in_range() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let range = FractionRange::CONSUMPTION_ERROR;
        for _ in 0..1000 {
            assert!(range.contains(range.sample(&mut rng)));
        }
    }
}
