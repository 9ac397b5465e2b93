//! Result Record - measured outcome of an executed experiment

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ExperimentId;

/// Decide whether every obtained value lies within its acceptable range.
///
/// Ranges are inclusive on both ends. A measurement with no entry in
/// `acceptable` does not fail the result.
#[must_use]
pub fn evaluate(obtained: &BTreeMap<String, f64>, acceptable: &BTreeMap<String, (f64, f64)>) -> bool {
    obtained.iter().all(|(name, value)| {
        acceptable.get(name).copied().map_or(true, |range| within(range, *value))
    })
}

/// Inclusive on both ends.
fn within((min, max): (f64, f64), value: f64) -> bool {
    min <= value && value <= max
}

/// One line of a result breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRow<'a> {
    /// Measurement name
    pub name: &'a str,
    /// Obtained value
    pub obtained: f64,
    /// Acceptable `(min, max)`, if one was recorded
    pub range: Option<(f64, f64)>,
    /// Whether this measurement passes
    pub within: bool,
}

/// Result Record holds the values obtained by running an experiment.
///
/// `valid` is derived from `obtained` and `acceptable` through [`evaluate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    experiment_id: ExperimentId,
    obtained: BTreeMap<String, f64>,
    acceptable: BTreeMap<String, (f64, f64)>,
    valid: bool,
}

impl ResultRecord {
    /// Create a result and evaluate it.
    #[must_use]
    pub fn new(
        experiment_id: ExperimentId,
        obtained: BTreeMap<String, f64>,
        acceptable: BTreeMap<String, (f64, f64)>,
    ) -> Self {
        let valid = evaluate(&obtained, &acceptable);
        Self {
            experiment_id,
            obtained,
            acceptable,
            valid,
        }
    }

    /// Get the experiment this result belongs to.
    #[must_use]
    pub const fn experiment_id(&self) -> ExperimentId {
        self.experiment_id
    }

    /// Get the obtained values by measurement name.
    #[must_use]
    pub const fn obtained(&self) -> &BTreeMap<String, f64> {
        &self.obtained
    }

    /// Get the acceptable ranges by measurement name.
    #[must_use]
    pub const fn acceptable(&self) -> &BTreeMap<String, (f64, f64)> {
        &self.acceptable
    }

    /// True when every measurement is within parameters.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Obtained measurements that have no acceptable range and therefore pass unchecked.
    #[must_use]
    pub fn unranged_measurements(&self) -> Vec<&str> {
        self.obtained
            .keys()
            .filter(|name| !self.acceptable.contains_key(*name))
            .map(String::as_str)
            .collect()
    }

    /// Per-measurement breakdown, ordered by measurement name.
    #[must_use]
    pub fn rows(&self) -> Vec<MeasurementRow<'_>> {
        self.obtained
            .iter()
            .map(|(name, &obtained)| {
                let range = self.acceptable.get(name).copied();
                MeasurementRow {
                    name,
                    obtained,
                    range,
                    within: range.map_or(true, |range| within(range, obtained)),
                }
            })
            .collect()
    }

    /// Recompute validity, returning whether the previously stored flag agreed.
    pub(crate) fn revalidate(&mut self) -> bool {
        let valid = evaluate(&self.obtained, &self.acceptable);
        let agreed = valid == self.valid;
        self.valid = valid;
        agreed
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.valid {
            "within parameters"
        } else {
            "outside parameters"
        };
        writeln!(f, "Result of experiment {}: {verdict}", self.experiment_id)?;
        for row in self.rows() {
            match row.range {
                Some((min, max)) => writeln!(
                    f,
                    "  - {}: {:.2} (acceptable {min} - {max}) [{}]",
                    row.name,
                    row.obtained,
                    if row.within { "ok" } else { "out" }
                )?,
                None => writeln!(f, "  - {}: {:.2} (no range)", row.name, row.obtained)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ph_result(value: f64) -> ResultRecord {
        let obtained = BTreeMap::from([("pH".to_string(), value)]);
        let acceptable = BTreeMap::from([("pH".to_string(), (6.0, 8.0))]);
        ResultRecord::new(ExperimentId(1), obtained, acceptable)
    }

    #[test]
    fn test_ph_boundaries() {
        assert!(ph_result(7.0).is_valid());
        assert!(ph_result(6.0).is_valid());
        assert!(ph_result(8.0).is_valid());
        assert!(!ph_result(8.5).is_valid());
        assert!(!ph_result(5.9).is_valid());
    }

    #[test]
    fn test_rows_share_boundary_rule() {
        for (value, expected) in [(6.0, true), (8.0, true), (8.01, false), (5.99, false)] {
            let result = ph_result(value);
            assert_eq!(result.rows()[0].within, expected, "value = {value}");
            assert_eq!(result.is_valid(), expected, "value = {value}");
        }
    }

    #[test]
    fn test_unranged_measurement_passes() {
        let obtained = BTreeMap::from([("pH".to_string(), 7.0), ("mass".to_string(), 1e9)]);
        let acceptable = BTreeMap::from([("pH".to_string(), (6.0, 8.0))]);
        let result = ResultRecord::new(ExperimentId(1), obtained, acceptable);

        assert!(result.is_valid());
        assert_eq!(result.unranged_measurements(), vec!["mass"]);
    }

    #[test]
    fn test_one_failure_fails_result() {
        let obtained = BTreeMap::from([("a".to_string(), 1.0), ("b".to_string(), 10.0)]);
        let acceptable =
            BTreeMap::from([("a".to_string(), (0.0, 2.0)), ("b".to_string(), (0.0, 2.0))]);
        let result = ResultRecord::new(ExperimentId(1), obtained, acceptable);
        assert!(!result.is_valid());

        let rows = result.rows();
        assert!(rows[0].within);
        assert!(!rows[1].within);
    }

    #[test]
    fn test_revalidate_reports_mismatch() {
        let mut result = ph_result(9.0);
        result.valid = true;
        assert!(!result.revalidate());
        assert!(!result.is_valid());
        assert!(result.revalidate());
    }

    #[test]
    fn test_display_summary() {
        let text = ph_result(8.5).to_string();
        assert!(text.contains("outside parameters"));
        assert!(text.contains("pH: 8.50"));
    }
}
