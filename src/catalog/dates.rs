//! Date parsing at the catalog boundary
//!
//! Dates are stored as [`NaiveDate`] and persisted as `YYYY-MM-DD`. An expiry
//! that does not apply is `None` in memory and the literal
//! [`NOT_APPLICABLE`] on disk.

use chrono::NaiveDate;

use crate::{Error, Result};

/// Persisted marker for reagents without an expiry date.
pub const NOT_APPLICABLE: &str = "not applicable";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an ISO `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the text is not a valid calendar date.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|e| Error::InvalidInput(format!("invalid date '{text}': {e}")))
}

/// Parse an expiry date, mapping blank text and [`NOT_APPLICABLE`] to `None`.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the text is neither a date nor the marker.
pub fn parse_expiry(text: &str) -> Result<Option<NaiveDate>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_APPLICABLE) {
        return Ok(None);
    }
    parse_date(trimmed).map(Some)
}

/// Format an expiry for display or persistence.
#[must_use]
pub fn format_expiry(expiry: Option<NaiveDate>) -> String {
    expiry.map_or_else(
        || NOT_APPLICABLE.to_string(),
        |date| date.format(DATE_FORMAT).to_string(),
    )
}

/// `serde(with = ...)` adapter for optional expiry dates.
pub(crate) mod expiry {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        expiry: &Option<NaiveDate>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_expiry(*expiry))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<NaiveDate>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        match text {
            None => Ok(None),
            Some(text) => super::parse_expiry(&text).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-03-10").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert!(parse_date("10/03/2024").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn test_parse_expiry_marker() {
        assert_eq!(parse_expiry("not applicable").unwrap(), None);
        assert_eq!(parse_expiry("Not Applicable").unwrap(), None);
        assert_eq!(parse_expiry("  ").unwrap(), None);
        assert!(parse_expiry("2025-01-01").unwrap().is_some());
        assert!(parse_expiry("soon").is_err());
    }

    #[test]
    fn test_format_expiry() {
        assert_eq!(format_expiry(None), NOT_APPLICABLE);
        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(format_expiry(Some(date)), "2025-01-09");
    }
}
