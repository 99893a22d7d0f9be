use chrono::NaiveDate;

use crate::constants::DATE_FORMAT;
use crate::errors::{Result, ValidationError};

/// Parses a date in `DATE_FORMAT`.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| {
            ValidationError::InvalidInput(format!("invalid date '{}': {}", value, e)).into()
        })
}

/// Parses an optional query-style date; blank input means no bound.
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_date(raw).map(Some),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
