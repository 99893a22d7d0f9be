//! Read-side models for computed valuation history.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weights of every asset of a portfolio on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightsOnDate {
    pub date: NaiveDate,
    /// asset -> weight
    pub weights: BTreeMap<String, Decimal>,
}
