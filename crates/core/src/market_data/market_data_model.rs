//! Market data domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A trading date as persisted, carrying its successor on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDate {
    pub date: NaiveDate,
    /// Next trading date, `None` for the last date of the timeline
    pub next_date: Option<NaiveDate>,
}

/// Closing price of one asset on one trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub asset: String,
    pub date: NaiveDate,
    pub amount: Decimal,
}
