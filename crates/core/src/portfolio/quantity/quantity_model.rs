//! Holdings domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::PositionKey;

/// Units of an asset held by a portfolio on a trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    pub portfolio: String,
    pub asset: String,
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl Quantity {
    pub fn new(key: PositionKey, amount: Decimal) -> Self {
        Self {
            portfolio: key.portfolio,
            asset: key.asset,
            date: key.date,
            amount,
        }
    }
}
