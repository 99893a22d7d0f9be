//! Portfolio valuation domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::{PortfolioDateKey, PositionKey};

/// Monetary value of one position: price x quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub portfolio: String,
    pub asset: String,
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl Share {
    pub fn new(key: PositionKey, amount: Decimal) -> Self {
        Self {
            portfolio: key.portfolio,
            asset: key.asset,
            date: key.date,
            amount,
        }
    }
}

/// Total value of a portfolio on a date: the sum of its shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValue {
    pub portfolio: String,
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl PortfolioValue {
    pub fn new(key: PortfolioDateKey, amount: Decimal) -> Self {
        Self {
            portfolio: key.portfolio,
            date: key.date,
            amount,
        }
    }
}

/// Fraction of a portfolio's value held in one asset on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weight {
    pub portfolio: String,
    pub asset: String,
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl Weight {
    pub fn new(key: PositionKey, amount: Decimal) -> Self {
        Self {
            portfolio: key.portfolio,
            asset: key.asset,
            date: key.date,
            amount,
        }
    }
}
