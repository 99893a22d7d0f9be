//! Key tuples shared by the derived portfolio records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one position: a portfolio's holding of one asset on one trading date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionKey {
    pub portfolio: String,
    pub asset: String,
    pub date: NaiveDate,
}

impl PositionKey {
    pub fn new(portfolio: &str, asset: &str, date: NaiveDate) -> Self {
        Self {
            portfolio: portfolio.to_string(),
            asset: asset.to_string(),
            date,
        }
    }

    pub fn portfolio_date(&self) -> PortfolioDateKey {
        PortfolioDateKey::new(&self.portfolio, self.date)
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(portfolio '{}', asset '{}', date {})",
            self.portfolio, self.asset, self.date
        )
    }
}

/// Identifies one portfolio on one trading date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDateKey {
    pub portfolio: String,
    pub date: NaiveDate,
}

impl PortfolioDateKey {
    pub fn new(portfolio: &str, date: NaiveDate) -> Self {
        Self {
            portfolio: portfolio.to_string(),
            date,
        }
    }
}

impl fmt::Display for PortfolioDateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(portfolio '{}', date {})", self.portfolio, self.date)
    }
}
