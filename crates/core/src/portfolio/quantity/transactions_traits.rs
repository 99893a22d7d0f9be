//! Source of period-over-period holdings changes.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::Result;

/// Supplies the net units bought (positive) or sold (negative) by a portfolio
/// in an asset on a trading date. The rollforward adds this amount to the
/// previous date's holdings.
pub trait TransactionSourceTrait: Send + Sync {
    fn net_transactions(&self, portfolio: &str, asset: &str, date: NaiveDate) -> Result<Decimal>;
}

/// Default source: no transactions are modeled, so holdings stay flat after
/// the initial allocation. Replace it with a ledger-backed source to model
/// inflows and outflows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransactions;

impl TransactionSourceTrait for NoTransactions {
    fn net_transactions(
        &self,
        _portfolio: &str,
        _asset: &str,
        _date: NaiveDate,
    ) -> Result<Decimal> {
        Ok(Decimal::ZERO)
    }
}
