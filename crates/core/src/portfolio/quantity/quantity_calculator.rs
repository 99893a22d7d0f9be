use crate::errors::{CalculatorError, Result};
use crate::market_data::{MarketTimeline, PriceTable};
use crate::portfolio::quantity::{Quantity, TransactionSourceTrait};
use crate::portfolio::PositionKey;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Computes initial holdings from the initial allocation and rolls them
/// forward date by date.
#[derive(Clone)]
pub struct QuantityCalculator {
    transaction_source: Arc<dyn TransactionSourceTrait>,
}

impl QuantityCalculator {
    pub fn new(transaction_source: Arc<dyn TransactionSourceTrait>) -> Self {
        Self { transaction_source }
    }

    /// Units bought at the first trading date: `weight * value / price`.
    /// A zero or negative price fails instead of producing a meaningless holding.
    pub fn initial_quantity(
        key: &PositionKey,
        initial_weight: Decimal,
        initial_portfolio_value: Decimal,
        initial_price: Decimal,
    ) -> Result<Decimal> {
        if initial_price <= Decimal::ZERO {
            return Err(CalculatorError::DivisionByZeroPrice {
                key: key.clone(),
                price: initial_price,
            }
            .into());
        }

        let allocated = initial_weight
            .checked_mul(initial_portfolio_value)
            .ok_or_else(|| CalculatorError::Overflow(format!("allocated capital for {}", key)))?;
        allocated.checked_div(initial_price).ok_or_else(|| {
            CalculatorError::Overflow(format!("initial quantity for {}", key)).into()
        })
    }

    /// Holdings on a date given the previous date's holdings and the net
    /// transactions booked on that date.
    pub fn rollforward(previous_quantity: Decimal, net_transactions: Decimal) -> Result<Decimal> {
        previous_quantity.checked_add(net_transactions).ok_or_else(|| {
            CalculatorError::Overflow(format!(
                "rollforward of {} by {}",
                previous_quantity, net_transactions
            ))
            .into()
        })
    }

    /// Full quantity series of one (portfolio, asset) pair, in ascending date order.
    pub fn calculate_series(
        &self,
        portfolio: &str,
        asset: &str,
        initial_weight: Decimal,
        initial_portfolio_value: Decimal,
        prices: &PriceTable,
    ) -> Result<Vec<Quantity>> {
        let timeline = prices.timeline();
        let first_date = timeline.first();
        let first_key = PositionKey::new(portfolio, asset, first_date);
        let initial_price = prices.get(asset, first_date)?;
        let initial_amount = Self::initial_quantity(
            &first_key,
            initial_weight,
            initial_portfolio_value,
            initial_price,
        )?;

        debug!(
            "Initial quantity for {}: {} (weight {}, price {})",
            first_key, initial_amount, initial_weight, initial_price
        );

        let mut rollforward =
            QuantityRollforward::start(timeline, portfolio, asset, initial_amount);
        for date in timeline.all().skip(1) {
            let net_transactions = self
                .transaction_source
                .net_transactions(portfolio, asset, date)?;
            rollforward.advance(date, net_transactions)?;
        }

        Ok(rollforward.into_records())
    }
}

/// Left-to-right holdings recurrence for one (portfolio, asset) pair.
///
/// Each advance must target the immediate successor of the last computed date.
pub struct QuantityRollforward<'a> {
    timeline: &'a MarketTimeline,
    portfolio: String,
    asset: String,
    records: Vec<Quantity>,
}

impl<'a> QuantityRollforward<'a> {
    /// Seeds the series at the first timeline date.
    pub fn start(
        timeline: &'a MarketTimeline,
        portfolio: &str,
        asset: &str,
        initial_amount: Decimal,
    ) -> Self {
        let first = Quantity::new(
            PositionKey::new(portfolio, asset, timeline.first()),
            initial_amount,
        );
        let mut records = Vec::with_capacity(timeline.len());
        records.push(first);
        Self {
            timeline,
            portfolio: portfolio.to_string(),
            asset: asset.to_string(),
            records,
        }
    }

    pub fn last(&self) -> &Quantity {
        // The series is seeded on construction and only grows.
        &self.records[self.records.len() - 1]
    }

    /// Computes the holdings at `date` from the previous date's holdings.
    pub fn advance(&mut self, date: NaiveDate, net_transactions: Decimal) -> Result<&Quantity> {
        let previous = self.last();
        let expected = self.timeline.successor(previous.date)?;
        if expected != Some(date) {
            return Err(CalculatorError::OutOfOrderRollforward {
                key: PositionKey::new(&self.portfolio, &self.asset, date),
                expected: expected
                    .map(|next| next.to_string())
                    .unwrap_or_else(|| "none (series complete)".to_string()),
                actual: date,
            }
            .into());
        }

        let amount = QuantityCalculator::rollforward(previous.amount, net_transactions)?;
        self.records.push(Quantity::new(
            PositionKey::new(&self.portfolio, &self.asset, date),
            amount,
        ));
        Ok(self.last())
    }

    pub fn into_records(self) -> Vec<Quantity> {
        self.records
    }
}
