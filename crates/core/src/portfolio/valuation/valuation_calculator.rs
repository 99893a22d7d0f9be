use crate::errors::{CalculatorError, Result};
use crate::portfolio::{PortfolioDateKey, PositionKey};

use rust_decimal::Decimal;

/// Monetary value of a position: `price * quantity`.
pub fn calculate_share(key: &PositionKey, price: Decimal, quantity: Decimal) -> Result<Decimal> {
    price
        .checked_mul(quantity)
        .ok_or_else(|| CalculatorError::Overflow(format!("share for {}", key)).into())
}

/// Sum of the shares of every asset held by a portfolio on a date.
///
/// An empty asset set has no defined value and is rejected.
pub fn calculate_portfolio_value(key: &PortfolioDateKey, shares: &[Decimal]) -> Result<Decimal> {
    if shares.is_empty() {
        return Err(CalculatorError::EmptyAssetUniverse(key.clone()).into());
    }

    shares.iter().try_fold(Decimal::ZERO, |total, share| -> Result<Decimal> {
        total.checked_add(*share).ok_or_else(|| {
            CalculatorError::Overflow(format!("portfolio value for {}", key)).into()
        })
    })
}

/// Fraction of the portfolio value held in one position: `share / portfolio_value`.
pub fn calculate_weight(
    key: &PositionKey,
    share: Decimal,
    portfolio_value: Decimal,
) -> Result<Decimal> {
    if portfolio_value.is_zero() {
        return Err(CalculatorError::ZeroPortfolioValue(key.portfolio_date()).into());
    }

    share
        .checked_div(portfolio_value)
        .ok_or_else(|| CalculatorError::Overflow(format!("weight for {}", key)).into())
}

/// Whether `sum` equals one within `tolerance` (relative to one).
pub fn is_normalized(sum: Decimal, tolerance: Decimal) -> bool {
    (sum - Decimal::ONE).abs() <= tolerance
}

/// Sum of the weights of one portfolio/date, failing instead of overflowing.
pub fn sum_weights(key: &PortfolioDateKey, weights: &[Decimal]) -> Result<Decimal> {
    weights.iter().try_fold(Decimal::ZERO, |total, weight| -> Result<Decimal> {
        total.checked_add(*weight).ok_or_else(|| {
            CalculatorError::Overflow(format!("sum of weights for {}", key)).into()
        })
    })
}

/// Checks that the weights of one portfolio/date sum to one and returns the sum.
pub fn check_weight_normalization(
    key: &PortfolioDateKey,
    weights: &[Decimal],
    tolerance: Decimal,
) -> Result<Decimal> {
    let sum = sum_weights(key, weights)?;
    if is_normalized(sum, tolerance) {
        Ok(sum)
    } else {
        Err(CalculatorError::WeightsNotNormalized {
            key: key.clone(),
            sum,
        }
        .into())
    }
}
