//! Repository traits for the valuation records.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::assets::{Asset, Portfolio};
use crate::errors::Result;
use crate::market_data::{MarketDate, Price};
use crate::portfolio::quantity::Quantity;
use crate::portfolio::valuation::{PortfolioValue, Share, Weight};

/// Storage collaborator of the valuation pipeline.
///
/// Records are created once and never updated or deleted. Every `save_*`
/// call is an atomic batch: when any key of the batch already exists, or
/// repeats within the batch, nothing is written and
/// `DatabaseError::UniqueViolation` is returned. A record written by one
/// call must be visible to every read issued after that call returns.
#[async_trait]
pub trait ValuationRepositoryTrait: Send + Sync {
    async fn save_assets(&self, assets: &[Asset]) -> Result<()>;

    async fn save_portfolios(&self, portfolios: &[Portfolio]) -> Result<()>;

    async fn save_market_dates(&self, market_dates: &[MarketDate]) -> Result<()>;

    async fn save_prices(&self, prices: &[Price]) -> Result<()>;

    async fn save_quantities(&self, quantities: &[Quantity]) -> Result<()>;

    async fn save_shares(&self, shares: &[Share]) -> Result<()>;

    async fn save_portfolio_values(&self, values: &[PortfolioValue]) -> Result<()>;

    async fn save_weights(&self, weights: &[Weight]) -> Result<()>;

    /// Price of an asset on a date, `DatabaseError::NotFound` when absent.
    fn get_price(&self, asset: &str, date: NaiveDate) -> Result<Decimal>;

    fn get_quantity(&self, portfolio: &str, asset: &str, date: NaiveDate) -> Result<Quantity>;

    fn get_share(&self, portfolio: &str, asset: &str, date: NaiveDate) -> Result<Share>;

    fn get_portfolio_value(&self, portfolio: &str, date: NaiveDate) -> Result<PortfolioValue>;

    /// Assets ordered by name.
    fn list_assets(&self) -> Result<Vec<Asset>>;

    /// Portfolios ordered by name.
    fn list_portfolios(&self) -> Result<Vec<Portfolio>>;

    /// Trading dates in ascending order.
    fn list_market_dates(&self) -> Result<Vec<MarketDate>>;

    fn has_portfolios(&self) -> Result<bool>;

    /// Values of a portfolio ordered by date, within the optional inclusive bounds.
    fn get_portfolio_values(
        &self,
        portfolio: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PortfolioValue>>;

    /// Weights of a portfolio ordered by date then asset, within the optional inclusive bounds.
    fn get_weights(
        &self,
        portfolio: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Weight>>;
}
