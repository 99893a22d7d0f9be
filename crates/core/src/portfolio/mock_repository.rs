//! In-crate repository mock used by the pipeline and history tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::assets::{Asset, Portfolio};
use crate::errors::{DatabaseError, Error, Result};
use crate::market_data::{MarketDate, Price};
use crate::portfolio::quantity::Quantity;
use crate::portfolio::valuation::{PortfolioValue, Share, Weight};
use crate::portfolio::ValuationRepositoryTrait;

type PositionKey = (String, String, NaiveDate);

#[derive(Default)]
struct MockState {
    assets: Vec<Asset>,
    portfolios: Vec<Portfolio>,
    market_dates: Vec<MarketDate>,
    prices: BTreeMap<(String, NaiveDate), Decimal>,
    quantities: BTreeMap<PositionKey, Quantity>,
    shares: BTreeMap<PositionKey, Share>,
    values: BTreeMap<(String, NaiveDate), PortfolioValue>,
    weights: BTreeMap<PositionKey, Weight>,
}

#[derive(Default)]
pub struct MockValuationRepository {
    state: RwLock<MockState>,
    pub fail_on_save_weights: bool,
}

impl MockValuationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_weights() -> Self {
        Self {
            fail_on_save_weights: true,
            ..Self::default()
        }
    }

    pub fn quantity_count(&self) -> usize {
        self.state.read().unwrap().quantities.len()
    }

    pub fn weight(&self, portfolio: &str, asset: &str, date: NaiveDate) -> Decimal {
        let key = (portfolio.to_string(), asset.to_string(), date);
        self.state.read().unwrap().weights[&key].amount
    }

    pub fn weight_count(&self) -> usize {
        self.state.read().unwrap().weights.len()
    }
}

fn not_found(what: String) -> Error {
    Error::Database(DatabaseError::NotFound(what))
}

#[async_trait]
impl ValuationRepositoryTrait for MockValuationRepository {
    async fn save_assets(&self, assets: &[Asset]) -> Result<()> {
        self.state.write().unwrap().assets.extend_from_slice(assets);
        Ok(())
    }

    async fn save_portfolios(&self, portfolios: &[Portfolio]) -> Result<()> {
        self.state.write().unwrap().portfolios.extend_from_slice(portfolios);
        Ok(())
    }

    async fn save_market_dates(&self, market_dates: &[MarketDate]) -> Result<()> {
        self.state.write().unwrap().market_dates.extend_from_slice(market_dates);
        Ok(())
    }

    async fn save_prices(&self, prices: &[Price]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        for price in prices {
            state.prices.insert((price.asset.clone(), price.date), price.amount);
        }
        Ok(())
    }

    async fn save_quantities(&self, quantities: &[Quantity]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        for q in quantities {
            state
                .quantities
                .insert((q.portfolio.clone(), q.asset.clone(), q.date), q.clone());
        }
        Ok(())
    }

    async fn save_shares(&self, shares: &[Share]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        for s in shares {
            state
                .shares
                .insert((s.portfolio.clone(), s.asset.clone(), s.date), s.clone());
        }
        Ok(())
    }

    async fn save_portfolio_values(&self, values: &[PortfolioValue]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        for v in values {
            state.values.insert((v.portfolio.clone(), v.date), v.clone());
        }
        Ok(())
    }

    async fn save_weights(&self, weights: &[Weight]) -> Result<()> {
        if self.fail_on_save_weights {
            return Err(DatabaseError::Internal("weights table is read-only".to_string()).into());
        }
        let mut state = self.state.write().unwrap();
        for w in weights {
            state
                .weights
                .insert((w.portfolio.clone(), w.asset.clone(), w.date), w.clone());
        }
        Ok(())
    }

    fn get_price(&self, asset: &str, date: NaiveDate) -> Result<Decimal> {
        self.state
            .read()
            .unwrap()
            .prices
            .get(&(asset.to_string(), date))
            .copied()
            .ok_or_else(|| not_found(format!("price {} {}", asset, date)))
    }

    fn get_quantity(&self, portfolio: &str, asset: &str, date: NaiveDate) -> Result<Quantity> {
        self.state
            .read()
            .unwrap()
            .quantities
            .get(&(portfolio.to_string(), asset.to_string(), date))
            .cloned()
            .ok_or_else(|| not_found(format!("quantity {} {} {}", portfolio, asset, date)))
    }

    fn get_share(&self, portfolio: &str, asset: &str, date: NaiveDate) -> Result<Share> {
        self.state
            .read()
            .unwrap()
            .shares
            .get(&(portfolio.to_string(), asset.to_string(), date))
            .cloned()
            .ok_or_else(|| not_found(format!("share {} {} {}", portfolio, asset, date)))
    }

    fn get_portfolio_value(&self, portfolio: &str, date: NaiveDate) -> Result<PortfolioValue> {
        self.state
            .read()
            .unwrap()
            .values
            .get(&(portfolio.to_string(), date))
            .cloned()
            .ok_or_else(|| not_found(format!("portfolio value {} {}", portfolio, date)))
    }

    fn list_assets(&self) -> Result<Vec<Asset>> {
        let mut assets = self.state.read().unwrap().assets.clone();
        assets.sort();
        Ok(assets)
    }

    fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        let mut portfolios = self.state.read().unwrap().portfolios.clone();
        portfolios.sort();
        Ok(portfolios)
    }

    fn list_market_dates(&self) -> Result<Vec<MarketDate>> {
        let mut dates = self.state.read().unwrap().market_dates.clone();
        dates.sort_by_key(|d| d.date);
        Ok(dates)
    }

    fn has_portfolios(&self) -> Result<bool> {
        Ok(!self.state.read().unwrap().portfolios.is_empty())
    }

    fn get_portfolio_values(
        &self,
        portfolio: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PortfolioValue>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .values
            .values()
            .filter(|v| v.portfolio == portfolio)
            .filter(|v| start_date.map_or(true, |start| v.date >= start))
            .filter(|v| end_date.map_or(true, |end| v.date <= end))
            .cloned()
            .collect())
    }

    fn get_weights(
        &self,
        portfolio: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Weight>> {
        let mut weights: Vec<Weight> = self
            .state
            .read()
            .unwrap()
            .weights
            .values()
            .filter(|w| w.portfolio == portfolio)
            .filter(|w| start_date.map_or(true, |start| w.date >= start))
            .filter(|w| end_date.map_or(true, |end| w.date <= end))
            .cloned()
            .collect();
        weights.sort_by(|a, b| (a.date, &a.asset).cmp(&(b.date, &b.asset)));
        Ok(weights)
    }
}
