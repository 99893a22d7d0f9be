use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use portfolioviz_core::assets::{Asset, Portfolio};
use portfolioviz_core::errors::Result;
use portfolioviz_core::market_data::{MarketDate, Price};
use portfolioviz_core::portfolio::quantity::Quantity;
use portfolioviz_core::portfolio::valuation::{PortfolioValue, Share, Weight};
use portfolioviz_core::portfolio::ValuationRepositoryTrait;

use crate::errors::StorageError;

type PositionRow = (String, String, NaiveDate);
type PortfolioDateRow = (String, NaiveDate);

#[derive(Default)]
struct StoreState {
    assets: BTreeMap<String, Asset>,
    portfolios: BTreeMap<String, Portfolio>,
    market_dates: BTreeMap<NaiveDate, MarketDate>,
    prices: BTreeMap<(String, NaiveDate), Price>,
    quantities: BTreeMap<PositionRow, Quantity>,
    shares: BTreeMap<PositionRow, Share>,
    portfolio_values: BTreeMap<PortfolioDateRow, PortfolioValue>,
    weights: BTreeMap<PositionRow, Weight>,
}

/// Inserts a batch of write-once records. Every key is checked against the
/// table and against the rest of the batch before anything is written.
fn insert_batch<K, V>(
    table: &mut BTreeMap<K, V>,
    kind: &'static str,
    rows: Vec<(K, V)>,
) -> std::result::Result<usize, StorageError>
where
    K: Ord + Clone + Debug,
{
    let mut batch_keys = BTreeSet::new();
    for (key, _) in &rows {
        if table.contains_key(key) || !batch_keys.insert(key) {
            return Err(StorageError::Duplicate {
                kind,
                key: format!("{:?}", key),
            });
        }
    }
    let count = rows.len();
    table.extend(rows);
    Ok(count)
}

fn lookup<K, V>(table: &BTreeMap<K, V>, kind: &'static str, key: &K) -> Result<V>
where
    K: Ord + Debug,
    V: Clone,
{
    table.get(key).cloned().ok_or_else(|| {
        StorageError::NotFound {
            kind,
            key: format!("{:?}", key),
        }
        .into()
    })
}

/// Range over the rows of one portfolio within optional inclusive date bounds.
fn portfolio_date_range(
    portfolio: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> (Bound<PortfolioDateRow>, Bound<PortfolioDateRow>) {
    let start = (
        portfolio.to_string(),
        start_date.unwrap_or(NaiveDate::MIN),
    );
    let end = (portfolio.to_string(), end_date.unwrap_or(NaiveDate::MAX));
    (Bound::Included(start), Bound::Included(end))
}

/// Repository for valuation records held in process memory.
pub struct ValuationRepository {
    state: RwLock<StoreState>,
}

impl Default for ValuationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuationRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    fn read(&self) -> std::result::Result<RwLockReadGuard<'_, StoreState>, StorageError> {
        self.state
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> std::result::Result<RwLockWriteGuard<'_, StoreState>, StorageError> {
        self.state
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn position_rows<T, F>(rows: &[T], key: F) -> Vec<(PositionRow, T)>
    where
        T: Clone,
        F: Fn(&T) -> PositionRow,
    {
        rows.iter().map(|row| (key(row), row.clone())).collect()
    }
}

#[async_trait]
impl ValuationRepositoryTrait for ValuationRepository {
    async fn save_assets(&self, assets: &[Asset]) -> Result<()> {
        let rows = assets.iter().map(|a| (a.name.clone(), a.clone())).collect();
        let count = insert_batch(&mut self.write()?.assets, "asset", rows)?;
        debug!("Saved {} assets", count);
        Ok(())
    }

    async fn save_portfolios(&self, portfolios: &[Portfolio]) -> Result<()> {
        let rows = portfolios
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect();
        let count = insert_batch(&mut self.write()?.portfolios, "portfolio", rows)?;
        debug!("Saved {} portfolios", count);
        Ok(())
    }

    async fn save_market_dates(&self, market_dates: &[MarketDate]) -> Result<()> {
        let rows = market_dates.iter().map(|d| (d.date, *d)).collect();
        let count = insert_batch(&mut self.write()?.market_dates, "market date", rows)?;
        debug!("Saved {} market dates", count);
        Ok(())
    }

    async fn save_prices(&self, prices: &[Price]) -> Result<()> {
        let rows = prices
            .iter()
            .map(|p| ((p.asset.clone(), p.date), p.clone()))
            .collect();
        let count = insert_batch(&mut self.write()?.prices, "price", rows)?;
        debug!("Saved {} prices", count);
        Ok(())
    }

    async fn save_quantities(&self, quantities: &[Quantity]) -> Result<()> {
        let rows = Self::position_rows(quantities, |q| {
            (q.portfolio.clone(), q.asset.clone(), q.date)
        });
        let count = insert_batch(&mut self.write()?.quantities, "quantity", rows)?;
        debug!("Saved {} quantities", count);
        Ok(())
    }

    async fn save_shares(&self, shares: &[Share]) -> Result<()> {
        let rows = Self::position_rows(shares, |s| (s.portfolio.clone(), s.asset.clone(), s.date));
        let count = insert_batch(&mut self.write()?.shares, "share", rows)?;
        debug!("Saved {} shares", count);
        Ok(())
    }

    async fn save_portfolio_values(&self, values: &[PortfolioValue]) -> Result<()> {
        let rows = values
            .iter()
            .map(|v| ((v.portfolio.clone(), v.date), v.clone()))
            .collect();
        let count = insert_batch(&mut self.write()?.portfolio_values, "portfolio value", rows)?;
        debug!("Saved {} portfolio values", count);
        Ok(())
    }

    async fn save_weights(&self, weights: &[Weight]) -> Result<()> {
        let rows = Self::position_rows(weights, |w| (w.portfolio.clone(), w.asset.clone(), w.date));
        let count = insert_batch(&mut self.write()?.weights, "weight", rows)?;
        debug!("Saved {} weights", count);
        Ok(())
    }

    fn get_price(&self, asset: &str, date: NaiveDate) -> Result<Decimal> {
        let state = self.read()?;
        lookup(&state.prices, "price", &(asset.to_string(), date)).map(|p| p.amount)
    }

    fn get_quantity(&self, portfolio: &str, asset: &str, date: NaiveDate) -> Result<Quantity> {
        let state = self.read()?;
        lookup(
            &state.quantities,
            "quantity",
            &(portfolio.to_string(), asset.to_string(), date),
        )
    }

    fn get_share(&self, portfolio: &str, asset: &str, date: NaiveDate) -> Result<Share> {
        let state = self.read()?;
        lookup(
            &state.shares,
            "share",
            &(portfolio.to_string(), asset.to_string(), date),
        )
    }

    fn get_portfolio_value(&self, portfolio: &str, date: NaiveDate) -> Result<PortfolioValue> {
        let state = self.read()?;
        lookup(
            &state.portfolio_values,
            "portfolio value",
            &(portfolio.to_string(), date),
        )
    }

    fn list_assets(&self) -> Result<Vec<Asset>> {
        Ok(self.read()?.assets.values().cloned().collect())
    }

    fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        Ok(self.read()?.portfolios.values().cloned().collect())
    }

    fn list_market_dates(&self) -> Result<Vec<MarketDate>> {
        Ok(self.read()?.market_dates.values().copied().collect())
    }

    fn has_portfolios(&self) -> Result<bool> {
        Ok(!self.read()?.portfolios.is_empty())
    }

    fn get_portfolio_values(
        &self,
        portfolio: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PortfolioValue>> {
        if matches!((start_date, end_date), (Some(start), Some(end)) if start > end) {
            return Ok(Vec::new());
        }
        let state = self.read()?;
        Ok(state
            .portfolio_values
            .range(portfolio_date_range(portfolio, start_date, end_date))
            .map(|(_, value)| value.clone())
            .collect())
    }

    fn get_weights(
        &self,
        portfolio: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Weight>> {
        let state = self.read()?;
        // Keys are (portfolio, asset, date); reorder to date then asset.
        let mut weights: Vec<Weight> = state
            .weights
            .range((portfolio.to_string(), String::new(), NaiveDate::MIN)..)
            .take_while(|((p, _, _), _)| p == portfolio)
            .filter(|(_, w)| start_date.map_or(true, |start| w.date >= start))
            .filter(|(_, w)| end_date.map_or(true, |end| w.date <= end))
            .map(|(_, w)| w.clone())
            .collect();
        weights.sort_by(|a, b| (a.date, &a.asset).cmp(&(b.date, &b.asset)));
        Ok(weights)
    }
}
