use crate::assets::{Asset, Portfolio};
use crate::errors::{DatabaseError, Result};
use crate::portfolio::history::WeightsOnDate;
use crate::portfolio::valuation::PortfolioValue;
use crate::portfolio::ValuationRepositoryTrait;

use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read access to the records written by a completed pipeline run.
pub trait ValuationHistoryServiceTrait: Send + Sync {
    fn list_assets(&self) -> Result<Vec<Asset>>;

    fn list_portfolios(&self) -> Result<Vec<Portfolio>>;

    /// Values of a portfolio ordered by date. Missing bounds default to the
    /// first and last trading dates.
    fn get_portfolio_values(
        &self,
        portfolio: &str,
        start_date_opt: Option<NaiveDate>,
        end_date_opt: Option<NaiveDate>,
    ) -> Result<Vec<PortfolioValue>>;

    /// Weights of a portfolio grouped per date, ascending. Missing bounds
    /// default to the first and last trading dates.
    fn get_weights_by_date(
        &self,
        portfolio: &str,
        start_date_opt: Option<NaiveDate>,
        end_date_opt: Option<NaiveDate>,
    ) -> Result<Vec<WeightsOnDate>>;
}

#[derive(Clone)]
pub struct ValuationHistoryService {
    repository: Arc<dyn ValuationRepositoryTrait>,
}

impl ValuationHistoryService {
    pub fn new(repository: Arc<dyn ValuationRepositoryTrait>) -> Self {
        Self { repository }
    }

    fn ensure_portfolio(&self, portfolio: &str) -> Result<()> {
        let known = self
            .repository
            .list_portfolios()?
            .iter()
            .any(|p| p.name == portfolio);
        if known {
            Ok(())
        } else {
            Err(DatabaseError::NotFound(format!("portfolio '{}'", portfolio)).into())
        }
    }

    /// Fills missing bounds with the timeline edges.
    fn resolve_range(
        &self,
        start_date_opt: Option<NaiveDate>,
        end_date_opt: Option<NaiveDate>,
    ) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        if start_date_opt.is_some() && end_date_opt.is_some() {
            return Ok((start_date_opt, end_date_opt));
        }
        let market_dates = self.repository.list_market_dates()?;
        let first = market_dates.first().map(|d| d.date);
        let last = market_dates.last().map(|d| d.date);
        Ok((start_date_opt.or(first), end_date_opt.or(last)))
    }
}

impl ValuationHistoryServiceTrait for ValuationHistoryService {
    fn list_assets(&self) -> Result<Vec<Asset>> {
        self.repository.list_assets()
    }

    fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        self.repository.list_portfolios()
    }

    fn get_portfolio_values(
        &self,
        portfolio: &str,
        start_date_opt: Option<NaiveDate>,
        end_date_opt: Option<NaiveDate>,
    ) -> Result<Vec<PortfolioValue>> {
        self.ensure_portfolio(portfolio)?;
        let (start, end) = self.resolve_range(start_date_opt, end_date_opt)?;
        debug!(
            "Loading portfolio values for '{}' from {:?} to {:?}",
            portfolio, start, end
        );
        self.repository.get_portfolio_values(portfolio, start, end)
    }

    fn get_weights_by_date(
        &self,
        portfolio: &str,
        start_date_opt: Option<NaiveDate>,
        end_date_opt: Option<NaiveDate>,
    ) -> Result<Vec<WeightsOnDate>> {
        self.ensure_portfolio(portfolio)?;
        let (start, end) = self.resolve_range(start_date_opt, end_date_opt)?;
        debug!(
            "Loading weights for '{}' from {:?} to {:?}",
            portfolio, start, end
        );

        let mut by_date: BTreeMap<NaiveDate, BTreeMap<String, _>> = BTreeMap::new();
        for weight in self.repository.get_weights(portfolio, start, end)? {
            by_date
                .entry(weight.date)
                .or_default()
                .insert(weight.asset, weight.amount);
        }

        Ok(by_date
            .into_iter()
            .map(|(date, weights)| WeightsOnDate { date, weights })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::market_data::MarketDate;
    use crate::portfolio::mock_repository::MockValuationRepository;
    use crate::portfolio::valuation::Weight;
    use crate::portfolio::{PortfolioDateKey, PositionKey};
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    async fn seeded_repository() -> Arc<MockValuationRepository> {
        let repository = Arc::new(MockValuationRepository::new());
        repository
            .save_portfolios(&[Portfolio::new("P")])
            .await
            .unwrap();
        repository
            .save_assets(&[Asset::new("B"), Asset::new("A")])
            .await
            .unwrap();
        repository
            .save_market_dates(&[
                MarketDate {
                    date: d(1),
                    next_date: Some(d(2)),
                },
                MarketDate {
                    date: d(2),
                    next_date: Some(d(3)),
                },
                MarketDate {
                    date: d(3),
                    next_date: None,
                },
            ])
            .await
            .unwrap();
        repository
            .save_portfolio_values(&[
                PortfolioValue::new(PortfolioDateKey::new("P", d(1)), dec!(1000)),
                PortfolioValue::new(PortfolioDateKey::new("P", d(2)), dec!(1080)),
                PortfolioValue::new(PortfolioDateKey::new("P", d(3)), dec!(1040)),
            ])
            .await
            .unwrap();
        repository
            .save_weights(&[
                Weight::new(PositionKey::new("P", "A", d(1)), dec!(0.6)),
                Weight::new(PositionKey::new("P", "B", d(1)), dec!(0.4)),
                Weight::new(PositionKey::new("P", "A", d(2)), dec!(0.6667)),
                Weight::new(PositionKey::new("P", "B", d(2)), dec!(0.3333)),
            ])
            .await
            .unwrap();
        repository
    }

    #[tokio::test]
    async fn test_values_default_to_full_timeline() {
        let service = ValuationHistoryService::new(seeded_repository().await);
        let values = service.get_portfolio_values("P", None, None).unwrap();
        let dates: Vec<_> = values.iter().map(|v| v.date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3)]);
    }

    #[tokio::test]
    async fn test_values_respect_inclusive_bounds() {
        let service = ValuationHistoryService::new(seeded_repository().await);
        let values = service.get_portfolio_values("P", Some(d(2)), None).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].amount, dec!(1080));

        let values = service.get_portfolio_values("P", Some(d(2)), Some(d(2))).unwrap();
        assert_eq!(values.len(), 1);
    }

    #[tokio::test]
    async fn test_weights_are_grouped_by_date() {
        let service = ValuationHistoryService::new(seeded_repository().await);
        let grouped = service.get_weights_by_date("P", None, Some(d(2))).unwrap();

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].date, d(1));
        assert_eq!(grouped[0].weights["A"], dec!(0.6));
        assert_eq!(grouped[1].weights["B"], dec!(0.3333));
    }

    #[tokio::test]
    async fn test_unknown_portfolio_is_not_found() {
        let service = ValuationHistoryService::new(seeded_repository().await);
        assert!(matches!(
            service.get_weights_by_date("Q", None, None),
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_listings_are_sorted() {
        let service = ValuationHistoryService::new(seeded_repository().await);
        let assets: Vec<_> = service.list_assets().unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(assets, vec!["A", "B"]);
        assert_eq!(service.list_portfolios().unwrap(), vec![Portfolio::new("P")]);
    }
}
