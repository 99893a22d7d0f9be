use crate::assets::{Asset, Portfolio};
use crate::errors::{CalculatorError, DatabaseError, Error, PipelineError, Result};
use crate::market_data::{MarketTimeline, PriceTable};
use crate::portfolio::pipeline::{
    PipelineConfig, PipelineStage, PipelineSummary, RawPortfolioData,
};
use crate::portfolio::quantity::{QuantityCalculator, TransactionSourceTrait};
use crate::portfolio::valuation::{
    calculate_portfolio_value, calculate_share, calculate_weight, check_weight_normalization,
    sum_weights, PortfolioValue, Share, Weight,
};
use crate::portfolio::{PortfolioDateKey, PositionKey, ValuationRepositoryTrait};

use chrono::NaiveDate;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Derives quantities, shares, portfolio values and weights from raw prices
/// and an initial allocation, persisting every record through the repository.
#[derive(Clone)]
pub struct ValuationPipeline {
    repository: Arc<dyn ValuationRepositoryTrait>,
    quantity_calculator: QuantityCalculator,
    config: PipelineConfig,
}

impl ValuationPipeline {
    pub fn new(
        repository: Arc<dyn ValuationRepositoryTrait>,
        transaction_source: Arc<dyn TransactionSourceTrait>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            repository,
            quantity_calculator: QuantityCalculator::new(transaction_source),
            config,
        }
    }

    /// Starts a run at INIT. Stages must then be driven in order.
    pub fn start_run<'a>(&'a self, raw: &'a RawPortfolioData) -> PipelineRun<'a> {
        PipelineRun {
            pipeline: self,
            raw,
            stage: PipelineStage::Init,
            failed_stage: None,
            prices: None,
            summary: PipelineSummary::default(),
        }
    }

    /// Runs every stage to completion, failing fast on the first error.
    pub async fn run(&self, raw: &RawPortfolioData) -> Result<PipelineSummary> {
        let total_start_time = Instant::now();
        info!(
            "Starting valuation pipeline: {} portfolios, {} assets, {} dates",
            raw.portfolios.len(),
            raw.assets.len(),
            raw.dates.len()
        );

        let mut run = self.start_run(raw);
        run.load_prices().await?;
        run.compute_quantities().await?;
        run.compute_shares_and_values().await?;
        run.compute_weights().await?;

        info!(
            "Valuation pipeline completed in {:?}",
            total_start_time.elapsed()
        );
        Ok(run.summary())
    }

    /// Maps `f` over the units of a stage, in parallel when configured.
    /// Output order follows input order.
    fn map_units<T, R, F>(&self, units: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        if self.config.parallel {
            units.par_iter().map(f).collect()
        } else {
            units.iter().map(f).collect()
        }
    }
}

/// One pass of the pipeline over a raw input.
///
/// Stage methods must be called in order. Each stage computes all its
/// records before writing them, so a failing stage writes nothing. After a
/// failure the run is dead; a new run must start from INIT.
pub struct PipelineRun<'a> {
    pipeline: &'a ValuationPipeline,
    raw: &'a RawPortfolioData,
    stage: PipelineStage,
    failed_stage: Option<PipelineStage>,
    prices: Option<PriceTable>,
    summary: PipelineSummary,
}

impl<'a> PipelineRun<'a> {
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn failed_stage(&self) -> Option<PipelineStage> {
        self.failed_stage
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            stage: Some(self.stage),
            ..self.summary.clone()
        }
    }

    /// INIT -> PRICES_LOADED: validates the raw input, builds the timeline and
    /// the price table, and persists assets, portfolios, trading dates and prices.
    pub async fn load_prices(&mut self) -> Result<()> {
        let target = PipelineStage::PricesLoaded;
        self.enter(target)?;
        let started = Instant::now();
        debug!("Loading market prices");

        match self.persist_prices().await {
            Ok(table) => {
                self.prices = Some(table);
                self.complete(target, started);
                Ok(())
            }
            Err(e) => Err(self.fail(target, e)),
        }
    }

    /// PRICES_LOADED -> QUANTITIES_COMPUTED: initial holdings at the first date,
    /// then the rollforward through every later date, per (portfolio, asset).
    pub async fn compute_quantities(&mut self) -> Result<()> {
        let target = PipelineStage::QuantitiesComputed;
        self.enter(target)?;
        let started = Instant::now();
        debug!("Calculating initial quantities and rolling them forward");

        match self.persist_quantities().await {
            Ok(count) => {
                self.summary.quantities = count;
                self.complete(target, started);
                Ok(())
            }
            Err(e) => Err(self.fail(target, e)),
        }
    }

    /// QUANTITIES_COMPUTED -> SHARES_AND_VALUES_COMPUTED: shares of every asset,
    /// then their sum, per (portfolio, date).
    pub async fn compute_shares_and_values(&mut self) -> Result<()> {
        let target = PipelineStage::SharesAndValuesComputed;
        self.enter(target)?;
        let started = Instant::now();
        debug!("Calculating shares and portfolio values");

        match self.persist_shares_and_values().await {
            Ok((shares, values)) => {
                self.summary.shares = shares;
                self.summary.portfolio_values = values;
                self.complete(target, started);
                Ok(())
            }
            Err(e) => Err(self.fail(target, e)),
        }
    }

    /// SHARES_AND_VALUES_COMPUTED -> WEIGHTS_COMPUTED: weights from the
    /// persisted shares and portfolio values.
    pub async fn compute_weights(&mut self) -> Result<()> {
        let target = PipelineStage::WeightsComputed;
        self.enter(target)?;
        let started = Instant::now();
        debug!("Calculating asset weights");

        match self.persist_weights().await {
            Ok(count) => {
                self.summary.weights = count;
                self.complete(target, started);
                Ok(())
            }
            Err(e) => Err(self.fail(target, e)),
        }
    }

    fn enter(&self, target: PipelineStage) -> Result<()> {
        if let Some(failed_stage) = self.failed_stage {
            return Err(PipelineError::RunAborted { failed_stage }.into());
        }
        if self.stage.next() != Some(target) {
            return Err(PipelineError::InvalidTransition {
                from: self.stage,
                to: target,
            }
            .into());
        }
        Ok(())
    }

    fn complete(&mut self, target: PipelineStage, started: Instant) {
        info!("Pipeline reached {} in {:?}", target, started.elapsed());
        self.stage = target;
    }

    fn fail(&mut self, target: PipelineStage, source: Error) -> Error {
        error!(
            "Pipeline halted at {} while entering {}: {}",
            self.stage, target, source
        );
        self.failed_stage = Some(target);
        PipelineError::StageFailed {
            stage: target,
            source: Box::new(source),
        }
        .into()
    }

    fn price_table(&self) -> Result<&PriceTable> {
        self.prices.as_ref().ok_or_else(|| {
            Error::Unexpected("price table accessed before PRICES_LOADED".to_string())
        })
    }

    /// (portfolio, date) units in portfolio-major order.
    fn portfolio_dates(&self, timeline: &MarketTimeline) -> Vec<PortfolioDateKey> {
        self.raw
            .portfolios
            .iter()
            .flat_map(|portfolio| {
                timeline
                    .all()
                    .map(move |date| PortfolioDateKey::new(portfolio, date))
            })
            .collect()
    }

    async fn persist_prices(&mut self) -> Result<PriceTable> {
        validate_raw_input(self.raw)?;
        let timeline = MarketTimeline::load(&self.raw.dates)?;
        let table = PriceTable::from_grid(&timeline, &self.raw.assets, &self.raw.prices)?;

        let assets: Vec<Asset> = self.raw.assets.iter().map(Asset::new).collect();
        let portfolios: Vec<Portfolio> = self.raw.portfolios.iter().map(Portfolio::new).collect();
        let market_dates = timeline.market_dates();
        let prices = table.records();

        let repository = &self.pipeline.repository;
        if repository.has_portfolios()? {
            return Err(DatabaseError::UniqueViolation(
                "store already holds the portfolios of an earlier run".to_string(),
            )
            .into());
        }
        repository.save_assets(&assets).await?;
        repository.save_portfolios(&portfolios).await?;
        repository.save_market_dates(&market_dates).await?;
        repository.save_prices(&prices).await?;

        self.summary.assets = assets.len();
        self.summary.portfolios = portfolios.len();
        self.summary.market_dates = market_dates.len();
        self.summary.prices = prices.len();
        self.summary.first_date = Some(timeline.first());
        self.summary.last_date = Some(timeline.last());

        Ok(table)
    }

    async fn persist_quantities(&self) -> Result<usize> {
        let prices = self.price_table()?;
        let first_date = prices.timeline().first();
        check_initial_allocation(self.raw)?;

        let mut pairs: Vec<(&str, &str, Decimal)> =
            Vec::with_capacity(self.raw.portfolios.len() * self.raw.assets.len());
        for portfolio in &self.raw.portfolios {
            for asset in &self.raw.assets {
                let weight = self.raw.initial_weight(portfolio, asset).ok_or_else(|| {
                    CalculatorError::MissingInitialWeight {
                        portfolio: portfolio.clone(),
                        asset: asset.clone(),
                        date: first_date,
                    }
                })?;
                pairs.push((portfolio.as_str(), asset.as_str(), weight));
            }
        }

        let calculator = &self.pipeline.quantity_calculator;
        let initial_value = self.raw.initial_value;
        let series = self.pipeline.map_units(&pairs, |(portfolio, asset, weight)| {
            calculator.calculate_series(portfolio, asset, *weight, initial_value, prices)
        })?;

        let quantities: Vec<_> = series.into_iter().flatten().collect();
        self.pipeline.repository.save_quantities(&quantities).await?;
        Ok(quantities.len())
    }

    async fn persist_shares_and_values(&self) -> Result<(usize, usize)> {
        let prices = self.price_table()?;
        let units = self.portfolio_dates(prices.timeline());
        let repository = &self.pipeline.repository;
        let assets = &self.raw.assets;

        // The value of a (portfolio, date) waits on the shares of all its assets.
        let valued = self.pipeline.map_units(&units, |key| {
            let mut shares = Vec::with_capacity(assets.len());
            for asset in assets {
                let position = PositionKey::new(&key.portfolio, asset, key.date);
                let price = repository.get_price(asset, key.date)?;
                let quantity = repository.get_quantity(&key.portfolio, asset, key.date)?;
                let amount = calculate_share(&position, price, quantity.amount)?;
                shares.push(Share::new(position, amount));
            }
            let amounts: Vec<Decimal> = shares.iter().map(|share| share.amount).collect();
            let value = calculate_portfolio_value(key, &amounts)?;
            Ok((shares, PortfolioValue::new(key.clone(), value)))
        })?;

        let mut shares = Vec::with_capacity(units.len() * assets.len());
        let mut values = Vec::with_capacity(units.len());
        for (unit_shares, value) in valued {
            shares.extend(unit_shares);
            values.push(value);
        }

        repository.save_shares(&shares).await?;
        repository.save_portfolio_values(&values).await?;
        Ok((shares.len(), values.len()))
    }

    async fn persist_weights(&self) -> Result<usize> {
        let prices = self.price_table()?;
        let units = self.portfolio_dates(prices.timeline());
        let repository = &self.pipeline.repository;
        let assets = &self.raw.assets;
        let config = &self.pipeline.config;

        let weighted = self.pipeline.map_units(&units, |key| {
            let value = repository.get_portfolio_value(&key.portfolio, key.date)?;
            let mut weights = Vec::with_capacity(assets.len());
            for asset in assets {
                let position = PositionKey::new(&key.portfolio, asset, key.date);
                let share = repository.get_share(&key.portfolio, asset, key.date)?;
                let amount = calculate_weight(&position, share.amount, value.amount)?;
                weights.push(Weight::new(position, amount));
            }
            check_unit_normalization(key, &weights, config)?;
            Ok(weights)
        })?;

        let weights: Vec<Weight> = weighted.into_iter().flatten().collect();
        repository.save_weights(&weights).await?;
        Ok(weights.len())
    }
}

fn check_unit_normalization(
    key: &PortfolioDateKey,
    weights: &[Weight],
    config: &PipelineConfig,
) -> Result<()> {
    let amounts: Vec<Decimal> = weights.iter().map(|weight| weight.amount).collect();
    match check_weight_normalization(key, &amounts, config.weight_tolerance) {
        Ok(_) => Ok(()),
        Err(Error::Calculation(CalculatorError::WeightsNotNormalized { sum, .. }))
            if !config.strict_weight_check =>
        {
            warn!("Weights for {} sum to {}, outside tolerance", key, sum);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Sums the initial weights of every portfolio, warning when one does not
/// allocate exactly the initial value.
fn check_initial_allocation(raw: &RawPortfolioData) -> Result<()> {
    for portfolio in &raw.portfolios {
        let key = PortfolioDateKey::new(portfolio, raw.initial_date);
        let weights: Vec<Decimal> = raw
            .assets
            .iter()
            .filter_map(|asset| raw.initial_weight(portfolio, asset))
            .collect();
        let total = sum_weights(&key, &weights)?;
        if total != Decimal::ONE {
            warn!(
                "Initial weights of portfolio '{}' sum to {}; its first-date value will differ \
                 from the initial value",
                portfolio, total
            );
        }
    }
    Ok(())
}

/// Checks the shape of the raw input before anything is derived from it.
pub fn validate_raw_input(raw: &RawPortfolioData) -> Result<()> {
    let malformed = |reason: String| -> Error { PipelineError::MalformedInput(reason).into() };

    if raw.assets.is_empty() {
        return Err(malformed("asset list is empty".to_string()));
    }
    if raw.portfolios.is_empty() {
        return Err(malformed("portfolio list is empty".to_string()));
    }
    if raw.dates.is_empty() {
        return Err(malformed("date list is empty".to_string()));
    }

    let mut seen_assets = HashSet::new();
    if let Some(duplicate) = raw.assets.iter().find(|asset| !seen_assets.insert(*asset)) {
        return Err(malformed(format!("asset '{}' is listed twice", duplicate)));
    }
    let mut seen_portfolios = HashSet::new();
    if let Some(duplicate) = raw
        .portfolios
        .iter()
        .find(|portfolio| !seen_portfolios.insert(*portfolio))
    {
        return Err(malformed(format!("portfolio '{}' is listed twice", duplicate)));
    }

    let dates: HashSet<NaiveDate> = raw.dates.iter().copied().collect();
    if let Some(date) = raw.dates.iter().find(|date| !raw.prices.contains_key(*date)) {
        return Err(malformed(format!("no price row for trading date {}", date)));
    }
    for (date, row) in &raw.prices {
        if !dates.contains(date) {
            return Err(malformed(format!(
                "price row for {} is not a trading date",
                date
            )));
        }
        if let Some(asset) = row.keys().find(|asset| !seen_assets.contains(asset)) {
            return Err(malformed(format!(
                "price row for {} names unknown asset '{}'",
                date, asset
            )));
        }
    }

    if raw.initial_date != raw.dates[0] {
        return Err(malformed(format!(
            "initial date {} is not the first trading date {}",
            raw.initial_date, raw.dates[0]
        )));
    }

    Ok(())
}
