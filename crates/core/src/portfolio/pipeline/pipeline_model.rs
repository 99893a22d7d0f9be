//! Valuation pipeline models: raw input, configuration, stages and run summary.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::WEIGHT_TOLERANCE;
use crate::market_data::PriceGrid;

/// Initial allocation: (date, asset) -> (portfolio -> weight).
pub type InitialWeights = BTreeMap<(NaiveDate, String), BTreeMap<String, Decimal>>;

/// Already-parsed source data the pipeline derives everything from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPortfolioData {
    pub assets: Vec<String>,
    pub portfolios: Vec<String>,
    pub initial_weights: InitialWeights,
    pub prices: PriceGrid,
    pub dates: Vec<NaiveDate>,
    pub initial_date: NaiveDate,
    /// Assumed starting capital of every portfolio
    pub initial_value: Decimal,
}

impl RawPortfolioData {
    /// Weight of `asset` in `portfolio` at the initial date, if present.
    pub fn initial_weight(&self, portfolio: &str, asset: &str) -> Option<Decimal> {
        self.initial_weights
            .get(&(self.initial_date, asset.to_string()))
            .and_then(|column| column.get(portfolio))
            .copied()
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Fail the run when the weights of a portfolio/date do not sum to one
    pub strict_weight_check: bool,
    /// Relative tolerance of the weight normalization check
    pub weight_tolerance: Decimal,
    /// Fan each stage out over a thread pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict_weight_check: false,
            weight_tolerance: WEIGHT_TOLERANCE,
            parallel: true,
        }
    }
}

/// Ordered stages of a pipeline run. Each stage is a full barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Init,
    PricesLoaded,
    QuantitiesComputed,
    SharesAndValuesComputed,
    WeightsComputed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Init => "INIT",
            PipelineStage::PricesLoaded => "PRICES_LOADED",
            PipelineStage::QuantitiesComputed => "QUANTITIES_COMPUTED",
            PipelineStage::SharesAndValuesComputed => "SHARES_AND_VALUES_COMPUTED",
            PipelineStage::WeightsComputed => "WEIGHTS_COMPUTED",
        }
    }

    /// The stage that follows this one, `None` for the terminal stage.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Init => Some(PipelineStage::PricesLoaded),
            PipelineStage::PricesLoaded => Some(PipelineStage::QuantitiesComputed),
            PipelineStage::QuantitiesComputed => Some(PipelineStage::SharesAndValuesComputed),
            PipelineStage::SharesAndValuesComputed => Some(PipelineStage::WeightsComputed),
            PipelineStage::WeightsComputed => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record counts written by a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub stage: Option<PipelineStage>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub assets: usize,
    pub portfolios: usize,
    pub market_dates: usize,
    pub prices: usize,
    pub quantities: usize,
    pub shares: usize,
    pub portfolio_values: usize,
    pub weights: usize,
}
