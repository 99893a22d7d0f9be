//! Pipeline runs against the in-memory store.

use chrono::NaiveDate;
use portfolioviz_core::errors::{CalculatorError, DatabaseError, Error, PipelineError};
use portfolioviz_core::ingest::load_raw_portfolio_data;
use portfolioviz_core::portfolio::history::{ValuationHistoryService, ValuationHistoryServiceTrait};
use portfolioviz_core::portfolio::pipeline::{
    PipelineConfig, PipelineStage, RawPortfolioData, ValuationPipeline,
};
use portfolioviz_core::portfolio::quantity::NoTransactions;
use portfolioviz_core::portfolio::ValuationRepositoryTrait;
use portfolioviz_storage_memory::ValuationRepository;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

const PRICES: &str = "\
Dates,A,B
2020-01-01,10,20
2020-01-02,12,18
";

const WEIGHTS: &str = "\
Fecha,activos,P,Q
2020-01-01,A,0.6,0.25
2020-01-01,B,0.4,0.75
";

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
}

fn raw_input() -> RawPortfolioData {
    load_raw_portfolio_data(PRICES.as_bytes(), WEIGHTS.as_bytes(), dec!(1000)).unwrap()
}

/// Weights of a portfolio on one date, ordered by asset.
fn weights_on(repository: &ValuationRepository, portfolio: &str, date: NaiveDate) -> Vec<Decimal> {
    repository
        .get_weights(portfolio, Some(date), Some(date))
        .unwrap()
        .into_iter()
        .map(|weight| weight.amount)
        .collect()
}

fn pipeline(repository: Arc<ValuationRepository>) -> ValuationPipeline {
    ValuationPipeline::new(repository, Arc::new(NoTransactions), PipelineConfig::default())
}

#[tokio::test]
async fn test_scenario_from_csv_sheets() {
    let repository = Arc::new(ValuationRepository::new());
    let summary = pipeline(repository.clone()).run(&raw_input()).await.unwrap();

    assert_eq!(summary.stage, Some(PipelineStage::WeightsComputed));
    assert_eq!(summary.portfolios, 2);
    assert_eq!(summary.quantities, 8);
    assert_eq!(summary.portfolio_values, 4);

    assert_eq!(repository.get_quantity("P", "A", d(2)).unwrap().amount, dec!(60));
    assert_eq!(repository.get_quantity("P", "B", d(2)).unwrap().amount, dec!(20));
    assert_eq!(repository.get_share("P", "A", d(2)).unwrap().amount, dec!(720));
    assert_eq!(repository.get_share("P", "B", d(2)).unwrap().amount, dec!(360));
    assert_eq!(repository.get_portfolio_value("P", d(2)).unwrap().amount, dec!(1080));
    let weights = weights_on(&repository, "P", d(2));
    assert_eq!(weights[0].round_dp(4), dec!(0.6667));
    assert_eq!(weights[1].round_dp(4), dec!(0.3333));

    // Q: 250/10 = 25 units of A, 750/20 = 37.5 units of B
    assert_eq!(repository.get_quantity("Q", "B", d(1)).unwrap().amount, dec!(37.5));
    assert_eq!(repository.get_portfolio_value("Q", d(2)).unwrap().amount, dec!(975));
}

#[tokio::test]
async fn test_history_reads_completed_run() {
    let repository = Arc::new(ValuationRepository::new());
    pipeline(repository.clone()).run(&raw_input()).await.unwrap();

    let history = ValuationHistoryService::new(repository);
    let values = history.get_portfolio_values("P", None, None).unwrap();
    let amounts: Vec<Decimal> = values.iter().map(|v| v.amount).collect();
    assert_eq!(amounts, vec![dec!(1000), dec!(1080)]);

    let weights = history.get_weights_by_date("Q", Some(d(2)), None).unwrap();
    assert_eq!(weights.len(), 1);
    assert_eq!(weights[0].date, d(2));
    let total: Decimal = weights[0].weights.values().copied().sum();
    assert!((total - Decimal::ONE).abs() <= dec!(0.000000001));
}

#[tokio::test]
async fn test_second_run_on_same_store_is_rejected() {
    let repository = Arc::new(ValuationRepository::new());
    pipeline(repository.clone()).run(&raw_input()).await.unwrap();

    let err = pipeline(repository.clone())
        .run(&raw_input())
        .await
        .unwrap_err();

    match err {
        Error::Pipeline(PipelineError::StageFailed { stage, source }) => {
            assert_eq!(stage, PipelineStage::PricesLoaded);
            assert!(matches!(
                *source,
                Error::Database(DatabaseError::UniqueViolation(_))
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(repository.list_assets().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_stage_leaves_no_records_of_its_kind() {
    let prices = "Dates,A,B\n2020-01-01,10,0\n2020-01-02,12,18\n";
    let raw = load_raw_portfolio_data(prices.as_bytes(), WEIGHTS.as_bytes(), dec!(1000)).unwrap();
    let repository = Arc::new(ValuationRepository::new());
    let pipeline = pipeline(repository.clone());

    let mut run = pipeline.start_run(&raw);
    run.load_prices().await.unwrap();
    assert!(run.compute_quantities().await.is_err());
    assert_eq!(run.failed_stage(), Some(PipelineStage::QuantitiesComputed));

    assert!(repository.get_quantity("P", "A", d(1)).is_err());
    assert_eq!(repository.list_market_dates().unwrap().len(), 2);
}

#[tokio::test]
async fn test_out_of_range_weights_return_an_error() {
    let weights = "\
Fecha,activos,P
2020-01-01,A,50000000000000000000000000000
2020-01-01,B,50000000000000000000000000000
";
    let raw = load_raw_portfolio_data(PRICES.as_bytes(), weights.as_bytes(), dec!(1000)).unwrap();
    let repository = Arc::new(ValuationRepository::new());

    let err = pipeline(repository.clone()).run(&raw).await.unwrap_err();

    match err {
        Error::Pipeline(PipelineError::StageFailed { stage, source }) => {
            assert_eq!(stage, PipelineStage::QuantitiesComputed);
            assert!(matches!(
                *source,
                Error::Calculation(CalculatorError::Overflow(_))
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
