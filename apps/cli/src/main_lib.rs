use std::fs::File;
use std::sync::Arc;

use anyhow::Context;
use portfolioviz_core::constants::DECIMAL_PRECISION;
use portfolioviz_core::ingest::load_raw_portfolio_data;
use portfolioviz_core::portfolio::history::{
    ValuationHistoryService, ValuationHistoryServiceTrait, WeightsOnDate,
};
use portfolioviz_core::portfolio::pipeline::{PipelineConfig, PipelineSummary, ValuationPipeline};
use portfolioviz_core::portfolio::quantity::NoTransactions;
use portfolioviz_core::portfolio::valuation::PortfolioValue;
use portfolioviz_core::utils::time_utils::format_date;
use portfolioviz_storage_memory::ValuationRepository;
use serde::Serialize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub fn init_tracing() {
    let log_format = std::env::var("PV_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Valuation history of one portfolio, as exported.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReport {
    pub portfolio: String,
    pub values: Vec<PortfolioValue>,
    pub weights: Vec<WeightsOnDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationReport {
    pub summary: PipelineSummary,
    pub portfolios: Vec<PortfolioReport>,
}

fn pipeline_config(config: &Config) -> PipelineConfig {
    PipelineConfig {
        strict_weight_check: config.strict_weights,
        parallel: !config.sequential,
        ..PipelineConfig::default()
    }
}

/// Loads the sheets, runs the pipeline into a fresh store and collects the
/// history of every portfolio within the configured window.
pub async fn run(config: &Config) -> anyhow::Result<ValuationReport> {
    let prices = File::open(&config.prices_csv)
        .with_context(|| format!("opening {}", config.prices_csv.display()))?;
    let weights = File::open(&config.weights_csv)
        .with_context(|| format!("opening {}", config.weights_csv.display()))?;
    let raw = load_raw_portfolio_data(prices, weights, config.initial_value)?;

    let repository = Arc::new(ValuationRepository::new());
    let pipeline = ValuationPipeline::new(
        repository.clone(),
        Arc::new(NoTransactions),
        pipeline_config(config),
    );
    let summary = pipeline.run(&raw).await?;
    tracing::info!(
        "Valued {} portfolios over {} dates: {} weights written",
        summary.portfolios,
        summary.market_dates,
        summary.weights
    );

    let history = ValuationHistoryService::new(repository);
    let mut portfolios = Vec::new();
    for portfolio in history.list_portfolios()? {
        let values = history
            .get_portfolio_values(&portfolio.name, config.from, config.to)?
            .into_iter()
            .map(|mut value| {
                value.amount = value.amount.round_dp(DECIMAL_PRECISION);
                value
            })
            .collect();
        let weights = history
            .get_weights_by_date(&portfolio.name, config.from, config.to)?
            .into_iter()
            .map(|mut on_date| {
                for amount in on_date.weights.values_mut() {
                    *amount = amount.round_dp(DECIMAL_PRECISION);
                }
                on_date
            })
            .collect();
        portfolios.push(PortfolioReport {
            portfolio: portfolio.name,
            values,
            weights,
        });
    }

    Ok(ValuationReport {
        summary,
        portfolios,
    })
}

pub fn write_report(config: &Config, report: &ValuationReport) -> anyhow::Result<()> {
    let Some(path) = &config.output else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)?;
    tracing::info!(
        "Wrote valuation report for {} to {}",
        window(report),
        path.display()
    );
    Ok(())
}

fn window(report: &ValuationReport) -> String {
    match (report.summary.first_date, report.summary.last_date) {
        (Some(first), Some(last)) => format!("{}..{}", format_date(first), format_date(last)),
        _ => "an empty timeline".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::io::Write;
    use std::path::Path;
    use tempfile::{tempdir, NamedTempFile};

    fn sheet(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn config(prices: &Path, weights: &Path) -> Config {
        Config {
            prices_csv: prices.to_path_buf(),
            weights_csv: weights.to_path_buf(),
            initial_value: Decimal::from(1000),
            strict_weights: true,
            sequential: false,
            output: None,
            from: None,
            to: None,
        }
    }

    #[tokio::test]
    async fn test_run_and_export() {
        let prices = sheet("Dates,A,B\n2020-01-01,10,20\n2020-01-02,12,18\n");
        let weights = sheet("Fecha,activos,P\n2020-01-01,A,0.6\n2020-01-01,B,0.4\n");
        let dir = tempdir().unwrap();
        let output = dir.path().join("report.json");
        let config = Config {
            output: Some(output.clone()),
            ..config(prices.path(), weights.path())
        };

        let report = run(&config).await.unwrap();
        write_report(&config, &report).unwrap();

        assert_eq!(report.portfolios.len(), 1);
        let history = &report.portfolios[0];
        assert_eq!(history.values[1].amount, Decimal::from(1080));
        assert_eq!(history.weights[1].weights["A"], Decimal::new(666667, 6));

        let exported: serde_json::Value =
            serde_json::from_reader(File::open(&output).unwrap()).unwrap();
        assert_eq!(exported["summary"]["stage"], "WEIGHTS_COMPUTED");
        assert_eq!(exported["portfolios"][0]["portfolio"], "P");
    }

    #[tokio::test]
    async fn test_missing_sheet_is_reported() {
        let weights = sheet("Fecha,activos,P\n2020-01-01,A,1\n");
        let config = config(Path::new("/nonexistent/prices.csv"), weights.path());
        let err = run(&config).await.unwrap_err();
        assert!(err.to_string().contains("prices.csv"));
    }
}
