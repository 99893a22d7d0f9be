//! CSV loading of the price and initial-weight sheets.
//!
//! Price sheet: `<date>,<asset1>,<asset2>,...` with one row per trading date.
//! Weight sheet: `<date>,<asset>,<portfolio1>,<portfolio2>,...` with one row
//! per (date, asset).

use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;

use crate::errors::{Error, Result, ValidationError};
use crate::market_data::PriceGrid;
use crate::portfolio::pipeline::{InitialWeights, RawPortfolioData};
use crate::utils::time_utils::parse_date;
use chrono::NaiveDate;

/// Parsed price sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSheet {
    pub assets: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub prices: PriceGrid,
}

/// Parsed initial-weight sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSheet {
    pub portfolios: Vec<String>,
    pub initial_weights: InitialWeights,
}

fn invalid(message: String) -> Error {
    Error::Validation(ValidationError::InvalidInput(message))
}

fn parse_amount(cell: &str, row: usize, column: &str) -> Result<Decimal> {
    Decimal::from_str(cell)
        .or_else(|_| Decimal::from_scientific(cell))
        .map_err(|_| {
            invalid(format!(
                "row {}, column '{}': invalid number '{}'",
                row, column, cell
            ))
        })
}

fn read_headers<R: Read>(
    reader: &mut csv::Reader<R>,
    min_columns: usize,
    sheet: &str,
) -> Result<Vec<String>> {
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.len() < min_columns {
        return Err(invalid(format!(
            "{} sheet needs at least {} columns, found {}",
            sheet,
            min_columns,
            headers.len()
        )));
    }
    Ok(headers)
}

fn cell<'r>(record: &'r StringRecord, index: usize, row: usize, column: &str) -> Result<&'r str> {
    record.get(index).ok_or_else(|| {
        ValidationError::MissingField(format!("row {}, column '{}'", row, column)).into()
    })
}

/// Reads the price sheet. Assets come from the header, dates from the rows
/// in file order.
pub fn read_price_sheet<R: Read>(source: R) -> Result<PriceSheet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);
    let headers = read_headers(&mut reader, 2, "price")?;
    let assets: Vec<String> = headers[1..].to_vec();

    let mut dates = Vec::new();
    let mut prices = PriceGrid::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 2;
        let date = parse_date(cell(&record, 0, row, &headers[0])?)?;

        let mut column = BTreeMap::new();
        for (offset, asset) in assets.iter().enumerate() {
            let raw = cell(&record, offset + 1, row, asset)?;
            if raw.is_empty() {
                continue;
            }
            column.insert(asset.clone(), parse_amount(raw, row, asset)?);
        }

        if prices.insert(date, column).is_some() {
            return Err(invalid(format!("row {}: date {} appears twice", row, date)));
        }
        dates.push(date);
    }

    debug!(
        "Read price sheet with {} assets and {} dates",
        assets.len(),
        dates.len()
    );
    Ok(PriceSheet {
        assets,
        dates,
        prices,
    })
}

/// Reads the initial-weight sheet. Portfolios come from the header.
pub fn read_weight_sheet<R: Read>(source: R) -> Result<WeightSheet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);
    let headers = read_headers(&mut reader, 3, "weight")?;
    let portfolios: Vec<String> = headers[2..].to_vec();

    let mut initial_weights = InitialWeights::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 2;
        let date = parse_date(cell(&record, 0, row, &headers[0])?)?;
        let asset = cell(&record, 1, row, &headers[1])?.to_string();

        let mut column = BTreeMap::new();
        for (offset, portfolio) in portfolios.iter().enumerate() {
            let raw = cell(&record, offset + 2, row, portfolio)?;
            if raw.is_empty() {
                continue;
            }
            column.insert(portfolio.clone(), parse_amount(raw, row, portfolio)?);
        }

        if initial_weights.insert((date, asset.clone()), column).is_some() {
            return Err(invalid(format!(
                "row {}: weights for asset '{}' on {} appear twice",
                row, asset, date
            )));
        }
    }

    Ok(WeightSheet {
        portfolios,
        initial_weights,
    })
}

/// Builds the pipeline input from the two sheets. The first price row is the
/// initial date.
pub fn load_raw_portfolio_data<P: Read, W: Read>(
    prices_source: P,
    weights_source: W,
    initial_value: Decimal,
) -> Result<RawPortfolioData> {
    let price_sheet = read_price_sheet(prices_source)?;
    let weight_sheet = read_weight_sheet(weights_source)?;

    let initial_date = price_sheet
        .dates
        .first()
        .copied()
        .ok_or_else(|| invalid("price sheet has no rows".to_string()))?;

    Ok(RawPortfolioData {
        assets: price_sheet.assets,
        portfolios: weight_sheet.portfolios,
        initial_weights: weight_sheet.initial_weights,
        prices: price_sheet.prices,
        dates: price_sheet.dates,
        initial_date,
        initial_value,
    })
}
