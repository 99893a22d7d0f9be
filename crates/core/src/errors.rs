//! Core error types for the valuation pipeline.
//!
//! This module defines storage-agnostic error types. Storage-specific errors
//! are converted to these types by the storage layer.

use chrono::{NaiveDate, ParseError as ChronoParseError};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::portfolio::pipeline::PipelineStage;
use crate::portfolio::{PortfolioDateKey, PositionKey};

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the valuation pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Valuation calculation failed: {0}")]
    Calculation(#[from] CalculatorError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Storage-agnostic error type for repository operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A record with the same key tuple already exists.
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Internal/unexpected storage error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors raised while building the trading timeline and the price grid.
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Market timeline is empty")]
    EmptyTimeline,

    #[error("Market timeline is not strictly increasing: {previous} is followed by {next}")]
    UnsortedTimeline {
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("Date {0} is not a trading date of the market timeline")]
    UnknownMarketDate(NaiveDate),

    #[error("Asset '{0}' is not part of the asset universe")]
    UnknownAsset(String),

    #[error("Missing price for asset '{asset}' on {date}")]
    MissingPrice {
        asset: String,
        date: NaiveDate,
    },
}

/// Errors that occur during quantity and valuation calculations.
#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error("Cannot derive initial quantity for {key}: non-positive price {price}")]
    DivisionByZeroPrice {
        key: PositionKey,
        price: Decimal,
    },

    #[error("Out of order rollforward for {key}: expected date {expected}, got {actual}")]
    OutOfOrderRollforward {
        key: PositionKey,
        expected: String,
        actual: NaiveDate,
    },

    #[error("Missing initial weight for portfolio '{portfolio}', asset '{asset}' on {date}")]
    MissingInitialWeight {
        portfolio: String,
        asset: String,
        date: NaiveDate,
    },

    #[error("Empty asset universe for {0}")]
    EmptyAssetUniverse(PortfolioDateKey),

    #[error("Zero portfolio value for {0}")]
    ZeroPortfolioValue(PortfolioDateKey),

    #[error("Weights for {key} sum to {sum}, outside tolerance")]
    WeightsNotNormalized {
        key: PortfolioDateKey,
        sum: Decimal,
    },

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

/// Errors raised by the pipeline state machine.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed raw input: {0}")]
    MalformedInput(String),

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition {
        from: PipelineStage,
        to: PipelineStage,
    },

    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: PipelineStage,
        #[source]
        source: Box<Error>,
    },

    #[error("Run was aborted after a failure while entering {failed_stage}; restart from INIT")]
    RunAborted { failed_stage: PipelineStage },
}

/// Validation errors for external input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),

    #[error("Failed to read CSV: {0}")]
    Csv(String),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Validation(ValidationError::Csv(err.to_string()))
    }
}
