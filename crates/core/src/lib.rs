//! Portfolioviz Core - Domain entities, valuation engines and traits.
//!
//! This crate turns raw market prices and an initial allocation into a
//! complete time series of holdings, position values, portfolio values and
//! weights. It is storage-agnostic and defines traits that are implemented
//! by the `storage-memory` crate.

pub mod assets;
pub mod constants;
pub mod errors;
pub mod ingest;
pub mod market_data;
pub mod portfolio;
pub mod utils;

// Re-export common types from asset and portfolio modules
pub use assets::*;
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
