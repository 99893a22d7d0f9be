//! Portfolio holdings, valuation and the pipeline that derives them.

pub mod history;
pub mod pipeline;
pub mod quantity;
pub mod valuation;

mod portfolio_model;
mod portfolio_traits;

pub use portfolio_model::*;
pub use portfolio_traits::*;

#[cfg(test)]
pub(crate) mod mock_repository;
