//! Trading timeline and price grid.

mod market_data_model;
mod market_timeline;
mod price_table;

pub use market_data_model::*;
pub use market_timeline::*;
pub use price_table::*;
