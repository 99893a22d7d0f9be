pub mod quantity_calculator;
mod quantity_model;
mod transactions_traits;

pub use quantity_calculator::*;
pub use quantity_model::*;
pub use transactions_traits::*;
