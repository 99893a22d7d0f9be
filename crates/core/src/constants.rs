use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Assumed starting capital of every portfolio at the first trading date
pub const INITIAL_VALUE: Decimal = dec!(1000000000);

/// Relative tolerance when checking that weights of a portfolio/date sum to one
pub const WEIGHT_TOLERANCE: Decimal = dec!(0.000000001);

/// Date format used by raw input files and query parameters
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Decimal places kept when rendering amounts for export
pub const DECIMAL_PRECISION: u32 = 6;
