//! Loading raw portfolio data from tabular files.

pub mod csv_loader;

pub use csv_loader::*;
