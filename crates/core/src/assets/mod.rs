//! Asset and portfolio identities.

mod assets_model;

pub use assets_model::*;
