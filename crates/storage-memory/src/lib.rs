//! In-memory storage implementation for the valuation pipeline.
//!
//! This crate implements the repository traits defined in
//! `portfolioviz-core` on top of ordered maps guarded by a lock:
//! - write-once records keyed by their (portfolio, asset, date) tuples
//! - atomic batch inserts with uniqueness enforcement
//! - ordered range reads for the history queries
//!
//! ```text
//!   core (pipeline, history)
//!            │
//!            ▼
//!   storage-memory (this crate)
//! ```

pub mod errors;
pub mod valuation;

pub use errors::StorageError;
pub use valuation::ValuationRepository;
