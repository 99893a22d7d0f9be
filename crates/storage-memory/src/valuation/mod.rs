//! In-memory storage of the valuation records.

mod repository;

pub use repository::ValuationRepository;

// Re-export trait from core for convenience
pub use portfolioviz_core::portfolio::ValuationRepositoryTrait;
