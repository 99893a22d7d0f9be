mod pipeline_model;
pub mod pipeline_service;

pub use pipeline_model::*;
pub use pipeline_service::*;
