pub mod data_sources;
pub mod reports;
pub mod templates;
