pub mod column;
pub mod datasource;
pub mod filter;
pub mod inspection;
pub mod report;
pub mod template;
