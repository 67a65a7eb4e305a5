pub mod assembler;
pub mod document;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod render;
pub mod selection;
pub mod sheet;
pub mod store;
pub mod templates;

pub use error::ReportError;
pub use pipeline::{Notice, NoticeLevel, Notifier, ReportPipeline, ReportReceipt};
