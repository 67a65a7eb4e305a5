//! Model types shared by the report engine and the HTTP service.

pub mod jobs;
pub mod model;
pub mod requests;
