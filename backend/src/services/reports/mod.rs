//! Report jobs.
//!
//! - `POST /api/reports/start`: JSON `StartReportRequest`; answers with a
//!   `job_id` right away and runs the report in the background.
//! - `GET /api/reports/status/{job_id}`: the job's current `JobStatus`. A
//!   finished job carries the message shown to the user.

mod get_status;
mod start;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/reports";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/start", post().to(start::process))
        .route("/status/{job_id}", get().to(get_status::process))
}
