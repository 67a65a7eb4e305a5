//! # Template Service Module
//!
//! Routes under `/api/templates`:
//! - `save`: creates or replaces a template.
//! - `get`: returns one stored template as JSON.
//! - `pdf`: renders a template, tokens and all, as a PDF preview.

mod get;
mod pdf;
mod save;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/templates";

/// # Registered Routes:
///
/// *   **`POST /save`**: JSON `Template` body; stored under its `id`, replacing
///     any previous version.
/// *   **`GET /{template_id}`**: the stored `Template`, or `404` when unknown.
/// *   **`GET /pdf/{template_id}`**: the unpopulated template rendered with the
///     configured page geometry, served inline as `application/pdf`.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/save", post().to(save::process))
        .route("/{template_id}", get().to(get::process))
        .route("/pdf/{template_id}", get().to(pdf::process))
}
