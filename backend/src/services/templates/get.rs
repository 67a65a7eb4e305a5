//! `GET /api/templates/{template_id}`: returns the stored template as JSON.

use crate::config::AppConfig;
use crate::report::templates::{SqliteTemplateStore, TemplateError};
use actix_web::{web, HttpResponse, Responder};

/// - `200 OK` with the `Template` as JSON.
/// - `404 Not Found` when no template has that id.
/// - `503 Service Unavailable` when the database cannot be read.
pub async fn process(
    config: web::Data<AppConfig>,
    template_id: web::Path<String>,
) -> impl Responder {
    let store = SqliteTemplateStore::new(&config.storage.database);
    let template_id = template_id.into_inner();

    match web::block(move || store.get(&template_id)).await {
        Ok(Ok(template)) => HttpResponse::Ok().json(template),
        Ok(Err(e @ TemplateError::NotFound(_))) => HttpResponse::NotFound().body(e.to_string()),
        Ok(Err(e)) => HttpResponse::ServiceUnavailable()
            .body(format!("Error retrieving template: {}", e)),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
