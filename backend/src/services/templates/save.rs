use crate::config::AppConfig;
use crate::report::templates::{SqliteTemplateStore, TemplateError};
use actix_web::{web, HttpResponse, Responder};
use common::model::template::Template;
use log::{error, info};

pub async fn process(config: web::Data<AppConfig>, payload: web::Json<Template>) -> impl Responder {
    let template = payload.into_inner();
    let store = SqliteTemplateStore::new(&config.storage.database);
    let id = template.id.clone();

    match web::block(move || store.save(&template)).await {
        Ok(Ok(())) => {
            info!("saved template `{}`", id);
            HttpResponse::Ok().body("Template saved")
        }
        Ok(Err(TemplateError::EmptyId)) => {
            HttpResponse::BadRequest().body("Template id must not be empty")
        }
        Ok(Err(e)) => {
            error!("saving template `{}` failed: {}", id, e);
            HttpResponse::ServiceUnavailable().body(format!("Error saving template: {}", e))
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
