use super::valid_sheet_name;
use crate::config::AppConfig;
use crate::db;
use actix_web::{web, HttpResponse, Responder};
use common::model::filter::SheetFilter;
use log::info;

pub async fn save(
    config: web::Data<AppConfig>,
    sheet: web::Path<String>,
    payload: web::Json<SheetFilter>,
) -> impl Responder {
    let sheet = sheet.into_inner();
    if !valid_sheet_name(&sheet) {
        return HttpResponse::BadRequest().body("Invalid sheet name");
    }
    let filter = payload.into_inner();
    let database = config.storage.database.clone();

    let result = web::block(move || {
        let conn = db::open(&database)?;
        db::save_filter(&conn, &sheet, &filter)?;
        info!(
            "filter on `{}` set: {} criteria, {} hidden rows",
            sheet,
            filter.criteria.len(),
            filter.hidden_rows.len()
        );
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
    })
    .await;

    match result {
        Ok(Ok(())) => HttpResponse::Ok().body("Filter saved"),
        Ok(Err(e)) => HttpResponse::ServiceUnavailable().body(format!("Error saving filter: {}", e)),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

pub async fn clear(config: web::Data<AppConfig>, sheet: web::Path<String>) -> impl Responder {
    let sheet = sheet.into_inner();
    let database = config.storage.database.clone();

    let result = web::block(move || {
        let conn = db::open(&database)?;
        db::clear_filter(&conn, &sheet)
    })
    .await;

    match result {
        Ok(Ok(true)) => HttpResponse::Ok().body("Filter removed"),
        Ok(Ok(false)) => HttpResponse::NotFound().body("Sheet has no filter"),
        Ok(Err(e)) => {
            HttpResponse::ServiceUnavailable().body(format!("Error removing filter: {}", e))
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
