//! `GET /api/templates/pdf/{template_id}`: preview of a template as PDF.

use crate::config::AppConfig;
use crate::report::render::{DocumentRenderer, PdfRenderer};
use crate::report::templates::{SqliteTemplateStore, TemplateError, TemplateSource};
use actix_web::http::header::{ContentDisposition, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use log::error;

pub async fn process(
    config: web::Data<AppConfig>,
    template_id: web::Path<String>,
) -> impl Responder {
    let template_id = template_id.into_inner();
    let config = config.into_inner();

    let rendered = web::block(move || render_preview(&config, &template_id)).await;
    match rendered {
        Ok(Ok(bytes)) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Inline,
                parameters: vec![],
            })
            .body(bytes),
        Ok(Err(PreviewError::Template(e @ TemplateError::NotFound(_)))) => {
            HttpResponse::NotFound().body(e.to_string())
        }
        Ok(Err(e)) => {
            error!("template preview failed: {}", e);
            HttpResponse::ServiceUnavailable().body(format!("PDF generation failed: {}", e))
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
enum PreviewError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Render(#[from] crate::report::render::RenderError),
}

fn render_preview(config: &AppConfig, template_id: &str) -> Result<Vec<u8>, PreviewError> {
    let store = SqliteTemplateStore::new(&config.storage.database);
    let mut doc = store.copy_template(template_id, template_id)?;
    let page = &config.report.page;
    doc.set_page_size(page.width_pt, page.height_pt);
    doc.set_margins(
        page.margin_top_pt,
        page.margin_bottom_pt,
        page.margin_left_pt,
        page.margin_right_pt,
    );

    let mut bytes = Vec::new();
    PdfRenderer::new(&config.storage.fonts_dir).render(&doc, &mut bytes)?;
    Ok(bytes)
}
