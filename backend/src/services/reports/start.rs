//! # Report Job Start Service
//!
//! `POST /api/reports/start` schedules one report run:
//!
//! 1.  A `job_id` is registered as `Pending` and returned immediately.
//! 2.  A Tokio task runs `report_blocking` through `spawn_blocking`; image
//!     downloads and PDF rendering never block the server's runtime.
//! 3.  `report_blocking` takes the sheet lock, opens the uploaded CSV of the
//!     requested kind, applies its stored filter and hands everything to a
//!     `ReportPipeline`.
//! 4.  The pipeline's notifications travel as `ReportUpdate`s over a per-job
//!     channel; a listener task turns them into `JobUpdate`s for the central
//!     job controller. Row progress becomes `InProgress(percent)`, the final
//!     notice becomes `Completed` or `Failed`.

use crate::config::AppConfig;
use crate::db;
use crate::job_controller::notifier::{JobNotifier, ReportUpdate};
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::report::image::{HttpImageFetcher, ImageResolver};
use crate::report::render::PdfRenderer;
use crate::report::sheet::{CsvSheet, SheetError};
use crate::report::store::FsReportStore;
use crate::report::templates::SqliteTemplateStore;
use crate::report::{ReportError, ReportPipeline, ReportReceipt};
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobStatus;
use common::requests::StartReportRequest;
use log::{error, info};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

#[derive(Debug, Error)]
enum JobError {
    #[error("No sheet named `{0}` has been uploaded")]
    SheetMissing(String),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error("Cannot load sheet filter: {0}")]
    Filter(Box<dyn std::error::Error + Send + Sync>),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Report(#[from] ReportError),
}

pub(crate) async fn process(
    state: web::Data<JobsState>,
    config: web::Data<AppConfig>,
    payload: web::Json<StartReportRequest>,
) -> impl Responder {
    let job_id = schedule_report_job(state, config.into_inner(), payload.into_inner()).await;
    HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id }))
}

async fn schedule_report_job(
    state: web::Data<JobsState>,
    config: Arc<AppConfig>,
    req: StartReportRequest,
) -> String {
    let job_id = Uuid::new_v4().to_string();
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);
    info!("scheduled {} report job {}", req.kind.label(), job_id);

    let tx = state.tx.clone();
    let sheet_lock = Arc::clone(&state.sheet_lock);
    let job_id_clone = job_id.clone();

    tokio::spawn(async move {
        let (report_tx, mut report_rx) = mpsc::channel::<ReportUpdate>(100);

        let job_updater_tx = tx.clone();
        let job_id_for_updater = job_id_clone.clone();
        tokio::spawn(async move {
            while let Some(update) = report_rx.recv().await {
                let _ = job_updater_tx
                    .send(JobUpdate::new(job_id_for_updater.clone(), update.into_status()))
                    .await;
            }
        });

        let handle = tokio::task::spawn_blocking(move || {
            report_blocking(&config, req, report_tx, &sheet_lock)
        });

        if let Err(e) = handle.await {
            let _ = tx
                .send(JobUpdate::new(
                    job_id_clone,
                    JobStatus::Failed(format!("Task join error: {}", e)),
                ))
                .await;
        }
    });

    job_id
}

/// Every outcome ends as a final job status: the pipeline's own notice for
/// success and selection errors, the error text for everything else.
fn report_blocking(
    config: &AppConfig,
    req: StartReportRequest,
    tx: mpsc::Sender<ReportUpdate>,
    sheet_lock: &Mutex<()>,
) {
    let _ = tx.blocking_send(ReportUpdate::Job(JobStatus::InProgress(0)));
    let _guard = sheet_lock.blocking_lock();
    let kind = req.kind;

    match generate(config, req, tx.clone()) {
        Ok(receipt) => info!("report available at {}", receipt.url),
        Err(JobError::Report(e)) if e.is_user_facing() => {}
        Err(e) => {
            error!("{} report job failed: {}", kind.label(), e);
            let _ = tx.blocking_send(ReportUpdate::Job(JobStatus::Failed(e.to_string())));
        }
    }
}

fn generate(
    config: &AppConfig,
    req: StartReportRequest,
    tx: mpsc::Sender<ReportUpdate>,
) -> Result<ReportReceipt, JobError> {
    let storage = &config.storage;
    let sheet_name = req.kind.sheet_name();
    let sheet_path = storage.sheet_path(sheet_name);
    if !sheet_path.is_file() {
        return Err(JobError::SheetMissing(sheet_name.to_string()));
    }

    let mut sheet = CsvSheet::open(&sheet_path)?;
    let conn = db::open(&storage.database)?;
    if let Some(filter) = db::load_filter(&conn, sheet_name).map_err(JobError::Filter)? {
        sheet.set_filter(filter, config.report.schema.clone());
    }
    drop(conn);

    let pipeline = ReportPipeline::new(
        config.report.clone(),
        Box::new(SqliteTemplateStore::new(&storage.database)),
        ImageResolver::new(Box::new(HttpImageFetcher::new()), config.report.image),
        Box::new(FsReportStore::new(
            &storage.reports_dir,
            config.server.reports_url(),
            Box::new(PdfRenderer::new(&storage.fonts_dir)),
        )),
        Box::new(JobNotifier::new(tx)),
    );
    Ok(pipeline.run(req.kind, req.strategy, &mut sheet)?)
}
