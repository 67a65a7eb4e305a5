use super::valid_sheet_name;
use crate::config::AppConfig;
use crate::db;
use crate::job_controller::state::JobsState;
use crate::report::pipeline::TIMESTAMP_FORMAT;
use crate::report::sheet::{CsvSheet, SheetReader};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use chrono::Local;
use common::model::datasource::DataSource;
use futures_util::StreamExt;
use log::info;
use md5::Context;
use serde_json::from_slice;
use std::fs;
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

/// - `200 OK` with `true` when the sheet is unchanged, `false` when it was replaced.
/// - `400 Bad Request` with the reason otherwise.
pub async fn process(
    state: web::Data<JobsState>,
    config: web::Data<AppConfig>,
    payload: Multipart,
) -> impl Responder {
    match upload_sheet(&config, &state.sheet_lock, payload).await {
        Ok(unchanged) => HttpResponse::Ok().body(unchanged.to_string()),
        Err(e) => HttpResponse::BadRequest().body(format!("Error: {}", e)),
    }
}

/// Streams the `file` part into a temporary file next to the stored sheets,
/// hashing it on the way. The upload only replaces the stored copy once it
/// parses as CSV.
pub async fn upload_sheet(
    config: &AppConfig,
    sheet_lock: &Mutex<()>,
    mut payload: Multipart,
) -> Result<bool, Box<dyn std::error::Error>> {
    let sheets_dir = &config.storage.sheets_dir;
    fs::create_dir_all(sheets_dir)?;

    let mut data_source: Option<DataSource> = None;
    let mut upload: Option<NamedTempFile> = None;
    let mut md5_hasher = Context::new();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let part_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match part_name.as_deref() {
            Some("json") => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    bytes.extend_from_slice(&chunk?);
                }
                let ds: DataSource = from_slice(&bytes)?;
                if !valid_sheet_name(&ds.sheet_name) {
                    return Err(format!("Invalid sheet name `{}`", ds.sheet_name).into());
                }
                data_source = Some(ds);
            }

            Some("file") => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();
                if !filename.to_ascii_lowercase().ends_with(".csv") {
                    return Err("The file must end with .csv".into());
                }
                if data_source.is_none() {
                    return Err("DataSource JSON must be sent before the file".into());
                }

                let tmp = NamedTempFile::new_in(sheets_dir)?;
                {
                    let mut writer = BufWriter::new(tmp.as_file());
                    while let Some(chunk) = field.next().await {
                        let chunk = chunk?;
                        md5_hasher.consume(&chunk);
                        writer.write_all(&chunk)?;
                    }
                    writer.flush()?;
                }
                upload = Some(tmp);
            }

            _ => {}
        }
    }

    let ds = data_source.ok_or("Missing DataSource")?;
    let upload = upload.ok_or("Missing file")?;

    let sheet = CsvSheet::open(upload.path())?;
    let rows = sheet.last_row();
    let computed_md5 = format!("{:x}", md5_hasher.finalize());

    let unchanged = store_sheet(config, sheet_lock, &ds.sheet_name, upload, &computed_md5).await?;
    if !unchanged {
        info!("sheet `{}` replaced ({} rows, md5 {})", ds.sheet_name, rows, computed_md5);
    }
    Ok(unchanged)
}

/// Replaces the stored sheet unless its fingerprint matches. Runs under the
/// sheet lock, after any report job that will write back to the file.
async fn store_sheet(
    config: &AppConfig,
    sheet_lock: &Mutex<()>,
    sheet_name: &str,
    upload: NamedTempFile,
    computed_md5: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let _guard = sheet_lock.lock().await;

    let conn = db::open(&config.storage.database)?;
    let unchanged = db::sheet_md5(&conn, sheet_name)?.as_deref() == Some(computed_md5);
    let target = config.storage.sheet_path(sheet_name);
    if unchanged && target.is_file() {
        return Ok(true);
    }

    upload.persist(&target)?;
    let uploaded_at = Local::now().format(TIMESTAMP_FORMAT).to_string();
    db::record_sheet_upload(&conn, sheet_name, computed_md5, &uploaded_at)?;
    Ok(false)
}
