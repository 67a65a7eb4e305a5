//! SQLite storage for templates, uploaded sheets and their filter state.

use common::model::filter::SheetFilter;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS templates (
    id   TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sheets (
    name        TEXT PRIMARY KEY,
    md5         TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sheet_filters (
    sheet_name TEXT PRIMARY KEY,
    filter     TEXT NOT NULL
);
";

/// Opens the database at `path`, creating missing tables.
pub fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Fingerprint of the last upload for `sheet_name`, if any.
pub fn sheet_md5(conn: &Connection, sheet_name: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT md5 FROM sheets WHERE name = ?1",
        params![sheet_name],
        |row| row.get(0),
    )
    .optional()
}

pub fn record_sheet_upload(
    conn: &Connection,
    sheet_name: &str,
    md5: &str,
    uploaded_at: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sheets (name, md5, uploaded_at) VALUES (?1, ?2, ?3)",
        params![sheet_name, md5, uploaded_at],
    )?;
    Ok(())
}

pub fn load_filter(
    conn: &Connection,
    sheet_name: &str,
) -> Result<Option<SheetFilter>, Box<dyn std::error::Error + Send + Sync>> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT filter FROM sheet_filters WHERE sheet_name = ?1",
            params![sheet_name],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn save_filter(
    conn: &Connection,
    sheet_name: &str,
    filter: &SheetFilter,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let json = serde_json::to_string(filter)?;
    conn.execute(
        "INSERT OR REPLACE INTO sheet_filters (sheet_name, filter) VALUES (?1, ?2)",
        params![sheet_name, json],
    )?;
    Ok(())
}

/// Removes the filter of `sheet_name`. Returns whether one existed.
pub fn clear_filter(conn: &Connection, sheet_name: &str) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM sheet_filters WHERE sheet_name = ?1",
        params![sheet_name],
    )?;
    Ok(removed > 0)
}
