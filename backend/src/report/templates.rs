//! Template storage and instantiation.

use crate::db;
use crate::report::document::ReportDocument;
use common::model::template::Template;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("template id must not be empty")]
    EmptyId,

    #[error("template database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored template is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Source of fresh documents to populate.
pub trait TemplateSource {
    /// Copies template `template_id` into a new document titled `destination_name`.
    fn copy_template(
        &self,
        template_id: &str,
        destination_name: &str,
    ) -> Result<ReportDocument, TemplateError>;
}

/// Templates kept as JSON rows in the application database.
pub struct SqliteTemplateStore {
    database: PathBuf,
}

impl SqliteTemplateStore {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
        }
    }

    pub fn get(&self, template_id: &str) -> Result<Template, TemplateError> {
        let conn = db::open(&self.database)?;
        get_template(&conn, template_id)
    }

    pub fn save(&self, template: &Template) -> Result<(), TemplateError> {
        let conn = db::open(&self.database)?;
        save_template(&conn, template)
    }
}

impl TemplateSource for SqliteTemplateStore {
    fn copy_template(
        &self,
        template_id: &str,
        destination_name: &str,
    ) -> Result<ReportDocument, TemplateError> {
        let template = self.get(template_id)?;
        debug!("copied template `{}` as `{}`", template_id, destination_name);
        Ok(ReportDocument::from_template(&template, destination_name))
    }
}

pub fn get_template(conn: &Connection, template_id: &str) -> Result<Template, TemplateError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM templates WHERE id = ?1",
            params![template_id],
            |row| row.get(0),
        )
        .optional()?;
    let body = body.ok_or_else(|| TemplateError::NotFound(template_id.to_string()))?;
    Ok(serde_json::from_str(&body)?)
}

pub fn save_template(conn: &Connection, template: &Template) -> Result<(), TemplateError> {
    if template.id.trim().is_empty() {
        return Err(TemplateError::EmptyId);
    }
    let body = serde_json::to_string(template)?;
    conn.execute(
        "INSERT OR REPLACE INTO templates (id, name, body) VALUES (?1, ?2, ?3)",
        params![&template.id, &template.name, body],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::template::TemplateBlock;

    fn template(id: &str) -> Template {
        Template {
            id: id.to_string(),
            name: "Functional inspection".to_string(),
            header: vec!["{{trainNo}}".to_string()],
            body: vec![TemplateBlock::Table {
                rows: vec![vec!["No".to_string()], vec!["{{Location}}".to_string()]],
            }],
        }
    }

    #[test]
    fn copies_a_saved_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteTemplateStore::new(dir.path().join("reports.sqlite"));
        store.save(&template("functional")).unwrap();

        let doc = store
            .copy_template("functional", "T3 Functional Inspection Report")
            .unwrap();
        assert_eq!(doc.title(), "T3 Functional Inspection Report");
        assert_eq!(doc.tables().count(), 1);
    }

    #[test]
    fn unknown_template_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteTemplateStore::new(dir.path().join("reports.sqlite"));
        assert!(matches!(
            store.copy_template("missing", "x"),
            Err(TemplateError::NotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn rejects_blank_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteTemplateStore::new(dir.path().join("reports.sqlite"));
        assert!(matches!(store.save(&template("  ")), Err(TemplateError::EmptyId)));
    }
}
