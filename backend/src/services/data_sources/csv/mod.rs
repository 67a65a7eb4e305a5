//! Inspection sheets: CSV uploads and their persisted filter state.
//!
//! - `POST /api/sheets/upload`: multipart form with a `json` part naming the
//!   sheet, followed by a `file` part with the CSV. The file replaces the
//!   stored copy of that sheet; the response body is `true` when the upload
//!   is byte-identical to the previous one.
//! - `PUT /api/sheets/{sheet}/filter`: stores a `SheetFilter` for the sheet.
//!   The filter-driven report strategy only runs on a filtered sheet.
//! - `DELETE /api/sheets/{sheet}/filter`: removes it again.

use actix_web::web::{delete, post, put, scope};
use actix_web::Scope;
use regex::Regex;
use std::sync::OnceLock;

mod filter;
mod upload;

const API_PATH: &str = "/api/sheets";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/upload", post().to(upload::process))
        .route("/{sheet}/filter", put().to(filter::save))
        .route("/{sheet}/filter", delete().to(filter::clear))
}

/// Sheet names become file names; only word characters, spaces and hyphens.
fn valid_sheet_name(name: &str) -> bool {
    static SHEET_NAME: OnceLock<Option<Regex>> = OnceLock::new();
    SHEET_NAME
        .get_or_init(|| Regex::new(r"^[\w\- ]{1,100}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name) && !name.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::valid_sheet_name;

    #[test]
    fn sheet_names_are_file_safe() {
        assert!(valid_sheet_name("Visual_Inspection_Report"));
        assert!(valid_sheet_name("Line 2 - Functional"));
        assert!(!valid_sheet_name(""));
        assert!(!valid_sheet_name("   "));
        assert!(!valid_sheet_name("../etc/passwd"));
        assert!(!valid_sheet_name("a/b"));
    }
}
