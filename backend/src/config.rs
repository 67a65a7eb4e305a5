//! Application configuration, read once at startup from `reports.toml`.

use crate::report::document::PageSetup;
use crate::report::image::ImageSize;
use crate::report::sheet::CellAddress;
use common::model::column::ColumnSchema;
use common::model::report::ReportKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "REPORTS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "reports.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Base of the URLs written back to the sheet.
    pub public_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerSettings {
    pub fn reports_url(&self) -> String {
        format!("{}/reports", self.public_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database: PathBuf,
    pub sheets_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub fonts_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("reports.sqlite"),
            sheets_dir: PathBuf::from("data/sheets"),
            reports_dir: PathBuf::from("data/reports"),
            fonts_dir: PathBuf::from("fonts"),
        }
    }
}

impl StorageSettings {
    /// Where the uploaded CSV of `sheet_name` lives.
    pub fn sheet_path(&self, sheet_name: &str) -> PathBuf {
        self.sheets_dir.join(format!("{}.csv", sheet_name))
    }
}

/// Everything one pipeline run needs besides its collaborators.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub schema: ColumnSchema,
    pub layout: SheetLayout,
    pub image: ImageSize,
    pub page: PageSetup,
    pub templates: TemplateIds,
}

/// Fixed cells of an inspection sheet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// First row holding inspection data; rows above are the sheet header.
    pub first_data_row: usize,
    pub train_cell: CellAddress,
    pub report_name_cell: CellAddress,
    pub report_url_cell: CellAddress,
    pub generated_at_cell: CellAddress,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            first_data_row: 10,
            train_cell: CellAddress::new(6, 7),
            report_name_cell: CellAddress::new(6, 8),
            report_url_cell: CellAddress::new(6, 9),
            generated_at_cell: CellAddress::new(6, 10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemplateIds {
    pub functional: String,
    pub visual: String,
}

impl Default for TemplateIds {
    fn default() -> Self {
        Self {
            functional: "functional".to_string(),
            visual: "visual".to_string(),
        }
    }
}

impl TemplateIds {
    pub fn id_for(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Functional => &self.functional,
            ReportKind::Visual => &self.visual,
        }
    }
}

impl AppConfig {
    /// Reads the file named by `REPORTS_CONFIG`, else `reports.toml` when it
    /// exists, else falls back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
