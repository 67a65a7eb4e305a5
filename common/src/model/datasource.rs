use serde::{Deserialize, Serialize};

/// Metadata part of a sheet upload; names the sheet the file replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub sheet_name: String,
    #[serde(default)]
    pub source_type: DataSourceType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceType {
    #[default]
    Csv,
}
