use serde::{Deserialize, Serialize};

/// A stored report template.
///
/// Text may contain field tokens such as `{{trainNo}}`. The first table of
/// the body is the data table: row 0 holds column headings and row 1 the
/// token markers that per-row data replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub body: Vec<TemplateBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TemplateBlock {
    Paragraph { text: String },
    Table { rows: Vec<Vec<String>> },
}
