use crate::model::column::{ColumnSchema, Field, SchemaError};
use serde::{Deserialize, Serialize};

/// One inspection record as read from the sheet.
///
/// Cells are only reachable through a [`ColumnSchema`]; a column past the end
/// of a short row reads as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRow {
    cells: Vec<String>,
}

impl InspectionRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn value(&self, schema: &ColumnSchema, field: Field) -> Result<&str, SchemaError> {
        let index = schema.index_of(field)?;
        Ok(self.cells.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Value with surrounding whitespace removed.
    pub fn trimmed(&self, schema: &ColumnSchema, field: Field) -> Result<&str, SchemaError> {
        self.value(schema, field).map(str::trim)
    }
}

impl From<Vec<String>> for InspectionRow {
    fn from(cells: Vec<String>) -> Self {
        Self::new(cells)
    }
}

/// The rows making up one report, all belonging to `train_no`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainSelection {
    pub train_no: String,
    pub rows: Vec<InspectionRow>,
}
