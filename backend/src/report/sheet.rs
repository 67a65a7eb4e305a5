//! Source table access.
//!
//! The report engine reads the inspection sheet through [`SheetReader`] and
//! writes report details back through [`SheetWriter`]. [`CsvSheet`] backs both
//! with a CSV file laid out like the original spreadsheet: a title block in
//! the first rows, the stored train number and report status cells, then one
//! inspection record per row from the first data row on.

use common::model::column::{ColumnSchema, SchemaError};
use common::model::filter::SheetFilter;
use common::model::inspection::InspectionRow;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("invalid cell address `{0}`")]
    InvalidAddress(String),

    #[error("sheet I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed sheet: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A1-style cell reference. Row and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddress {
    pub row: usize,
    pub column: usize,
}

impl CellAddress {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl FromStr for CellAddress {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static A1: OnceLock<Option<Regex>> = OnceLock::new();
        let re = A1
            .get_or_init(|| Regex::new(r"^([A-Za-z]{1,3})([1-9][0-9]*)$").ok())
            .as_ref()
            .ok_or_else(|| SheetError::InvalidAddress(s.to_string()))?;
        let caps = re
            .captures(s.trim())
            .ok_or_else(|| SheetError::InvalidAddress(s.to_string()))?;

        let column = caps[1]
            .chars()
            .fold(0usize, |acc, ch| acc * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1));
        let row = caps[2]
            .parse::<usize>()
            .map_err(|_| SheetError::InvalidAddress(s.to_string()))?;

        Ok(Self { row, column })
    }
}

impl TryFrom<String> for CellAddress {
    type Error = SheetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellAddress> for String {
    fn from(address: CellAddress) -> Self {
        address.to_string()
    }
}

impl Display for CellAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut letters = Vec::new();
        let mut column = self.column;
        while column > 0 {
            let rem = (column - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            column = (column - 1) / 26;
        }
        let letters: String = letters.into_iter().rev().collect();
        write!(f, "{}{}", letters, self.row)
    }
}

/// Read side of the source table. Rows and columns are 1-based.
pub trait SheetReader {
    /// Reads a block of cell values; cells outside the sheet read as empty.
    fn read_range(
        &self,
        row_start: usize,
        col_start: usize,
        row_count: usize,
        col_count: usize,
    ) -> Result<Vec<Vec<String>>, SheetError>;

    fn read_cell(&self, address: &CellAddress) -> Result<String, SheetError>;

    /// Last row holding any content, 0 for an empty sheet.
    fn last_row(&self) -> usize;

    fn last_column(&self) -> usize;

    fn has_active_filter(&self) -> bool;

    /// Whether the active filter hides `row`.
    fn is_row_suppressed(&self, row: usize) -> Result<bool, SheetError>;
}

/// Write side of the source table, used for report status write-back.
pub trait SheetWriter {
    fn write_cell(&mut self, address: &CellAddress, value: &str) -> Result<(), SheetError>;

    /// Persists pending writes.
    fn flush(&mut self) -> Result<(), SheetError>;
}

struct ActiveFilter {
    filter: SheetFilter,
    schema: ColumnSchema,
}

/// Spreadsheet grid backed by a CSV file.
pub struct CsvSheet {
    path: Option<PathBuf>,
    grid: Vec<Vec<String>>,
    filter: Option<ActiveFilter>,
}

impl CsvSheet {
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        // The reader skips empty lines; each record goes back to the row it
        // started on so A1 addresses match the file as the user sees it.
        let mut grid: Vec<Vec<String>> = Vec::new();
        let mut next_line = 1u64;
        for record in reader.records() {
            let record = record?;
            if let Some(position) = record.position() {
                for _ in next_line..position.line() {
                    grid.push(Vec::new());
                }
                let embedded_breaks = record
                    .iter()
                    .map(|field| field.matches('\n').count() as u64)
                    .sum::<u64>();
                next_line = position.line() + 1 + embedded_breaks;
            }
            grid.push(record.iter().map(str::to_string).collect());
        }
        debug!("loaded {} rows from {:?}", grid.len(), path);

        Ok(Self {
            path: Some(path.to_path_buf()),
            grid,
            filter: None,
        })
    }

    /// Sheet held only in memory; `flush` is a no-op.
    pub fn from_rows(grid: Vec<Vec<String>>) -> Self {
        Self {
            path: None,
            grid,
            filter: None,
        }
    }

    /// Applies `filter`, evaluating its criteria through `schema`.
    pub fn set_filter(&mut self, filter: SheetFilter, schema: ColumnSchema) {
        self.filter = Some(ActiveFilter { filter, schema });
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        if row == 0 || column == 0 {
            return "";
        }
        self.grid
            .get(row - 1)
            .and_then(|cells| cells.get(column - 1))
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl SheetReader for CsvSheet {
    fn read_range(
        &self,
        row_start: usize,
        col_start: usize,
        row_count: usize,
        col_count: usize,
    ) -> Result<Vec<Vec<String>>, SheetError> {
        Ok((row_start..row_start + row_count)
            .map(|row| {
                (col_start..col_start + col_count)
                    .map(|column| self.cell(row, column).to_string())
                    .collect()
            })
            .collect())
    }

    fn read_cell(&self, address: &CellAddress) -> Result<String, SheetError> {
        Ok(self.cell(address.row, address.column).to_string())
    }

    fn last_row(&self) -> usize {
        self.grid
            .iter()
            .rposition(|cells| cells.iter().any(|cell| !cell.is_empty()))
            .map_or(0, |index| index + 1)
    }

    fn last_column(&self) -> usize {
        self.grid
            .iter()
            .filter_map(|cells| cells.iter().rposition(|cell| !cell.is_empty()))
            .max()
            .map_or(0, |index| index + 1)
    }

    fn has_active_filter(&self) -> bool {
        self.filter.is_some()
    }

    fn is_row_suppressed(&self, row: usize) -> Result<bool, SheetError> {
        let Some(active) = &self.filter else {
            return Ok(false);
        };
        let width = self.last_column().max(active.schema.widest_column());
        let cells = (1..=width)
            .map(|column| self.cell(row, column).to_string())
            .collect();
        let suppressed = active
            .filter
            .suppresses(row, &InspectionRow::new(cells), &active.schema)?;
        Ok(suppressed)
    }
}

impl SheetWriter for CsvSheet {
    fn write_cell(&mut self, address: &CellAddress, value: &str) -> Result<(), SheetError> {
        if address.row == 0 || address.column == 0 {
            return Err(SheetError::InvalidAddress(address.to_string()));
        }
        if self.grid.len() < address.row {
            self.grid.resize_with(address.row, Vec::new);
        }
        let cells = &mut self.grid[address.row - 1];
        if cells.len() < address.column {
            cells.resize(address.column, String::new());
        }
        cells[address.column - 1] = value.to_string();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SheetError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        // Written next to the target, then renamed over it.
        let temp_path = path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&temp_path)?;
            for cells in &self.grid {
                // The reader skips empty lines, so blank rows keep a separator.
                if cells.iter().all(String::is_empty) {
                    writer.write_record(["", ""])?;
                } else {
                    writer.write_record(cells)?;
                }
            }
            writer.flush()?;
        }
        fs::rename(&temp_path, path)?;
        debug!("wrote {} rows to {:?}", self.grid.len(), path);
        Ok(())
    }
}
