use crate::report::sheet::{CellAddress, SheetError};
use crate::report::store::StoreError;
use crate::report::templates::TemplateError;
use common::model::column::SchemaError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Why no train number could be determined for a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoTrainReason {
    /// The filter-driven strategy needs a filter on the sheet.
    NoActiveFilter,
    /// No visible row carries a train number.
    NoVisibleRows,
    /// The stored train number cell is blank.
    EmptyTrainCell(CellAddress),
    /// No row matches the stored train number.
    NoMatchingRows(String),
}

impl Display for NoTrainReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NoTrainReason::NoActiveFilter => write!(f, "no filter is applied to the sheet"),
            NoTrainReason::NoVisibleRows => write!(f, "no visible row has a train number"),
            NoTrainReason::EmptyTrainCell(cell) => write!(f, "cell {} is empty", cell),
            NoTrainReason::NoMatchingRows(train_no) => {
                write!(f, "no rows found for train number {}", train_no)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no train number selected: {0}")]
    NoTrainSelected(NoTrainReason),

    #[error("more than one train number selected ({first}, {second})")]
    MultipleTrainsSelected { first: String, second: String },

    #[error("template `{0}` has no data table")]
    TemplateMissingTable(String),

    #[error("column schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReportError {
    /// Selection failures are reported to the user; everything else is a
    /// defect in the template, configuration or environment.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ReportError::NoTrainSelected(_) | ReportError::MultipleTrainsSelected { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            ReportError::MultipleTrainsSelected { .. } => {
                "Error: More than one train number is present in the filtered data. \
                 Please ensure only one train number is present."
                    .to_string()
            }
            ReportError::NoTrainSelected(NoTrainReason::EmptyTrainCell(cell)) => {
                format!("Train No is empty. Please provide a Train No in {}.", cell)
            }
            ReportError::NoTrainSelected(_) => {
                "Error: No train number found. Please check your data.".to_string()
            }
            other => format!("Error: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_match_sheet_alerts() {
        let empty_cell = ReportError::NoTrainSelected(NoTrainReason::EmptyTrainCell(
            CellAddress::new(6, 7),
        ));
        assert_eq!(
            empty_cell.user_message(),
            "Train No is empty. Please provide a Train No in G6."
        );

        let ambiguous = ReportError::MultipleTrainsSelected {
            first: "T1".to_string(),
            second: "T2".to_string(),
        };
        assert!(ambiguous.is_user_facing());
        assert!(ambiguous.user_message().starts_with("Error: More than one train number"));

        let missing = ReportError::TemplateMissingTable("tpl".to_string());
        assert!(!missing.is_user_facing());
        assert_eq!(missing.user_message(), "Error: template `tpl` has no data table");
    }
}
