use serde::{Deserialize, Serialize};

/// The two inspection report families, each backed by its own sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Functional,
    Visual,
}

impl ReportKind {
    pub fn label(self) -> &'static str {
        match self {
            ReportKind::Functional => "Functional",
            ReportKind::Visual => "Visual",
        }
    }

    /// Name of the sheet holding this kind's inspection rows.
    pub fn sheet_name(self) -> &'static str {
        match self {
            ReportKind::Functional => "Functional_Inspection_Report",
            ReportKind::Visual => "Visual_Inspection_Report",
        }
    }

    /// Top-level output folder, e.g. `Visual_Inspection_Reports`.
    pub fn folder_name(self) -> String {
        format!("{}s", self.sheet_name())
    }

    pub fn file_name(self, train_no: &str) -> String {
        format!("{} {} Inspection Report", train_no, self.label())
    }

    /// Text that replaces the train token, e.g. `T12 (Functional)`.
    pub fn train_display(self, train_no: &str) -> String {
        format!("{} ({})", train_no, self.label())
    }
}

/// How the rows of a report are chosen from the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Rows left visible by the sheet filter, verbatim.
    FilterDriven,
    /// Rows of the train number stored in the sheet, grouped by inspection.
    IdentifierDriven,
}
