use crate::model::column::{ColumnSchema, Field, SchemaError};
use crate::model::inspection::InspectionRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Accepts a row when its `field` value is one of `values`.
///
/// An empty `values` list leaves the column unfiltered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriterion {
    pub field: Field,
    pub values: Vec<String>,
}

/// Filter state applied to a sheet by the user.
///
/// A row is suppressed when it is hidden explicitly or rejected by any
/// criterion. Row numbers are 1-based sheet rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetFilter {
    #[serde(default)]
    pub criteria: Vec<FilterCriterion>,
    #[serde(default)]
    pub hidden_rows: BTreeSet<usize>,
}

impl SheetFilter {
    pub fn suppresses(
        &self,
        row_number: usize,
        row: &InspectionRow,
        schema: &ColumnSchema,
    ) -> Result<bool, SchemaError> {
        if self.hidden_rows.contains(&row_number) {
            return Ok(true);
        }
        for criterion in &self.criteria {
            if criterion.values.is_empty() {
                continue;
            }
            let value = row.trimmed(schema, criterion.field)?;
            if !criterion.values.iter().any(|accepted| accepted.trim() == value) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(train: &str, location: &str) -> InspectionRow {
        InspectionRow::new(vec![train.to_string(), location.to_string()])
    }

    fn schema() -> ColumnSchema {
        ColumnSchema::new([(Field::TrainNo, 1), (Field::Location, 2)]).unwrap()
    }

    #[test]
    fn hidden_rows_are_suppressed() {
        let filter = SheetFilter {
            criteria: vec![],
            hidden_rows: [12].into_iter().collect(),
        };
        assert_eq!(filter.suppresses(12, &row("T1", "A"), &schema()), Ok(true));
        assert_eq!(filter.suppresses(13, &row("T1", "A"), &schema()), Ok(false));
    }

    #[test]
    fn criteria_compare_trimmed_values() {
        let filter = SheetFilter {
            criteria: vec![FilterCriterion {
                field: Field::TrainNo,
                values: vec!["T1".to_string()],
            }],
            hidden_rows: BTreeSet::new(),
        };
        assert_eq!(filter.suppresses(10, &row(" T1", "A"), &schema()), Ok(false));
        assert_eq!(filter.suppresses(11, &row("T2", "A"), &schema()), Ok(true));
    }

    #[test]
    fn empty_criterion_accepts_everything() {
        let filter = SheetFilter {
            criteria: vec![FilterCriterion {
                field: Field::Location,
                values: vec![],
            }],
            hidden_rows: BTreeSet::new(),
        };
        assert_eq!(filter.suppresses(10, &row("T9", ""), &schema()), Ok(false));
    }
}
