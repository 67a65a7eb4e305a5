//! Row selection strategies.
//!
//! A selector turns the inspection sheet into the rows of exactly one report.
//! Both strategies either return a non-empty selection for a single train or
//! fail; neither touches a document.

use crate::config::SheetLayout;
use crate::report::error::{NoTrainReason, ReportError};
use crate::report::sheet::{CellAddress, SheetReader};
use common::model::column::{ColumnSchema, Field, SchemaError};
use common::model::inspection::{InspectionRow, TrainSelection};
use common::model::report::SelectionStrategy;
use log::debug;
use std::collections::HashMap;

/// When the template's token row is dropped from the data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderRemoval {
    BeforePopulate,
    AfterPopulate,
}

pub trait RowSelector {
    fn select(
        &self,
        sheet: &dyn SheetReader,
        schema: &ColumnSchema,
    ) -> Result<TrainSelection, ReportError>;

    fn placeholder_removal(&self) -> PlaceholderRemoval;
}

pub fn selector_for(strategy: SelectionStrategy, layout: &SheetLayout) -> Box<dyn RowSelector> {
    match strategy {
        SelectionStrategy::FilterDriven => Box::new(FilterDriven {
            first_row: layout.first_data_row,
        }),
        SelectionStrategy::IdentifierDriven => Box::new(IdentifierDriven {
            first_row: layout.first_data_row,
            train_cell: layout.train_cell,
        }),
    }
}

/// Takes the rows the sheet filter leaves visible, verbatim.
///
/// Scanning stops at the first row whose train number differs from the one
/// already seen.
pub struct FilterDriven {
    pub first_row: usize,
}

impl RowSelector for FilterDriven {
    fn select(
        &self,
        sheet: &dyn SheetReader,
        schema: &ColumnSchema,
    ) -> Result<TrainSelection, ReportError> {
        if !sheet.has_active_filter() {
            return Err(ReportError::NoTrainSelected(NoTrainReason::NoActiveFilter));
        }

        let width = sheet.last_column().max(schema.widest_column());
        let mut train_no: Option<String> = None;
        let mut rows = Vec::new();

        for row_number in self.first_row..=sheet.last_row() {
            let cells = sheet
                .read_range(row_number, 1, 1, width)?
                .pop()
                .unwrap_or_default();
            let row = InspectionRow::new(cells);
            let candidate = row.trimmed(schema, Field::TrainNo)?.to_string();
            if candidate.is_empty() || sheet.is_row_suppressed(row_number)? {
                continue;
            }

            match &train_no {
                None => train_no = Some(candidate),
                Some(first) if *first != candidate => {
                    return Err(ReportError::MultipleTrainsSelected {
                        first: first.clone(),
                        second: candidate,
                    });
                }
                Some(_) => {}
            }
            rows.push(row);
        }

        let train_no =
            train_no.ok_or(ReportError::NoTrainSelected(NoTrainReason::NoVisibleRows))?;
        debug!("filter left {} visible rows for train {}", rows.len(), train_no);
        Ok(TrainSelection { train_no, rows })
    }

    fn placeholder_removal(&self) -> PlaceholderRemoval {
        PlaceholderRemoval::BeforePopulate
    }
}

/// Takes the rows of the train number stored in `train_cell`, one line per
/// photographed defect or one summary line per unphotographed inspection.
pub struct IdentifierDriven {
    pub first_row: usize,
    pub train_cell: CellAddress,
}

impl RowSelector for IdentifierDriven {
    fn select(
        &self,
        sheet: &dyn SheetReader,
        schema: &ColumnSchema,
    ) -> Result<TrainSelection, ReportError> {
        let train_no = sheet.read_cell(&self.train_cell)?.trim().to_string();
        if train_no.is_empty() {
            return Err(ReportError::NoTrainSelected(NoTrainReason::EmptyTrainCell(
                self.train_cell,
            )));
        }

        let row_count = (sheet.last_row() + 1).saturating_sub(self.first_row);
        let mut matching = Vec::new();
        for cells in sheet.read_range(self.first_row, 1, row_count, schema.widest_column())? {
            let row = InspectionRow::new(cells);
            if row.trimmed(schema, Field::TrainNo)? == train_no {
                matching.push(row);
            }
        }
        debug!("{} rows match train {}", matching.len(), train_no);

        let rows = group_by_inspection(matching, schema)?;
        if rows.is_empty() {
            return Err(ReportError::NoTrainSelected(NoTrainReason::NoMatchingRows(
                train_no,
            )));
        }
        Ok(TrainSelection { train_no, rows })
    }

    fn placeholder_removal(&self) -> PlaceholderRemoval {
        PlaceholderRemoval::AfterPopulate
    }
}

/// Collapses rows sharing an inspection id.
///
/// Groups keep the order of their first row. A group with any image id keeps
/// exactly its rows that have one; otherwise only its first row survives.
pub fn group_by_inspection(
    rows: Vec<InspectionRow>,
    schema: &ColumnSchema,
) -> Result<Vec<InspectionRow>, SchemaError> {
    let mut groups: Vec<Vec<InspectionRow>> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let key = row.trimmed(schema, Field::InspectionId)?.to_string();
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }

    let mut selected = Vec::new();
    for group in groups {
        let photographed = group
            .iter()
            .map(|row| row.trimmed(schema, Field::ImageId).map(|id| !id.is_empty()))
            .collect::<Result<Vec<bool>, _>>()?;

        if photographed.iter().any(|&has_image| has_image) {
            selected.extend(
                group
                    .into_iter()
                    .zip(photographed)
                    .filter_map(|(row, has_image)| has_image.then_some(row)),
            );
        } else if let Some(first) = group.into_iter().next() {
            selected.push(first);
        }
    }
    Ok(selected)
}
