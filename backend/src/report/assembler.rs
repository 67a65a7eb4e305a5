use crate::report::document::{ReportDocument, Table, TableRow};
use crate::report::error::ReportError;
use crate::report::image::ImageResolver;
use crate::report::selection::PlaceholderRemoval;
use common::model::column::{ColumnSchema, Field};
use common::model::inspection::TrainSelection;
use common::model::report::ReportKind;
use log::{debug, error, info};

/// Index of the token row in a template's data table, right below the headings.
const PLACEHOLDER_ROW: usize = 1;

/// Counts reported back after a document has been populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblySummary {
    pub rows_written: usize,
    pub images_embedded: usize,
}

/// Fills a template copy with the rows of one train.
pub struct ReportAssembler<'a> {
    schema: &'a ColumnSchema,
    images: &'a ImageResolver,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(schema: &'a ColumnSchema, images: &'a ImageResolver) -> Self {
        Self { schema, images }
    }

    /// Populates `doc`. `on_row` is called after each appended row with the
    /// number of rows written so far and the total.
    pub fn assemble(
        &self,
        doc: &mut ReportDocument,
        kind: ReportKind,
        selection: &TrainSelection,
        removal: PlaceholderRemoval,
        mut on_row: impl FnMut(usize, usize),
    ) -> Result<AssemblySummary, ReportError> {
        let train_token = Field::TrainNo.token();
        let train_display = kind.train_display(&selection.train_no);
        doc.replace_body_text(train_token, &train_display);
        doc.replace_header_text(train_token, &train_display);

        for token in self.schema.tokens().filter(|token| *token != train_token) {
            doc.replace_body_text(token, "");
        }

        let title = doc.title().to_string();
        let Some(table) = doc.first_table_mut() else {
            error!("template copy `{}` has no data table", title);
            return Err(ReportError::TemplateMissingTable(title));
        };

        // A header-only table has no token row to drop.
        let has_placeholder = table.num_rows() > PLACEHOLDER_ROW;
        if has_placeholder && removal == PlaceholderRemoval::BeforePopulate {
            remove_placeholder_row(table);
        }

        let total = selection.rows.len();
        let mut summary = AssemblySummary::default();
        for (index, row) in selection.rows.iter().enumerate() {
            let mut line = TableRow::new();
            line.append_text((index + 1).to_string());
            for field in Field::PRESENTATION {
                line.append_text(row.value(self.schema, field)?);
            }

            let outcome = self.images.resolve(row.value(self.schema, Field::ImageUrl)?);
            if outcome.is_embedded() {
                summary.images_embedded += 1;
            }
            line.append_cell(outcome.into_cell());

            table.append_row(line);
            summary.rows_written += 1;
            on_row(summary.rows_written, total);
        }

        if has_placeholder && removal == PlaceholderRemoval::AfterPopulate {
            remove_placeholder_row(table);
        }

        info!(
            "populated {} rows ({} with images) for train {}",
            summary.rows_written, summary.images_embedded, selection.train_no
        );
        Ok(summary)
    }
}

fn remove_placeholder_row(table: &mut Table) {
    table.remove_row(PLACEHOLDER_ROW);
    debug!("removed template placeholder row");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::document::{Block, Cell};
    use crate::report::image::{FetchError, FetchedImage, ImageFetcher, ImageSize};
    use common::model::inspection::InspectionRow;
    use common::model::template::{Template, TemplateBlock};
    use pretty_assertions::assert_eq;

    struct PngFetcher;

    impl ImageFetcher for PngFetcher {
        fn fetch(&self, _locator: &str) -> Result<FetchedImage, FetchError> {
            Ok(FetchedImage {
                content_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            })
        }
    }

    fn token_row() -> Vec<String> {
        let mut cells = vec![String::new()];
        cells.extend(Field::PRESENTATION.iter().map(|f| f.token().to_string()));
        cells.push(Field::ImageUrl.token().to_string());
        cells
    }

    fn template() -> Template {
        Template {
            id: "visual".to_string(),
            name: "Visual".to_string(),
            header: vec!["Train: {{trainNo}}".to_string()],
            body: vec![
                TemplateBlock::Paragraph {
                    text: "Inspection of {{trainNo}} by {{UserName}}".to_string(),
                },
                TemplateBlock::Table {
                    rows: vec![
                        vec!["No".to_string(), "Location".to_string()],
                        token_row(),
                    ],
                },
            ],
        }
    }

    fn schema() -> ColumnSchema {
        ColumnSchema::default()
    }

    fn inspection(train: &str, insp: &str, img_id: &str, url: &str, location: &str) -> InspectionRow {
        let schema = schema();
        let mut cells = vec![String::new(); schema.widest_column()];
        let mut set = |field: Field, value: &str| {
            cells[schema.index_of(field).unwrap()] = value.to_string();
        };
        set(Field::TrainNo, train);
        set(Field::InspectionId, insp);
        set(Field::ImageId, img_id);
        set(Field::ImageUrl, url);
        set(Field::Location, location);
        set(Field::Remarks, "ok");
        InspectionRow::new(cells)
    }

    fn resolver() -> ImageResolver {
        ImageResolver::new(Box::new(PngFetcher), ImageSize::default())
    }

    fn assemble(
        selection: &TrainSelection,
        removal: PlaceholderRemoval,
    ) -> (ReportDocument, AssemblySummary) {
        let schema = schema();
        let images = resolver();
        let mut doc = ReportDocument::from_template(&template(), "T1 Visual Inspection Report");
        let summary = ReportAssembler::new(&schema, &images)
            .assemble(&mut doc, ReportKind::Visual, selection, removal, |_, _| {})
            .unwrap();
        (doc, summary)
    }

    #[test]
    fn unphotographed_row_gets_no_image_label() {
        let selection = TrainSelection {
            train_no: "T1".to_string(),
            rows: vec![inspection("T1", "I1", "", "", "Cab")],
        };

        let (doc, summary) = assemble(&selection, PlaceholderRemoval::AfterPopulate);
        let table = doc.tables().next().unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(summary.rows_written, 1);

        let cells = table.rows()[1].cells();
        assert_eq!(cells.len(), 12);
        assert_eq!(cells[0], Cell::Text("1".to_string()));
        assert_eq!(cells[1], Cell::Text("Cab".to_string()));
        assert_eq!(cells[10], Cell::Text("ok".to_string()));
        assert_eq!(cells[11], Cell::Text("No image available".to_string()));
    }

    #[test]
    fn photographed_row_embeds_image() {
        let selection = TrainSelection {
            train_no: "T1".to_string(),
            rows: vec![inspection("T1", "I1", "IMG1", "http://x/a.png", "Bogie")],
        };

        let (doc, summary) = assemble(&selection, PlaceholderRemoval::BeforePopulate);
        assert_eq!(summary.images_embedded, 1);
        let table = doc.tables().next().unwrap();
        assert_eq!(table.num_rows(), 2);
        match &table.rows()[1].cells()[11] {
            Cell::Image(image) => {
                assert_eq!((image.width, image.height), (100, 100));
                assert_eq!(image.bytes, vec![1, 2, 3]);
            }
            other => panic!("expected embedded image, got {:?}", other),
        }
    }

    #[test]
    fn replaces_train_token_and_sweeps_the_rest() {
        let selection = TrainSelection {
            train_no: "T1".to_string(),
            rows: vec![inspection("T1", "I1", "", "", "Cab")],
        };
        let (doc, _) = assemble(&selection, PlaceholderRemoval::AfterPopulate);

        assert_eq!(doc.header(), ["Train: T1 (Visual)".to_string()]);
        assert_eq!(
            doc.body()[0],
            Block::Paragraph("Inspection of T1 (Visual) by ".to_string())
        );
    }

    #[test]
    fn placeholder_row_never_survives() {
        let selection = TrainSelection {
            train_no: "T1".to_string(),
            rows: vec![
                inspection("T1", "I1", "", "", "A"),
                inspection("T1", "I2", "", "", "B"),
                inspection("T1", "I3", "", "", "C"),
            ],
        };

        for removal in [PlaceholderRemoval::BeforePopulate, PlaceholderRemoval::AfterPopulate] {
            let (doc, _) = assemble(&selection, removal);
            let table = doc.tables().next().unwrap();
            assert_eq!(table.num_rows(), 4);

            let numbers: Vec<_> = table.rows()[1..]
                .iter()
                .map(|row| row.cells()[0].text().unwrap().to_string())
                .collect();
            assert_eq!(numbers, vec!["1", "2", "3"]);

            let tokens = token_row();
            assert!(table.rows().iter().all(|row| {
                row.cells().iter().map(|c| c.text().unwrap_or("")).collect::<Vec<_>>()
                    != tokens.iter().map(String::as_str).collect::<Vec<_>>()
            }));
        }
    }

    #[test]
    fn header_only_table_keeps_every_data_row() {
        let mut header_only = template();
        header_only.body[1] = TemplateBlock::Table {
            rows: vec![vec!["No".to_string(), "Location".to_string()]],
        };
        let selection = TrainSelection {
            train_no: "T1".to_string(),
            rows: vec![
                inspection("T1", "I1", "", "", "A"),
                inspection("T1", "I2", "", "", "B"),
            ],
        };
        let schema = schema();
        let images = resolver();

        for removal in [PlaceholderRemoval::BeforePopulate, PlaceholderRemoval::AfterPopulate] {
            let mut doc = ReportDocument::from_template(&header_only, "doc");
            ReportAssembler::new(&schema, &images)
                .assemble(&mut doc, ReportKind::Visual, &selection, removal, |_, _| {})
                .unwrap();

            let table = doc.tables().next().unwrap();
            assert_eq!(table.num_rows(), 3);
            assert_eq!(table.rows()[0].cells()[0], Cell::Text("No".to_string()));
            let locations: Vec<_> = table.rows()[1..]
                .iter()
                .map(|row| row.cells()[1].clone())
                .collect();
            assert_eq!(
                locations,
                vec![Cell::Text("A".to_string()), Cell::Text("B".to_string())]
            );
        }
    }

    #[test]
    fn template_without_table_is_fatal() {
        let schema = schema();
        let images = resolver();
        let mut doc = ReportDocument::new("broken");
        doc.push_paragraph("{{trainNo}}");
        let selection = TrainSelection {
            train_no: "T1".to_string(),
            rows: vec![inspection("T1", "I1", "", "", "Cab")],
        };

        let result = ReportAssembler::new(&schema, &images).assemble(
            &mut doc,
            ReportKind::Functional,
            &selection,
            PlaceholderRemoval::BeforePopulate,
            |_, _| {},
        );
        assert!(matches!(result, Err(ReportError::TemplateMissingTable(title)) if title == "broken"));
    }

    #[test]
    fn reports_progress_per_row() {
        let schema = schema();
        let images = resolver();
        let mut doc = ReportDocument::from_template(&template(), "doc");
        let selection = TrainSelection {
            train_no: "T1".to_string(),
            rows: vec![
                inspection("T1", "I1", "", "", "A"),
                inspection("T1", "I2", "", "", "B"),
            ],
        };

        let mut seen = Vec::new();
        ReportAssembler::new(&schema, &images)
            .assemble(
                &mut doc,
                ReportKind::Functional,
                &selection,
                PlaceholderRemoval::AfterPopulate,
                |done, total| seen.push((done, total)),
            )
            .unwrap();
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }
}
