//! One report run: select rows, copy the template, populate, store, write back.

use crate::config::ReportSettings;
use crate::report::assembler::ReportAssembler;
use crate::report::error::ReportError;
use crate::report::image::ImageResolver;
use crate::report::selection::{selector_for, RowSelector};
use crate::report::sheet::{SheetReader, SheetWriter};
use crate::report::store::ReportStore;
use crate::report::templates::TemplateSource;
use chrono::Local;
use common::model::report::{ReportKind, SelectionStrategy};
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message shown to whoever started the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

pub trait Notifier {
    fn notify(&self, notice: Notice);

    /// Called after each populated row.
    fn progress(&self, _rows_done: usize, _rows_total: usize) {}
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportReceipt {
    pub train_no: String,
    pub file_name: String,
    pub path: PathBuf,
    pub url: String,
    pub rows_written: usize,
    pub images_embedded: usize,
    pub generated_at: String,
}

pub struct ReportPipeline {
    settings: ReportSettings,
    templates: Box<dyn TemplateSource>,
    images: ImageResolver,
    store: Box<dyn ReportStore>,
    notifier: Box<dyn Notifier>,
}

impl ReportPipeline {
    pub fn new(
        settings: ReportSettings,
        templates: Box<dyn TemplateSource>,
        images: ImageResolver,
        store: Box<dyn ReportStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            templates,
            images,
            store,
            notifier,
        }
    }

    /// Generates the `kind` report from `sheet`. Success and selection
    /// failures are also sent to the notifier.
    pub fn run<S>(
        &self,
        kind: ReportKind,
        strategy: SelectionStrategy,
        sheet: &mut S,
    ) -> Result<ReportReceipt, ReportError>
    where
        S: SheetReader + SheetWriter,
    {
        info!("generating {} report ({:?})", kind.label(), strategy);
        let selector = selector_for(strategy, &self.settings.layout);

        let outcome = self.generate(kind, selector.as_ref(), sheet);
        match &outcome {
            Ok(receipt) => self.notifier.notify(Notice {
                level: NoticeLevel::Info,
                message: format!(
                    "Report generated and saved for Train No: {}",
                    receipt.train_no
                ),
            }),
            Err(e) if e.is_user_facing() => {
                info!("{} report not generated: {}", kind.label(), e);
                self.notifier.notify(Notice {
                    level: NoticeLevel::Error,
                    message: e.user_message(),
                });
            }
            Err(e) => error!("{} report failed: {}", kind.label(), e),
        }
        outcome
    }

    fn generate<S>(
        &self,
        kind: ReportKind,
        selector: &dyn RowSelector,
        sheet: &mut S,
    ) -> Result<ReportReceipt, ReportError>
    where
        S: SheetReader + SheetWriter,
    {
        let schema = &self.settings.schema;
        let selection = selector.select(&*sheet, schema)?;
        info!(
            "selected {} rows for train {}",
            selection.rows.len(),
            selection.train_no
        );

        let file_name = kind.file_name(&selection.train_no);
        let mut doc = self
            .templates
            .copy_template(self.settings.templates.id_for(kind), &file_name)?;
        let page = &self.settings.page;
        doc.set_page_size(page.width_pt, page.height_pt);
        doc.set_margins(
            page.margin_top_pt,
            page.margin_bottom_pt,
            page.margin_left_pt,
            page.margin_right_pt,
        );

        let summary = ReportAssembler::new(schema, &self.images).assemble(
            &mut doc,
            kind,
            &selection,
            selector.placeholder_removal(),
            |done, total| self.notifier.progress(done, total),
        )?;

        let root = self.store.root();
        let kind_folder = self.store.get_or_create_folder(&root, &kind.folder_name())?;
        let train_folder = self
            .store
            .get_or_create_folder(&kind_folder, &selection.train_no)?;
        let stored = self.store.save(&doc, &train_folder, &file_name)?;
        info!("saved {} to {}", file_name, stored.path.display());

        let generated_at = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let layout = &self.settings.layout;
        sheet.write_cell(&layout.report_name_cell, &file_name)?;
        sheet.write_cell(&layout.report_url_cell, &stored.url)?;
        sheet.write_cell(&layout.generated_at_cell, &generated_at)?;
        sheet.flush()?;

        Ok(ReportReceipt {
            train_no: selection.train_no,
            file_name,
            path: stored.path,
            url: stored.url,
            rows_written: summary.rows_written,
            images_embedded: summary.images_embedded,
            generated_at,
        })
    }
}
