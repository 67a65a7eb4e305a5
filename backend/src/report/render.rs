//! Turns a populated [`ReportDocument`] into a PDF file.

use crate::report::document::{Block, Cell, EmbeddedImage, PageSetup, ReportDocument, Table};
use crate::report::image::LOAD_FAILURE_PREFIX;
use genpdf::elements::{Break, FrameCellDecorator, Image as PdfImage, LinearLayout, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::{Document, Element as _, Margins, SimplePageDecorator, Size};
use image::imageops::FilterType;
use image::{load_from_memory, DynamicImage};
use log::{debug, warn};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const MM_PER_PT: f64 = 25.4 / 72.0;
/// One image pixel per PDF point.
const IMAGE_DPI: f64 = 72.0;
const FONT_SIZE_PT: u8 = 8;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no usable font in {dir}: {source}")]
    Font {
        dir: PathBuf,
        source: genpdf::error::Error,
    },

    #[error("pdf rendering failed: {0}")]
    Pdf(#[from] genpdf::error::Error),

    #[error("image preparation failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("png encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Output format of stored reports.
pub trait DocumentRenderer {
    /// File extension, without the dot.
    fn extension(&self) -> &str;

    fn render(&self, doc: &ReportDocument, out: &mut dyn Write) -> Result<(), RenderError>;
}

pub struct PdfRenderer {
    fonts_dir: PathBuf,
}

impl PdfRenderer {
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
        }
    }

    /// Arial when available, LiberationSans otherwise.
    fn load_font(&self) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, RenderError> {
        if let Ok(family) = genpdf::fonts::from_files(&self.fonts_dir, "Arial", None) {
            return Ok(family);
        }
        genpdf::fonts::from_files(&self.fonts_dir, "LiberationSans", None).map_err(|source| {
            RenderError::Font {
                dir: self.fonts_dir.clone(),
                source,
            }
        })
    }

    fn configure(&self, doc: &ReportDocument) -> Result<Document, RenderError> {
        let mut pdf = Document::new(self.load_font()?);
        pdf.set_title(doc.title());
        pdf.set_font_size(FONT_SIZE_PT);
        pdf.set_line_spacing(1.0);

        let page = doc.page();
        pdf.set_paper_size(paper_size(page));

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(margins(page));
        let header = doc.header().to_vec();
        if !header.is_empty() {
            decorator.set_header(move |_page| {
                let mut layout = LinearLayout::vertical();
                for line in &header {
                    layout.push(Paragraph::new(line.clone()).styled(Style::new().bold()));
                }
                layout.push(Break::new(1));
                layout
            });
        }
        pdf.set_page_decorator(decorator);
        Ok(pdf)
    }
}

impl DocumentRenderer for PdfRenderer {
    fn extension(&self) -> &str {
        "pdf"
    }

    fn render(&self, doc: &ReportDocument, out: &mut dyn Write) -> Result<(), RenderError> {
        let mut pdf = self.configure(doc)?;

        // Image elements are built from these files; keep them until rendering ends.
        let mut temp_files: Vec<NamedTempFile> = Vec::new();

        for block in doc.body() {
            match block {
                Block::Paragraph(text) => push_text(&mut pdf, text),
                Block::Table(table) => {
                    if table.num_columns() == 0 {
                        continue;
                    }
                    pdf.push(build_table(table, &mut temp_files)?);
                    pdf.push(Break::new(1));
                }
            }
        }

        pdf.render(out)?;
        debug!("rendered `{}` with {} images", doc.title(), temp_files.len());
        Ok(())
    }
}

fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_PT
}

fn paper_size(page: &PageSetup) -> Size {
    Size::new(pt_to_mm(page.width_pt), pt_to_mm(page.height_pt))
}

fn margins(page: &PageSetup) -> Margins {
    Margins::trbl(
        pt_to_mm(page.margin_top_pt),
        pt_to_mm(page.margin_right_pt),
        pt_to_mm(page.margin_bottom_pt),
        pt_to_mm(page.margin_left_pt),
    )
}

/// Keeps line breaks inside a paragraph.
fn push_text(pdf: &mut Document, text: &str) {
    let lines: Vec<&str> = text.split('\n').collect();
    for (i, line) in lines.iter().enumerate() {
        pdf.push(Paragraph::new(line.to_string()));
        if i < lines.len() - 1 {
            pdf.push(Break::new(1));
        }
    }
}

/// Narrow sequence column, wide image columns.
fn column_weights(table: &Table) -> Vec<usize> {
    (0..table.num_columns())
        .map(|column| {
            let holds_image = table
                .rows()
                .iter()
                .any(|row| matches!(row.cells().get(column), Some(Cell::Image(_))));
            match column {
                _ if holds_image => 3,
                0 => 1,
                _ => 2,
            }
        })
        .collect()
}

fn build_table(table: &Table, temp_files: &mut Vec<NamedTempFile>) -> Result<TableLayout, RenderError> {
    let columns = table.num_columns();
    let mut layout = TableLayout::new(column_weights(table));
    layout.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    for (index, row) in table.rows().iter().enumerate() {
        let style = if index == 0 {
            Style::new().bold()
        } else {
            Style::new()
        };
        let mut line = layout.row();
        for cell in row.cells() {
            match cell {
                Cell::Text(text) => {
                    line.push_element(Paragraph::new(text.clone()).styled(style).padded(1));
                }
                Cell::Image(image) => match prepare_image(image) {
                    Ok(file) => {
                        let mut element = PdfImage::from_path(file.path())?;
                        element.set_dpi(IMAGE_DPI);
                        temp_files.push(file);
                        line.push_element(element.padded(1));
                    }
                    Err(e) => {
                        warn!("embedded image could not be decoded: {}", e);
                        line.push_element(Paragraph::new(failure_label(&e)).padded(1));
                    }
                },
            }
        }
        // Short rows are padded so every row spans the full width.
        for _ in row.cells().len()..columns {
            line.push_element(Paragraph::new(""));
        }
        line.push()?;
    }
    Ok(layout)
}

/// Same wording as a failed download, so both read alike in the report.
fn failure_label(error: &RenderError) -> String {
    format!("{}{}", LOAD_FAILURE_PREFIX, error)
}

/// Scales to the requested size, flattens alpha over white and writes an RGB
/// PNG the PDF backend can embed.
fn prepare_image(image: &EmbeddedImage) -> Result<NamedTempFile, RenderError> {
    let decoded = load_from_memory(&image.bytes)?;
    let resized = decoded.resize_exact(image.width.max(1), image.height.max(1), FilterType::Lanczos3);

    let rgba = resized.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut background = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &rgba, 0, 0);
    let raw = DynamicImage::ImageRgba8(background).to_rgb8().into_raw();

    let mut tmp = tempfile::Builder::new().suffix(".png").tempfile()?;
    {
        let mut encoder = PngEncoder::new(tmp.as_file_mut(), w, h);
        encoder.set_color(PngColorType::Rgb);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&raw)?;
    }
    Ok(tmp)
}

/// Whether `dir` holds one of the font families the renderer can use.
pub fn fonts_available(dir: &Path) -> bool {
    ["Arial-Regular.ttf", "LiberationSans-Regular.ttf"]
        .iter()
        .any(|file| dir.join(file).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::document::TableRow;
    use crate::report::image::ImageOutcome;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 0]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn a4_landscape_converts_to_millimetres() {
        let page = PageSetup::A4_LANDSCAPE;
        assert!((pt_to_mm(page.width_pt) - 297.0).abs() < 0.1);
        assert!((pt_to_mm(page.height_pt) - 210.0).abs() < 0.1);
        assert!((pt_to_mm(page.margin_left_pt) - 12.7).abs() < 0.01);
    }

    #[test]
    fn image_is_scaled_and_flattened() {
        let image = EmbeddedImage {
            bytes: png_bytes(300, 40),
            width: 100,
            height: 100,
        };
        let file = prepare_image(&image).unwrap();

        let written = image::open(file.path()).unwrap();
        assert_eq!((written.width(), written.height()), (100, 100));
        assert!(matches!(written, DynamicImage::ImageRgb8(_)));
        // Fully transparent pixels end up white.
        assert_eq!(written.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn undecodable_bytes_are_an_image_error() {
        let image = EmbeddedImage {
            bytes: b"<html></html>".to_vec(),
            width: 100,
            height: 100,
        };
        assert!(matches!(prepare_image(&image), Err(RenderError::Image(_))));
    }

    #[test]
    fn decode_failure_reads_like_a_fetch_failure() {
        let image = EmbeddedImage {
            bytes: b"<html></html>".to_vec(),
            width: 100,
            height: 100,
        };
        let Err(error) = prepare_image(&image) else {
            panic!("html decoded as an image");
        };
        let label = failure_label(&error);
        let fetch_label = ImageOutcome::FetchFailed(error.to_string()).into_cell();
        assert_eq!(Cell::Text(label), fetch_label);
    }

    #[test]
    fn image_columns_are_widest() {
        let mut table = Table::default();
        let mut heading = TableRow::new();
        heading.append_text("No").append_text("Location").append_text("Image");
        table.append_row(heading);
        let mut row = TableRow::new();
        row.append_text("1").append_text("Cab").append_cell(Cell::Image(EmbeddedImage {
            bytes: Vec::new(),
            width: 100,
            height: 100,
        }));
        table.append_row(row);

        assert_eq!(column_weights(&table), vec![1, 2, 3]);
    }

    #[test]
    fn missing_fonts_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!fonts_available(dir.path()));
        std::fs::write(dir.path().join("LiberationSans-Regular.ttf"), b"").unwrap();
        assert!(fonts_available(dir.path()));
    }

    #[test]
    fn pdf_extension() {
        assert_eq!(PdfRenderer::new("./fonts").extension(), "pdf");
    }
}
