//! In-memory report document.
//!
//! A document is a header region plus a body of paragraphs and tables. The
//! assembler mutates it through token replacement and table row edits; the
//! renderer turns the finished document into a file.

use common::model::template::{Template, TemplateBlock};
use serde::{Deserialize, Serialize};

/// Page geometry in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    pub width_pt: f64,
    pub height_pt: f64,
    pub margin_top_pt: f64,
    pub margin_bottom_pt: f64,
    pub margin_left_pt: f64,
    pub margin_right_pt: f64,
}

impl PageSetup {
    /// A4 landscape with half-inch margins.
    pub const A4_LANDSCAPE: PageSetup = PageSetup {
        width_pt: 842.0,
        height_pt: 595.0,
        margin_top_pt: 36.0,
        margin_bottom_pt: 36.0,
        margin_left_pt: 36.0,
        margin_right_pt: 36.0,
    };
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Cell {
    Text(String),
    Image(EmbeddedImage),
}

impl Cell {
    pub fn text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            Cell::Image(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableRow {
    cells: Vec<Cell>,
}

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.cells.push(Cell::Text(text.into()));
        self
    }

    pub fn append_cell(&mut self, cell: Cell) -> &mut Self {
        self.cells.push(cell);
        self
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    rows: Vec<TableRow>,
}

impl Table {
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn append_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    pub fn remove_row(&mut self, index: usize) -> Option<TableRow> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Widest row, which fixes the rendered column count.
    pub fn num_columns(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }

    fn replace_text(&mut self, token: &str, replacement: &str) -> usize {
        let mut replaced = 0;
        for row in &mut self.rows {
            for cell in &mut row.cells {
                if let Cell::Text(text) = cell {
                    replaced += replace_in(text, token, replacement);
                }
            }
        }
        replaced
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Block {
    Paragraph(String),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    title: String,
    page: PageSetup,
    header: Vec<String>,
    body: Vec<Block>,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            page: PageSetup::default(),
            header: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Instantiates `template` as a fresh document named `title`.
    pub fn from_template(template: &Template, title: impl Into<String>) -> Self {
        let mut doc = Self::new(title);
        doc.header = template.header.clone();
        doc.body = template
            .body
            .iter()
            .map(|block| match block {
                TemplateBlock::Paragraph { text } => Block::Paragraph(text.clone()),
                TemplateBlock::Table { rows } => Block::Table(Table {
                    rows: rows
                        .iter()
                        .map(|cells| TableRow {
                            cells: cells.iter().cloned().map(Cell::Text).collect(),
                        })
                        .collect(),
                }),
            })
            .collect();
        doc
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn page(&self) -> &PageSetup {
        &self.page
    }

    pub fn set_page_size(&mut self, width_pt: f64, height_pt: f64) {
        self.page.width_pt = width_pt;
        self.page.height_pt = height_pt;
    }

    pub fn set_margins(&mut self, top: f64, bottom: f64, left: f64, right: f64) {
        self.page.margin_top_pt = top;
        self.page.margin_bottom_pt = bottom;
        self.page.margin_left_pt = left;
        self.page.margin_right_pt = right;
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn body(&self) -> &[Block] {
        &self.body
    }

    pub fn push_paragraph(&mut self, text: impl Into<String>) {
        self.body.push(Block::Paragraph(text.into()));
    }

    pub fn push_table(&mut self, table: Table) {
        self.body.push(Block::Table(table));
    }

    /// Replaces `token` in body paragraphs and table text cells.
    /// Returns the number of occurrences replaced.
    pub fn replace_body_text(&mut self, token: &str, replacement: &str) -> usize {
        let mut replaced = 0;
        for block in &mut self.body {
            replaced += match block {
                Block::Paragraph(text) => replace_in(text, token, replacement),
                Block::Table(table) => table.replace_text(token, replacement),
            };
        }
        replaced
    }

    pub fn replace_header_text(&mut self, token: &str, replacement: &str) -> usize {
        self.header
            .iter_mut()
            .map(|text| replace_in(text, token, replacement))
            .sum()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        })
    }

    pub fn first_table_mut(&mut self) -> Option<&mut Table> {
        self.body.iter_mut().find_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        })
    }
}

fn replace_in(text: &mut String, token: &str, replacement: &str) -> usize {
    if token.is_empty() {
        return 0;
    }
    let count = text.matches(token).count();
    if count > 0 {
        *text = text.replace(token, replacement);
    }
    count
}
