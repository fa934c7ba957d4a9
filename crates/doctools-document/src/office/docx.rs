// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word (.docx) output.

use std::io::Cursor;

use docx_rs::{
    BreakType, Docx, Paragraph, Pic, Run, Style, StyleType, Table, TableCell, TableRow,
};
use doctools_core::error::DoctoolsError;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument};

use super::clean_text;
use crate::tables::Block;

const TITLE_STYLE: &str = "Title";

/// Word's default 96 dpi.
const EMU_PER_PIXEL: u64 = 9525;

/// Pictures wider than the text area (6 inches) are scaled down to fit.
const MAX_PICTURE_WIDTH_EMU: u64 = 6 * 914_400;

/// Builder for a Word document.
///
/// Methods consume and return `self` so content can be chained:
///
/// ```ignore
/// let bytes = WordDocument::new()
///     .title("Extract from picture")
///     .paragraph("first line")
///     .into_bytes()?;
/// ```
pub struct WordDocument {
    docx: Docx,
    paragraphs: usize,
    tables: usize,
    pictures: usize,
}

impl Default for WordDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl WordDocument {
    pub fn new() -> Self {
        let title_style = Style::new(TITLE_STYLE, StyleType::Paragraph)
            .name(TITLE_STYLE)
            .size(40)
            .bold();
        Self {
            docx: Docx::new().add_style(title_style),
            paragraphs: 0,
            tables: 0,
            pictures: 0,
        }
    }

    /// Add a heading paragraph in the title style.
    pub fn title(mut self, text: &str) -> Self {
        let paragraph = Paragraph::new()
            .style(TITLE_STYLE)
            .add_run(Run::new().add_text(clean_text(text)));
        self.docx = self.docx.add_paragraph(paragraph);
        self.paragraphs += 1;
        self
    }

    /// Add one paragraph of body text.
    pub fn paragraph(mut self, text: &str) -> Self {
        self.docx = self
            .docx
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(clean_text(text))));
        self.paragraphs += 1;
        self
    }

    /// Add an empty paragraph.
    pub fn blank(mut self) -> Self {
        self.docx = self.docx.add_paragraph(Paragraph::new());
        self
    }

    /// Add a table. Row 0 is rendered bold as the header; short rows are
    /// padded so every row has the same number of cells.
    pub fn table(mut self, rows: &[Vec<String>]) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return self;
        }

        let table_rows = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let cells = (0..width)
                    .map(|col| {
                        let text = row.get(col).map(String::as_str).unwrap_or("");
                        let mut run = Run::new().add_text(clean_text(text));
                        if index == 0 {
                            run = run.bold();
                        }
                        TableCell::new().add_paragraph(Paragraph::new().add_run(run))
                    })
                    .collect();
                TableRow::new(cells)
            })
            .collect();

        self.docx = self.docx.add_table(Table::new(table_rows));
        self.tables += 1;
        self
    }

    /// Add a picture in its own paragraph, stored as PNG.
    pub fn picture(mut self, image: &DynamicImage) -> Result<Self, DoctoolsError> {
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|err| DoctoolsError::Writer {
                format: "Word",
                detail: format!("picture encoding failed: {err}"),
            })?;

        let (width, height) = (image.width(), image.height());
        let (width_emu, height_emu) = picture_size(width, height);
        let pic = Pic::new_with_dimensions(png.into_inner(), width, height).size(width_emu, height_emu);
        self.docx = self
            .docx
            .add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)));
        self.pictures += 1;
        Ok(self)
    }

    /// Start a new page.
    pub fn page_break(mut self) -> Self {
        self.docx = self
            .docx
            .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
        self
    }

    /// Append segmented page content: text lines become paragraphs, gaps
    /// become empty paragraphs, tables become Word tables.
    pub fn blocks(self, blocks: &[Block]) -> Self {
        blocks.iter().fold(self, |doc, block| match block {
            Block::Text(text) => doc.paragraph(text),
            Block::Gap => doc.blank(),
            Block::Table(rows) => doc.table(rows),
        })
    }

    /// Serialise to `.docx` bytes.
    #[instrument(
        skip(self),
        fields(paragraphs = self.paragraphs, tables = self.tables, pictures = self.pictures)
    )]
    pub fn into_bytes(self) -> Result<Vec<u8>, DoctoolsError> {
        let mut cursor = Cursor::new(Vec::new());
        self.docx
            .build()
            .pack(&mut cursor)
            .map_err(|err| DoctoolsError::Writer {
                format: "Word",
                detail: err.to_string(),
            })?;
        let bytes = cursor.into_inner();
        debug!(size = bytes.len(), "Word document written");
        Ok(bytes)
    }
}

/// Display size in EMU, keeping the aspect ratio.
fn picture_size(width_px: u32, height_px: u32) -> (u32, u32) {
    let width = u64::from(width_px) * EMU_PER_PIXEL;
    let height = u64::from(height_px) * EMU_PER_PIXEL;
    let (width, height) = if width > MAX_PICTURE_WIDTH_EMU {
        (MAX_PICTURE_WIDTH_EMU, height * MAX_PICTURE_WIDTH_EMU / width)
    } else {
        (width, height)
    };
    (
        u32::try_from(width).unwrap_or(u32::MAX),
        u32::try_from(height).unwrap_or(u32::MAX),
    )
}
