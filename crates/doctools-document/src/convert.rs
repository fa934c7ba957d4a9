// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion dispatch.
//
// Every upload is routed by (document kind, requested target) to one of five
// paths: PDF text, image OCR, PDF to Word, PDF to Excel, image to Word. The
// converter is synchronous and CPU-bound; callers on an async runtime run it
// on a blocking thread.

use std::sync::Arc;

use doctools_core::config::{PdfSettings, PreprocessConfig, ServiceConfig};
use doctools_core::error::{DoctoolsError, Result};
use doctools_core::types::{
    ConversionPath, ConversionTarget, Converted, DetectedTable, DocumentKind, Extraction,
    ExtractionMethod,
};
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::image::ImageProcessor;
use crate::office::{WordDocument, tables_to_workbook};
use crate::pdf::{LayoutTextSource, PageLines, PdfReader, layout_source};
use crate::scan::{TextRecognizer, preprocess_for_ocr};
use crate::tables::{Block, segment_page, with_ruled_tables};

/// Heading of documents produced from images.
pub const IMAGE_DOCUMENT_TITLE: &str = "Extract from picture";

/// What a conversion produced.
#[derive(Debug, Clone)]
pub enum Output {
    Text(Extraction),
    File(Converted),
}

/// Routes uploads to the right processing path.
pub struct DocumentConverter {
    recognizer: Option<Arc<dyn TextRecognizer>>,
    layout: Arc<dyn LayoutTextSource>,
    preprocess: PreprocessConfig,
    pdf: PdfSettings,
}

impl DocumentConverter {
    // -- Construction ---------------------------------------------------------

    /// Build a converter from service settings. `recognizer` is `None` when
    /// OCR is disabled or its models could not be loaded; OCR paths then fail
    /// with [`DoctoolsError::OcrUnavailable`].
    pub fn new(config: &ServiceConfig, recognizer: Option<Arc<dyn TextRecognizer>>) -> Result<Self> {
        let layout: Arc<dyn LayoutTextSource> = Arc::from(layout_source(config.pdf.layout_backend)?);
        Ok(Self {
            recognizer,
            layout,
            preprocess: config.preprocess.clone(),
            pdf: config.pdf.clone(),
        })
    }

    /// Replace the layout text backend.
    pub fn with_layout_source(mut self, layout: Arc<dyn LayoutTextSource>) -> Self {
        self.layout = layout;
        self
    }

    pub fn ocr_ready(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Name of the OCR engine, if one is loaded.
    pub fn recognizer_name(&self) -> Option<&str> {
        self.recognizer.as_deref().map(|r| r.name())
    }

    // -- Dispatch -------------------------------------------------------------

    /// Convert an upload to `target`, choosing the path from the filename.
    pub fn process(&self, upload_name: &str, bytes: &[u8], target: ConversionTarget) -> Result<Output> {
        if target == ConversionTarget::Text {
            return Ok(Output::Text(self.extract(upload_name, bytes)?));
        }
        let path = ConversionPath::resolve(detect_kind(upload_name)?, target)?;
        Ok(Output::File(self.convert(path, upload_name, bytes)?))
    }

    /// Text of a PDF or image upload.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn extract(&self, upload_name: &str, bytes: &[u8]) -> Result<Extraction> {
        let path = ConversionPath::resolve(detect_kind(upload_name)?, ConversionTarget::Text)?;
        self.check_ready(path, upload_name)?;
        info!(?path, "Extracting text");
        match path {
            ConversionPath::PdfText => self.extract_pdf_text(bytes),
            _ => self.extract_image_text(bytes),
        }
    }

    /// Run a file-producing conversion path. The upload must be one of the
    /// kinds the path accepts.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn convert(&self, path: ConversionPath, upload_name: &str, bytes: &[u8]) -> Result<Converted> {
        self.check_ready(path, upload_name)?;
        info!(?path, "Converting upload");
        let (target, output) = match path {
            ConversionPath::PdfToWord => (ConversionTarget::Word, self.pdf_to_word(bytes)?),
            ConversionPath::PdfToExcel => (ConversionTarget::Excel, self.pdf_to_excel(bytes)?),
            ConversionPath::ImageToWord => (ConversionTarget::Word, self.image_to_word(bytes)?),
            ConversionPath::PdfText | ConversionPath::ImageOcr => {
                return Err(DoctoolsError::UnsupportedDocument(
                    "text extraction does not produce a file".into(),
                ));
            }
        };
        Ok(Converted {
            bytes: output,
            target,
            file_name: target.output_file_name(upload_name),
        })
    }

    /// Upload kind matches the path, and OCR is loaded if the path needs it.
    fn check_ready(&self, path: ConversionPath, upload_name: &str) -> Result<()> {
        let kind = detect_kind(upload_name)?;
        if !path.accepted_kinds().contains(&kind) {
            return Err(DoctoolsError::UnsupportedDocument(format!(
                "{} expects {}, got {}",
                upload_name,
                describe_kinds(path.accepted_kinds()),
                kind.mime_type()
            )));
        }
        if path.needs_ocr() && !self.ocr_ready() {
            return Err(DoctoolsError::OcrUnavailable("no OCR engine is loaded".into()));
        }
        Ok(())
    }

    // -- Paths ----------------------------------------------------------------

    /// Text of a PDF. Pages without a text layer are OCR'd from their
    /// embedded images when OCR is loaded and enabled for scanned pages.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn extract_pdf_text(&self, bytes: &[u8]) -> Result<Extraction> {
        let reader = PdfReader::from_bytes(bytes)?;
        let mut pages = reader.extract_pages()?;
        let mut ocr_pages = 0;

        for page in pages.iter_mut().filter(|p| p.is_blank()) {
            if let Some(text) = self.ocr_scanned_page(&reader, page.number) {
                page.text = text;
                ocr_pages += 1;
            }
        }

        let method = match ocr_pages {
            0 => ExtractionMethod::Native,
            n if n == pages.len() => ExtractionMethod::Ocr,
            _ => ExtractionMethod::Mixed,
        };
        let text = crate::pdf::reader::join_pages(&pages);
        debug!(pages = pages.len(), ocr_pages, chars = text.len(), "PDF text extracted");

        Ok(Extraction {
            text,
            method,
            pages: pages.len(),
        })
    }

    /// Text of a PNG or JPEG image.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn extract_image_text(&self, bytes: &[u8]) -> Result<Extraction> {
        let image = ImageProcessor::from_bytes(bytes)?.into_dynamic();
        let text = self.ocr_image(image)?;
        Ok(Extraction {
            text: text.trim().to_string(),
            method: ExtractionMethod::Ocr,
            pages: 1,
        })
    }

    /// Word document with one section per PDF page. Ruled grids and aligned
    /// columns become Word tables; images drawn on a page follow its text.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn pdf_to_word(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let pages = self.layout_pages(bytes)?;
        let scanned = self.scanned_page_text(bytes, &pages)?;
        let reader = graphics_reader(bytes);

        let mut document = WordDocument::new();
        for (index, page) in pages.iter().enumerate() {
            if index > 0 {
                document = document.page_break();
            }
            document = match scanned.iter().find(|(number, _)| *number == page.page) {
                Some((_, text)) => text.lines().fold(document, |doc, line| doc.paragraph(line)),
                None => document.blocks(&page_blocks(reader.as_ref(), page)),
            };
            for picture in page_pictures(reader.as_ref(), page.page) {
                document = document.picture(&picture)?;
            }
        }
        document.into_bytes()
    }

    /// Workbook with one sheet per table found in the PDF.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn pdf_to_excel(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let tables = self.detect_tables(bytes)?;
        info!(tables = tables.len(), "Tables detected");
        tables_to_workbook(&tables)
    }

    /// Word document holding the OCR text of an image under a fixed heading.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn image_to_word(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let image = ImageProcessor::from_bytes(bytes)?.into_dynamic();
        let text = self.ocr_image(image)?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .fold(WordDocument::new().title(IMAGE_DOCUMENT_TITLE), |doc, line| {
                doc.paragraph(line.trim())
            })
            .into_bytes()
    }

    /// All tables in a PDF, in page order. Ruled grids take precedence over
    /// whitespace-aligned columns on the same page.
    pub fn detect_tables(&self, bytes: &[u8]) -> Result<Vec<DetectedTable>> {
        let pages = self.layout_pages(bytes)?;
        let reader = graphics_reader(bytes);
        Ok(pages
            .iter()
            .flat_map(|page| {
                page_blocks(reader.as_ref(), page)
                    .into_iter()
                    .filter_map(|block| match block {
                        Block::Table(rows) => Some(DetectedTable { page: page.page, rows }),
                        _ => None,
                    })
            })
            .collect())
    }

    // -- Helpers --------------------------------------------------------------

    fn layout_pages(&self, bytes: &[u8]) -> Result<Vec<PageLines>> {
        let pages = self.layout.page_lines(bytes)?;
        debug!(backend = self.layout.backend_name(), pages = pages.len(), "Layout text read");
        Ok(pages)
    }

    /// OCR text for layout pages that have no text, keyed by page number.
    fn scanned_page_text(&self, bytes: &[u8], pages: &[PageLines]) -> Result<Vec<(usize, String)>> {
        if !pages.iter().any(PageLines::is_blank) || !self.ocr_scanned_enabled() {
            return Ok(Vec::new());
        }
        let reader = PdfReader::from_bytes(bytes)?;
        Ok(pages
            .iter()
            .filter(|page| page.is_blank())
            .filter_map(|page| {
                let number = u32::try_from(page.page).ok()?;
                self.ocr_scanned_page(&reader, number).map(|text| (page.page, text))
            })
            .collect())
    }

    fn ocr_scanned_enabled(&self) -> bool {
        self.pdf.ocr_scanned_pages && self.recognizer.is_some()
    }

    /// OCR the images of one page. `None` when OCR is off, the page has no
    /// decodable images, or recognition produced nothing; failures are logged
    /// and the page keeps its (empty) text layer.
    fn ocr_scanned_page(&self, reader: &PdfReader, page_number: u32) -> Option<String> {
        if !self.ocr_scanned_enabled() {
            return None;
        }
        let images = match reader.page_images(page_number) {
            Ok(images) => images,
            Err(err) => {
                warn!(page_number, %err, "Could not read page images");
                return None;
            }
        };

        let mut parts = Vec::new();
        for image in images {
            match self.ocr_image(image) {
                Ok(text) if !text.trim().is_empty() => parts.push(text.trim().to_string()),
                Ok(_) => {}
                Err(err) => warn!(page_number, %err, "OCR of page image failed"),
            }
        }
        if parts.is_empty() {
            None
        } else {
            debug!(page_number, images = parts.len(), "Scanned page recognised");
            Some(parts.join("\n"))
        }
    }

    fn ocr_image(&self, image: DynamicImage) -> Result<String> {
        let recognizer = self
            .recognizer
            .as_deref()
            .ok_or_else(|| DoctoolsError::OcrUnavailable("no OCR engine is loaded".into()))?;
        let prepared = DynamicImage::ImageLuma8(preprocess_for_ocr(image, &self.preprocess));
        recognizer.recognize(&prepared)
    }
}

/// Reader for ruling lines and pictures. The layout backend may accept files
/// lopdf rejects; those keep their text and lose only these extras.
fn graphics_reader(bytes: &[u8]) -> Option<PdfReader> {
    PdfReader::from_bytes(bytes)
        .inspect_err(|err| warn!(%err, "PDF graphics unavailable; using layout text only"))
        .ok()
}

/// Layout blocks of a page with its ruled tables swapped in.
fn page_blocks(reader: Option<&PdfReader>, page: &PageLines) -> Vec<Block> {
    let blocks = segment_page(&page.lines);
    let (Some(reader), Ok(number)) = (reader, u32::try_from(page.page)) else {
        return blocks;
    };
    match reader.ruled_tables(number) {
        Ok(ruled) => with_ruled_tables(blocks, ruled),
        Err(err) => {
            warn!(page = page.page, %err, "Could not read ruling lines");
            blocks
        }
    }
}

fn page_pictures(reader: Option<&PdfReader>, page: usize) -> Vec<DynamicImage> {
    let (Some(reader), Ok(number)) = (reader, u32::try_from(page)) else {
        return Vec::new();
    };
    reader.page_images(number).unwrap_or_else(|err| {
        warn!(page, %err, "Could not read page images");
        Vec::new()
    })
}

fn detect_kind(upload_name: &str) -> Result<DocumentKind> {
    DocumentKind::from_filename(upload_name).ok_or_else(|| {
        DoctoolsError::UnsupportedDocument(format!(
            "{}: only PDF, PNG and JPG files are accepted",
            upload_name
        ))
    })
}

fn describe_kinds(kinds: &[DocumentKind]) -> &'static str {
    if kinds.iter().all(DocumentKind::is_image) {
        "a PNG or JPG image"
    } else {
        "a PDF"
    }
}
