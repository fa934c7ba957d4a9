// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open existing PDF documents with the `lopdf` crate and pull out
// their text layer and embedded page images.

use std::path::Path;

use doctools_core::error::DoctoolsError;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

use super::rulings::PageGraphics;

/// Guard against `/Parent` cycles in malformed page trees.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number.
    pub number: u32,
    pub text: String,
}

impl PageText {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document` and exposes the two things the converters need:
/// per-page text and the raster images a scanned page is made of.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DoctoolsError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            DoctoolsError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, DoctoolsError> {
        let document = Document::load_mem(data).map_err(|err| {
            DoctoolsError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    fn page_id(&self, page_number: u32) -> Result<ObjectId, DoctoolsError> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            DoctoolsError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    // -- Text -----------------------------------------------------------------

    /// Text layer of a single page (1-indexed).
    pub fn page_text(&self, page_number: u32) -> Result<String, DoctoolsError> {
        self.page_id(page_number)?;
        self.document.extract_text(&[page_number]).map_err(|err| {
            DoctoolsError::PdfError(format!(
                "failed to extract text from page {}: {}",
                page_number, err
            ))
        })
    }

    /// Text layer of every page, in page order.
    #[instrument(skip(self))]
    pub fn extract_pages(&self) -> Result<Vec<PageText>, DoctoolsError> {
        let numbers: Vec<u32> = self.document.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(numbers.len());
        for number in numbers {
            let text = self.page_text(number)?;
            pages.push(PageText { number, text });
        }
        debug!(
            pages = pages.len(),
            blank = pages.iter().filter(|p| p.is_blank()).count(),
            "Text layer extracted"
        );
        Ok(pages)
    }

    /// Whole-document text: pages joined by newlines, surrounding whitespace
    /// trimmed.
    pub fn full_text(&self) -> Result<String, DoctoolsError> {
        Ok(join_pages(&self.extract_pages()?))
    }

    // -- Images ---------------------------------------------------------------

    /// Raster images drawn on a page (1-indexed).
    ///
    /// Supports JPEG (`/DCTDecode`) streams and 8-bit gray or RGB samples that
    /// are uncompressed or `/FlateDecode`d. Other encodings (JBIG2, JPX, CCITT,
    /// indexed colour) are skipped with a debug log.
    #[instrument(skip(self))]
    pub fn page_images(&self, page_number: u32) -> Result<Vec<DynamicImage>, DoctoolsError> {
        let page_id = self.page_id(page_number)?;
        let Some(resources) = self.inherited_resources(page_id) else {
            return Ok(Vec::new());
        };
        let xobjects = match resources.get(b"XObject").map(|obj| self.resolve(obj)) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return Ok(Vec::new()),
        };

        let mut images = Vec::new();
        for (name, value) in xobjects.iter() {
            let Object::Stream(stream) = self.resolve(value) else {
                continue;
            };
            if !is_name(stream.dict.get(b"Subtype").ok(), b"Image") {
                continue;
            }
            match self.decode_image(stream) {
                Ok(Some(image)) => images.push(image),
                Ok(None) => debug!(
                    xobject = %String::from_utf8_lossy(name),
                    "Skipping image with unsupported encoding"
                ),
                Err(err) => warn!(
                    xobject = %String::from_utf8_lossy(name),
                    %err,
                    "Failed to decode page image"
                ),
            }
        }

        debug!(page_number, images = images.len(), "Page images collected");
        Ok(images)
    }

    // -- Ruled tables ---------------------------------------------------------

    /// Tables drawn as ruled grids on a page (1-indexed), as rows of cell
    /// text. Pages whose text uses composite (Type0) fonts yield nothing,
    /// since their string codes cannot be read without the font's CMap.
    #[instrument(skip(self))]
    pub fn ruled_tables(&self, page_number: u32) -> Result<Vec<Vec<Vec<String>>>, DoctoolsError> {
        let page_id = self.page_id(page_number)?;
        let content = self.document.get_page_content(page_id).map_err(|err| {
            DoctoolsError::PdfError(format!("failed to read content of page {}: {}", page_number, err))
        })?;
        let content = Content::decode(&content).map_err(|err| {
            DoctoolsError::PdfError(format!("failed to parse content of page {}: {}", page_number, err))
        })?;

        let composite = self.composite_fonts(page_id);
        let graphics = PageGraphics::from_operations(&content.operations, |name| {
            composite.iter().any(|font| font.as_slice() == name)
        });
        if graphics.undecodable_text {
            debug!(page_number, "Skipping ruled tables: composite font text");
            return Ok(Vec::new());
        }
        if !graphics.has_rules() {
            return Ok(Vec::new());
        }

        let tables = graphics.ruled_tables();
        debug!(page_number, tables = tables.len(), "Ruled tables found");
        Ok(tables)
    }

    /// Resource names of the page's Type0 fonts.
    fn composite_fonts(&self, page_id: ObjectId) -> Vec<Vec<u8>> {
        let Some(resources) = self.inherited_resources(page_id) else {
            return Vec::new();
        };
        let fonts = match resources.get(b"Font").map(|obj| self.resolve(obj)) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return Vec::new(),
        };
        fonts
            .iter()
            .filter(|(_, font)| match self.resolve(font) {
                Object::Dictionary(dict) => is_name(dict.get(b"Subtype").ok(), b"Type0"),
                _ => false,
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    // -- Helpers --------------------------------------------------------------

    /// Follow a reference one level; anything else is returned as-is.
    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            other => other,
        }
    }

    /// `/Resources` of a page, walking up `/Parent` nodes when the page
    /// inherits them.
    fn inherited_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_PAGE_TREE_DEPTH {
            if let Ok(resources) = node.get(b"Resources") {
                return match self.resolve(resources) {
                    Object::Dictionary(dict) => Some(dict),
                    _ => None,
                };
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    fn decode_image(&self, stream: &Stream) -> Result<Option<DynamicImage>, DoctoolsError> {
        let filters = self.filter_names(&stream.dict);

        if filters.iter().any(|f| f == b"DCTDecode") {
            if filters.len() != 1 {
                return Ok(None);
            }
            let image = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|err| DoctoolsError::ImageError(format!("embedded JPEG: {}", err)))?;
            return Ok(Some(image));
        }

        let samples = match filters.as_slice() {
            [] => stream.content.clone(),
            [only] if only == b"FlateDecode" => stream.decompressed_content().map_err(|err| {
                DoctoolsError::PdfError(format!("failed to inflate image stream: {}", err))
            })?,
            _ => return Ok(None),
        };

        let int = |key: &[u8]| {
            stream
                .dict
                .get(key)
                .ok()
                .map(|obj| self.resolve(obj))
                .and_then(|obj| obj.as_i64().ok())
        };
        let (Some(width), Some(height)) = (int(b"Width"), int(b"Height")) else {
            return Ok(None);
        };
        if int(b"BitsPerComponent") != Some(8) || width <= 0 || height <= 0 {
            return Ok(None);
        }
        let (width, height) = (width as u32, height as u32);
        let pixels = width as usize * height as usize;

        let image = match self.colour_components(&stream.dict) {
            Some(1) if samples.len() >= pixels => {
                GrayImage::from_raw(width, height, samples[..pixels].to_vec())
                    .map(DynamicImage::ImageLuma8)
            }
            Some(3) if samples.len() >= pixels * 3 => {
                RgbImage::from_raw(width, height, samples[..pixels * 3].to_vec())
                    .map(DynamicImage::ImageRgb8)
            }
            _ => None,
        };
        Ok(image)
    }

    /// `/Filter` as a list of names (a single name or an array).
    fn filter_names(&self, dict: &Dictionary) -> Vec<Vec<u8>> {
        match dict.get(b"Filter").map(|obj| self.resolve(obj)) {
            Ok(Object::Name(name)) => vec![name.clone()],
            Ok(Object::Array(items)) => items
                .iter()
                .filter_map(|item| match self.resolve(item) {
                    Object::Name(name) => Some(name.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Number of colour components for the colour spaces we can decode.
    fn colour_components(&self, dict: &Dictionary) -> Option<i64> {
        match self.resolve(dict.get(b"ColorSpace").ok()?) {
            Object::Name(name) if name.as_slice() == b"DeviceGray" || name.as_slice() == b"CalGray" => Some(1),
            Object::Name(name) if name.as_slice() == b"DeviceRGB" || name.as_slice() == b"CalRGB" => Some(3),
            Object::Array(items) if is_name(items.first(), b"ICCBased") => {
                match self.resolve(items.get(1)?) {
                    Object::Stream(profile) => profile.dict.get(b"N").ok()?.as_i64().ok(),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Join page texts the way the extract endpoint reports them.
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_name(object: Option<&Object>, expected: &[u8]) -> bool {
    matches!(object, Some(Object::Name(name)) if name.as_slice() == expected)
}
