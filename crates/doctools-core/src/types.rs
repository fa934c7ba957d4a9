// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: what was uploaded, what it should become, and how.

use serde::{Deserialize, Serialize};

use crate::error::{DoctoolsError, Result};

/// Supported upload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    /// MIME type of the upload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Infer document kind from a bare file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Infer document kind from an upload filename (case-insensitive).
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }
}

/// What the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionTarget {
    Text,
    Word,
    Excel,
}

impl ConversionTarget {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Word => "docx",
            Self::Excel => "xlsx",
        }
    }

    /// Output filename for an upload: the upload's stem plus this target's
    /// extension. Falls back to `document` when the stem is empty.
    pub fn output_file_name(&self, upload_name: &str) -> String {
        let base = upload_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(upload_name);
        let stem = match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            Some(_) => "",
            None => base,
        };
        let stem = if stem.trim().is_empty() { "document" } else { stem };
        format!("{stem}.{}", self.extension())
    }
}

/// The processing routine selected for a `(DocumentKind, ConversionTarget)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionPath {
    /// Native PDF text layer, OCR for scanned pages.
    PdfText,
    /// Pre-processing + OCR.
    ImageOcr,
    PdfToWord,
    PdfToExcel,
    ImageToWord,
}

impl ConversionPath {
    /// Route an upload to its processing path.
    pub fn resolve(kind: DocumentKind, target: ConversionTarget) -> Result<Self> {
        match (kind, target) {
            (DocumentKind::Pdf, ConversionTarget::Text) => Ok(Self::PdfText),
            (DocumentKind::Png | DocumentKind::Jpeg, ConversionTarget::Text) => Ok(Self::ImageOcr),
            (DocumentKind::Pdf, ConversionTarget::Word) => Ok(Self::PdfToWord),
            (DocumentKind::Pdf, ConversionTarget::Excel) => Ok(Self::PdfToExcel),
            (DocumentKind::Png | DocumentKind::Jpeg, ConversionTarget::Word) => {
                Ok(Self::ImageToWord)
            }
            (kind, target) => Err(DoctoolsError::UnsupportedDocument(format!(
                "cannot convert {} to {}",
                kind.mime_type(),
                target.extension()
            ))),
        }
    }

    /// Upload kinds this path accepts, for validation messages.
    pub fn accepted_kinds(&self) -> &'static [DocumentKind] {
        match self {
            Self::PdfText | Self::PdfToWord | Self::PdfToExcel => &[DocumentKind::Pdf],
            Self::ImageOcr | Self::ImageToWord => &[DocumentKind::Png, DocumentKind::Jpeg],
        }
    }

    pub fn needs_ocr(&self) -> bool {
        matches!(self, Self::ImageOcr | Self::ImageToWord)
    }
}

/// How extracted text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// The PDF's own text layer.
    Native,
    /// Optical character recognition only.
    Ocr,
    /// Text layer for some pages, OCR for scanned ones.
    Mixed,
}

/// Result of a text extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub text: String,
    pub method: ExtractionMethod,
    /// Page count for PDFs, 1 for images.
    pub pages: usize,
}

/// A table found on a PDF page. Row 0 is the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedTable {
    /// 1-indexed page number.
    pub page: usize,
    pub rows: Vec<Vec<String>>,
}

impl DetectedTable {
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A finished conversion, ready to be returned to the caller.
#[derive(Debug, Clone)]
pub struct Converted {
    pub bytes: Vec<u8>,
    pub target: ConversionTarget,
    pub file_name: String,
}
