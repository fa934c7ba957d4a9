// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// doctools-document: Document processing for the doctools service.
//
// Provides PDF text and image extraction, OCR pre-processing (CLAHE, non-local
// means denoising, sharpening) with `ocrs` or `tesseract` recognition, table
// detection on layout text and ruling lines, and Word/Excel output.

pub mod convert;
pub mod image;
pub mod office;
pub mod pdf;
pub mod scan;
pub mod tables;

// Re-export the primary types so callers can use `doctools_document::PdfReader` etc.
pub use convert::{DocumentConverter, IMAGE_DOCUMENT_TITLE, Output};
pub use image::processor::ImageProcessor;
pub use office::{WordDocument, tables_to_workbook};
pub use pdf::{LayoutTextSource, PdfReader};
pub use scan::{
    OcrPreprocessor, TesseractEngine, TextRecognizer, build_recognizer, check_recognizer,
    load_recognizer, preprocess_for_ocr,
};
pub use tables::{Block, detect_tables, segment_page, with_ruled_tables};

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrConfig, OcrEngine};
