// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for doctools.

use thiserror::Error;

/// Top-level error type for all document operations.
#[derive(Debug, Error)]
pub enum DoctoolsError {
    // -- Input errors --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    // -- Processing errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("OCR is not available: {0}")]
    OcrUnavailable(String),

    #[error("no tables found in this PDF")]
    NoTablesFound,

    #[error("failed to write {format} document: {detail}")]
    Writer { format: &'static str, detail: String },

    // -- External tools --
    #[error("{tool} not found on PATH")]
    ToolNotFound { tool: &'static str },

    #[error("{tool} exited with code {code}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        code: i32,
        stderr: String,
    },

    // -- Configuration / filesystem --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DoctoolsError>;
