// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people uploading documents.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The API returns the suggestion as the `hint` field next to `detail`, and the
// CLI prints it under the error line.

use crate::error::DoctoolsError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Server-side hiccup: trying again may work.
    Transient,
    /// User must do something (pick another file, rescan).
    ActionRequired,
    /// Cannot be fixed by retrying: wrong format, broken file.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether retrying the same upload can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `DoctoolsError` into a `HumanError`.
pub fn humanize_error(err: &DoctoolsError) -> HumanError {
    match err {
        DoctoolsError::UnsupportedDocument(detail) => HumanError {
            message: "This type of file isn't supported here.".into(),
            suggestion: format!(
                "Upload a PDF for text extraction or PDF conversion, or a PNG/JPG picture for OCR. ({detail})"
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        DoctoolsError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged or password-protected. Try opening it on a computer first, or export it again as PDF.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        DoctoolsError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        DoctoolsError::OcrError(_) => HumanError {
            message: "Text recognition didn't work on this picture.".into(),
            suggestion: "Try a sharper photo with even lighting, with the text filling most of the frame.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        DoctoolsError::OcrUnavailable(_) => HumanError {
            message: "Text recognition is switched off on this server.".into(),
            suggestion: "Ask the administrator to install the OCR models (text-detection.rten, text-recognition.rten) or the tesseract language packs, or upload a PDF with a text layer instead.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        DoctoolsError::NoTablesFound => HumanError {
            message: "No tables were found in this PDF.".into(),
            suggestion: "Only tables with clearly separated columns can be exported. Try PDF to Word instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        DoctoolsError::Writer { format, .. } => HumanError {
            message: format!("We couldn't build the {format} file."),
            suggestion: "Try again. If this keeps happening, the document may contain unusual characters.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        DoctoolsError::ToolNotFound { tool } => HumanError {
            message: "A helper program is missing on the server.".into(),
            suggestion: format!("Install `{tool}` (poppler-utils) or set the PDF layout backend to `native`."),
            retriable: false,
            severity: Severity::Permanent,
        },

        DoctoolsError::ToolFailed { tool, .. } => HumanError {
            message: "The PDF couldn't be read.".into(),
            suggestion: format!("`{tool}` rejected the file. It may be damaged or encrypted."),
            retriable: false,
            severity: Severity::Permanent,
        },

        DoctoolsError::Config(detail) => HumanError {
            message: "The server is misconfigured.".into(),
            suggestion: format!("Fix the configuration and restart. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        DoctoolsError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The file couldn't be opened.".into(),
                    suggestion: "You may not have permission to read or write it. Check the file permissions.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "Something went wrong while handling the file.".into(),
                    suggestion: "Try again in a moment.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }
    }
}
