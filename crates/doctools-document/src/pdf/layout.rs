// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout text sources. Table detection needs page text whose columns are
// still aligned with spaces; `pdftotext -layout` produces exactly that, the
// in-process text layer is the fallback when poppler is not installed.

use std::io::Write;
use std::process::Command;

use doctools_core::config::TextBackend;
use doctools_core::error::DoctoolsError;
use tracing::{debug, info, instrument, warn};

use super::reader::PdfReader;

const PDFTOTEXT: &str = "pdftotext";

/// Lines of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLines {
    /// 1-indexed page number.
    pub page: usize,
    pub lines: Vec<String>,
}

impl PageLines {
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }
}

/// A backend that turns PDF bytes into per-page lines of text.
pub trait LayoutTextSource: Send + Sync {
    fn page_lines(&self, pdf_bytes: &[u8]) -> Result<Vec<PageLines>, DoctoolsError>;

    /// Backend name for diagnostics.
    fn backend_name(&self) -> &str;
}

/// Pick the layout backend for a configured [`TextBackend`].
pub fn layout_source(backend: TextBackend) -> Result<Box<dyn LayoutTextSource>, DoctoolsError> {
    let source: Box<dyn LayoutTextSource> = match backend {
        TextBackend::Native => Box::new(NativeLayout),
        TextBackend::Pdftotext => {
            if !PdftotextLayout::is_available() {
                return Err(DoctoolsError::ToolNotFound { tool: PDFTOTEXT });
            }
            Box::new(PdftotextLayout)
        }
        TextBackend::Auto => {
            if PdftotextLayout::is_available() {
                Box::new(PdftotextLayout)
            } else {
                warn!("pdftotext not found, table detection falls back to the PDF text layer");
                Box::new(NativeLayout)
            }
        }
    };
    info!(backend = source.backend_name(), "Layout text backend selected");
    Ok(source)
}

// -- Native -------------------------------------------------------------------

/// Text layer read in-process with `lopdf`. One line per text object, so
/// columns survive only when the producer wrote them space-padded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLayout;

impl LayoutTextSource for NativeLayout {
    #[instrument(skip_all, fields(bytes_len = pdf_bytes.len()))]
    fn page_lines(&self, pdf_bytes: &[u8]) -> Result<Vec<PageLines>, DoctoolsError> {
        let reader = PdfReader::from_bytes(pdf_bytes)?;
        Ok(reader
            .extract_pages()?
            .into_iter()
            .map(|page| PageLines {
                page: page.number as usize,
                lines: page.text.lines().map(str::to_string).collect(),
            })
            .collect())
    }

    fn backend_name(&self) -> &str {
        "native"
    }
}

// -- pdftotext ----------------------------------------------------------------

/// `pdftotext -layout` from poppler-utils.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdftotextLayout;

impl PdftotextLayout {
    /// Check if pdftotext is on the PATH.
    pub fn is_available() -> bool {
        Command::new(PDFTOTEXT)
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl LayoutTextSource for PdftotextLayout {
    #[instrument(skip_all, fields(bytes_len = pdf_bytes.len()))]
    fn page_lines(&self, pdf_bytes: &[u8]) -> Result<Vec<PageLines>, DoctoolsError> {
        // Removed when `tmpfile` drops, on success and on every error path.
        let mut tmpfile = tempfile::Builder::new()
            .prefix("doctools-")
            .suffix(".pdf")
            .tempfile()?;
        tmpfile.write_all(pdf_bytes)?;
        tmpfile.flush()?;

        let output = Command::new(PDFTOTEXT)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(tmpfile.path())
            .arg("-")
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    DoctoolsError::ToolNotFound { tool: PDFTOTEXT }
                } else {
                    DoctoolsError::Io(err)
                }
            })?;

        if !output.status.success() {
            return Err(DoctoolsError::ToolFailed {
                tool: PDFTOTEXT,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pages = split_form_feeds(&String::from_utf8_lossy(&output.stdout));
        debug!(pages = pages.len(), "pdftotext output split into pages");
        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        PDFTOTEXT
    }
}

/// pdftotext ends every page with a form feed, so the segment after the last
/// one is not a page.
fn split_form_feeds(text: &str) -> Vec<PageLines> {
    let mut segments: Vec<&str> = text.split('\x0c').collect();
    if segments.len() > 1 && segments.last().is_some_and(|s| s.trim().is_empty()) {
        segments.pop();
    }
    segments
        .into_iter()
        .enumerate()
        .map(|(i, segment)| PageLines {
            page: i + 1,
            lines: segment.lines().map(|l| l.trim_end().to_string()).collect(),
        })
        .collect()
}
