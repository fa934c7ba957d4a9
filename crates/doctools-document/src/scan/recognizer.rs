// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The seam between the conversion pipeline and whatever performs character
// recognition.

use doctools_core::error::Result;
use image::DynamicImage;

/// Something that turns a (pre-processed) page image into text.
///
/// Implementations must be shareable across request threads; the converter
/// holds one behind an `Arc` and calls it from blocking worker threads.
pub trait TextRecognizer: Send + Sync {
    /// Recognise all text in `image`, one line of output per text line,
    /// blank lines dropped.
    fn recognize(&self, image: &DynamicImage) -> Result<String>;

    /// Short engine name for logs and the health endpoint.
    fn name(&self) -> &str;
}
