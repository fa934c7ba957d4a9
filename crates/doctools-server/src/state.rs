// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared state handed to every request handler.

use std::sync::Arc;

use doctools_core::config::ServiceConfig;
use doctools_core::error::DoctoolsError;
use doctools_document::{DocumentConverter, load_recognizer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub converter: Arc<DocumentConverter>,
}

impl AppState {
    pub fn new(config: ServiceConfig, converter: DocumentConverter) -> Self {
        Self {
            config: Arc::new(config),
            converter: Arc::new(converter),
        }
    }

    /// Build the converter with the configured OCR engine. A missing engine
    /// leaves OCR endpoints answering 503. Model loading is slow; call this
    /// from a blocking context.
    pub fn from_config(config: ServiceConfig) -> Result<Self, DoctoolsError> {
        let recognizer = load_recognizer(&config.ocr);
        let converter = DocumentConverter::new(&config, recognizer)?;
        Ok(Self::new(config, converter))
    }
}
