// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-page handling: the fixed pre-processing sequence applied before
// recognition, the recognizer seam, and the two engines behind it (`ocrs`
// models, the `tesseract` command).

pub mod preprocess;
pub mod recognizer;
pub mod tesseract;

#[cfg(feature = "ocr")]
pub mod ocr;

use std::sync::Arc;

use doctools_core::config::{OcrEngineKind, OcrSettings};
use doctools_core::error::Result;
use tracing::{info, warn};

pub use preprocess::{OcrPreprocessor, preprocess_for_ocr};
pub use recognizer::TextRecognizer;
pub use tesseract::TesseractEngine;

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrEngine};

/// The configured recognizer, or `None` when OCR is disabled or the engine
/// cannot start. A missing engine is not fatal: PDF text paths still work and
/// OCR paths report `OcrUnavailable`.
pub fn load_recognizer(settings: &OcrSettings) -> Option<Arc<dyn TextRecognizer>> {
    if !settings.enabled {
        info!("OCR disabled by configuration");
        return None;
    }
    match build_recognizer(settings) {
        Ok(recognizer) => {
            info!(engine = recognizer.name(), "OCR engine loaded");
            Some(recognizer)
        }
        Err(err) => {
            warn!(%err, "OCR unavailable; image paths will fail");
            None
        }
    }
}

/// Start the configured engine. Loading `ocrs` models takes seconds.
pub fn build_recognizer(settings: &OcrSettings) -> Result<Arc<dyn TextRecognizer>> {
    match settings.engine {
        OcrEngineKind::Tesseract => Ok(Arc::new(TesseractEngine::new(settings)?)),
        OcrEngineKind::Ocrs => ocrs_recognizer(settings),
    }
}

/// Cheap readiness check for `--validate`: model files exist, or tesseract
/// runs with the requested languages. Nothing is loaded.
pub fn check_recognizer(settings: &OcrSettings) -> Result<()> {
    match settings.engine {
        OcrEngineKind::Tesseract => TesseractEngine::new(settings).map(|_| ()),
        OcrEngineKind::Ocrs => ocrs_models_present(settings),
    }
}

#[cfg(feature = "ocr")]
fn ocrs_recognizer(settings: &OcrSettings) -> Result<Arc<dyn TextRecognizer>> {
    let config = OcrConfig::from_optional_dir(settings.model_dir.as_deref());
    Ok(Arc::new(OcrEngine::new(config)?))
}

#[cfg(feature = "ocr")]
fn ocrs_models_present(settings: &OcrSettings) -> Result<()> {
    OcrConfig::from_optional_dir(settings.model_dir.as_deref()).validate()
}

#[cfg(not(feature = "ocr"))]
fn ocrs_recognizer(_settings: &OcrSettings) -> Result<Arc<dyn TextRecognizer>> {
    Err(ocrs_not_built())
}

#[cfg(not(feature = "ocr"))]
fn ocrs_models_present(_settings: &OcrSettings) -> Result<()> {
    Err(ocrs_not_built())
}

#[cfg(not(feature = "ocr"))]
fn ocrs_not_built() -> doctools_core::error::DoctoolsError {
    doctools_core::error::DoctoolsError::OcrUnavailable(
        "built without the `ocr` feature; set ocr.engine to tesseract".into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctools_core::error::DoctoolsError;

    #[test]
    fn disabled_ocr_loads_nothing() {
        let settings = OcrSettings {
            enabled: false,
            ..OcrSettings::default()
        };
        assert!(load_recognizer(&settings).is_none());
    }

    #[test]
    fn missing_ocrs_models_are_reported_not_fatal() {
        let settings = OcrSettings {
            model_dir: Some("/nonexistent/doctools-models".into()),
            ..OcrSettings::default()
        };
        assert!(matches!(check_recognizer(&settings), Err(DoctoolsError::OcrUnavailable(_))));
        assert!(load_recognizer(&settings).is_none());
    }
}
