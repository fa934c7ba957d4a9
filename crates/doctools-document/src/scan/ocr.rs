// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `ocrs`-backed text recognizer (feature `ocr`).
//
// Needs `text-detection.rten` and `text-recognition.rten` in the model
// directory. Running `ocrs` from `ocrs-cli` once downloads them into
// `$XDG_CACHE_HOME/ocrs` (usually `~/.cache/ocrs`), the default location.

use std::path::{Path, PathBuf};

use doctools_core::error::DoctoolsError;
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use super::recognizer::TextRecognizer;

const DETECTION_MODEL: &str = "text-detection.rten";
const RECOGNITION_MODEL: &str = "text-recognition.rten";

fn ocrs_cache_dir() -> PathBuf {
    match (std::env::var_os("XDG_CACHE_HOME"), std::env::var_os("HOME")) {
        (Some(cache), _) => PathBuf::from(cache).join("ocrs"),
        (None, Some(home)) => PathBuf::from(home).join(".cache").join("ocrs"),
        (None, None) => PathBuf::from("ocrs-models"),
    }
}

/// Where the two model files live.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model: PathBuf,
    pub recognition_model: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(ocrs_cache_dir())
    }
}

impl OcrConfig {
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model: dir.join(DETECTION_MODEL),
            recognition_model: dir.join(RECOGNITION_MODEL),
        }
    }

    /// `None` means the ocrs cache directory.
    pub fn from_optional_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::from_dir).unwrap_or_default()
    }

    /// Missing files are `OcrUnavailable`, so callers can degrade instead of
    /// failing.
    pub fn validate(&self) -> Result<(), DoctoolsError> {
        match [&self.detection_model, &self.recognition_model]
            .into_iter()
            .find(|path| !path.is_file())
        {
            Some(missing) => Err(DoctoolsError::OcrUnavailable(format!(
                "model not found at {}; run `ocrs-cli` once to download models",
                missing.display()
            ))),
            None => Ok(()),
        }
    }
}

/// Loaded detection and recognition models. Loading takes seconds, so build
/// one per process and share it.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(detection = %config.detection_model.display()))]
    pub fn new(config: OcrConfig) -> Result<Self, DoctoolsError> {
        config.validate()?;

        let detection_model = load_model("detection", &config.detection_model)?;
        let recognition_model = load_model("recognition", &config.recognition_model)?;
        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| DoctoolsError::OcrError(format!("engine setup failed: {err}")))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    /// Recognised lines in reading order. Lines that come out blank are dropped.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn recognize_lines(&self, image: &DynamicImage) -> Result<Vec<String>, DoctoolsError> {
        let rgb = image.to_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|err| DoctoolsError::OcrError(format!("bad page image: {err}")))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| DoctoolsError::OcrError(format!("input preparation failed: {err}")))?;

        let words = self
            .engine
            .detect_words(&input)
            .map_err(|err| DoctoolsError::OcrError(format!("word detection failed: {err}")))?;
        let line_rects = self.engine.find_text_lines(&input, &words);
        debug!(words = words.len(), lines = line_rects.len(), "Text layout found");

        let lines: Vec<String> = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| DoctoolsError::OcrError(format!("line recognition failed: {err}")))?
            .into_iter()
            .flatten()
            .map(|line| line.to_string())
            .filter(|text| !text.trim().is_empty())
            .collect();

        debug!(lines = lines.len(), "Recognition finished");
        Ok(lines)
    }
}

impl TextRecognizer for OcrEngine {
    fn recognize(&self, image: &DynamicImage) -> doctools_core::error::Result<String> {
        Ok(self.recognize_lines(image)?.join("\n"))
    }

    fn name(&self) -> &str {
        "ocrs"
    }
}

fn load_model(role: &str, path: &Path) -> Result<Model, DoctoolsError> {
    info!(role, path = %path.display(), "Loading OCR model");
    Model::load_file(path).map_err(|err| {
        DoctoolsError::OcrError(format!("cannot load {role} model {}: {err}", path.display()))
    })
}
