// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration. Loading (files, env) lives in the server crate; these
// are the plain serde structs with their defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DoctoolsError, Result};

/// Top-level settings for the document service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Interface to bind.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    pub ocr: OcrSettings,
    pub preprocess: PreprocessConfig,
    pub pdf: PdfSettings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024,
            ocr: OcrSettings::default(),
            preprocess: PreprocessConfig::default(),
            pdf: PdfSettings::default(),
        }
    }
}

impl ServiceConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(DoctoolsError::Config(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }
        self.ocr.validate()?;
        self.preprocess.validate()
    }
}

/// Which engine performs character recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// `ocrs` neural models (needs the `ocr` build feature).
    Ocrs,
    /// The `tesseract` command; supports any installed language pack.
    Tesseract,
}

/// Tesseract's page segmentation modes run from 0 to 13.
const MAX_PAGE_SEGMENTATION_MODE: u8 = 13;

/// OCR engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Load the OCR engine at startup.
    pub enabled: bool,
    pub engine: OcrEngineKind,
    /// Directory holding `text-detection.rten` and `text-recognition.rten`.
    /// `None` uses the ocrs cache directory.
    pub model_dir: Option<PathBuf>,
    /// Tesseract languages, primary first: `eng`, `tha+eng`, `deu, fra`.
    pub languages: String,
    /// Tesseract `--tessdata-dir`. `None` uses the system location.
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract `--psm`; 3 is fully automatic page segmentation.
    pub page_segmentation_mode: u8,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: OcrEngineKind::Ocrs,
            model_dir: None,
            languages: "eng".into(),
            tessdata_dir: None,
            page_segmentation_mode: 3,
        }
    }
}

impl OcrSettings {
    pub fn validate(&self) -> Result<()> {
        language_combination(&self.languages)?;
        if self.page_segmentation_mode > MAX_PAGE_SEGMENTATION_MODE {
            return Err(DoctoolsError::Config(format!(
                "page_segmentation_mode must be 0..={}, got {}",
                MAX_PAGE_SEGMENTATION_MODE, self.page_segmentation_mode
            )));
        }
        Ok(())
    }
}

/// Normalise a language list into Tesseract's `-l` form: codes separated by
/// `+`, first occurrence wins, primary language first.
///
/// Accepts `+`, commas or whitespace as separators.
pub fn language_combination(languages: &str) -> Result<String> {
    let mut codes: Vec<&str> = Vec::new();
    for code in languages
        .split(|c: char| c == '+' || c == ',' || c.is_whitespace())
        .filter(|code| !code.is_empty())
    {
        let valid = code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '/');
        if !valid {
            return Err(DoctoolsError::Config(format!("invalid OCR language code `{code}`")));
        }
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    if codes.is_empty() {
        return Err(DoctoolsError::Config("ocr.languages must name at least one language".into()));
    }
    Ok(codes.join("+"))
}

/// Denoising step used before OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenoiseMethod {
    /// Non-local means.
    NonLocalMeans,
    /// 3x3 median filter; much faster, softer on fine strokes.
    Median,
    None,
}

/// Parameters for the image pre-processing sequence
/// (grayscale, CLAHE, denoise, sharpen).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// CLAHE clip limit, relative to a uniform histogram.
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per axis.
    pub clahe_grid: u32,
    pub denoise: DenoiseMethod,
    /// Non-local means filter strength.
    pub denoise_strength: f32,
    /// Side of the square patch compared by non-local means (odd).
    pub template_window: u32,
    /// Side of the square search area (odd).
    pub search_window: u32,
    pub sharpen: bool,
    /// Longest allowed image side; larger images are downscaled first.
    pub max_dimension: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            denoise: DenoiseMethod::NonLocalMeans,
            denoise_strength: 10.0,
            template_window: 7,
            search_window: 21,
            sharpen: true,
            max_dimension: 2000,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.clahe_grid == 0 {
            return Err(DoctoolsError::Config("clahe_grid must be at least 1".into()));
        }
        if self.template_window % 2 == 0 || self.search_window % 2 == 0 {
            return Err(DoctoolsError::Config(format!(
                "template_window ({}) and search_window ({}) must be odd",
                self.template_window, self.search_window
            )));
        }
        if self.template_window > self.search_window {
            return Err(DoctoolsError::Config(
                "template_window cannot exceed search_window".into(),
            ));
        }
        if self.denoise_strength <= 0.0 {
            return Err(DoctoolsError::Config("denoise_strength must be positive".into()));
        }
        if self.max_dimension < 32 {
            return Err(DoctoolsError::Config("max_dimension must be at least 32".into()));
        }
        Ok(())
    }
}

/// Which PDF text backend produces layout text for table detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBackend {
    /// `pdftotext` when installed, native otherwise.
    Auto,
    /// In-process text layer only.
    Native,
    /// Always `pdftotext -layout`.
    Pdftotext,
}

/// PDF handling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    pub layout_backend: TextBackend,
    /// OCR embedded page images when a page has no text layer.
    pub ocr_scanned_pages: bool,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            layout_backend: TextBackend::Auto,
            ocr_scanned_pages: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_filter_sequence() {
        let cfg = PreprocessConfig::default();
        assert_eq!(cfg.clahe_clip_limit, 2.0);
        assert_eq!(cfg.clahe_grid, 8);
        assert_eq!(cfg.template_window, 7);
        assert_eq!(cfg.search_window, 21);
        assert!(cfg.validate().is_ok());
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn even_windows_rejected() {
        let cfg = PreprocessConfig {
            template_window: 6,
            ..PreprocessConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn language_lists_become_tesseract_combinations() {
        assert_eq!(language_combination("eng").unwrap(), "eng");
        assert_eq!(language_combination("tha+eng").unwrap(), "tha+eng");
        assert_eq!(language_combination(" deu, fra  eng+deu ").unwrap(), "deu+fra+eng");
        assert_eq!(language_combination("chi_sim+script/Latin").unwrap(), "chi_sim+script/Latin");
        assert!(language_combination(" + ,").is_err());
        assert!(language_combination("eng;rm -rf").is_err());
    }

    #[test]
    fn ocr_settings_are_checked() {
        let ocr = OcrSettings {
            languages: "tha+eng".into(),
            engine: OcrEngineKind::Tesseract,
            ..OcrSettings::default()
        };
        assert!(ocr.validate().is_ok());

        let cfg = ServiceConfig {
            ocr: OcrSettings {
                page_segmentation_mode: 14,
                ..OcrSettings::default()
            },
            ..ServiceConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(DoctoolsError::Config(_))));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: ServiceConfig = serde_json::from_str(
            r#"{"port": 9000, "preprocess": {"denoise": "median"}, "ocr": {"engine": "tesseract"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.ocr.engine, OcrEngineKind::Tesseract);
        assert_eq!(cfg.ocr.languages, "eng");
        assert_eq!(cfg.preprocess.denoise, DenoiseMethod::Median);
        assert_eq!(cfg.preprocess.search_window, 21);
        assert_eq!(cfg.bind_address(), "127.0.0.1:9000");
    }
}
