// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `tesseract`-backed text recognizer. Runs the tesseract command on a PNG of
// the pre-processed image, so any installed language pack can be used
// (`tha+eng`, `chi_sim`, ...).

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use doctools_core::config::{OcrSettings, language_combination};
use doctools_core::error::{DoctoolsError, Result};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, instrument};

use super::recognizer::TextRecognizer;

const TESSERACT: &str = "tesseract";

/// Recognition through the `tesseract` command.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    languages: String,
    tessdata_dir: Option<PathBuf>,
    page_segmentation_mode: u8,
}

impl TesseractEngine {
    /// Check that tesseract runs and has every requested language.
    #[instrument(skip_all, fields(languages = %settings.languages))]
    pub fn new(settings: &OcrSettings) -> Result<Self> {
        let languages = language_combination(&settings.languages)?;
        let engine = Self {
            languages,
            tessdata_dir: settings.tessdata_dir.clone(),
            page_segmentation_mode: settings.page_segmentation_mode,
        };

        let installed = engine.installed_languages()?;
        let missing: Vec<&str> = engine
            .languages
            .split('+')
            .filter(|lang| !installed.iter().any(|have| have == lang))
            .collect();
        if !missing.is_empty() {
            return Err(DoctoolsError::OcrUnavailable(format!(
                "tesseract language data missing for {}; installed: {}",
                missing.join(", "),
                installed.join(", ")
            )));
        }

        info!(languages = %engine.languages, "tesseract ready");
        Ok(engine)
    }

    /// Check if tesseract is on the PATH.
    pub fn is_available() -> bool {
        Command::new(TESSERACT)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// The `-l` argument passed to tesseract.
    pub fn languages(&self) -> &str {
        &self.languages
    }

    fn command(&self) -> Command {
        let mut command = Command::new(TESSERACT);
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        command
    }

    fn installed_languages(&self) -> Result<Vec<String>> {
        let output = self
            .command()
            .arg("--list-langs")
            .output()
            .map_err(tool_error)?;
        if !output.status.success() {
            return Err(DoctoolsError::OcrUnavailable(format!(
                "tesseract --list-langs failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        // Older releases print the list on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }
}

impl TextRecognizer for TesseractEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), languages = %self.languages))]
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        // Removed when `tmpfile` drops, on success and on every error path.
        let mut tmpfile = tempfile::Builder::new()
            .prefix("doctools-ocr-")
            .suffix(".png")
            .tempfile()?;
        let mut png = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|err| DoctoolsError::OcrError(format!("cannot encode page image: {err}")))?;
        tmpfile.write_all(png.get_ref())?;
        tmpfile.flush()?;

        let output = self
            .command()
            .arg(tmpfile.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .output()
            .map_err(tool_error)?;

        if !output.status.success() {
            return Err(DoctoolsError::ToolFailed {
                tool: TESSERACT,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = recognized_lines(&String::from_utf8_lossy(&output.stdout));
        debug!(chars = text.len(), "tesseract finished");
        Ok(text)
    }

    fn name(&self) -> &str {
        TESSERACT
    }
}

fn tool_error(err: std::io::Error) -> DoctoolsError {
    if err.kind() == std::io::ErrorKind::NotFound {
        DoctoolsError::OcrUnavailable(format!("{TESSERACT} is not installed"))
    } else {
        DoctoolsError::Io(err)
    }
}

/// Language codes from `tesseract --list-langs`. The header line ends with
/// a colon; `osd` is orientation data, not a language.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.ends_with(':') && *line != "osd")
        .filter(|line| !line.contains(' '))
        .map(str::to_string)
        .collect()
}

/// Trimmed lines with blanks and the trailing form feed removed.
fn recognized_lines(stdout: &str) -> String {
    stdout
        .lines()
        .map(|line| line.trim_matches(|c: char| c.is_whitespace() || c == '\x0c'))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
