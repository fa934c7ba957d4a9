// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations. Each command validates the input extension,
// then runs either against a server or in-process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use doctools_core::config::{OcrSettings, ServiceConfig};
use doctools_core::error::DoctoolsError;
use doctools_core::human_errors::humanize_error;
use doctools_core::types::{ConversionPath, ConversionTarget, DocumentKind, ExtractionMethod};
use doctools_document::{DocumentConverter, load_recognizer};
use serde::Serialize;
use tracing::{info, warn};

use crate::client::ApiClient;

/// Where documents are processed.
pub enum Backend {
    Remote(ApiClient),
    Local(Arc<DocumentConverter>),
}

impl Backend {
    pub fn remote(base_url: &str) -> anyhow::Result<Self> {
        Ok(Self::Remote(ApiClient::new(base_url)?))
    }

    /// In-process converter with default settings and the given OCR
    /// settings. Without a working OCR engine only PDF commands work.
    pub fn local(ocr: OcrSettings) -> anyhow::Result<Self> {
        ocr.validate().map_err(explain)?;
        let config = ServiceConfig {
            ocr,
            ..ServiceConfig::default()
        };
        let recognizer = load_recognizer(&config.ocr);
        if recognizer.is_none() {
            warn!("No OCR engine loaded; image commands will fail");
        }
        let converter = DocumentConverter::new(&config, recognizer).map_err(explain)?;
        Ok(Self::Local(Arc::new(converter)))
    }
}

/// Text extraction result, whichever backend produced it.
#[derive(Debug, Serialize)]
pub struct ExtractOutput {
    pub filename: String,
    pub extracted_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

// -- Commands -----------------------------------------------------------------

/// `doctools extract`: print the text, or write it to `out`.
pub async fn extract(
    backend: &Backend,
    input: &Path,
    out: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let result = extract_text(backend, input).await?;

    let rendered = if json {
        serde_json::to_string_pretty(&result)?
    } else {
        result.extracted_text.clone()
    };

    match out {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Text of {} written to {}", result.filename, path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

pub async fn extract_text(backend: &Backend, input: &Path) -> anyhow::Result<ExtractOutput> {
    let file_name = validate_input(input, &[DocumentKind::Pdf, DocumentKind::Png, DocumentKind::Jpeg])?;
    let bytes = read_input(input)?;

    match backend {
        Backend::Remote(client) => {
            let reply = client.extract(&file_name, bytes).await?;
            Ok(ExtractOutput {
                filename: reply.filename,
                extracted_text: reply.extracted_text,
                method: reply.method,
                pages: reply.pages,
            })
        }
        Backend::Local(converter) => {
            let converter = converter.clone();
            let name = file_name.clone();
            let extraction =
                tokio::task::spawn_blocking(move || converter.extract(&name, &bytes))
                    .await?
                    .map_err(explain)?;
            Ok(ExtractOutput {
                filename: file_name,
                extracted_text: extraction.text,
                method: Some(extraction.method),
                pages: Some(extraction.pages),
            })
        }
    }
}

/// `doctools pdf-to-word | pdf-to-excel | image-to-word`. Returns the path written.
pub async fn convert(
    backend: &Backend,
    path: ConversionPath,
    input: &Path,
    out: Option<PathBuf>,
) -> anyhow::Result<PathBuf> {
    let file_name = validate_input(input, path.accepted_kinds())?;
    let bytes = read_input(input)?;

    let converted = match backend {
        Backend::Remote(client) => client.convert(path, &file_name, bytes).await?,
        Backend::Local(converter) => {
            let converter = converter.clone();
            let name = file_name.clone();
            tokio::task::spawn_blocking(move || converter.convert(path, &name, &bytes))
                .await?
                .map_err(explain)?
                .bytes
        }
    };

    let target = output_path(input, out, path);
    std::fs::write(&target, &converted)
        .with_context(|| format!("failed to write {}", target.display()))?;
    info!(output = %target.display(), size = converted.len(), "Conversion written");
    eprintln!("Wrote {}", target.display());
    Ok(target)
}

/// `doctools health`
pub async fn health(backend: &Backend) -> anyhow::Result<()> {
    match backend {
        Backend::Remote(client) => {
            let health = client.health().await?;
            println!("server:  {}", client.base_url());
            println!("status:  {}", health.status);
            if let Some(version) = health.version {
                println!("version: {version}");
            }
            println!("ocr:     {}", ocr_status(health.ocr_ready, health.ocr_engine.as_deref()));
        }
        Backend::Local(converter) => {
            println!("mode:    local");
            println!(
                "ocr:     {}",
                ocr_status(converter.ocr_ready(), converter.recognizer_name())
            );
        }
    }
    Ok(())
}

// -- Helpers ------------------------------------------------------------------

/// Check the input's extension against what the command accepts and return
/// its file name.
pub fn validate_input(input: &Path, accepted: &[DocumentKind]) -> anyhow::Result<String> {
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("{} is not a file path", input.display()))?
        .to_string();

    match DocumentKind::from_filename(&file_name) {
        Some(kind) if accepted.contains(&kind) => Ok(file_name),
        _ => bail!("{file_name}: expected {}", describe_kinds(accepted)),
    }
}

fn describe_kinds(kinds: &[DocumentKind]) -> &'static str {
    let pdf = kinds.contains(&DocumentKind::Pdf);
    let image = kinds.iter().any(DocumentKind::is_image);
    match (pdf, image) {
        (true, true) => "a PDF, PNG or JPG file",
        (true, false) => "a PDF file",
        _ => "a PNG or JPG image",
    }
}

/// `out` if given, otherwise the input's stem with the target extension next
/// to the input.
pub fn output_path(input: &Path, out: Option<PathBuf>, path: ConversionPath) -> PathBuf {
    if let Some(out) = out {
        return out;
    }
    let target = match path {
        ConversionPath::PdfToExcel => ConversionTarget::Excel,
        ConversionPath::PdfToWord | ConversionPath::ImageToWord => ConversionTarget::Word,
        ConversionPath::PdfText | ConversionPath::ImageOcr => ConversionTarget::Text,
    };
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    input.with_file_name(target.output_file_name(&name))
}

fn read_input(input: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes = std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", input.display());
    }
    Ok(bytes)
}

fn ocr_status(ready: bool, engine: Option<&str>) -> String {
    match (ready, engine) {
        (true, Some(engine)) => format!("ready ({engine})"),
        (true, None) => "ready".to_string(),
        (false, _) => "unavailable".to_string(),
    }
}

/// Library errors become the plain message plus what to do about it.
fn explain(err: DoctoolsError) -> anyhow::Error {
    let human = humanize_error(&err);
    anyhow!("{}\n  hint: {}", human.message, human.suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_checked_per_command() {
        let pdf_only = ConversionPath::PdfToExcel.accepted_kinds();
        assert_eq!(validate_input(Path::new("/tmp/Report.PDF"), pdf_only).unwrap(), "Report.PDF");

        let err = validate_input(Path::new("scan.jpg"), pdf_only).unwrap_err();
        assert_eq!(err.to_string(), "scan.jpg: expected a PDF file");

        let images = ConversionPath::ImageToWord.accepted_kinds();
        assert!(validate_input(Path::new("scan.jpeg"), images).is_ok());
        let err = validate_input(Path::new("notes.txt"), images).unwrap_err();
        assert_eq!(err.to_string(), "notes.txt: expected a PNG or JPG image");
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            output_path(Path::new("/data/invoice.pdf"), None, ConversionPath::PdfToExcel),
            PathBuf::from("/data/invoice.xlsx")
        );
        assert_eq!(
            output_path(Path::new("photo.JPG"), None, ConversionPath::ImageToWord),
            PathBuf::from("photo.docx")
        );
        assert_eq!(
            output_path(
                Path::new("a.pdf"),
                Some(PathBuf::from("out/b.docx")),
                ConversionPath::PdfToWord
            ),
            PathBuf::from("out/b.docx")
        );
    }

    #[test]
    fn local_backend_rejects_bad_languages() {
        let ocr = OcrSettings {
            languages: "eng;tha".into(),
            ..OcrSettings::default()
        };
        let err = Backend::local(ocr).err().unwrap();
        assert!(err.to_string().contains("hint:"));
    }

    #[test]
    fn ocr_status_line() {
        assert_eq!(ocr_status(true, Some("ocrs")), "ready (ocrs)");
        assert_eq!(ocr_status(false, Some("ocrs")), "unavailable");
    }
}
