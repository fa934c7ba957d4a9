// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request handlers. Each upload endpoint reads the multipart `file` field into
// memory (bounded by `max_upload_bytes`), then runs the conversion on a
// blocking thread so OCR and PDF parsing never stall the async runtime.

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use doctools_core::error::Result as DocResult;
use doctools_core::types::{ConversionPath, Converted, ExtractionMethod};
use doctools_document::DocumentConverter;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::errors::ApiError;
use crate::state::AppState;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub filename: String,
    pub extracted_text: String,
    pub method: ExtractionMethod,
    pub pages: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ocr_ready: bool,
    pub ocr_engine: Option<String>,
}

/// An uploaded file held in memory.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

// -- Endpoints ----------------------------------------------------------------

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr_ready: state.converter.ocr_ready(),
        ocr_engine: state.converter.recognizer_name().map(str::to_string),
    })
}

/// `POST /extract`: text of a PDF (text layer, OCR for scanned pages) or of
/// a PNG/JPG image (OCR).
#[instrument(skip_all)]
pub async fn extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    let filename = upload.file_name.clone();

    let extraction = run_blocking(&state, move |converter| {
        converter.extract(&upload.file_name, &upload.bytes)
    })
    .await?;

    info!(
        filename = %filename,
        method = ?extraction.method,
        pages = extraction.pages,
        chars = extraction.text.len(),
        "Text extracted"
    );
    Ok(Json(ExtractResponse {
        filename,
        extracted_text: extraction.text,
        method: extraction.method,
        pages: extraction.pages,
    }))
}

/// `POST /convert/pdf-to-word`
pub async fn pdf_to_word(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    convert(state, multipart, ConversionPath::PdfToWord).await
}

/// `POST /convert/pdf-to-excel`: 404 when the PDF holds no tables.
pub async fn pdf_to_excel(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    convert(state, multipart, ConversionPath::PdfToExcel).await
}

/// `POST /convert/image-to-word`
pub async fn image_to_word(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    convert(state, multipart, ConversionPath::ImageToWord).await
}

#[instrument(skip(state, multipart))]
async fn convert(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
    path: ConversionPath,
) -> Result<Response, ApiError> {
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    let converted = run_blocking(&state, move |converter| {
        converter.convert(path, &upload.file_name, &upload.bytes)
    })
    .await?;

    info!(file_name = %converted.file_name, size = converted.bytes.len(), "Conversion complete");
    Ok(file_response(converted))
}

// -- Helpers ------------------------------------------------------------------

/// Read the `file` field, failing fast once it grows past `limit`.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    limit: usize,
) -> Result<Upload, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        ApiError::bad_request(format!(
            "expected a multipart/form-data upload: {}",
            rejection.body_text()
        ))
    })?;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
            if bytes.len() + chunk.len() > limit {
                tracing::warn!(file_name = %file_name, limit, "Upload size limit exceeded, aborting");
                return Err(ApiError::PayloadTooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }

        if file_name.is_empty() {
            return Err(ApiError::bad_request("uploaded file has no name"));
        }
        if bytes.is_empty() {
            return Err(ApiError::bad_request(format!("{file_name} is empty")));
        }
        tracing::debug!(file_name = %file_name, size = bytes.len(), "Upload received");
        return Ok(Upload { file_name, bytes });
    }

    Err(ApiError::bad_request(format!(
        "missing multipart field `{FILE_FIELD}`"
    )))
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::bad_request(format!("failed to read multipart data: {}", err.body_text()))
    }
}

/// Run a conversion on the blocking pool.
async fn run_blocking<T, F>(state: &AppState, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&DocumentConverter) -> DocResult<T> + Send + 'static,
{
    let converter = state.converter.clone();
    tokio::task::spawn_blocking(move || job(&converter))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?
        .map_err(ApiError::from)
}

fn file_response(converted: Converted) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe_file_name(&converted.file_name)
    );
    (
        [
            (header::CONTENT_TYPE, converted.target.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        converted.bytes,
    )
        .into_response()
}

/// Header values must be visible ASCII; anything else (and quotes) becomes `_`.
fn header_safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
