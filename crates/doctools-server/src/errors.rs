// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error mapping. Every failure becomes a JSON body
// `{"detail": "...", "hint": "..."}` with a status code that tells the client
// whether to fix the upload, retry later, or report a bug.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use doctools_core::error::DoctoolsError;
use doctools_core::human_errors::humanize_error;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ApiError {
    /// Malformed request: missing field, empty file, unreadable multipart body.
    #[error("{message}")]
    BadRequest { message: String },

    #[error("upload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The blocking worker panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Document(#[from] DoctoolsError),
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Document(err) => match err {
                DoctoolsError::UnsupportedDocument(_) => StatusCode::BAD_REQUEST,
                DoctoolsError::NoTablesFound => StatusCode::NOT_FOUND,
                DoctoolsError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// The `detail` field: says what went wrong without internal paths or
    /// stack context for client errors.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::BadRequest { message } => message.clone(),
            ApiError::PayloadTooLarge { limit } => format!(
                "file is larger than the {} MB upload limit",
                limit.div_ceil(1024 * 1024)
            ),
            ApiError::Worker(_) => "processing error: the worker stopped unexpectedly".to_string(),
            ApiError::Document(err) => match err {
                DoctoolsError::UnsupportedDocument(detail) => detail.clone(),
                DoctoolsError::NoTablesFound => "no tables found in this PDF".to_string(),
                DoctoolsError::OcrUnavailable(_) => {
                    "OCR is not available on this server".to_string()
                }
                other => format!("processing error: {other}"),
            },
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            ApiError::Document(err) => Some(humanize_error(err).suggestion),
            ApiError::PayloadTooLarge { .. } => {
                Some("Split the document or reduce the image resolution, then upload again.".into())
            }
            ApiError::BadRequest { .. } => {
                Some("Send the file as multipart/form-data in a field named `file`.".into())
            }
            ApiError::Worker(_) => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log full error details, level by severity
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("Request failed: {:#}", self);
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!("Service unavailable: {}", self);
        } else {
            tracing::debug!("Client error: {}", self);
        }

        let body = ErrorBody {
            detail: self.user_message(),
            hint: self.hint(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            ApiError::from(DoctoolsError::UnsupportedDocument("x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DoctoolsError::NoTablesFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DoctoolsError::OcrUnavailable("x".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(DoctoolsError::PdfError("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn processing_errors_carry_their_cause() {
        let err = ApiError::from(DoctoolsError::PdfError("bad xref".into()));
        assert_eq!(err.user_message(), "processing error: PDF operation failed: bad xref");
        assert!(err.hint().is_some());
    }

    #[test]
    fn size_limit_rounds_up_to_megabytes() {
        let err = ApiError::PayloadTooLarge {
            limit: 25 * 1024 * 1024,
        };
        assert_eq!(err.user_message(), "file is larger than the 25 MB upload limit");
    }
}
