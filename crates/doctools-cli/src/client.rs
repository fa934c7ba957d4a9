// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP client for a running doctools server.

use std::time::Duration;

use anyhow::{Context, bail};
use doctools_core::types::{ConversionPath, ExtractionMethod};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

/// OCR of a large scan can take minutes on a small machine.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Reply of `POST /extract`. `method` and `pages` are optional so older
/// backends that only send the text still parse.
#[derive(Debug, Deserialize)]
pub struct RemoteExtraction {
    pub filename: String,
    pub extracted_text: String,
    #[serde(default)]
    pub method: Option<ExtractionMethod>,
    #[serde(default)]
    pub pages: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteHealth {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ocr_ready: bool,
    #[serde(default)]
    pub ocr_engine: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    detail: serde_json::Value,
    #[serde(default)]
    hint: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> anyhow::Result<RemoteHealth> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base_url))?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn extract(&self, file_name: &str, bytes: Vec<u8>) -> anyhow::Result<RemoteExtraction> {
        let response = self.upload("/extract", file_name, bytes).await?;
        Ok(response.json().await.context("unexpected reply from /extract")?)
    }

    /// Upload to a conversion endpoint and return the produced file.
    pub async fn convert(
        &self,
        path: ConversionPath,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<Vec<u8>> {
        let Some(endpoint) = endpoint(path) else {
            bail!("{path:?} does not produce a file");
        };
        let response = self.upload(endpoint, file_name, bytes).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(
        &self,
        endpoint: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, file_name, size = bytes.len(), "Uploading");

        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base_url))?;
        check(response).await
    }
}

/// Server route for a file-producing path.
pub fn endpoint(path: ConversionPath) -> Option<&'static str> {
    match path {
        ConversionPath::PdfToWord => Some("/convert/pdf-to-word"),
        ConversionPath::PdfToExcel => Some("/convert/pdf-to-excel"),
        ConversionPath::ImageToWord => Some("/convert/image-to-word"),
        ConversionPath::PdfText | ConversionPath::ImageOcr => None,
    }
}

/// Turn non-2xx replies into errors carrying the server's `detail` and `hint`.
async fn check(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorReply>(&body) {
        Ok(reply) => {
            let detail = match reply.detail {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            };
            match reply.hint {
                Some(hint) => bail!("server returned {status}: {detail}\n  hint: {hint}"),
                None => bail!("server returned {status}: {detail}"),
            }
        }
        Err(_) if body.trim().is_empty() => bail!("server returned {status}"),
        Err(_) => bail!("server returned {status}: {}", body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        assert_eq!(endpoint(ConversionPath::PdfToExcel), Some("/convert/pdf-to-excel"));
        assert_eq!(endpoint(ConversionPath::PdfText), None);
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn minimal_extract_reply_parses() {
        let reply: RemoteExtraction =
            serde_json::from_str(r#"{"filename": "a.pdf", "extracted_text": "hi"}"#).unwrap();
        assert_eq!(reply.extracted_text, "hi");
        assert!(reply.method.is_none());
    }
}
