// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP API tests against an in-process server.

use std::io::{Cursor, Read};
use std::sync::Arc;

use axum::http::{StatusCode, header};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use doctools_core::config::{PdfSettings, ServiceConfig, TextBackend};
use doctools_core::error::Result as DocResult;
use doctools_document::{DocumentConverter, TextRecognizer};
use doctools_server::errors::ErrorBody;
use doctools_server::handlers::{ExtractResponse, HealthResponse};
use doctools_server::{AppState, router};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

// -- Fixtures -----------------------------------------------------------------

struct FixedText(&'static str);

impl TextRecognizer for FixedText {
    fn recognize(&self, _image: &DynamicImage) -> DocResult<String> {
        Ok(self.0.to_string())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn config(max_upload_bytes: usize) -> ServiceConfig {
    ServiceConfig {
        max_upload_bytes,
        pdf: PdfSettings {
            layout_backend: TextBackend::Native,
            ..PdfSettings::default()
        },
        ..ServiceConfig::default()
    }
}

fn server_with(config: ServiceConfig, ocr: bool) -> TestServer {
    let recognizer: Option<Arc<dyn TextRecognizer>> = if ocr {
        Some(Arc::new(FixedText("Recognised receipt text")))
    } else {
        None
    };
    let converter = DocumentConverter::new(&config, recognizer).unwrap();
    TestServer::new(router(AppState::new(config, converter))).unwrap()
}

fn server() -> TestServer {
    server_with(config(1024 * 1024), true)
}

/// Single-page PDF with one Courier text line per entry.
fn pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
        operations.push(Operation::new("Td", vec![50.into(), (780 - 14 * i as i64).into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        Content { operations }.encode().unwrap(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn invoice_pdf() -> Vec<u8> {
    pdf(&[
        "ACME Supplies",
        "Item      Qty   Price",
        "Pens      4     2.50",
        "Paper     10    6.00",
    ])
}

fn png() -> Vec<u8> {
    let img = GrayImage::from_fn(40, 30, |x, _| if x % 10 < 5 { Luma([20]) } else { Luma([235]) });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn upload(bytes: Vec<u8>, name: &str) -> MultipartForm {
    MultipartForm::new().add_part("file", Part::bytes(bytes).file_name(name))
}

// -- Health -------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ocr_status() {
    let response = server().get("/health").await;
    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(health.ocr_ready);
    assert_eq!(health.ocr_engine.as_deref(), Some("fixed"));

    let health: HealthResponse = server_with(config(1024), false).get("/health").await.json();
    assert!(!health.ocr_ready);
    assert!(health.ocr_engine.is_none());
}

// -- /extract -----------------------------------------------------------------

#[tokio::test]
async fn extract_pdf_text() {
    let response = server()
        .post("/extract")
        .multipart(upload(invoice_pdf(), "Invoice.PDF"))
        .await;
    response.assert_status_ok();

    let body: ExtractResponse = response.json();
    assert_eq!(body.filename, "Invoice.PDF");
    assert!(body.extracted_text.starts_with("ACME Supplies"));
    assert!(body.extracted_text.contains("Paper"));
    assert_eq!(body.pages, 1);
}

#[tokio::test]
async fn extract_image_text() {
    let response = server().post("/extract").multipart(upload(png(), "receipt.png")).await;
    response.assert_status_ok();
    let body: ExtractResponse = response.json();
    assert_eq!(body.extracted_text, "Recognised receipt text");
}

#[tokio::test]
async fn unsupported_extension_is_400() {
    let response = server()
        .post("/extract")
        .multipart(upload(b"hello".to_vec(), "notes.txt"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert!(body.detail.contains("only PDF, PNG and JPG"));
    assert!(body.hint.is_some());
}

#[tokio::test]
async fn missing_file_field_is_400() {
    let form = MultipartForm::new().add_part("document", Part::bytes(invoice_pdf()).file_name("a.pdf"));
    let response = server().post("/extract").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert_eq!(body.detail, "missing multipart field `file`");
}

#[tokio::test]
async fn non_multipart_body_gets_a_json_error() {
    let response = server()
        .post("/extract")
        .json(&serde_json::json!({ "file": "invoice.pdf" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert!(
        body.detail.starts_with("expected a multipart/form-data upload"),
        "{}",
        body.detail
    );
    assert!(body.hint.is_some());

    let response = server().post("/convert/pdf-to-word").text("plain text").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let _: ErrorBody = response.json();
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let response = server_with(config(1024), true)
        .post("/extract")
        .multipart(upload(vec![b'x'; 4096], "big.pdf"))
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn corrupt_pdf_is_a_processing_error() {
    let response = server()
        .post("/extract")
        .multipart(upload(b"%PDF-1.7 truncated".to_vec(), "broken.pdf"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json();
    assert!(body.detail.starts_with("processing error:"));
}

// -- /convert -----------------------------------------------------------------

#[tokio::test]
async fn pdf_to_word_returns_docx_attachment() {
    let response = server()
        .post("/convert/pdf-to-word")
        .multipart(upload(invoice_pdf(), "invoice.pdf"))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"invoice.docx\""
    );

    let bytes = response.as_bytes().to_vec();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    assert!(xml.contains("ACME Supplies"));
    assert!(xml.contains("<w:tbl>"));
}

#[tokio::test]
async fn pdf_to_excel_returns_xlsx_attachment() {
    let response = server()
        .post("/convert/pdf-to-excel")
        .multipart(upload(invoice_pdf(), "invoice.pdf"))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"invoice.xlsx\""
    );
    assert_eq!(&response.as_bytes()[..2], b"PK");
}

#[tokio::test]
async fn pdf_without_tables_is_404() {
    let response = server()
        .post("/convert/pdf-to-excel")
        .multipart(upload(pdf(&["Dear customer,", "thank you."]), "letter.pdf"))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: ErrorBody = response.json();
    assert_eq!(body.detail, "no tables found in this PDF");
}

#[tokio::test]
async fn pdf_endpoint_rejects_images() {
    let response = server()
        .post("/convert/pdf-to-word")
        .multipart(upload(png(), "photo.png"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_to_word_returns_docx() {
    let response = server()
        .post("/convert/image-to-word")
        .multipart(upload(png(), "receipt.jpg.png"))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"receipt.jpg.docx\""
    );
}

#[tokio::test]
async fn image_to_word_without_ocr_is_503() {
    let response = server_with(config(1024 * 1024), false)
        .post("/convert/image-to-word")
        .multipart(upload(png(), "receipt.png"))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = response.json();
    assert_eq!(body.detail, "OCR is not available on this server");
}
