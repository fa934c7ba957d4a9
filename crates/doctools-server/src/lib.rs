// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// doctools-server: HTTP front for the doctools document pipeline.
//
// Routes:
//
// | Method | Path                      | Result                              |
// |--------|---------------------------|-------------------------------------|
// | GET    | `/health`                 | service and OCR status              |
// | POST   | `/extract`                | JSON with the extracted text        |
// | POST   | `/convert/pdf-to-word`    | `.docx` attachment                  |
// | POST   | `/convert/pdf-to-excel`   | `.xlsx` attachment, 404 if no table |
// | POST   | `/convert/image-to-word`  | `.docx` attachment                  |
//
// Uploads are `multipart/form-data` with the document in a field named `file`.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod state;
pub mod telemetry;

use std::future::Future;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use uuid::Uuid;

pub use errors::ApiError;
pub use state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/extract", post(handlers::extract))
        .route("/convert/pdf-to-word", post(handlers::pdf_to_word))
        .route("/convert/pdf-to-excel", post(handlers::pdf_to_excel))
        .route("/convert/image-to-word", post(handlers::image_to_word))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &Request<_>| {
                            tracing::info_span!(
                                "request",
                                id = %Uuid::new_v4(),
                                method = %request.method(),
                                uri = %request.uri(),
                            )
                        })
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(state: AppState, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
    let bind_addr = state.config.bind_address();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        ocr_ready = state.converter.ocr_ready(),
        max_upload_bytes = state.config.max_upload_bytes,
        "doctools listening on http://{}",
        bind_addr
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
