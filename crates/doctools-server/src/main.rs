// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// doctools-server: entry point. Loads configuration, initialises logging and
// the OCR engine, then serves until Ctrl+C or SIGTERM.

use clap::Parser;
use doctools_server::{AppState, config, telemetry};

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(%err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = config::Args::parse();
    let config = config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        if config.ocr.enabled {
            if let Err(err) = doctools_document::check_recognizer(&config.ocr) {
                println!("Warning: {err}; image endpoints will answer 503.");
            }
        }
        return Ok(());
    }

    telemetry::init_telemetry()?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "doctools starting");
    tracing::debug!(?args, ?config, "Configuration loaded");

    let state = tokio::task::spawn_blocking(move || AppState::from_config(config)).await??;
    doctools_server::serve(state, shutdown_signal()).await
}
