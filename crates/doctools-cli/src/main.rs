// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use doctools_cli::{Backend, commands};
use doctools_core::config::{OcrEngineKind, OcrSettings};
use doctools_core::types::ConversionPath;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "doctools",
    version,
    about = "Extract text from PDFs and images, convert them to Word or Excel"
)]
struct Cli {
    /// Base URL of the doctools server
    #[arg(
        long,
        global = true,
        env = "BACKEND_API_URL",
        default_value = "http://127.0.0.1:8000"
    )]
    server: String,

    /// Process files in this process instead of calling the server
    #[arg(long, global = true)]
    local: bool,

    /// OCR model directory for --local (default: the ocrs cache)
    #[arg(long, global = true, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// OCR engine for --local
    #[arg(long, global = true, value_enum, default_value_t = Engine::Ocrs)]
    ocr_engine: Engine,

    /// Tesseract languages for --local, primary first (e.g. tha+eng)
    #[arg(long, global = true, default_value = "eng")]
    lang: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Engine {
    Ocrs,
    Tesseract,
}

impl From<Engine> for OcrEngineKind {
    fn from(engine: Engine) -> Self {
        match engine {
            Engine::Ocrs => OcrEngineKind::Ocrs,
            Engine::Tesseract => OcrEngineKind::Tesseract,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from a PDF, PNG or JPG file
    Extract {
        input_file: PathBuf,

        /// Write the text to a file instead of stdout
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Print filename, method and page count as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert a PDF to a Word document
    PdfToWord {
        input_file: PathBuf,

        /// Output path (default: input name with .docx)
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Export the tables of a PDF to an Excel workbook
    PdfToExcel {
        input_file: PathBuf,

        /// Output path (default: input name with .xlsx)
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// OCR a PNG or JPG image into a Word document
    ImageToWord {
        input_file: PathBuf,

        /// Output path (default: input name with .docx)
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Show server (or local) status and OCR availability
    Health,
}

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr so extracted text on stdout stays clean
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let backend = if cli.local {
        let ocr = OcrSettings {
            engine: cli.ocr_engine.into(),
            model_dir: cli.model_dir,
            languages: cli.lang,
            ..OcrSettings::default()
        };
        tokio::task::spawn_blocking(move || Backend::local(ocr)).await??
    } else {
        Backend::remote(&cli.server)?
    };

    match cli.command {
        Commands::Extract {
            input_file,
            out,
            json,
        } => commands::extract(&backend, &input_file, out, json).await,
        Commands::PdfToWord { input_file, out } => {
            commands::convert(&backend, ConversionPath::PdfToWord, &input_file, out).await?;
            Ok(())
        }
        Commands::PdfToExcel { input_file, out } => {
            commands::convert(&backend, ConversionPath::PdfToExcel, &input_file, out).await?;
            Ok(())
        }
        Commands::ImageToWord { input_file, out } => {
            commands::convert(&backend, ConversionPath::ImageToWord, &input_file, out).await?;
            Ok(())
        }
        Commands::Health => commands::health(&backend).await,
    }
}
