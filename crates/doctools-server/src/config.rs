// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration loading.
//
// Settings come from, in increasing priority:
//
// 1. Built-in defaults (`ServiceConfig::default()`).
// 2. A YAML file, `doctools.yaml` unless `--config` says otherwise. A missing
//    file is fine.
// 3. Environment variables prefixed `DOCTOOLS_`, with `__` separating nested
//    keys:
//
// ```bash
// DOCTOOLS_PORT=9000
// DOCTOOLS_MAX_UPLOAD_BYTES=52428800
// DOCTOOLS_OCR__MODEL_DIR=/opt/ocrs
// DOCTOOLS_OCR__ENGINE=tesseract
// DOCTOOLS_OCR__LANGUAGES=tha+eng
// DOCTOOLS_PREPROCESS__DENOISE=median
// DOCTOOLS_PDF__LAYOUT_BACKEND=native
// ```

use clap::Parser;
use doctools_core::config::ServiceConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "DOCTOOLS_CONFIG", default_value = "doctools.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Load and validate the service configuration.
pub fn load(args: &Args) -> Result<ServiceConfig, figment::Error> {
    let config: ServiceConfig = figment(args).extract()?;
    config
        .validate()
        .map_err(|err| figment::Error::from(err.to_string()))?;
    Ok(config)
}

pub fn figment(args: &Args) -> Figment {
    Figment::from(Serialized::defaults(ServiceConfig::default()))
        .merge(Yaml::file(&args.config))
        .merge(Env::prefixed("DOCTOOLS_").split("__"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctools_core::config::{DenoiseMethod, OcrEngineKind, TextBackend};
    use figment::Jail;

    fn args(config: &str) -> Args {
        Args {
            config: config.to_string(),
            validate: false,
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        Jail::expect_with(|_jail| {
            let config = load(&args("does-not-exist.yaml"))?;
            assert_eq!(config, ServiceConfig::default());
            assert_eq!(config.bind_address(), "127.0.0.1:8000");
            Ok(())
        });
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "doctools.yaml",
                r#"
host: 0.0.0.0
port: 8080
ocr:
  enabled: false
preprocess:
  denoise: median
pdf:
  layout_backend: native
"#,
            )?;

            let config = load(&args("doctools.yaml"))?;
            assert_eq!(config.bind_address(), "0.0.0.0:8080");
            assert!(!config.ocr.enabled);
            assert_eq!(config.preprocess.denoise, DenoiseMethod::Median);
            assert_eq!(config.preprocess.search_window, 21);
            assert_eq!(config.pdf.layout_backend, TextBackend::Native);
            assert!(config.pdf.ocr_scanned_pages);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("doctools.yaml", "port: 8080\nmax_upload_bytes: 1000\n")?;
            jail.set_env("DOCTOOLS_PORT", "9090");
            jail.set_env("DOCTOOLS_OCR__MODEL_DIR", "/opt/models");
            jail.set_env("DOCTOOLS_PREPROCESS__SHARPEN", "false");

            let config = load(&args("doctools.yaml"))?;
            assert_eq!(config.port, 9090);
            assert_eq!(config.max_upload_bytes, 1000);
            assert_eq!(
                config.ocr.model_dir.as_deref(),
                Some(std::path::Path::new("/opt/models"))
            );
            assert!(!config.preprocess.sharpen);
            Ok(())
        });
    }

    #[test]
    fn tesseract_languages_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("DOCTOOLS_OCR__ENGINE", "tesseract");
            jail.set_env("DOCTOOLS_OCR__LANGUAGES", "tha+eng");

            let config = load(&args("doctools.yaml"))?;
            assert_eq!(config.ocr.engine, OcrEngineKind::Tesseract);
            assert_eq!(config.ocr.languages, "tha+eng");

            jail.set_env("DOCTOOLS_OCR__LANGUAGES", "+");
            assert!(load(&args("doctools.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("doctools.yaml", "preprocess:\n  template_window: 8\n")?;
            assert!(load(&args("doctools.yaml")).is_err());

            jail.create_file("doctools.yaml", "max_upload_bytes: 0\n")?;
            assert!(load(&args("doctools.yaml")).is_err());

            jail.create_file("doctools.yaml", "port: not-a-number\n")?;
            assert!(load(&args("doctools.yaml")).is_err());
            Ok(())
        });
    }
}
