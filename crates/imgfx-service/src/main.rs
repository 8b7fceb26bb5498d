// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgfx: apply one effect to one image file.
//
//   imgfx <image-path> <effect>
//
// Loads configuration, initialises logging and the service, then prints the
// stored asset summary as JSON on stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use imgfx_core::human_errors::humanize_error;
use imgfx_core::{AppConfig, CoreError, Effect, ProcessedUpload, UploadRequest};
use imgfx_service::{EffectService, StartupError};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] CoreError),

    #[error("failed to serialise result: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [path, effect] = args.as_slice() else {
        let names: Vec<&str> = Effect::ALL.iter().map(|e| e.as_str()).collect();
        eprintln!("usage: imgfx <image-path> <{}>", names.join("|"));
        return ExitCode::from(2);
    };

    tracing::info!("imgfx starting");

    match run(Path::new(path), effect).await {
        Ok(upload) => match serde_json::to_string_pretty(&upload) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => report(CliError::Output(e)),
        },
        Err(e) => report(e),
    }
}

async fn run(path: &Path, effect: &str) -> Result<ProcessedUpload, CliError> {
    let config = AppConfig::load().map_err(StartupError::from)?;
    let service = EffectService::init(config)?;

    let bytes = tokio::fs::read(path).await.map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let upload = service
        .process_upload_blocking(UploadRequest::new(bytes, filename, effect))
        .await?;
    Ok(upload)
}

fn report(err: CliError) -> ExitCode {
    match &err {
        CliError::Process(core) => {
            let human = humanize_error(core);
            tracing::error!(
                status = human.status,
                class = ?human.class,
                error = %core,
                "Request failed"
            );
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::from(1)
        }
        other => {
            tracing::error!(error = %other, "imgfx failed");
            eprintln!("imgfx: {other}");
            ExitCode::from(3)
        }
    }
}
