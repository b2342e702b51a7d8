// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{time::ChronoLocal, writer::BoxMakeWriter},
};

#[derive(Debug, Deserialize, Clone)]
struct LoggerFile {
    logger: LogSettings,
}

/// The `logger:` section of a client configuration file.
#[derive(Debug, Deserialize, Clone)]
struct LogSettings {
    /// Filter directive, e.g. `info` or `uci_client_rs::transport=debug`.
    level: String,
    sink: LogSink,
    #[serde(default)]
    show_line_numbers: bool,
    #[serde(default)]
    show_targets: bool,
}

/// Where log lines go. Engine sessions are long-lived, so the file sink
/// offers daily rotation and nothing finer.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
enum LogSink {
    Stdout,
    Stderr,
    File {
        path: PathBuf,
        #[serde(default)]
        rotate_daily: bool,
    },
}

impl LogSink {
    fn into_writer(self) -> Result<(BoxMakeWriter, WorkerGuard)> {
        Ok(match self {
            LogSink::Stdout => {
                let (w, g) = tracing_appender::non_blocking(std::io::stdout());
                (BoxMakeWriter::new(w), g)
            },
            LogSink::Stderr => {
                let (w, g) = tracing_appender::non_blocking(std::io::stderr());
                (BoxMakeWriter::new(w), g)
            },
            LogSink::File { path, rotate_daily } => {
                let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
                let name = path
                    .file_name()
                    .with_context(|| format!("log path {path:?} has no file name"))?;
                let rotation = if rotate_daily {
                    Rotation::DAILY
                } else {
                    Rotation::NEVER
                };
                let appender = RollingFileAppender::new(
                    rotation,
                    dir.unwrap_or_else(|| std::path::Path::new(".")),
                    name,
                );
                let (w, g) = tracing_appender::non_blocking(appender);
                (BoxMakeWriter::new(w), g)
            },
        })
    }
}

/// Initializes the global tracing subscriber from the `logger:` section of a
/// YAML file and returns the guard keeping the non-blocking writer alive.
pub fn init_logger(config_path: &str) -> Result<WorkerGuard> {
    let raw = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read logger config {config_path}"))?;
    let settings = serde_yaml::from_str::<LoggerFile>(&raw)
        .with_context(|| format!("failed to parse logger config {config_path}"))?
        .logger;

    let env_filter = EnvFilter::try_new(&settings.level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .context("failed to parse log level from config or env")?;

    let (writer, guard) = settings.sink.into_writer()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(ChronoLocal::rfc_3339())
        .with_line_number(settings.show_line_numbers)
        .with_target(settings.show_targets)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install the global tracing subscriber")?;

    Ok(guard)
}
