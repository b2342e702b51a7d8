// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use tracing::info;
use uci_client_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    engine::{LogReporter, network::NetworkEngine},
};

#[tokio::main]
async fn main() -> Result<()> {
    let _init_logger = init_logger("tests/config_logger.yaml")?;

    // Load config
    let cfg = resolve_config_path("tests/config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let engine = NetworkEngine::with_runtime(
        cfg.engine,
        cfg.runtime,
        Arc::new(LogReporter),
    );
    engine.start();

    // Probe the UCI identity and wait for the uciok terminator.
    engine.write_line("uci");
    let mut attempts = 0u32;
    loop {
        match engine.read_line(Duration::from_millis(1000)).await {
            Some(line) if line.trim() == "uciok" => {
                info!("engine completed the uci exchange");
                break;
            },
            Some(line) if line.is_empty() => {
                attempts += 1;
                if attempts > 30 {
                    engine.shutdown().await;
                    bail!("engine did not answer uci in time");
                }
            },
            Some(line) => {
                if line.starts_with("option ") {
                    let _ = engine.register_option(&line);
                }
                info!("{line}");
            },
            None => bail!("engine session closed before uciok"),
        }
    }

    info!(
        "engine declared {} options",
        engine.all_options().len()
    );

    engine.shutdown().await;
    Ok(())
}
