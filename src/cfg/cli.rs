// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};

/// Environment variable that overrides where the engine configuration is
/// read from, taking precedence over the path given on the command line.
pub const CONFIG_ENV: &str = "UCI_CLIENT_CONFIG";

/// Resolves the engine configuration file: `UCI_CLIENT_CONFIG` wins when
/// set, otherwise `rel` is taken relative to the working directory. The
/// result is canonical and known to name a regular file.
pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let chosen = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(rel));

    let abs = if chosen.is_absolute() {
        chosen
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(chosen)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("engine config {abs:?} is not readable"))?;
    ensure!(
        canon.is_file(),
        "engine config {canon:?} is not a regular file"
    );

    Ok(canon)
}
