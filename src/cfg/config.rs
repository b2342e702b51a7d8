// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cfg::endpoint::Endpoint;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// How to reach and authenticate against the remote engine.
    pub engine: Endpoint,
    /// Implementation/runtime parameters that never travel over the wire.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Runtime-only knobs. The defaults are the values the protocol was
/// designed around; tests shrink them.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(default = "default_startup_timeout", rename = "StartupTimeout", with = "serde_secs")]
    /// How long the startup watchdog waits for the first line and `uciok`.
    pub startup_timeout: Duration,

    #[serde(default = "default_quit_grace", rename = "QuitGrace", with = "serde_secs")]
    /// Best-effort window for delivering `quit` during shutdown.
    pub quit_grace: Duration,
}

fn default_startup_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_quit_grace() -> Duration {
    Duration::from_secs(1)
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            startup_timeout: default_startup_timeout(),
            quit_grace: default_quit_grace(),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.engine.validate()?;
        Ok(cfg)
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
