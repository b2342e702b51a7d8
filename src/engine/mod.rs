// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod network;

use std::{collections::HashSet, time::Duration};

use once_cell::sync::Lazy;
use tracing::warn;

/// Host-supplied capability receiving user-facing failure messages when a
/// session transitions to its error state.
pub trait Reporter: Send + Sync {
    fn report_error(&self, message: &str);
}

/// Reporter that routes failures into the tracing log. Useful for headless
/// hosts and the demo binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report_error(&self, message: &str) {
        warn!("engine error: {message}");
    }
}

/// The host's desired values for the options it manages itself.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    pub hash_mb: i64,
    pub syzygy_path: String,
    pub gaviota_path: String,
}

/// Contract a GUI consumes to drive an engine, network-backed or otherwise.
pub trait UciEngine {
    /// Begins connecting; completion and failures surface asynchronously.
    fn start(&self);

    /// Next engine output line: `Some("")` on timeout, `None` once the
    /// engine side is closed and drained.
    fn read_line(&self, timeout: Duration) -> impl Future<Output = Option<String>> + Send;

    /// Queues one command line (no trailing newline). Dropped silently after
    /// the session ended.
    fn write_line(&self, line: &str);

    /// Emits `setoption` commands for the host-managed values.
    fn init_options(&self, host: &HostOptions);

    /// False when the engine is in error state or a pre-init option value
    /// disagrees with the host configuration.
    fn options_ok(&self, host: &HostOptions) -> bool;

    /// Stops the session: best-effort `quit`, then teardown of the socket,
    /// tasks and pipes. I/O failures on the way out are swallowed.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}

/// Option names the host configures itself; they stay out of the GUI's
/// option editor.
static HOST_MANAGED_OPTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "hash",
        "ponder",
        "multipv",
        "uci_chess960",
        "uci_limitstrength",
        "uci_elo",
        "ownbook",
        "syzygypath",
        "gaviotatbpath",
    ])
});

/// Whether an option may be edited by the user: `UCI_`-prefixed and
/// host-managed options are not.
pub fn editable_option(name: &str) -> bool {
    !name.starts_with("UCI_")
        && !HOST_MANAGED_OPTIONS.contains(name.to_lowercase().as_str())
}
