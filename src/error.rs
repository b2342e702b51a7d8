// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// One failed connection strategy inside an aggregated transport failure.
#[derive(Debug)]
pub struct StrategyFailure {
    /// Strategy label (`mdns`, `direct`, `external`, `relay`, `retry`).
    pub strategy: &'static str,
    /// The `host:port` the strategy targeted.
    pub target: String,
    pub error: EngineError,
}

fn join_attempts(attempts: &[StrategyFailure]) -> String {
    let mut out = String::new();
    for a in attempts {
        if !out.is_empty() {
            out.push_str("; ");
        }
        out.push_str(a.strategy);
        out.push(' ');
        out.push_str(&a.target);
        out.push_str(": ");
        out.push_str(&a.error.to_string());
    }
    out
}

/// Failure classification for the whole network engine core. The `Display`
/// rendering of each variant is the user-visible message handed to the
/// session's error reporter.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("unknown host {0}")]
    UnknownHost(String),

    #[error("connection refused by {0}")]
    Refused(String),

    #[error("connection to {target} timed out{diag}")]
    Timeout { target: String, diag: String },

    #[error("TLS handshake with {target} failed: {reason}")]
    TlsHandshake { target: String, reason: String },

    #[error(
        "server certificate does not match the pinned fingerprint \
         (pinned {pinned}, presented {presented})"
    )]
    TlsPinning { pinned: String, presented: String },

    #[error("relay rendezvous failed: {0}")]
    Relay(String),

    #[error("authentication rejected by server: {0}")]
    AuthFailed(String),

    #[error("server requires authentication but none is configured")]
    AuthRequiredMismatch,

    #[error("engine not available: {0}")]
    EngineUnavailable(String),

    #[error("engine terminated")]
    RemoteClosed,

    #[error("uci protocol error")]
    StartupProtocol,

    #[error("unable to reach engine: {}", join_attempts(.attempts))]
    ConnectFailed { attempts: Vec<StrategyFailure> },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Builds a timeout error whose message names the configured alternate
    /// endpoints, so a user can tell which fallback paths were in play.
    pub fn timeout(target: impl Into<String>, alternates: &[&str]) -> Self {
        let diag = if alternates.is_empty() {
            String::new()
        } else {
            format!(" (alternates configured: {})", alternates.join(", "))
        };
        EngineError::Timeout {
            target: target.into(),
            diag,
        }
    }

    /// Classifies a raw connect/read error against a target address.
    pub fn classify_io(err: std::io::Error, target: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => {
                EngineError::Refused(target.to_string())
            },
            std::io::ErrorKind::TimedOut => EngineError::timeout(target, &[]),
            _ => EngineError::Io(err),
        }
    }
}
