// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    cfg::{endpoint::Endpoint, enums::AuthMethod},
    error::EngineError,
    session::common::{EngineLines, SharedWriter, read_handshake_line, send_line},
};

/// Runs the on-socket bootstrapping (auth, then engine selection) before any
/// UCI traffic flows.
///
/// Returns the line to re-inject into the engine→GUI pipe when the server
/// turned out not to require auth and its first engine output was consumed
/// by the probe read.
pub(crate) async fn negotiate(
    lines: &mut EngineLines,
    writer: &SharedWriter,
    ep: &Endpoint,
    cancel: &CancellationToken,
) -> Result<Option<String>, EngineError> {
    let reinject = authenticate(lines, writer, ep, cancel).await?;
    select_engine(lines, writer, ep, cancel).await?;
    Ok(reinject)
}

/// Auth sub-protocol. Skipped entirely when no method or no secret is
/// configured; otherwise the first server line decides: `AUTH_REQUIRED`
/// starts the exchange, anything else is engine output to be re-injected.
async fn authenticate(
    lines: &mut EngineLines,
    writer: &SharedWriter,
    ep: &Endpoint,
    cancel: &CancellationToken,
) -> Result<Option<String>, EngineError> {
    if ep.auth_method.is_none() || (ep.token.is_empty() && ep.psk_key.is_empty()) {
        return Ok(None);
    }

    let first = read_handshake_line(lines, cancel).await?;
    if !first.starts_with("AUTH_REQUIRED") {
        debug!("server did not request auth for this session");
        return Ok(Some(first));
    }
    // Some servers append a method list after AUTH_REQUIRED; the configured
    // method is used regardless.

    let answer = if ep.auth_method == AuthMethod::Token && !ep.token.is_empty() {
        format!("AUTH {}", ep.token)
    } else {
        format!("PSK_AUTH {}", ep.psk_key)
    };
    send_line(writer, &answer, cancel).await?;

    let verdict = read_handshake_line(lines, cancel).await?;
    if verdict.trim() == "AUTH_OK" {
        debug!("authenticated via {}", ep.auth_method);
        Ok(None)
    } else {
        Err(EngineError::AuthFailed(verdict))
    }
}

/// Engine-selection sub-protocol for multiplexed servers.
async fn select_engine(
    lines: &mut EngineLines,
    writer: &SharedWriter,
    ep: &Endpoint,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    if ep.selected_engine.is_empty() {
        return Ok(());
    }
    let wanted = ep.selected_engine.as_str();

    send_line(writer, "ENGINE_LIST", cancel).await?;
    let mut available: Vec<String> = Vec::new();
    loop {
        let line = read_handshake_line(lines, cancel).await?;
        if line == "ENGINES_END" {
            break;
        }
        if let Some(name) = line.strip_prefix("ENGINE ") {
            available.push(name.to_string());
        }
    }

    if available.is_empty() {
        // A server without multiplexing support answers with an empty list
        // (or nothing but the terminator).
        return Err(EngineError::EngineUnavailable(format!(
            "{wanted} (server listed no engines)"
        )));
    }
    if !available.iter().any(|name| name == wanted) {
        return Err(EngineError::EngineUnavailable(format!(
            "{wanted} (server offers: {})",
            available.join(", ")
        )));
    }

    send_line(writer, &format!("SELECT_ENGINE {wanted}"), cancel).await?;
    let verdict = read_handshake_line(lines, cancel).await?;
    if verdict.trim() == "ENGINE_SELECTED" {
        debug!("selected engine {wanted}");
        Ok(())
    } else {
        Err(EngineError::EngineUnavailable(format!(
            "{wanted} (selection rejected: {verdict})"
        )))
    }
}
