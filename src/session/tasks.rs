// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{io, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::Mutex,
    time::sleep,
};
use tracing::{debug, warn};

use crate::{
    cfg::endpoint::Endpoint,
    engine::Reporter,
    error::EngineError,
    pipe::PipeRead,
    session::{Session, common::SharedWriter, handshake},
    transport,
};

/// Engine → GUI task: connects, runs the handshake, releases the gate, then
/// forwards lines until EOF, error, or shutdown. Always leaves the
/// engine→GUI pipe closed on exit so a blocked GUI reader wakes up.
pub(crate) async fn reader_task(
    session: Arc<Session>,
    endpoint: Endpoint,
    reporter: Arc<dyn Reporter>,
) {
    run_reader(&session, &endpoint, &reporter).await;
    session.to_gui.close();
    debug!("reader task finished");
}

async fn run_reader(session: &Session, endpoint: &Endpoint, reporter: &Arc<dyn Reporter>) {
    let cancel = session.cancel_token().clone();

    let stream = tokio::select! {
        _ = cancel.cancelled() => return,
        s = transport::connect(endpoint) => s,
    };
    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            session.fail(reporter.as_ref(), &e);
            return;
        },
    };

    let (read_half, write_half) = tokio::io::split(stream);
    let writer: SharedWriter = Arc::new(Mutex::new(write_half));
    session.bind_writer(Arc::clone(&writer));
    if session.is_shutdown_requested() {
        return;
    }

    let mut lines = BufReader::new(read_half).lines();
    let reinject = match handshake::negotiate(&mut lines, &writer, endpoint, &cancel).await
    {
        Ok(r) => r,
        Err(e) => {
            session.fail(reporter.as_ref(), &e);
            return;
        },
    };

    session.release_gate();
    if let Some(line) = reinject {
        session.push_engine_line(&line);
    }
    debug!("handshake gate released");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            r = lines.next_line() => r,
        };
        match next {
            Ok(Some(line)) => {
                if line.starts_with("AUTH_REQUIRED") {
                    // The server wanted auth while this client was configured
                    // without it.
                    session.fail(reporter.as_ref(), &EngineError::AuthRequiredMismatch);
                    return;
                }
                session.push_engine_line(&line);
            },
            Ok(None) => {
                if !session.is_shutdown_requested() && !session.is_error() {
                    session.fail(reporter.as_ref(), &EngineError::RemoteClosed);
                }
                return;
            },
            Err(e) => {
                if !session.is_shutdown_requested() && !session.is_error() {
                    warn!("engine socket read failed: {e}");
                    session.fail(reporter.as_ref(), &EngineError::Io(e));
                }
                return;
            },
        }
    }
}

/// GUI → engine task: waits for the handshake gate, then drains the
/// GUI→engine pipe onto the socket, tracking `position `/`go ` lines on the
/// way through.
pub(crate) async fn writer_task(session: Arc<Session>, reporter: Arc<dyn Reporter>) {
    let cancel = session.cancel_token().clone();

    // Wait for the reader to finish the handshake.
    let mut gate = session.gate();
    while !*gate.borrow() {
        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = gate.changed() => {
                if changed.is_err() {
                    return;
                }
            },
        }
    }
    if session.is_shutdown_requested() || session.is_error() {
        return;
    }
    let Some(writer) = session.writer().map(Arc::clone) else {
        return;
    };

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return,
            r = session.to_engine.read(Duration::MAX) => r,
        };
        match read {
            PipeRead::Line(line) => {
                session.note_outgoing(&line);
                let mut payload = line;
                payload.push('\n');

                let mut w = writer.lock().await;
                let written = tokio::select! {
                    _ = cancel.cancelled() => Err(io::Error::new(
                        io::ErrorKind::Interrupted,
                        "session cancelled",
                    )),
                    r = async {
                        w.write_all(payload.as_bytes()).await?;
                        w.flush().await
                    } => r,
                };
                if let Err(e) = written {
                    if !session.is_shutdown_requested() && !session.is_error() {
                        debug!("engine socket write failed: {e}");
                        session.fail(reporter.as_ref(), &EngineError::RemoteClosed);
                    }
                    return;
                }
            },
            PipeRead::Timeout => {},
            PipeRead::Closed => {
                if !session.is_shutdown_requested() && !session.is_error() {
                    session.fail(reporter.as_ref(), &EngineError::RemoteClosed);
                }
                return;
            },
        }
    }
}

/// Startup watchdog: one fixed sleep, then a verdict. An engine that never
/// produced a line, or produced lines but no `uciok`, is flagged as a UCI
/// protocol failure.
pub(crate) async fn watchdog_task(
    session: Arc<Session>,
    reporter: Arc<dyn Reporter>,
    startup_timeout: Duration,
) {
    tokio::select! {
        _ = session.cancel_token().cancelled() => return,
        _ = sleep(startup_timeout) => {},
    }
    if session.is_shutdown_requested() || session.is_error() {
        return;
    }
    if !session.is_running() || !session.uci_confirmed() {
        session.fail(reporter.as_ref(), &EngineError::StartupProtocol);
    }
}
