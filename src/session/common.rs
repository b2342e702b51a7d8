// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{io, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf},
    sync::Mutex,
    time::timeout,
};
use tokio_util::sync::CancellationToken;

use crate::{error::EngineError, transport::NetStream};

/// Per-line deadline for the handshake sub-protocols.
pub(crate) const HANDSHAKE_IO_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Buffered line source over the read half of the session socket. The same
/// value serves the handshake and then the reader loop, so no buffered byte
/// is ever lost between the two.
pub(crate) type EngineLines = Lines<BufReader<ReadHalf<NetStream>>>;

/// Write half of the session socket. The reader task holds it during the
/// handshake, the writer task afterwards; shutdown borrows it for the
/// best-effort `quit`.
pub(crate) type SharedWriter = Arc<Mutex<WriteHalf<NetStream>>>;

pub(crate) async fn io_with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T, EngineError>
where
    F: Future<Output = io::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(EngineError::Io(io::Error::new(
            io::ErrorKind::Interrupted,
            format!("{label} cancelled"),
        ))),
        res = timeout(io_timeout, fut) => {
            match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(EngineError::Io(e)),
                Err(_) => Err(EngineError::timeout(label, &[])),
            }
        }
    }
}

/// Reads one trimmed line during the handshake; EOF maps to
/// [`EngineError::RemoteClosed`].
pub(crate) async fn read_handshake_line(
    lines: &mut EngineLines,
    cancel: &CancellationToken,
) -> Result<String, EngineError> {
    let line = io_with_timeout(
        "handshake read",
        lines.next_line(),
        HANDSHAKE_IO_TIMEOUT,
        cancel,
    )
    .await?;
    line.ok_or(EngineError::RemoteClosed)
}

/// Sends one line (newline appended) and flushes.
pub(crate) async fn send_line(
    writer: &SharedWriter,
    line: &str,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    let mut payload = String::with_capacity(line.len() + 1);
    payload.push_str(line);
    payload.push('\n');

    let mut w = writer.lock().await;
    io_with_timeout(
        "handshake write",
        w.write_all(payload.as_bytes()),
        HANDSHAKE_IO_TIMEOUT,
        cancel,
    )
    .await?;
    io_with_timeout("handshake flush", w.flush(), HANDSHAKE_IO_TIMEOUT, cancel).await
}
