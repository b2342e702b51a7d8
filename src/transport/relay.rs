// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use crate::{
    cfg::endpoint::RelayConfig,
    error::EngineError,
    transport::{RELAY_CONNECT_TIMEOUT, timed_connect},
};

/// Per-operation deadline on the rendezvous socket.
pub const RELAY_IO_TIMEOUT: Duration = Duration::from_millis(15_000);

const MAX_RESPONSE_LEN: usize = 512;

/// Dials the relay and performs the rendezvous: after this returns, the
/// stream is bridged to the engine server and every byte on it belongs to
/// the session.
pub async fn connect(relay: &RelayConfig) -> Result<TcpStream, EngineError> {
    let target = format!("{}:{}", relay.host, relay.port);
    let mut stream = timed_connect(&target, RELAY_CONNECT_TIMEOUT).await?;
    stream.set_nodelay(true)?;
    rendezvous(&mut stream, &relay.session_id).await?;
    debug!("relay session {} established via {target}", relay.session_id);
    Ok(stream)
}

/// Announces the session and consumes exactly the relay's one-line reply.
///
/// The reply is read one byte at a time: a buffered reader here would pull
/// the server's first post-bridge bytes into a buffer that dies with it.
pub(crate) async fn rendezvous(
    stream: &mut TcpStream,
    session_id: &str,
) -> Result<(), EngineError> {
    let announce = format!("SESSION {session_id} client\n");
    relay_io(stream.write_all(announce.as_bytes())).await?;
    relay_io(stream.flush()).await?;

    let mut line: Vec<u8> = Vec::with_capacity(32);
    loop {
        let mut byte = [0u8; 1];
        let n = relay_io(stream.read(&mut byte)).await?;
        if n == 0 {
            return Err(EngineError::Relay(
                "relay closed the connection during rendezvous".to_string(),
            ));
        }
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
        if line.len() > MAX_RESPONSE_LEN {
            return Err(EngineError::Relay(format!(
                "unexpected relay response: {}",
                String::from_utf8_lossy(&line)
            )));
        }
    }
    if line.last() == Some(&b'\r') {
        let _ = line.pop();
    }

    let response = String::from_utf8_lossy(&line);
    if response == "CONNECTED" {
        Ok(())
    } else if response.starts_with("ERROR") {
        Err(EngineError::Relay(response.into_owned()))
    } else {
        Err(EngineError::Relay(format!(
            "unexpected relay response: {response}"
        )))
    }
}

async fn relay_io<T>(
    fut: impl Future<Output = std::io::Result<T>>,
) -> Result<T, EngineError> {
    match timeout(RELAY_IO_TIMEOUT, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(EngineError::Io(e)),
        Err(_) => Err(EngineError::Relay("relay rendezvous timed out".to_string())),
    }
}
