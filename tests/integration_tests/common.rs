// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    task::JoinHandle,
    time::timeout,
};
use uci_client_rs::{
    cfg::{config::RuntimeConfig, endpoint::Endpoint},
    engine::{Reporter, network::NetworkEngine},
};

pub type ServerLines = Lines<BufReader<OwnedReadHalf>>;

/// Reporter that records every message for later assertions.
#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("reporter mutex").clone()
    }
}

impl Reporter for RecordingReporter {
    fn report_error(&self, message: &str) {
        self.messages
            .lock()
            .expect("reporter mutex")
            .push(message.to_string());
    }
}

/// Binds a scripted one-connection server on an ephemeral port.
pub async fn spawn_server<F, Fut>(handler: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let port = listener.local_addr().expect("local addr").port();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        stream.set_nodelay(true).expect("nodelay");
        handler(stream).await;
    });
    (port, handle)
}

/// A port that refuses connections: bound, then immediately released.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("probe bind");
    listener.local_addr().expect("probe addr").port()
}

pub fn endpoint_to(port: u16) -> Endpoint {
    Endpoint {
        host: "127.0.0.1".to_string(),
        port,
        ..Endpoint::default()
    }
}

pub fn test_runtime() -> RuntimeConfig {
    RuntimeConfig {
        startup_timeout: Duration::from_secs(10),
        quit_grace: Duration::from_millis(200),
    }
}

pub fn engine_for(
    endpoint: Endpoint,
    reporter: &Arc<RecordingReporter>,
) -> NetworkEngine {
    NetworkEngine::with_runtime(
        endpoint,
        test_runtime(),
        Arc::clone(reporter) as Arc<dyn Reporter>,
    )
}

pub fn split_lines(stream: TcpStream) -> (ServerLines, OwnedWriteHalf) {
    let (r, w) = stream.into_split();
    (BufReader::new(r).lines(), w)
}

/// Server-side: asserts the next client line.
pub async fn expect_line(lines: &mut ServerLines, expected: &str) {
    let line = timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("server read timed out")
        .expect("server read failed")
        .unwrap_or_else(|| panic!("client closed before sending {expected:?}"));
    assert_eq!(line, expected);
}

/// Server-side: consumes lines until the client closes the connection, so
/// the mock outlives the client's shutdown instead of racing it.
pub async fn drain_until_close(lines: &mut ServerLines) {
    while let Ok(Ok(Some(_))) = timeout(Duration::from_secs(5), lines.next_line()).await {}
}

/// Server-side: writes raw bytes (may contain several lines) and flushes.
pub async fn send_raw(writer: &mut OwnedWriteHalf, payload: &str) {
    writer
        .write_all(payload.as_bytes())
        .await
        .expect("server write failed");
    writer.flush().await.expect("server flush failed");
}

/// Client-side: next non-empty engine line within an overall deadline
/// (`read_line` yields empty strings on its internal poll timeouts).
pub async fn next_engine_line(engine: &NetworkEngine, deadline: Duration) -> Option<String> {
    timeout(deadline, async {
        loop {
            match engine.read_line(Duration::from_millis(100)).await {
                Some(line) if line.is_empty() => continue,
                other => return other,
            }
        }
    })
    .await
    .expect("engine produced no line before the deadline")
}

/// Waits until the reporter holds at least one message.
pub async fn wait_for_report(reporter: &RecordingReporter, deadline: Duration) -> Vec<String> {
    timeout(deadline, async {
        loop {
            let messages = reporter.messages();
            if !messages.is_empty() {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("no error was reported before the deadline")
}
