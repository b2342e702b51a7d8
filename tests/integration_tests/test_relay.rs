// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use uci_client_rs::cfg::endpoint::RelayConfig;

use crate::integration_tests::common::{
    RecordingReporter, closed_port, drain_until_close, endpoint_to, engine_for,
    expect_line, next_engine_line, send_raw, spawn_server, split_lines, wait_for_report,
};

#[tokio::test]
async fn test_relay_fallback_after_lan_failure() {
    let (relay_port, relay) = spawn_server(|stream| async move {
        let (mut lines, mut writer) = split_lines(stream);
        expect_line(&mut lines, "SESSION sess-42 client").await;
        // CONNECTED and the bridged server banner arrive in one burst; the
        // rendezvous consumer must not eat past its own line.
        send_raw(&mut writer, "CONNECTED\nid name StubEngine\nuciok\n").await;
        expect_line(&mut lines, "uci").await;
        drain_until_close(&mut lines).await;
    })
    .await;

    let mut endpoint = endpoint_to(closed_port());
    endpoint.relay = RelayConfig {
        host: "127.0.0.1".to_string(),
        port: relay_port,
        session_id: "sess-42".to_string(),
    };

    let reporter = RecordingReporter::new();
    let engine = engine_for(endpoint, &reporter);
    engine.start();
    engine.write_line("uci");

    assert_eq!(
        next_engine_line(&engine, Duration::from_secs(3)).await,
        Some("id name StubEngine".to_string())
    );
    assert_eq!(
        next_engine_line(&engine, Duration::from_secs(2)).await,
        Some("uciok".to_string())
    );
    assert!(engine.is_running());

    engine.shutdown().await;
    relay.await.expect("relay assertions failed");
    // The LAN failure stayed internal to the cascade.
    assert!(reporter.messages().is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_relay_error_response_fails_session() {
    let (relay_port, relay) = spawn_server(|stream| async move {
        let (mut lines, mut writer) = split_lines(stream);
        expect_line(&mut lines, "SESSION nope client").await;
        send_raw(&mut writer, "ERROR no such session\n").await;
    })
    .await;

    let mut endpoint = endpoint_to(closed_port());
    endpoint.relay = RelayConfig {
        host: "127.0.0.1".to_string(),
        port: relay_port,
        session_id: "nope".to_string(),
    };

    let reporter = RecordingReporter::new();
    let engine = engine_for(endpoint, &reporter);
    engine.start();

    let messages = wait_for_report(&reporter, Duration::from_secs(3)).await;
    assert!(messages[0].contains("ERROR no such session"), "{messages:?}");
    assert_eq!(engine.read_line(Duration::MAX).await, None);

    relay.await.expect("relay assertions failed");
    engine.shutdown().await;
}
