// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use uci_client_rs::cfg::enums::AuthMethod;

use crate::integration_tests::common::{
    RecordingReporter, drain_until_close, endpoint_to, engine_for, expect_line,
    next_engine_line, send_raw, spawn_server, split_lines, wait_for_report,
};

#[tokio::test]
async fn test_token_auth_success() {
    let (port, server) = spawn_server(|stream| async move {
        let (mut lines, mut writer) = split_lines(stream);
        send_raw(&mut writer, "AUTH_REQUIRED\n").await;
        // The writer must stay quiescent until AUTH_OK: the next client
        // line has to be the auth answer, not queued UCI traffic.
        expect_line(&mut lines, "AUTH abc").await;
        send_raw(&mut writer, "AUTH_OK\n").await;
        send_raw(&mut writer, "id name StubEngine\nuciok\n").await;
        expect_line(&mut lines, "uci").await;
        drain_until_close(&mut lines).await;
    })
    .await;

    let mut endpoint = endpoint_to(port);
    endpoint.auth_method = AuthMethod::Token;
    endpoint.token = "abc".to_string();

    let reporter = RecordingReporter::new();
    let engine = engine_for(endpoint, &reporter);
    engine.start();
    engine.write_line("uci");

    // The GUI never sees the auth exchange.
    assert_eq!(
        next_engine_line(&engine, Duration::from_secs(2)).await,
        Some("id name StubEngine".to_string())
    );
    assert_eq!(
        next_engine_line(&engine, Duration::from_secs(2)).await,
        Some("uciok".to_string())
    );

    engine.shutdown().await;
    server.await.expect("server assertions failed");
    assert!(reporter.messages().is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_psk_auth_success() {
    let (port, server) = spawn_server(|stream| async move {
        let (mut lines, mut writer) = split_lines(stream);
        send_raw(&mut writer, "AUTH_REQUIRED token psk\n").await;
        expect_line(&mut lines, "PSK_AUTH sesame").await;
        send_raw(&mut writer, "AUTH_OK\nuciok\n").await;
        drain_until_close(&mut lines).await;
    })
    .await;

    let mut endpoint = endpoint_to(port);
    endpoint.auth_method = AuthMethod::Psk;
    endpoint.psk_key = "sesame".to_string();

    let reporter = RecordingReporter::new();
    let engine = engine_for(endpoint, &reporter);
    engine.start();

    assert_eq!(
        next_engine_line(&engine, Duration::from_secs(2)).await,
        Some("uciok".to_string())
    );
    engine.shutdown().await;
    server.await.expect("server assertions failed");
    assert!(reporter.messages().is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_auth_rejection_reported() {
    let (port, server) = spawn_server(|stream| async move {
        let (mut lines, mut writer) = split_lines(stream);
        send_raw(&mut writer, "AUTH_REQUIRED\n").await;
        expect_line(&mut lines, "AUTH wrong").await;
        send_raw(&mut writer, "AUTH_DENIED bad token\n").await;
    })
    .await;

    let mut endpoint = endpoint_to(port);
    endpoint.auth_method = AuthMethod::Token;
    endpoint.token = "wrong".to_string();

    let reporter = RecordingReporter::new();
    let engine = engine_for(endpoint, &reporter);
    engine.start();

    let messages = wait_for_report(&reporter, Duration::from_secs(2)).await;
    assert!(
        messages[0].contains("authentication rejected"),
        "{messages:?}"
    );
    assert_eq!(engine.read_line(Duration::MAX).await, None);
    assert!(engine.is_error());

    server.await.expect("server assertions failed");
    engine.shutdown().await;
}

#[tokio::test]
async fn test_server_without_auth_reinjects_first_line() {
    // Client is configured for token auth, but the server goes straight to
    // engine output. That first line must reach the GUI.
    let (port, server) = spawn_server(|stream| async move {
        let (mut lines, mut writer) = split_lines(stream);
        send_raw(&mut writer, "id name StubEngine\nuciok\n").await;
        expect_line(&mut lines, "uci").await;
        drain_until_close(&mut lines).await;
    })
    .await;

    let mut endpoint = endpoint_to(port);
    endpoint.auth_method = AuthMethod::Token;
    endpoint.token = "abc".to_string();

    let reporter = RecordingReporter::new();
    let engine = engine_for(endpoint, &reporter);
    engine.start();
    engine.write_line("uci");

    assert_eq!(
        next_engine_line(&engine, Duration::from_secs(2)).await,
        Some("id name StubEngine".to_string())
    );
    assert_eq!(
        next_engine_line(&engine, Duration::from_secs(2)).await,
        Some("uciok".to_string())
    );

    engine.shutdown().await;
    server.await.expect("server assertions failed");
    assert!(reporter.messages().is_empty(), "{:?}", reporter.messages());
}
