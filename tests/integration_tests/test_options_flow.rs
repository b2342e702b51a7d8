// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use crate::integration_tests::common::{
    RecordingReporter, drain_until_close, endpoint_to, engine_for, expect_line,
    next_engine_line, send_raw, spawn_server, split_lines,
};

#[tokio::test]
async fn test_init_options_programs_the_engine() {
    let (port, server) = spawn_server(|stream| async move {
        let (mut lines, mut writer) = split_lines(stream);
        send_raw(
            &mut writer,
            "option name Hash type spin default 16 min 1 max 4096\n\
             option name SyzygyPath type string default <empty>\n\
             uciok\n",
        )
        .await;
        expect_line(&mut lines, "setoption name Hash value 128").await;
        expect_line(&mut lines, "setoption name SyzygyPath value /data/syzygy").await;
        expect_line(&mut lines, "isready").await;
        send_raw(&mut writer, "readyok\n").await;
        drain_until_close(&mut lines).await;
    })
    .await;

    let reporter = RecordingReporter::new();
    let engine = engine_for(endpoint_to(port), &reporter);
    engine.start();

    // Register declarations as they stream in, the way a GUI does.
    loop {
        let line = next_engine_line(&engine, Duration::from_secs(2))
            .await
            .expect("engine closed during startup");
        if line == "uciok" {
            break;
        }
        if line.starts_with("option ") {
            assert!(engine.register_option(&line), "unparsed: {line}");
        }
    }

    engine.init_options(&uci_client_rs::engine::HostOptions {
        hash_mb: 128,
        syzygy_path: "/data/syzygy".to_string(),
        gaviota_path: String::new(),
    });
    engine.write_line("isready");

    assert_eq!(
        next_engine_line(&engine, Duration::from_secs(2)).await,
        Some("readyok".to_string())
    );

    engine.shutdown().await;
    server.await.expect("server assertions failed");
    assert!(reporter.messages().is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_rejected_set_option_emits_nothing() {
    let (port, server) = spawn_server(|stream| async move {
        let (mut lines, mut writer) = split_lines(stream);
        send_raw(
            &mut writer,
            "option name Hash type spin default 16 min 1 max 64\nuciok\n",
        )
        .await;
        // The rejected assignment must leave no trace on the wire: the
        // marker has to be the very next line.
        expect_line(&mut lines, "isready").await;
        drain_until_close(&mut lines).await;
    })
    .await;

    let reporter = RecordingReporter::new();
    let engine = engine_for(endpoint_to(port), &reporter);
    engine.start();

    loop {
        let line = next_engine_line(&engine, Duration::from_secs(2))
            .await
            .expect("engine closed during startup");
        if line == "uciok" {
            break;
        }
        if line.starts_with("option ") {
            assert!(engine.register_option(&line), "unparsed: {line}");
        }
    }

    assert!(!engine.set_option("Hash", "1024"));
    assert!(!engine.set_option("Threads", "4"));
    engine.write_line("isready");

    engine.shutdown().await;
    server.await.expect("server assertions failed");
    assert!(reporter.messages().is_empty(), "{:?}", reporter.messages());
}
