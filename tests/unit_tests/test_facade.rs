// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, Mutex};

use uci_client_rs::{
    cfg::endpoint::Endpoint,
    engine::{HostOptions, Reporter, network::NetworkEngine},
};

#[derive(Default)]
struct NullReporter(Mutex<Vec<String>>);

impl Reporter for NullReporter {
    fn report_error(&self, message: &str) {
        self.0
            .lock()
            .expect("reporter mutex")
            .push(message.to_string());
    }
}

fn engine() -> NetworkEngine {
    let endpoint = Endpoint {
        host: "127.0.0.1".to_string(),
        port: 9670,
        ..Endpoint::default()
    };
    NetworkEngine::new(endpoint, Arc::new(NullReporter::default()))
}

fn host_options() -> HostOptions {
    HostOptions {
        hash_mb: 128,
        syzygy_path: "/data/syzygy".to_string(),
        gaviota_path: String::new(),
    }
}

#[test]
fn test_options_ok_tracks_host_agreement() {
    let engine = engine();
    assert!(engine.register_option("option name Hash type spin default 16 min 1 max 4096"));
    assert!(engine.register_option("option name SyzygyPath type string default <empty>"));

    // Pre-init values disagree with the host: a restart would be needed.
    assert!(!engine.options_ok(&host_options()));

    engine.init_options(&host_options());
    assert!(engine.options_ok(&host_options()));
}

#[test]
fn test_options_ok_ignores_undeclared_options() {
    let engine = engine();
    // The engine declared nothing host-managed; nothing can disagree.
    assert!(engine.register_option("option name Skill Level type spin default 20 min 0 max 20"));
    assert!(engine.options_ok(&host_options()));
}

#[test]
fn test_registered_host_managed_options_are_hidden() {
    let engine = engine();
    assert!(engine.register_option("option name Hash type spin default 16 min 1 max 4096"));
    assert!(engine.register_option("option name Skill Level type spin default 20 min 0 max 20"));
    assert!(engine.register_option("option name UCI_Elo type spin default 1500 min 800 max 2800"));

    let options = engine.all_options();
    assert!(!options.get("hash").expect("hash missing").visible());
    assert!(!options.get("uci_elo").expect("elo missing").visible());
    assert!(options.get("skill level").expect("skill missing").visible());
}

#[test]
fn test_register_option_rejects_garbage() {
    let engine = engine();
    assert!(!engine.register_option("info string not an option"));
    assert!(!engine.register_option("option name Broken type spin default banana"));
    assert!(engine.all_options().is_empty());

    engine.register_option("option name Hash type spin default 16 min 1 max 4096");
    engine.clear_options();
    assert!(engine.all_options().is_empty());
}

#[test]
fn test_option_value_lookup() {
    let engine = engine();
    assert!(engine.register_option(
        "option name Play Style type combo default Normal var Solid var Normal var Risky"
    ));
    assert_eq!(engine.option_value("play style").as_deref(), Some("Normal"));
    assert_eq!(engine.option_value("Threads"), None);
}
