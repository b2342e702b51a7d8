// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use uci_client_rs::cfg::{
    cli::resolve_config_path,
    config::Config,
    endpoint::{Endpoint, RelayConfig},
    enums::AuthMethod,
};

fn full_endpoint() -> Endpoint {
    Endpoint {
        host: "chessbox.local".to_string(),
        port: 9670,
        use_tls: true,
        auth_method: AuthMethod::Token,
        token: "secret-token".to_string(),
        psk_key: String::new(),
        cert_fingerprint: "ab:cd:ef".to_string(),
        relay: RelayConfig {
            host: "relay.example.org".to_string(),
            port: 7000,
            session_id: "sess-42".to_string(),
        },
        external_host: "203.0.113.7".to_string(),
        mdns_service_name: "Shelf Machine".to_string(),
        selected_engine: "Dragon".to_string(),
    }
}

#[test]
fn test_nete_round_trip() -> Result<()> {
    let ep = full_endpoint();
    let text = ep.to_nete();
    assert_eq!(text.lines().count(), 14);
    assert!(text.starts_with("NETE\n"));

    let parsed = Endpoint::from_nete(&text)?;
    assert_eq!(parsed, ep);
    Ok(())
}

#[test]
fn test_nete_tolerates_short_descriptor() -> Result<()> {
    // A legacy four-line descriptor: magic, host, port, TLS flag.
    let parsed = Endpoint::from_nete("NETE\n10.0.0.2\n9670\nnotls\n")?;
    assert_eq!(parsed.host, "10.0.0.2");
    assert_eq!(parsed.port, 9670);
    assert!(!parsed.use_tls);
    // Missing method line means token auth.
    assert_eq!(parsed.auth_method, AuthMethod::Token);
    assert!(parsed.token.is_empty());
    assert!(parsed.relay().is_none());
    assert!(parsed.external_host().is_none());
    assert!(parsed.mdns_service_name().is_none());
    assert!(parsed.selected_engine.is_empty());
    Ok(())
}

#[test]
fn test_nete_trims_trailing_whitespace() -> Result<()> {
    let parsed =
        Endpoint::from_nete("NETE\nhost.lan  \n9670\t\ntls\ntok \n\nnone\n")?;
    assert_eq!(parsed.host, "host.lan");
    assert!(parsed.use_tls);
    assert_eq!(parsed.token, "tok");
    assert_eq!(parsed.auth_method, AuthMethod::None);
    Ok(())
}

#[test]
fn test_nete_rejects_garbage() {
    assert!(Endpoint::from_nete("").is_err());
    assert!(Endpoint::from_nete("NOPE\nhost\n1\n").is_err());
    assert!(Endpoint::from_nete("NETE\nhost\nnot-a-port\n").is_err());
    assert!(Endpoint::from_nete("NETE\nhost\n0\n").is_err());
    assert!(Endpoint::from_nete("NETE\n\n9670\n").is_err());
    assert!(Endpoint::from_nete("NETE\nhost\n9670\nmaybe\n").is_err());
}

#[test]
fn test_relay_requires_all_three_fields() {
    let mut ep = full_endpoint();
    assert!(ep.relay().is_some());

    ep.relay.session_id.clear();
    assert!(ep.relay().is_none());

    ep.relay.session_id = "sess".to_string();
    ep.relay.port = 0;
    assert!(ep.relay().is_none());
}

#[test]
fn test_auth_secret_follows_method() {
    let mut ep = full_endpoint();
    assert_eq!(ep.auth_secret(), "secret-token");

    ep.auth_method = AuthMethod::Psk;
    ep.psk_key = "shared-key".to_string();
    assert_eq!(ep.auth_secret(), "shared-key");

    ep.auth_method = AuthMethod::None;
    assert_eq!(ep.auth_secret(), "");
}

#[test]
fn test_alternate_endpoint_detection() {
    let mut ep = full_endpoint();
    assert!(ep.has_alternate_endpoint());

    ep.relay = RelayConfig::default();
    ep.external_host.clear();
    ep.mdns_service_name.clear();
    assert!(!ep.has_alternate_endpoint());
}

#[test]
fn test_yaml_config_loads() -> Result<()> {
    let cfg = resolve_config_path("tests/config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;
    assert_eq!(cfg.engine.host, "127.0.0.1");
    assert_eq!(cfg.engine.port, 9670);
    assert_eq!(cfg.engine.auth_method, AuthMethod::None);
    assert_eq!(cfg.runtime.startup_timeout.as_secs(), 10);
    Ok(())
}
