// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt::Write;

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::AuthMethod;

/// Magic line opening the text serialization of an endpoint.
pub const NETE_MAGIC: &str = "NETE";

/// Rendezvous relay coordinates. The relay is only considered configured
/// when all three fields are populated.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayConfig {
    #[serde(default, rename = "Host")]
    pub host: String,
    #[serde(default, rename = "Port")]
    pub port: u16,
    #[serde(default, rename = "SessionId")]
    pub session_id: String,
}

impl RelayConfig {
    pub fn is_present(&self) -> bool {
        !self.host.is_empty() && self.port != 0 && !self.session_id.is_empty()
    }
}

/// Everything needed to reach and authenticate against one remote engine
/// server. Optional string fields use the empty string for "absent".
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    #[serde(rename = "Host")]
    /// Primary host name or address (mandatory).
    pub host: String,
    #[serde(rename = "Port")]
    /// Primary TCP port (mandatory, 1..=65535).
    pub port: u16,
    #[serde(default, rename = "UseTls")]
    /// Whether the byte stream is wrapped in TLS after connecting.
    pub use_tls: bool,
    #[serde(default, rename = "AuthMethod")]
    /// Authentication sub-protocol to use during the handshake.
    pub auth_method: AuthMethod,
    #[serde(default, rename = "Token")]
    /// Bearer token sent via `AUTH` when the method is `token`.
    pub token: String,
    #[serde(default, rename = "PskKey")]
    /// Pre-shared key sent via `PSK_AUTH` when the method is `psk`.
    pub psk_key: String,
    #[serde(default, rename = "CertFingerprint")]
    /// Pinned SHA-256 of the server leaf certificate (colon-hex); empty
    /// accepts any certificate.
    pub cert_fingerprint: String,
    #[serde(default, rename = "Relay")]
    /// Rendezvous relay coordinates.
    pub relay: RelayConfig,
    #[serde(default, rename = "ExternalHost")]
    /// UPnP-exposed external address, tried when it differs from `host`.
    pub external_host: String,
    #[serde(default, rename = "MdnsServiceName")]
    /// mDNS service instance name to resolve on the local link.
    pub mdns_service_name: String,
    #[serde(default, rename = "SelectedEngine")]
    /// Engine name on a multiplexed server; empty selects the default.
    pub selected_engine: String,
}

impl Endpoint {
    /// The relay tuple, when fully populated.
    pub fn relay(&self) -> Option<&RelayConfig> {
        self.relay.is_present().then_some(&self.relay)
    }

    pub fn external_host(&self) -> Option<&str> {
        (!self.external_host.is_empty()).then_some(self.external_host.as_str())
    }

    pub fn mdns_service_name(&self) -> Option<&str> {
        (!self.mdns_service_name.is_empty()).then_some(self.mdns_service_name.as_str())
    }

    /// The secret matching the configured method.
    pub fn auth_secret(&self) -> &str {
        match self.auth_method {
            AuthMethod::None => "",
            AuthMethod::Token => &self.token,
            AuthMethod::Psk => &self.psk_key,
        }
    }

    /// True when any strategy beyond the direct LAN connect is configured.
    pub fn has_alternate_endpoint(&self) -> bool {
        self.mdns_service_name().is_some()
            || self.external_host().is_some()
            || self.relay().is_some()
    }

    /// Checks the invariants the transport layer relies on.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.host.is_empty(), "engine host must not be empty");
        ensure!(self.port != 0, "engine port must be in 1..=65535");
        Ok(())
    }

    /// Parses the 14-line text serialization. Trailing lines may be absent;
    /// every field is trimmed of trailing whitespace.
    pub fn from_nete(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim_end);
        let magic = lines.next().unwrap_or_default();
        ensure!(magic == NETE_MAGIC, "bad endpoint magic {magic:?}");

        let mut next = || lines.next().unwrap_or_default().to_string();

        let host = next();
        let port_field = next();
        let tls_field = next();
        let token = next();
        let cert_fingerprint = next();
        let method_field = next();
        let psk_key = next();
        let relay_host = next();
        let relay_port_field = next();
        let relay_session = next();
        let external_host = next();
        let mdns_service_name = next();
        let selected_engine = next();

        ensure!(!host.is_empty(), "endpoint host line is empty");
        let port: u16 = port_field
            .parse()
            .with_context(|| format!("bad endpoint port {port_field:?}"))?;
        ensure!(port != 0, "endpoint port 0 is not addressable");

        let use_tls = match tls_field.as_str() {
            "tls" => true,
            "" | "notls" => false,
            other => bail!("bad TLS flag {other:?}"),
        };
        let auth_method = AuthMethod::parse_field(&method_field)
            .with_context(|| format!("bad auth method {method_field:?}"))?;
        let relay_port: u16 = if relay_port_field.is_empty() {
            0
        } else {
            relay_port_field
                .parse()
                .with_context(|| format!("bad relay port {relay_port_field:?}"))?
        };

        let ep = Self {
            host,
            port,
            use_tls,
            auth_method,
            token,
            psk_key,
            cert_fingerprint,
            relay: RelayConfig {
                host: relay_host,
                port: relay_port,
                session_id: relay_session,
            },
            external_host,
            mdns_service_name,
            selected_engine,
        };
        ep.validate()?;
        Ok(ep)
    }

    /// Renders the 14-line text serialization, always fully populated.
    pub fn to_nete(&self) -> String {
        let mut out = String::with_capacity(128);
        let mut line = |s: &str| {
            out.push_str(s);
            out.push('\n');
        };
        line(NETE_MAGIC);
        line(&self.host);
        line(&self.port.to_string());
        line(if self.use_tls { "tls" } else { "notls" });
        line(&self.token);
        line(&self.cert_fingerprint);
        line(&self.auth_method.to_string());
        line(&self.psk_key);
        line(&self.relay.host);
        line(&self.relay.port.to_string());
        line(&self.relay.session_id);
        line(&self.external_host);
        line(&self.mdns_service_name);
        line(&self.selected_engine);
        out
    }

    /// `host:port` for log lines and error messages.
    pub fn address(&self) -> String {
        let mut s = String::with_capacity(self.host.len() + 6);
        write!(&mut s, "{}:{}", self.host, self.port)
            .expect("Writing to String cannot fail");
        s
    }
}
