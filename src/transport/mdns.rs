// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    net::IpAddr,
    time::{Duration, Instant},
};

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tracing::debug;

use crate::error::EngineError;

/// DNS-SD service type advertised by network UCI servers.
pub const SERVICE_TYPE: &str = "_uci._tcp.local.";

/// Resolves the address and port of the service instance with the given
/// name, browsing the local link for at most `limit`.
pub async fn resolve(
    instance: &str,
    limit: Duration,
) -> Result<(IpAddr, u16), EngineError> {
    let instance = instance.to_string();
    tokio::task::spawn_blocking(move || resolve_blocking(&instance, limit))
        .await
        .map_err(|e| EngineError::Config(format!("mdns resolver task failed: {e}")))?
}

fn resolve_blocking(
    instance: &str,
    limit: Duration,
) -> Result<(IpAddr, u16), EngineError> {
    let daemon = ServiceDaemon::new()
        .map_err(|e| EngineError::Config(format!("mdns daemon unavailable: {e}")))?;
    let receiver = daemon
        .browse(SERVICE_TYPE)
        .map_err(|e| EngineError::Config(format!("mdns browse failed: {e}")))?;

    let deadline = Instant::now() + limit;
    let result = loop {
        let now = Instant::now();
        if now >= deadline {
            break Err(EngineError::timeout(format!("mdns service {instance:?}"), &[]));
        }
        match receiver.recv_timeout(deadline - now) {
            Ok(ServiceEvent::ServiceResolved(info)) => {
                let found = instance_name(info.get_fullname());
                debug!("mdns resolved {found:?} at port {}", info.get_port());
                if found == instance
                    && let Some(addr) = info.get_addresses().iter().next()
                {
                    break Ok((*addr, info.get_port()));
                }
            },
            Ok(_) => {},
            Err(_) => {
                break Err(EngineError::timeout(
                    format!("mdns service {instance:?}"),
                    &[],
                ));
            },
        }
    };

    let _ = daemon.stop_browse(SERVICE_TYPE);
    let _ = daemon.shutdown();
    result
}

/// Extracts the instance label from a DNS-SD full name such as
/// `MyEngine._uci._tcp.local.`.
pub(crate) fn instance_name(fullname: &str) -> &str {
    fullname
        .strip_suffix(SERVICE_TYPE)
        .map(|s| s.strip_suffix('.').unwrap_or(s))
        .unwrap_or(fullname)
}
