// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::{TcpStream, lookup_host},
    time::timeout,
};
use tracing::{debug, warn};

use crate::{
    cfg::endpoint::Endpoint,
    error::{EngineError, StrategyFailure},
};

pub mod backoff;
pub mod mdns;
pub mod relay;
pub mod tls;

/// Direct LAN connect deadline.
pub const LAN_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);
/// UPnP-exposed external address connect deadline.
pub const EXTERNAL_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);
/// Relay rendezvous connect deadline (the handshake has its own I/O cap).
pub const RELAY_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Per-attempt deadline inside the backoff retry strategy.
pub const RETRY_CONNECT_TIMEOUT: Duration = Duration::from_millis(15_000);
/// Cap on local-link service discovery.
pub const MDNS_RESOLVE_TIMEOUT: Duration = Duration::from_millis(1500);
/// Connect deadline for an mDNS-resolved address.
pub const MDNS_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);

/// A connected byte stream to the engine server, optionally TLS-wrapped.
/// The reader and writer tasks each take one half after splitting.
#[derive(Debug)]
pub enum NetStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for NetStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            NetStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            NetStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_flush(cx),
            NetStream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            NetStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Produces a ready-to-use stream for the endpoint by walking the strategy
/// cascade: mDNS resolve, direct LAN, UPnP external address, relay
/// rendezvous, and finally (only when no relay is configured) a capped
/// exponential-backoff retry against the primary address.
///
/// Failures of individual strategies aggregate into
/// [`EngineError::ConnectFailed`]; a strategy whose target address was
/// already tried is skipped.
pub async fn connect(ep: &Endpoint) -> Result<NetStream, EngineError> {
    ep.validate()
        .map_err(|e| EngineError::Config(e.to_string()))?;

    let alternates = alternate_labels(ep);

    // With nothing but the primary address configured, retry is the whole
    // plan.
    if !ep.has_alternate_endpoint() {
        let stream = backoff::connect_with_retry(&ep.host, ep.port).await?;
        return finish(stream, ep).await;
    }

    let mut attempts: Vec<StrategyFailure> = Vec::new();
    let mut tried: Vec<String> = Vec::new();

    if let Some(name) = ep.mdns_service_name() {
        match mdns::resolve(name, MDNS_RESOLVE_TIMEOUT).await {
            Ok((addr, port)) => {
                let target = format!("{addr}:{port}");
                if !tried.contains(&target) {
                    tried.push(target.clone());
                    match timed_connect(&target, MDNS_CONNECT_TIMEOUT).await {
                        Ok(s) => return finish(s, ep).await,
                        Err(e) => push_attempt(&mut attempts, "mdns", target, e),
                    }
                }
            },
            Err(e) => push_attempt(&mut attempts, "mdns", name.to_string(), e),
        }
    }

    let lan_target = ep.address();
    if !tried.contains(&lan_target) {
        tried.push(lan_target.clone());
        match timed_connect(&lan_target, LAN_CONNECT_TIMEOUT).await {
            Ok(s) => return finish(s, ep).await,
            Err(e) => push_attempt(
                &mut attempts,
                "direct",
                lan_target.clone(),
                with_alternates(e, &alternates),
            ),
        }
    }

    if let Some(ext) = ep.external_host()
        && ext != ep.host
    {
        let target = format!("{ext}:{}", ep.port);
        if !tried.contains(&target) {
            tried.push(target.clone());
            match timed_connect(&target, EXTERNAL_CONNECT_TIMEOUT).await {
                Ok(s) => return finish(s, ep).await,
                Err(e) => push_attempt(&mut attempts, "external", target, e),
            }
        }
    }

    let relay_configured = ep.relay().is_some();
    if let Some(relay_cfg) = ep.relay() {
        let target = format!("{}:{}", relay_cfg.host, relay_cfg.port);
        match relay::connect(relay_cfg).await {
            Ok(s) => return finish(s, ep).await,
            Err(e) => push_attempt(&mut attempts, "relay", target, e),
        }
    }

    // A configured relay that failed ends the cascade; the direct host is
    // not retried after it.
    if !relay_configured {
        match backoff::connect_with_retry(&ep.host, ep.port).await {
            Ok(s) => return finish(s, ep).await,
            Err(e) => push_attempt(
                &mut attempts,
                "retry",
                lan_target,
                with_alternates(e, &alternates),
            ),
        }
    }

    Err(EngineError::ConnectFailed { attempts })
}

/// TCP connect with an explicit resolve step so DNS failures classify as
/// [`EngineError::UnknownHost`].
pub(crate) async fn timed_connect(
    target: &str,
    limit: Duration,
) -> Result<TcpStream, EngineError> {
    let resolved = match timeout(limit, lookup_host(target)).await {
        Ok(Ok(mut addrs)) => addrs.next(),
        Ok(Err(_)) | Err(_) => None,
    };
    let Some(addr) = resolved else {
        return Err(EngineError::UnknownHost(target.to_string()));
    };

    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            debug!("connected to {target} ({addr})");
            Ok(stream)
        },
        Ok(Err(e)) => Err(EngineError::classify_io(e, target)),
        Err(_) => Err(EngineError::timeout(target, &[])),
    }
}

async fn finish(stream: TcpStream, ep: &Endpoint) -> Result<NetStream, EngineError> {
    stream.set_nodelay(true)?;
    if ep.use_tls {
        tls::wrap(stream, &ep.host, &ep.cert_fingerprint).await
    } else {
        Ok(NetStream::Plain(stream))
    }
}

fn alternate_labels(ep: &Endpoint) -> Vec<&'static str> {
    let mut labels = Vec::new();
    if ep.mdns_service_name().is_some() {
        labels.push("mdns");
    }
    if ep.external_host().is_some() {
        labels.push("external");
    }
    if ep.relay().is_some() {
        labels.push("relay");
    }
    labels
}

fn with_alternates(err: EngineError, alternates: &[&str]) -> EngineError {
    match err {
        EngineError::Timeout { target, .. } => EngineError::timeout(target, alternates),
        other => other,
    }
}

fn push_attempt(
    attempts: &mut Vec<StrategyFailure>,
    strategy: &'static str,
    target: String,
    error: EngineError,
) {
    warn!("{strategy} connect to {target} failed: {error}");
    attempts.push(StrategyFailure {
        strategy,
        target,
        error,
    });
}
