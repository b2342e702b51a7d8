// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, Mutex};

use rustls::{
    DigitallySignedStruct, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::CryptoProvider,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::{
    error::EngineError,
    transport::NetStream,
    utils::{cert_fingerprint, normalize_fingerprint},
};

/// Certificate policy for LAN engine servers: with a pinned fingerprint the
/// leaf must hash to it; without one any certificate is accepted
/// (trust-on-first-use). Chain building and hostname checks are
/// intentionally not performed.
#[derive(Debug)]
struct PinnedServerVerifier {
    /// Normalized (bare lowercase hex) pinned fingerprint, if any.
    pinned: Option<String>,
    /// Set to the presented fingerprint when pinning fails, so the connect
    /// path can raise the dedicated mismatch diagnostic.
    mismatch: Arc<Mutex<Option<String>>>,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for PinnedServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if let Some(pinned) = &self.pinned {
            let presented = cert_fingerprint(end_entity.as_ref());
            if normalize_fingerprint(&presented) != *pinned {
                *self
                    .mismatch
                    .lock()
                    .expect("verifier mutex poisoned") = Some(presented);
                return Err(rustls::Error::InvalidCertificate(
                    rustls::CertificateError::ApplicationVerificationFailure,
                ));
            }
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Negotiates TLS (1.2 or 1.3) over an established connection, applying the
/// pinning policy above.
pub async fn wrap(
    stream: TcpStream,
    host: &str,
    pinned_fingerprint: &str,
) -> Result<NetStream, EngineError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mismatch = Arc::new(Mutex::new(None));
    let verifier = Arc::new(PinnedServerVerifier {
        pinned: (!pinned_fingerprint.is_empty())
            .then(|| normalize_fingerprint(pinned_fingerprint)),
        mismatch: Arc::clone(&mismatch),
        provider: Arc::clone(&provider),
    });

    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| EngineError::TlsHandshake {
            target: host.to_string(),
            reason: e.to_string(),
        })?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| EngineError::Config(format!("bad TLS server name {host:?}")))?;

    let connector = TlsConnector::from(Arc::new(config));
    match connector.connect(server_name, stream).await {
        Ok(tls) => {
            debug!("TLS session established with {host}");
            Ok(NetStream::Tls(Box::new(tls)))
        },
        Err(err) => {
            let presented = mismatch
                .lock()
                .expect("verifier mutex poisoned")
                .take();
            if let Some(presented) = presented {
                Err(EngineError::TlsPinning {
                    pinned: pinned_fingerprint.to_string(),
                    presented,
                })
            } else {
                Err(EngineError::TlsHandshake {
                    target: host.to_string(),
                    reason: err.to_string(),
                })
            }
        },
    }
}
