// # TLS Certificate Prober
//
// Connects to `hostname:port`, completes a TLS handshake and summarizes
// the leaf certificate the server presents.
//
// ## Behavior
//
// - The chain is never validated: expired, self-signed and mismatched
//   certificates are still reported, since the point is inventory
// - DNS resolution and TCP connect share one deadline, the connect
//   timeout from the start of resolution; the handshake has its own
// - Failures are classified into [`ProbeError`] variants so each hostname
//   carries a readable reason
//
// ## Issuer
//
// The issuer's organization (O) is preferred; the common name (CN) is used
// when no organization is present, and "unknown" when neither is.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domains_core::config::CertificateConfig;
use domains_core::traits::CertificateProber;
use domains_core::{CertificateSummary, Error, ProbeError, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, ring};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_rustls::TlsConnector;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Issuer placeholder when the certificate names neither O nor CN
pub const UNKNOWN_ISSUER: &str = "unknown";

/// Install the process-wide rustls provider
///
/// Other TLS users in the process (the HTTP clients) may look it up; a
/// provider that is already installed is kept.
pub fn ensure_crypto_provider() {
    let _ = CryptoProvider::install_default(ring::default_provider());
}

/// Summarize a DER-encoded certificate
pub fn summarize_certificate(der: &[u8]) -> std::result::Result<CertificateSummary, ProbeError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let issuer = cert.issuer();
    let issuer = issuer
        .iter_organization()
        .chain(issuer.iter_common_name())
        .filter_map(|attr| attr.as_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_ISSUER)
        .to_string();

    let not_after = cert.validity().not_after.timestamp();
    let expires = chrono::DateTime::from_timestamp(not_after, 0)
        .ok_or_else(|| ProbeError::Parse(format!("expiry out of range: {not_after}")))?
        .date_naive();

    Ok(CertificateSummary { issuer, expires })
}

/// Accepts any server certificate while still checking handshake signatures
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
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
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
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

/// [`CertificateProber`] over tokio-rustls
pub struct TlsProber {
    connector: TlsConnector,
    port: u16,
    connect_timeout: Duration,
    handshake_timeout: Duration,
}

impl std::fmt::Debug for TlsProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsProber")
            .field("port", &self.port)
            .field("connect_timeout", &self.connect_timeout)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

impl TlsProber {
    /// Create a prober from configuration
    pub fn new(config: &CertificateConfig) -> Result<Self> {
        let provider = Arc::new(ring::default_provider());

        let tls = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::config(format!("TLS client setup failed: {e}")))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(tls)),
            port: config.port,
            connect_timeout: config.connect_timeout(),
            handshake_timeout: config.handshake_timeout(),
        })
    }

    /// Port probed on every hostname
    pub fn port(&self) -> u16 {
        self.port
    }

    async fn connect(&self, hostname: &str) -> std::result::Result<TcpStream, ProbeError> {
        let deadline = Instant::now() + self.connect_timeout;
        connect_by(
            deadline,
            tokio::net::lookup_host((hostname, self.port)),
            |addrs| async move { TcpStream::connect(&addrs[..]).await },
        )
        .await
    }
}

/// Resolve, then connect to the resolved addresses, all before `deadline`
async fn connect_by<S, A, L, C, F>(
    deadline: Instant,
    lookup: L,
    connect: C,
) -> std::result::Result<S, ProbeError>
where
    A: Iterator<Item = SocketAddr>,
    L: Future<Output = std::io::Result<A>>,
    C: FnOnce(Vec<SocketAddr>) -> F,
    F: Future<Output = std::io::Result<S>>,
{
    let addrs: Vec<_> = match timeout_at(deadline, lookup).await {
        Ok(Ok(addrs)) => addrs.collect(),
        Ok(Err(e)) => return Err(ProbeError::DnsLookup(e.to_string())),
        Err(_) => return Err(ProbeError::Timeout),
    };

    if addrs.is_empty() {
        return Err(ProbeError::DnsLookup("no addresses".to_string()));
    }

    match timeout_at(deadline, connect(addrs)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(match e.kind() {
            std::io::ErrorKind::ConnectionRefused => ProbeError::ConnectionRefused,
            std::io::ErrorKind::TimedOut => ProbeError::Timeout,
            _ => ProbeError::Other(format!("connect failed: {e}")),
        }),
        Err(_) => Err(ProbeError::Timeout),
    }
}

#[async_trait]
impl CertificateProber for TlsProber {
    async fn probe(&self, hostname: &str) -> std::result::Result<CertificateSummary, ProbeError> {
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|e| ProbeError::InvalidHostname(format!("{hostname}: {e}")))?;

        tracing::debug!("Probing {}:{}", hostname, self.port);
        let stream = self.connect(hostname).await?;

        let tls = match timeout(
            self.handshake_timeout,
            self.connector.connect(server_name, stream),
        )
        .await
        {
            Ok(Ok(tls)) => tls,
            Ok(Err(e)) => return Err(ProbeError::Handshake(e.to_string())),
            Err(_) => return Err(ProbeError::Timeout),
        };

        let (_, session) = tls.get_ref();
        let leaf = session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or(ProbeError::NoCertificate)?;

        let summary = summarize_certificate(leaf.as_ref())?;
        tracing::debug!(
            "{} presented a certificate from {} expiring {}",
            hostname,
            summary.issuer,
            summary.expires
        );
        Ok(summary)
    }
}
