//! Certificate prober trait

use async_trait::async_trait;

use crate::record::{CertificateSummary, ProbeError};

/// TLS certificate probe against a hostname
///
/// Implementations bound every network step with their own timeout and
/// report failures as a classified [`ProbeError`]; they must not panic on
/// unreachable hosts or untrusted certificates.
#[async_trait]
pub trait CertificateProber: Send + Sync {
    /// Handshake with `hostname` and describe its leaf certificate
    async fn probe(&self, hostname: &str) -> Result<CertificateSummary, ProbeError>;
}
