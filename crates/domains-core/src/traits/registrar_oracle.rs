//! Registrar oracle trait

use async_trait::async_trait;

/// Best-effort registrar lookup (WHOIS or similar)
///
/// Lookups are slow and rate-sensitive. The registrar resolver calls the
/// oracle at most once per distinct domain in a run.
#[async_trait]
pub trait RegistrarOracle: Send + Sync {
    /// Look up the registrar of `domain`
    ///
    /// Never fails outward: any network or parse failure yields
    /// [`UNKNOWN_REGISTRAR`](crate::record::UNKNOWN_REGISTRAR).
    async fn lookup_registrar(&self, domain: &str) -> String;
}
