//! Certificate enrichment
//!
//! Probes each distinct cert-eligible hostname once, concurrently, and copies
//! the result to every record carrying that hostname.

use crate::record::{CertStatus, Record};
use crate::traits::CertificateProber;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Hostname → certificate status map for one pipeline run
#[derive(Debug, Default)]
pub struct CertificateCache {
    entries: Mutex<HashMap<String, CertStatus>>,
}

impl CertificateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached status of `hostname`
    pub fn get(&self, hostname: &str) -> Option<CertStatus> {
        self.lock().get(hostname).cloned()
    }

    /// Store the status of `hostname`
    pub fn insert(&self, hostname: impl Into<String>, status: CertStatus) {
        self.lock().insert(hostname.into(), status);
    }

    /// Number of probed hostnames
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been probed yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CertStatus>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Annotates records with TLS certificate metadata
pub struct CertificateEnricher {
    prober: Arc<dyn CertificateProber>,
    cache: Arc<CertificateCache>,
}

impl CertificateEnricher {
    /// Create an enricher writing into `cache`
    pub fn new(prober: Arc<dyn CertificateProber>, cache: Arc<CertificateCache>) -> Self {
        Self { prober, cache }
    }

    /// Set the certificate status of every record
    ///
    /// When `enabled` is false every record gets [`CertStatus::NotApplicable`]
    /// and nothing is probed.
    pub async fn enrich(&self, records: &mut [Record], enabled: bool) {
        if !enabled {
            for record in records.iter_mut() {
                record.cert = CertStatus::NotApplicable;
            }
            return;
        }

        // Enumerate keys before fan-out: one probe per distinct hostname
        let hostnames: BTreeSet<String> = records
            .iter()
            .filter(|r| r.record_type.is_cert_eligible())
            .filter(|r| self.cache.get(&r.name).is_none())
            .map(|r| r.name.clone())
            .collect();

        debug!("Probing {} distinct hostname(s)", hostnames.len());

        let handles: Vec<_> = hostnames
            .into_iter()
            .map(|hostname| {
                let prober = Arc::clone(&self.prober);
                let cache = Arc::clone(&self.cache);
                let task_hostname = hostname.clone();
                let handle = tokio::spawn(async move {
                    let status = CertStatus::from(prober.probe(&task_hostname).await);
                    cache.insert(task_hostname, status);
                });
                (hostname, handle)
            })
            .collect();

        // Join barrier
        for (hostname, handle) in handles {
            if let Err(e) = handle.await {
                warn!("Certificate probe for {} aborted: {}", hostname, e);
                self.cache
                    .insert(hostname, CertStatus::Failed(format!("probe aborted: {e}")));
            }
        }

        for record in records.iter_mut() {
            record.cert = if record.record_type.is_cert_eligible() {
                self.cache
                    .get(&record.name)
                    .unwrap_or_else(|| CertStatus::Failed("no probe result".to_string()))
            } else {
                CertStatus::NotApplicable
            };
        }
    }
}
