//! Inventory pipeline
//!
//! The Pipeline is responsible for:
//! - Fetching records from every configured source concurrently
//! - Resolving one registrar per domain
//! - Probing one certificate per hostname (optional)
//! - Ordering the final record set
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐
//! │ Cloudflare   │  │   Route53    │   (one task each)
//! └──────┬───────┘  └──────┬───────┘
//!        └────────┬────────┘
//!                 ▼
//!         ┌──────────────┐
//!         │  Aggregator  │
//!         └──────┬───────┘
//!                ▼
//!      ┌───────────────────┐     ┌──────────────────┐
//!      │ RegistrarResolver │ ──▶ │ RegistrarOracle  │ (≤ 1 call per domain)
//!      └─────────┬─────────┘     └──────────────────┘
//!                ▼
//!     ┌─────────────────────┐    ┌──────────────────┐
//!     │ CertificateEnricher │ ─▶ │ CertificateProber│ (one task per hostname)
//!     └─────────┬───────────┘    └──────────────────┘
//!               ▼
//!      sort by (domain, name)
//! ```

pub mod aggregator;
pub mod certificates;
pub mod registrar;

pub use aggregator::{Aggregation, SourceOutcome, SourceStatus, aggregate};
pub use certificates::{CertificateCache, CertificateEnricher};
pub use registrar::{RegistrarCache, RegistrarResolver};

use crate::error::Result;
use crate::record::{Record, RecordTypeFilter, sort_records};
use crate::registry::SourceSlot;
use crate::traits::{CertificateProber, RegistrarOracle};
use std::sync::Arc;
use tracing::info;

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Record types to keep (empty = all)
    pub filter: RecordTypeFilter,
    /// Whether to probe TLS certificates
    pub fetch_certificates: bool,
}

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct Report {
    /// Enriched records sorted by `(domain, name)`
    pub records: Vec<Record>,
    /// One outcome per source slot
    pub outcomes: Vec<SourceOutcome>,
}

impl Report {
    /// Warnings for skipped and failed sources
    pub fn warnings(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(SourceOutcome::warning)
            .collect()
    }
}

/// Inventory pipeline
///
/// ## Lifecycle
///
/// 1. Build slots with [`SourceRegistry::build_sources`](crate::SourceRegistry::build_sources)
/// 2. Create with [`Pipeline::new()`]
/// 3. Call [`Pipeline::run()`] once
///
/// Caches live for exactly one run and are created inside `run`.
pub struct Pipeline {
    slots: Vec<SourceSlot>,
    oracle: Arc<dyn RegistrarOracle>,
    prober: Arc<dyn CertificateProber>,
}

impl Pipeline {
    /// Create a new pipeline
    ///
    /// # Parameters
    ///
    /// - `slots`: Source slots in registrar-hint precedence order
    /// - `oracle`: Registrar fallback
    /// - `prober`: Certificate prober, only used when certificates are requested
    pub fn new(
        slots: Vec<SourceSlot>,
        oracle: Arc<dyn RegistrarOracle>,
        prober: Arc<dyn CertificateProber>,
    ) -> Self {
        Self {
            slots,
            oracle,
            prober,
        }
    }

    /// Run aggregation, registrar resolution, certificate enrichment and sort
    ///
    /// # Returns
    ///
    /// - `Ok(Report)`: Including partial results when some sources failed
    /// - `Err(Error::NoSourcesConfigured)`: No source had credentials
    pub async fn run(self, options: &PipelineOptions) -> Result<Report> {
        let Aggregation {
            mut records,
            outcomes,
            sources,
        } = aggregate(self.slots, &options.filter).await?;

        info!("Aggregated {} record(s)", records.len());

        let registrars = RegistrarCache::new();
        RegistrarResolver::new(&sources, self.oracle.as_ref(), &registrars)
            .resolve(&mut records)
            .await;
        info!("Resolved registrars for {} domain(s)", registrars.len());

        let certificates = Arc::new(CertificateCache::new());
        CertificateEnricher::new(self.prober, Arc::clone(&certificates))
            .enrich(&mut records, options.fetch_certificates)
            .await;
        if options.fetch_certificates {
            info!("Probed {} hostname(s)", certificates.len());
        }

        sort_records(&mut records);

        Ok(Report { records, outcomes })
    }
}
