// # Record Source Trait
//
// Defines the interface for listing DNS records from a provider API.
//
// ## Implementations
//
// - Cloudflare: `domains-provider-cloudflare` crate
// - Route53: `domains-provider-route53` crate
//
// ## Usage
//
// ```rust,ignore
// use domains_core::{RecordSource, RecordTypeFilter};
//
// let records = source
//     .fetch_records(&RecordTypeFilter::from_args(["A", "CNAME"]))
//     .await?;
//
// if source.is_registrar_for("example.com") {
//     println!("{} is the registrar", source.registrar_name());
// }
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::InventoryConfig;
use crate::record::{Record, RecordTypeFilter};

/// Trait for DNS provider record sources
///
/// A source lists every zone it hosts and every record in those zones. The
/// zone metadata it saw during [`fetch_records`](RecordSource::fetch_records)
/// backs the registrar hint returned by
/// [`is_registrar_for`](RecordSource::is_registrar_for).
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the aggregator moves each source
/// into its own task.
///
/// # Failure
///
/// A failed fetch is returned as `Err`. The aggregator turns it into a
/// warning and keeps the records of the other sources. Sources must not
/// retry internally and must not return partial results on error.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// List all records of all zones managed by this source
    ///
    /// # Parameters
    ///
    /// - `filter`: Record types to keep (empty = all)
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Record>)`: Unannotated records tagged with this source's name
    /// - `Err(Error)`: If any zone listing or record listing failed
    async fn fetch_records(&self, filter: &RecordTypeFilter)
    -> Result<Vec<Record>, crate::Error>;

    /// Whether this provider is the registrar of record for `domain`
    ///
    /// Only zones seen by a previous successful `fetch_records` call are
    /// considered; before that this returns `false`.
    fn is_registrar_for(&self, domain: &str) -> bool;

    /// Source name stamped on every record (e.g., "cloudflare", "route53")
    fn source_name(&self) -> &'static str;

    /// Registrar value used when [`is_registrar_for`](RecordSource::is_registrar_for) holds
    fn registrar_name(&self) -> &str {
        self.source_name()
    }
}

/// Helper trait for constructing record sources from configuration
pub trait SourceFactory: Send + Sync {
    /// Create a RecordSource from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Some(source))`: Credentials present, source ready
    /// - `Ok(None)`: Credentials absent; the source is skipped
    /// - `Err(Error)`: Credentials present but unusable
    fn create(
        &self,
        config: &InventoryConfig,
    ) -> Result<Option<Arc<dyn RecordSource>>, crate::Error>;
}
