// # domains-core
//
// Core library for the concurrent DNS inventory pipeline.
//
// ## Architecture Overview
//
// - **RecordSource**: Trait for listing records and zones from a DNS provider
// - **RegistrarOracle**: Trait for best-effort registrar lookup (WHOIS)
// - **CertificateProber**: Trait for TLS certificate probing
// - **SourceRegistry**: Plugin-based registry of record source factories
// - **Pipeline**: Aggregation → registrar resolution → certificate enrichment → sort
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Coordination lives here, wire clients live in their own crates
// 2. **Partial Failure**: One failing provider, domain or host never blocks the report
// 3. **Lookup Once**: At most one WHOIS lookup per domain and one probe per hostname
// 4. **Deterministic Output**: Records are sorted by (domain, name) after enrichment
// 5. **Library-First**: The pipeline can be embedded without the CLI

pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{CertificateConfig, CloudflareConfig, InventoryConfig, Route53Config, WhoisConfig};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOptions, Report, SourceOutcome, SourceStatus};
pub use record::{
    CertStatus, CertificateSummary, NOT_APPLICABLE, ProbeError, Record, RecordType,
    RecordTypeFilter, UNKNOWN_REGISTRAR, sort_records,
};
pub use registry::{SourceRegistry, SourceSlot};
pub use traits::{CertificateProber, RecordSource, RegistrarOracle, SourceFactory};
