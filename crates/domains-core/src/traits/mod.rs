//! Core traits for the inventory pipeline
//!
//! This module defines the interfaces of the pipeline's external collaborators.
//!
//! - [`RecordSource`]: list the records and zones a DNS provider manages
//! - [`RegistrarOracle`]: best-effort registrar lookup for a domain
//! - [`CertificateProber`]: TLS handshake against a hostname

pub mod cert_prober;
pub mod record_source;
pub mod registrar_oracle;

pub use cert_prober::CertificateProber;
pub use record_source::{RecordSource, SourceFactory};
pub use registrar_oracle::RegistrarOracle;
