//! DNS record model
//!
//! A [`Record`] is created by a record source during aggregation and then
//! annotated in place: first with its registrar, then with its certificate
//! status. Records are never merged or removed.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Sentinel for certificate fields of records that are not probed
pub const NOT_APPLICABLE: &str = "n/a";

/// Registrar value used whenever no registrar could be determined
pub const UNKNOWN_REGISTRAR: &str = "unknown";

/// DNS record type
///
/// Parsing never fails: unrecognized types are kept uppercase in
/// [`RecordType::Other`] and are never cert-eligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Ns,
    Mx,
    Txt,
    Srv,
    Caa,
    Soa,
    Ptr,
    /// Any type outside the known vocabulary (uppercase)
    Other(String),
}

impl RecordType {
    /// Uppercase wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Ns => "NS",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Soa => "SOA",
            RecordType::Ptr => "PTR",
            RecordType::Other(other) => other,
        }
    }

    /// Address and alias records get a live TLS probe
    pub fn is_cert_eligible(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa | RecordType::Cname)
    }
}

impl FromStr for RecordType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Ok(match upper.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "NS" => RecordType::Ns,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            "SOA" => RecordType::Soa,
            "PTR" => RecordType::Ptr,
            _ => RecordType::Other(upper),
        })
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(record_type) => record_type,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record-type filter passed to every source
///
/// An empty filter matches every type. Entries are stored uppercase and
/// compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTypeFilter {
    types: BTreeSet<String>,
}

impl RecordTypeFilter {
    /// Filter that accepts every record type
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a filter from user-supplied type names
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let types = args
            .into_iter()
            .map(|arg| arg.as_ref().trim().to_ascii_uppercase())
            .filter(|arg| !arg.is_empty())
            .collect();
        Self { types }
    }

    /// Whether the filter accepts everything
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether records of `record_type` pass the filter
    pub fn matches(&self, record_type: &str) -> bool {
        self.types.is_empty() || self.types.contains(&record_type.trim().to_ascii_uppercase())
    }

    /// Normalized type names, sorted
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }
}

/// Descriptive metadata of a leaf certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    /// Issuer organization, falling back to its common name
    pub issuer: String,
    /// Expiry (notAfter) date
    pub expires: NaiveDate,
}

/// Classified certificate probe failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("timeout")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("dns lookup failed: {0}")]
    DnsLookup(String),

    #[error("invalid hostname: {0}")]
    InvalidHostname(String),

    #[error("tls handshake failed: {0}")]
    Handshake(String),

    #[error("no certificate")]
    NoCertificate,

    #[error("certificate parse failed: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Certificate annotation of a record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CertStatus {
    /// Enrichment has not run yet
    #[default]
    Pending,
    /// Type is not cert-eligible, or certificate fetching is disabled
    NotApplicable,
    /// Probe succeeded
    Found(CertificateSummary),
    /// Probe failed with a classified error
    Failed(String),
}

impl CertStatus {
    /// Issuer column value
    pub fn issuer(&self) -> &str {
        match self {
            CertStatus::NotApplicable => NOT_APPLICABLE,
            CertStatus::Found(summary) => &summary.issuer,
            CertStatus::Pending | CertStatus::Failed(_) => "",
        }
    }

    /// Expiry column value (`YYYY-MM-DD`)
    pub fn expires(&self) -> String {
        match self {
            CertStatus::NotApplicable => NOT_APPLICABLE.to_string(),
            CertStatus::Found(summary) => summary.expires.format("%Y-%m-%d").to_string(),
            CertStatus::Pending | CertStatus::Failed(_) => String::new(),
        }
    }

    /// Error column value
    pub fn error(&self) -> &str {
        match self {
            CertStatus::Failed(error) => error,
            _ => "",
        }
    }
}

impl From<std::result::Result<CertificateSummary, ProbeError>> for CertStatus {
    fn from(result: std::result::Result<CertificateSummary, ProbeError>) -> Self {
        match result {
            Ok(summary) => CertStatus::Found(summary),
            Err(error) => CertStatus::Failed(error.to_string()),
        }
    }
}

/// A single DNS resource record with provenance and enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Zone apex the record belongs to
    pub domain: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content
    pub value: String,
    /// Uppercase record type
    pub record_type: RecordType,
    /// Registrar of `domain`, set by the registrar resolver
    pub registrar: Option<String>,
    /// Certificate annotation, set by the certificate enricher
    pub cert: CertStatus,
    source: String,
}

impl Record {
    /// Create an unannotated record
    pub fn new(
        domain: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        record_type: impl Into<RecordType>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            value: value.into(),
            record_type: record_type.into(),
            registrar: None,
            cert: CertStatus::Pending,
            source: source.into(),
        }
    }

    /// Source that produced this record
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Registrar column value (empty before resolution)
    pub fn registrar_or_empty(&self) -> &str {
        self.registrar.as_deref().unwrap_or("")
    }
}

/// Sort records by `(domain, name)` using plain string ordering
///
/// The sort is stable: records with equal keys keep their relative order.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| {
        a.domain
            .cmp(&b.domain)
            .then_with(|| a.name.cmp(&b.name))
    });
}
