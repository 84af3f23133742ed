// # Route53 Record Source
//
// This crate lists every hosted zone and resource record set of an AWS
// account through the Route53 REST API, signed with AWS Signature Version 4.
//
// ## Behavior
//
// - Zones are listed with `ListHostedZones` (marker pagination)
// - Record sets are listed per zone with `ListResourceRecordSets`
//   (name/type/identifier pagination)
// - One record per resource record value; alias record sets yield their target
// - Trailing dots are stripped and `\052` is decoded to `*`
// - A zone whose comment mentions "Route53 Registrar" is reported as
//   registered at Route53
// - One pass, no retries: a failed page fails the whole fetch
//
// ## Security Requirements
//
// - Secret access key and session token NEVER appear in logs or Debug output
//
// ## API Reference
//
// - ListHostedZones: GET `/2013-04-01/hostedzone`
// - ListResourceRecordSets: GET `/2013-04-01/hostedzone/:id/rrset`

pub mod sign;
pub mod types;

use async_trait::async_trait;
use domains_core::config::{InventoryConfig, Route53Config};
use domains_core::record::{Record, RecordTypeFilter};
use domains_core::traits::{RecordSource, SourceFactory};
use domains_core::{Error, Result};
use serde::de::DeserializeOwned;
use sign::{Signer, SigningRequest, canonical_query};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use types::{ErrorResponse, HostedZone, ListHostedZonesResponse, ListResourceRecordSetsResponse};

/// Route53 API endpoint (global, signed for us-east-1)
pub const ROUTE53_ENDPOINT: &str = "https://route53.amazonaws.com";

/// API version prefix of every path
const API_VERSION: &str = "/2013-04-01";

/// Region and service of the signing scope
const SIGNING_REGION: &str = "us-east-1";
const SIGNING_SERVICE: &str = "route53";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Zone comment marker of domains registered through Route53 Domains
const REGISTRAR_COMMENT_MARKER: &str = "Route53 Registrar";

/// Source name stamped on every record
const SOURCE_NAME: &str = "route53";

/// Route53 record source
///
/// Zones seen by the last successful [`fetch_records`](RecordSource::fetch_records)
/// are kept for the registrar hint.
pub struct Route53Source {
    signer: Signer,
    endpoint: String,
    host: String,
    client: reqwest::Client,
    zones: RwLock<Vec<HostedZone>>,
}

impl std::fmt::Debug for Route53Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Source")
            .field("signer", &self.signer)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Route53Source {
    /// Create a source against the public Route53 endpoint
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Result<Self> {
        Self::with_endpoint(access_key_id, secret_access_key, session_token, ROUTE53_ENDPOINT)
    }

    /// Create a source against a custom endpoint
    pub fn with_endpoint(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid Route53 endpoint {endpoint}: {e}")))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::config(format!("Route53 endpoint has no host: {endpoint}"))),
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            signer: Signer::new(
                access_key_id,
                secret_access_key,
                session_token,
                SIGNING_REGION,
                SIGNING_SERVICE,
            ),
            endpoint,
            host,
            client,
            zones: RwLock::new(Vec::new()),
        })
    }

    /// Signed GET returning the parsed XML body
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let signed = self.signer.sign(
            &SigningRequest {
                method: "GET",
                host: &self.host,
                path,
                query,
                headers: &[],
                payload: b"",
            },
            chrono::Utc::now(),
        )?;

        let query = canonical_query(query);
        let url = if query.is_empty() {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}{}?{}", self.endpoint, path, query)
        };
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(&url);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let (code, message) = match quick_xml::de::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => (parsed.error.code, parsed.error.message),
                Err(_) => (String::new(), body),
            };

            return Err(match (status.as_u16(), code.as_str()) {
                (_, "Throttling" | "ThrottlingException" | "PriorRequestNotComplete") | (429, _) => {
                    Error::rate_limited(format!("{code}: {message}"))
                }
                (401 | 403, _) | (_, "InvalidClientTokenId" | "SignatureDoesNotMatch") => {
                    Error::auth(format!("{code}: {message} (Status: {status})"))
                }
                (404, _) => Error::not_found(format!("{code}: {message}")),
                (500..=599, _) => Error::http(format!(
                    "Route53 server error (transient): {status} - {message}"
                )),
                _ => Error::http(format!("Request failed: {status} - {code}: {message}")),
            });
        }

        quick_xml::de::from_str(&body)
            .map_err(|e| Error::http(format!("Failed to parse response: {e}")))
    }

    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let path = format!("{API_VERSION}/hostedzone");
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let query: Vec<(&str, &str)> = marker
                .as_deref()
                .map(|m| vec![("marker", m)])
                .unwrap_or_default();
            let page: ListHostedZonesResponse = self.get(&path, &query).await?;
            zones.extend(page.hosted_zones.items);

            match page.next_marker {
                Some(next) if page.is_truncated => marker = Some(next),
                _ => return Ok(zones),
            }
        }
    }

    async fn list_zone_records(
        &self,
        zone: &HostedZone,
        filter: &RecordTypeFilter,
    ) -> Result<Vec<Record>> {
        let path = format!("{API_VERSION}/hostedzone/{}/rrset", zone.zone_id());
        let domain = zone.domain();
        let mut records = Vec::new();
        let mut next: Option<(String, Option<String>, Option<String>)> = None;

        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some((name, record_type, identifier)) = &next {
                query.push(("name", name.as_str()));
                if let Some(record_type) = record_type {
                    query.push(("type", record_type.as_str()));
                }
                if let Some(identifier) = identifier {
                    query.push(("identifier", identifier.as_str()));
                }
            }

            let page: ListResourceRecordSetsResponse = self.get(&path, &query).await?;

            for set in &page.resource_record_sets.items {
                if !filter.matches(&set.record_type) {
                    continue;
                }
                let name = types::decode_name(&set.name);
                records.extend(set.values().into_iter().map(|value| {
                    Record::new(&domain, &name, value, set.record_type.as_str(), SOURCE_NAME)
                }));
            }

            match page.next_record_name {
                Some(name) if page.is_truncated => {
                    next = Some((name, page.next_record_type, page.next_record_identifier));
                }
                _ => break,
            }
        }

        tracing::debug!("{}: {} record(s)", domain, records.len());
        Ok(records)
    }
}

#[async_trait]
impl RecordSource for Route53Source {
    async fn fetch_records(&self, filter: &RecordTypeFilter) -> Result<Vec<Record>> {
        let zones = self.list_hosted_zones().await?;
        tracing::info!("Route53: {} hosted zone(s)", zones.len());

        let mut records = Vec::new();
        for zone in &zones {
            records.extend(self.list_zone_records(zone, filter).await?);
        }

        *self.zones.write().unwrap_or_else(PoisonError::into_inner) = zones;
        Ok(records)
    }

    fn is_registrar_for(&self, domain: &str) -> bool {
        let zones = self.zones.read().unwrap_or_else(PoisonError::into_inner);
        zones
            .iter()
            .find(|zone| zone.domain() == domain)
            .is_some_and(|zone| zone.comment().contains(REGISTRAR_COMMENT_MARKER))
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

/// Factory for creating Route53 sources
pub struct Route53Factory;

impl SourceFactory for Route53Factory {
    fn create(&self, config: &InventoryConfig) -> Result<Option<Arc<dyn RecordSource>>> {
        let Route53Config {
            access_key_id: Some(access_key_id),
            secret_access_key: Some(secret_access_key),
            session_token,
        } = &config.route53
        else {
            return Ok(None);
        };

        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Ok(None);
        }

        Ok(Some(Arc::new(Route53Source::new(
            access_key_id.clone(),
            secret_access_key.clone(),
            session_token.clone(),
        )?)))
    }
}

/// Register the Route53 source with a registry
///
/// # Example
///
/// ```rust
/// use domains_core::SourceRegistry;
///
/// let registry = SourceRegistry::new();
/// domains_provider_route53::register(&registry);
/// assert!(registry.has_source("route53"));
/// ```
pub fn register(registry: &domains_core::SourceRegistry) {
    registry.register_source(SOURCE_NAME, Box::new(Route53Factory));
}
