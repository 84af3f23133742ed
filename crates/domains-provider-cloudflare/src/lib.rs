// # Cloudflare Record Source
//
// This crate lists every zone and DNS record visible to a Cloudflare account.
//
// ## Behavior
//
// - Zones are listed with `GET /zones` (50 per page)
// - Records are listed per zone with `GET /zones/:zone_id/dns_records` (100 per page)
// - Zone nameservers are reported as NS records on the zone apex
// - A zone served by `*.ns.cloudflare.com` is reported as registered at Cloudflare
// - One pass, no retries: a failed page fails the whole fetch
//
// ## Security Requirements
//
// - API token and API key NEVER appear in logs or Debug output
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?page=...&per_page=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=...&per_page=...`

pub mod types;

use async_trait::async_trait;
use domains_core::config::{CloudflareConfig, InventoryConfig};
use domains_core::record::{Record, RecordTypeFilter};
use domains_core::traits::{RecordSource, SourceFactory};
use domains_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use types::{CloudflareResponse, DnsRecord, Zone};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Zones per page (API maximum)
const ZONES_PER_PAGE: u32 = 50;

/// Records per page
const RECORDS_PER_PAGE: u32 = 100;

/// Nameserver suffix of zones delegated to Cloudflare
const CLOUDFLARE_NS_SUFFIX: &str = ".ns.cloudflare.com";

/// Source name stamped on every record
const SOURCE_NAME: &str = "cloudflare";

/// Cloudflare authentication
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Scoped API token (Bearer)
    Token(String),
    /// Global API key with the account email
    GlobalKey { api_key: String, email: String },
}

impl Credentials {
    /// Credentials from configuration, preferring the API token
    ///
    /// Returns `None` when neither a token nor a key/email pair is set.
    pub fn from_config(config: &CloudflareConfig) -> Option<Self> {
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(token) = present(&config.api_token) {
            return Some(Credentials::Token(token));
        }

        match (present(&config.api_key), present(&config.email)) {
            (Some(api_key), Some(email)) => Some(Credentials::GlobalKey { api_key, email }),
            _ => None,
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::GlobalKey { api_key, email } => request
                .header("X-Auth-Key", api_key)
                .header("X-Auth-Email", email),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(<REDACTED>)"),
            Credentials::GlobalKey { email, .. } => f
                .debug_struct("GlobalKey")
                .field("api_key", &"<REDACTED>")
                .field("email", email)
                .finish(),
        }
    }
}

/// Cloudflare record source
///
/// Zones seen by the last successful [`fetch_records`](RecordSource::fetch_records)
/// are kept for the registrar hint.
///
/// # Security
///
/// The Debug implementation does NOT expose credentials.
pub struct CloudflareSource {
    credentials: Credentials,
    base_url: String,
    client: reqwest::Client,
    zones: RwLock<Vec<Zone>>,
}

// Custom Debug implementation that hides credentials
impl std::fmt::Debug for CloudflareSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareSource")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareSource {
    /// Create a source against the public Cloudflare API
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_base_url(credentials, CLOUDFLARE_API_BASE)
    }

    /// Create a source against a custom API base URL
    pub fn with_base_url(credentials: Credentials, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            zones: RwLock::new(Vec::new()),
        })
    }

    /// Fetch one page of a paginated listing
    ///
    /// # Returns
    ///
    /// - `Ok((items, total_pages))`
    /// - `Err(Error)`: On transport, status or envelope errors
    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<T>, u32)> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {} (page {})", url, page);

        let response = self
            .credentials
            .apply(self.client.get(&url))
            .query(&[("page", page), ("per_page", per_page)])
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!(
                    "Invalid credentials or insufficient permissions. Status: {status}"
                )),
                404 => Error::not_found(format!("{path} ({status})")),
                429 => Error::rate_limited(format!(
                    "Rate limit exceeded. Please retry later. Status: {status}"
                )),
                500..=599 => Error::http(format!(
                    "Cloudflare server error (transient): {status} - {error_text}"
                )),
                _ => Error::http(format!("Request failed: {status} - {error_text}")),
            });
        }

        let body: CloudflareResponse<Vec<T>> = response
            .json()
            .await
            .map_err(|e| Error::http(format!("Failed to parse response: {e}")))?;

        if !body.success {
            return Err(Error::http(format!("API error: {}", body.error_message())));
        }

        let total_pages = body
            .result_info
            .as_ref()
            .map(|info| info.total_pages)
            .unwrap_or(1);
        Ok((body.result.unwrap_or_default(), total_pages))
    }

    /// Walk every page of a paginated listing
    async fn get_all<T: DeserializeOwned>(&self, path: &str, per_page: u32) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let (batch, total_pages) = self.get_page::<T>(path, page, per_page).await?;
            let empty = batch.is_empty();
            items.extend(batch);

            if empty || page >= total_pages {
                return Ok(items);
            }
            page += 1;
        }
    }

    async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.get_all("/zones", ZONES_PER_PAGE).await
    }

    async fn list_zone_records(
        &self,
        zone: &Zone,
        filter: &RecordTypeFilter,
    ) -> Result<Vec<Record>> {
        let path = format!("/zones/{}/dns_records", zone.id);
        let dns_records: Vec<DnsRecord> = self.get_all(&path, RECORDS_PER_PAGE).await?;

        let mut records: Vec<Record> = dns_records
            .into_iter()
            .filter(|r| filter.matches(&r.record_type))
            .map(|r| Record::new(&zone.name, r.name, r.content, r.record_type.as_str(), SOURCE_NAME))
            .collect();

        if filter.matches("NS") {
            records.extend(
                zone.name_servers
                    .iter()
                    .map(|ns| Record::new(&zone.name, &zone.name, ns, "NS", SOURCE_NAME)),
            );
        }

        tracing::debug!("{}: {} record(s)", zone.name, records.len());
        Ok(records)
    }
}

#[async_trait]
impl RecordSource for CloudflareSource {
    async fn fetch_records(&self, filter: &RecordTypeFilter) -> Result<Vec<Record>> {
        let zones = self.list_zones().await?;
        tracing::info!("Cloudflare: {} zone(s)", zones.len());

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
            .find(|zone| zone.name == domain)
            .is_some_and(|zone| {
                zone.name_servers
                    .iter()
                    .any(|ns| ns.ends_with(CLOUDFLARE_NS_SUFFIX))
            })
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

/// Factory for creating Cloudflare sources
pub struct CloudflareFactory;

impl SourceFactory for CloudflareFactory {
    fn create(&self, config: &InventoryConfig) -> Result<Option<Arc<dyn RecordSource>>> {
        let Some(credentials) = Credentials::from_config(&config.cloudflare) else {
            return Ok(None);
        };

        Ok(Some(Arc::new(CloudflareSource::new(credentials)?)))
    }
}

/// Register the Cloudflare source with a registry
///
/// # Example
///
/// ```rust
/// use domains_core::SourceRegistry;
///
/// let registry = SourceRegistry::new();
/// domains_provider_cloudflare::register(&registry);
/// assert!(registry.has_source("cloudflare"));
/// ```
pub fn register(registry: &domains_core::SourceRegistry) {
    registry.register_source(SOURCE_NAME, Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_config(token: &str) -> InventoryConfig {
        let mut config = InventoryConfig::new();
        config.cloudflare.api_token = Some(token.to_string());
        config
    }

    fn zone(name: &str, name_servers: &[&str]) -> Zone {
        Zone {
            id: format!("id-{name}"),
            name: name.to_string(),
            name_servers: name_servers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_credentials_prefer_token() {
        let config = CloudflareConfig {
            api_token: Some("tok".to_string()),
            api_key: Some("key".to_string()),
            email: Some("ops@example.com".to_string()),
        };
        assert_eq!(
            Credentials::from_config(&config),
            Some(Credentials::Token("tok".to_string()))
        );
    }

    #[test]
    fn test_credentials_key_requires_email() {
        let config = CloudflareConfig {
            api_token: None,
            api_key: Some("key".to_string()),
            email: None,
        };
        assert_eq!(Credentials::from_config(&config), None);

        let config = CloudflareConfig {
            email: Some("ops@example.com".to_string()),
            ..config
        };
        assert!(matches!(
            Credentials::from_config(&config),
            Some(Credentials::GlobalKey { .. })
        ));
    }

    #[test]
    fn test_empty_token_is_not_configured() {
        assert_eq!(Credentials::from_config(&token_config("").cloudflare), None);
    }

    #[test]
    fn test_factory_skips_without_credentials() {
        let source = CloudflareFactory.create(&InventoryConfig::new()).unwrap();
        assert!(source.is_none());
    }

    #[test]
    fn test_factory_creation() {
        let source = CloudflareFactory.create(&token_config("test_token")).unwrap();
        assert_eq!(source.unwrap().source_name(), "cloudflare");
    }

    #[test]
    fn test_credentials_not_exposed_in_debug() {
        let source =
            CloudflareSource::new(Credentials::Token("secret_token_12345".to_string())).unwrap();
        let debug_str = format!("{:?}", source);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareSource"));

        let key = Credentials::GlobalKey {
            api_key: "global_key_999".to_string(),
            email: "ops@example.com".to_string(),
        };
        let debug_str = format!("{:?}", key);
        assert!(!debug_str.contains("global_key_999"));
        assert!(debug_str.contains("ops@example.com"));
    }

    #[test]
    fn test_registrar_hint_requires_cloudflare_nameservers() {
        let source = CloudflareSource::new(Credentials::Token("t".to_string())).unwrap();
        *source.zones.write().unwrap() = vec![
            zone("a.com", &["bob.ns.cloudflare.com", "lola.ns.cloudflare.com"]),
            zone("b.com", &["ns1.example.net"]),
        ];

        assert!(source.is_registrar_for("a.com"));
        assert!(!source.is_registrar_for("b.com"));
        assert!(!source.is_registrar_for("c.com"));
        assert!(!source.is_registrar_for("www.a.com"));
    }

    #[test]
    fn test_no_registrar_hint_before_fetch() {
        let source = CloudflareSource::new(Credentials::Token("t".to_string())).unwrap();
        assert!(!source.is_registrar_for("a.com"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source =
            CloudflareSource::with_base_url(Credentials::Token("t".to_string()), "http://x/v4/")
                .unwrap();
        assert_eq!(source.base_url, "http://x/v4");
    }
}
