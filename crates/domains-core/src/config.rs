//! Configuration types for the inventory system
//!
//! This module defines the configuration structures shared by the sources,
//! the registrar oracle and the certificate prober. Loading (file and
//! environment) is done by the `domains` binary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main inventory configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Cloudflare credentials
    #[serde(default)]
    pub cloudflare: CloudflareConfig,

    /// Route53 credentials
    #[serde(default)]
    pub route53: Route53Config,

    /// WHOIS lookup settings
    #[serde(default)]
    pub whois: WhoisConfig,

    /// Certificate probe settings
    #[serde(default)]
    pub certificates: CertificateConfig,
}

impl InventoryConfig {
    /// Create a configuration with defaults and no credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    ///
    /// Missing credentials are not an error here: an unconfigured source is
    /// skipped by the pipeline.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.cloudflare.validate()?;
        self.route53.validate()?;
        self.whois.validate()?;
        self.certificates.validate()?;
        Ok(())
    }
}

/// Cloudflare credentials
///
/// Either an API token, or a global API key together with the account email.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// Scoped API token (Zone:Read, DNS:Read)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Global API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Account email paired with `api_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CloudflareConfig {
    /// Whether credentials are present
    pub fn is_configured(&self) -> bool {
        non_empty(&self.api_token) || (non_empty(&self.api_key) && non_empty(&self.email))
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if non_empty(&self.api_key) && !non_empty(&self.email) && !non_empty(&self.api_token) {
            return Err(crate::Error::config(
                "cloudflare.api_key requires cloudflare.email",
            ));
        }
        Ok(())
    }
}

// Credentials never appear in Debug output
impl std::fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("api_token", &redacted(&self.api_token))
            .field("api_key", &redacted(&self.api_key))
            .field("email", &self.email)
            .finish()
    }
}

/// Route53 (AWS) credentials
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route53Config {
    /// AWS access key ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// AWS secret access key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl Route53Config {
    /// Whether credentials are present
    pub fn is_configured(&self) -> bool {
        non_empty(&self.access_key_id) && non_empty(&self.secret_access_key)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if non_empty(&self.access_key_id) != non_empty(&self.secret_access_key) {
            return Err(crate::Error::config(
                "route53 requires both access_key_id and secret_access_key",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Route53Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Config")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redacted(&self.secret_access_key))
            .field("session_token", &redacted(&self.session_token))
            .finish()
    }
}

/// WHOIS lookup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisConfig {
    /// Per-lookup timeout (in seconds)
    #[serde(default = "default_whois_timeout_secs")]
    pub timeout_secs: u64,
}

impl WhoisConfig {
    /// Per-lookup timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "whois.timeout_secs must be between 1 and 300. Got: {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_whois_timeout_secs(),
        }
    }
}

/// Certificate probe settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// TLS port to probe
    #[serde(default = "default_tls_port")]
    pub port: u16,

    /// TCP connect timeout (in seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// TLS handshake timeout (in seconds)
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

impl CertificateConfig {
    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// TLS handshake timeout
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.port == 0 {
            return Err(crate::Error::config("certificates.port cannot be 0"));
        }
        for (key, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("handshake_timeout_secs", self.handshake_timeout_secs),
        ] {
            if !(1..=60).contains(&secs) {
                return Err(crate::Error::config(format!(
                    "certificates.{key} must be between 1 and 60. Got: {secs}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            port: default_tls_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn redacted(value: &Option<String>) -> &'static str {
    if value.is_some() { "<REDACTED>" } else { "<unset>" }
}

fn default_whois_timeout_secs() -> u64 {
    10
}

fn default_tls_port() -> u16 {
    443
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_handshake_timeout_secs() -> u64 {
    5
}
