// # WHOIS Registrar Oracle
//
// Best-effort registrar lookup over WHOIS (port 43), following registry
// referrals to the registrar's own WHOIS server.
//
// ## Behavior
//
// - Every lookup is bounded by a timeout
// - TLDs missing from the server list are asked at whois.iana.org, whose
//   referral names the registry server
// - The registrar is taken from the first `Registrar:`, `Registrar Name:`
//   or `Sponsoring Registrar:` line, trimmed and lowercased
// - Any failure (network, timeout, no matching line) yields "unknown"
// - Answers are memoized per domain for the lifetime of the oracle

use async_trait::async_trait;
use domains_core::config::WhoisConfig;
use domains_core::traits::RegistrarOracle;
use domains_core::{Error, Result, UNKNOWN_REGISTRAR};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Duration;
use whois_rust::{WhoIs, WhoIsLookupOptions};

/// Embedded TLD → WHOIS server map
pub const WHOIS_SERVERS: &str = include_str!("whois_servers.json");

/// Registrar line patterns, in priority order
static REGISTRAR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)^[ \t]*Registrar:[ \t]*(\S.*?)[ \t\r]*$",
        r"(?im)^[ \t]*Registrar Name:[ \t]*(\S.*?)[ \t\r]*$",
        r"(?im)^[ \t]*Sponsoring Registrar:[ \t]*(\S.*?)[ \t\r]*$",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Extract the registrar from a raw WHOIS response
///
/// Returns `None` when no registrar line is present.
pub fn extract_registrar(raw: &str) -> Option<String> {
    REGISTRAR_PATTERNS.iter().find_map(|re| {
        re.captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_lowercase())
            .filter(|value| !value.is_empty())
    })
}

/// WHOIS-backed [`RegistrarOracle`]
pub struct WhoisOracle {
    client: WhoIs,
    timeout: Duration,
    memo: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for WhoisOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhoisOracle")
            .field("timeout", &self.timeout)
            .field("memoized", &self.memoized())
            .finish()
    }
}

impl WhoisOracle {
    /// Create an oracle with the embedded server list
    pub fn new(config: &WhoisConfig) -> Result<Self> {
        Self::with_servers(WHOIS_SERVERS, config.timeout())
    }

    /// Create an oracle with a custom server list (whois-rust JSON format)
    pub fn with_servers(servers_json: &str, timeout: Duration) -> Result<Self> {
        let client = WhoIs::from_string(servers_json)
            .map_err(|e| Error::config(format!("Invalid WHOIS server list: {e}")))?;

        Ok(Self {
            client,
            timeout,
            memo: Mutex::new(HashMap::new()),
        })
    }

    /// Number of memoized domains
    pub fn memoized(&self) -> usize {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Raw WHOIS response for `domain`
    async fn query(&self, domain: &str) -> Result<String> {
        let options = WhoIsLookupOptions::from_string(domain)
            .map_err(|e| Error::invalid_input(format!("Invalid domain {domain}: {e}")))?;

        match tokio::time::timeout(self.timeout, self.client.lookup_async(options)).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => Err(Error::Other(format!("WHOIS query failed: {e}"))),
            Err(_) => Err(Error::Other(format!(
                "WHOIS query timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl RegistrarOracle for WhoisOracle {
    async fn lookup_registrar(&self, domain: &str) -> String {
        if let Some(cached) = self
            .memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
            .cloned()
        {
            return cached;
        }

        let registrar = match self.query(domain).await {
            Ok(raw) => extract_registrar(&raw).unwrap_or_else(|| {
                tracing::debug!("No registrar line in WHOIS response for {}", domain);
                UNKNOWN_REGISTRAR.to_string()
            }),
            Err(e) => {
                tracing::warn!("WHOIS lookup for {} failed: {}", domain, e);
                UNKNOWN_REGISTRAR.to_string()
            }
        };

        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(domain.to_string(), registrar.clone());
        registrar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_registrar_verisign_style() {
        let raw = "   Domain Name: EXAMPLE.COM\r\n\
                   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r\n\
                   Registrar WHOIS Server: whois.iana.org\r\n\
                   Registrar URL: http://res-dom.iana.org\r\n\
                   Registrar: RESERVED-Internet Assigned Numbers Authority\r\n\
                   Registrar IANA ID: 376\r\n";

        assert_eq!(
            extract_registrar(raw).as_deref(),
            Some("reserved-internet assigned numbers authority")
        );
    }

    #[test]
    fn test_extract_registrar_name_and_sponsoring() {
        assert_eq!(
            extract_registrar("Domain: x.ru\nRegistrar Name: REGRU-RU\n").as_deref(),
            Some("regru-ru")
        );
        assert_eq!(
            extract_registrar("Sponsoring Registrar: Alibaba Cloud Computing (Beijing) Co., Ltd.\n")
                .as_deref(),
            Some("alibaba cloud computing (beijing) co., ltd.")
        );
    }

    #[test]
    fn test_extract_registrar_prefers_plain_label() {
        let raw = "Sponsoring Registrar: Second\nRegistrar: First\n";
        assert_eq!(extract_registrar(raw).as_deref(), Some("first"));
    }

    #[test]
    fn test_extract_registrar_is_case_insensitive() {
        assert_eq!(
            extract_registrar("registrar:   Gandi SAS  \n").as_deref(),
            Some("gandi sas")
        );
    }

    #[test]
    fn test_extract_registrar_ignores_empty_values() {
        assert_eq!(extract_registrar("Registrar:\nRegistrar URL: x\n"), None);
        assert_eq!(extract_registrar("No match for \"NOPE.COM\".\n"), None);
        assert_eq!(extract_registrar(""), None);
    }

    #[test]
    fn test_embedded_server_list_loads() {
        let oracle = WhoisOracle::new(&WhoisConfig::default()).unwrap();
        assert_eq!(oracle.timeout, Duration::from_secs(10));
        assert_eq!(oracle.memoized(), 0);
    }

    #[test]
    fn test_unlisted_tlds_fall_back_to_iana() {
        let servers: serde_json::Value = serde_json::from_str(WHOIS_SERVERS).unwrap();
        assert_eq!(servers[""], "whois.iana.org");
        assert!(servers.get("museum").is_none());
    }

    #[test]
    fn test_invalid_server_list_is_config_error() {
        let err = WhoisOracle::with_servers("not json", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_memoized_answer_skips_network() {
        let oracle = WhoisOracle::new(&WhoisConfig::default()).unwrap();
        oracle
            .memo
            .lock()
            .unwrap()
            .insert("example.com".to_string(), "cached registrar".to_string());

        assert_eq!(oracle.lookup_registrar("example.com").await, "cached registrar");
        assert_eq!(oracle.memoized(), 1);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_lookup() {
        let oracle = WhoisOracle::new(&WhoisConfig::default()).unwrap();
        let registrar = oracle.lookup_registrar("google.com").await;
        assert!(registrar.contains("markmonitor"), "got {registrar}");
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_unlisted_tld_is_answered_through_iana() {
        let oracle = WhoisOracle::new(&WhoisConfig::default()).unwrap();
        let raw = oracle.query("nic.museum").await.unwrap();
        assert!(!raw.trim().is_empty());
    }
}
