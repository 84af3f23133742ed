//! Registrar resolution
//!
//! Resolves one registrar per distinct domain and copies it to every record
//! of that domain. Provider zone hints win over the registrar oracle, and the
//! oracle is consulted at most once per domain.

use crate::record::Record;
use crate::traits::{RecordSource, RegistrarOracle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Domain → registrar map for one pipeline run
#[derive(Debug, Default)]
pub struct RegistrarCache {
    entries: Mutex<HashMap<String, String>>,
}

impl RegistrarCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached registrar of `domain`
    pub fn get(&self, domain: &str) -> Option<String> {
        self.lock().get(domain).cloned()
    }

    /// Store the registrar of `domain`
    pub fn insert(&self, domain: impl Into<String>, registrar: impl Into<String>) {
        self.lock().insert(domain.into(), registrar.into());
    }

    /// Number of resolved domains
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Annotates records with their domain's registrar
pub struct RegistrarResolver<'a> {
    sources: &'a [Arc<dyn RecordSource>],
    oracle: &'a dyn RegistrarOracle,
    cache: &'a RegistrarCache,
}

impl<'a> RegistrarResolver<'a> {
    /// Create a resolver
    ///
    /// # Parameters
    ///
    /// - `sources`: Configured sources, consulted in order for zone hints
    /// - `oracle`: Fallback lookup
    /// - `cache`: Domain → registrar map owned by the caller for this run
    pub fn new(
        sources: &'a [Arc<dyn RecordSource>],
        oracle: &'a dyn RegistrarOracle,
        cache: &'a RegistrarCache,
    ) -> Self {
        Self {
            sources,
            oracle,
            cache,
        }
    }

    /// Set `registrar` on every record
    ///
    /// Single pass: the first record of each domain triggers resolution,
    /// later records copy the cached value.
    pub async fn resolve(&self, records: &mut [Record]) {
        for record in records.iter_mut() {
            if let Some(registrar) = self.cache.get(&record.domain) {
                record.registrar = Some(registrar);
                continue;
            }

            let registrar = self.resolve_domain(&record.domain).await;
            self.cache.insert(record.domain.clone(), registrar.clone());
            record.registrar = Some(registrar);
        }
    }

    async fn resolve_domain(&self, domain: &str) -> String {
        if let Some(source) = self
            .sources
            .iter()
            .find(|source| source.is_registrar_for(domain))
        {
            debug!("{} is registrar for {}", source.source_name(), domain);
            return source.registrar_name().to_string();
        }

        let registrar = self.oracle.lookup_registrar(domain).await;
        debug!("WHOIS registrar for {}: {}", domain, registrar);
        registrar
    }
}
