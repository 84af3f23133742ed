//! Test doubles and common utilities for pipeline contract tests
//!
//! This module provides minimal test doubles that count how often the
//! pipeline reaches its external collaborators.

#![allow(dead_code)]

use domains_core::error::{Error, Result};
use domains_core::record::{CertificateSummary, ProbeError, Record, RecordTypeFilter};
use domains_core::registry::SourceSlot;
use domains_core::traits::{CertificateProber, RecordSource, RegistrarOracle};
use domains_core::UNKNOWN_REGISTRAR;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A record source returning a fixed record set (or a fixed error)
pub struct MockSource {
    name: &'static str,
    records: Vec<Record>,
    failure: Option<String>,
    registrar_zones: Vec<String>,
    registrar_name: String,
    delay: Duration,
    fetch_count: Arc<AtomicUsize>,
}

impl MockSource {
    /// Source returning `records` (each re-tagged with this source's name)
    pub fn new(name: &'static str, records: Vec<(&str, &str, &str, &str)>) -> Self {
        let records = records
            .into_iter()
            .map(|(domain, rname, value, rtype)| Record::new(domain, rname, value, rtype, name))
            .collect();

        Self {
            name,
            records,
            failure: None,
            registrar_zones: Vec::new(),
            registrar_name: name.to_string(),
            delay: Duration::ZERO,
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Source whose fetch always fails with `message`
    pub fn failing(name: &'static str, message: &str) -> Self {
        let mut source = Self::new(name, Vec::new());
        source.failure = Some(message.to_string());
        source
    }

    /// Report this source as registrar of `zones` under `registrar_name`
    pub fn registrar_for(mut self, zones: &[&str], registrar_name: &str) -> Self {
        self.registrar_zones = zones.iter().map(|z| z.to_string()).collect();
        self.registrar_name = registrar_name.to_string();
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared fetch counter
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetch_count)
    }

    /// Wrap into a configured slot
    pub fn into_slot(self) -> SourceSlot {
        SourceSlot::Configured(Arc::new(self))
    }
}

#[async_trait::async_trait]
impl RecordSource for MockSource {
    async fn fetch_records(&self, filter: &RecordTypeFilter) -> Result<Vec<Record>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(Error::http(message.clone()));
        }

        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r.record_type.as_str()))
            .cloned()
            .collect())
    }

    fn is_registrar_for(&self, domain: &str) -> bool {
        self.registrar_zones.iter().any(|zone| zone == domain)
    }

    fn source_name(&self) -> &'static str {
        self.name
    }

    fn registrar_name(&self) -> &str {
        &self.registrar_name
    }
}

/// A registrar oracle with canned answers that counts lookups per domain
#[derive(Clone, Default)]
pub struct CountingOracle {
    answers: Arc<HashMap<String, String>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl CountingOracle {
    /// Oracle answering from `answers`; everything else is unknown
    pub fn new(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: Arc::new(
                answers
                    .iter()
                    .map(|(d, r)| (d.to_string(), r.to_string()))
                    .collect(),
            ),
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lookups for `domain`
    pub fn calls_for(&self, domain: &str) -> usize {
        self.calls.lock().unwrap().get(domain).copied().unwrap_or(0)
    }

    /// Total lookups
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait::async_trait]
impl RegistrarOracle for CountingOracle {
    async fn lookup_registrar(&self, domain: &str) -> String {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(domain.to_string())
            .or_insert(0) += 1;

        self.answers
            .get(domain)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_REGISTRAR.to_string())
    }
}

/// A certificate prober with canned failures that counts probes per hostname
#[derive(Clone, Default)]
pub struct CountingProber {
    failures: Arc<HashMap<String, ProbeError>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingProber {
    /// Prober succeeding for every hostname except those in `failures`
    pub fn new(failures: Vec<(&str, ProbeError)>) -> Self {
        Self {
            failures: Arc::new(
                failures
                    .into_iter()
                    .map(|(h, e)| (h.to_string(), e))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Sleep inside each probe
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Probes for `hostname`
    pub fn calls_for(&self, hostname: &str) -> usize {
        self.calls.lock().unwrap().get(hostname).copied().unwrap_or(0)
    }

    /// Total probes
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Highest number of probes observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CertificateProber for CountingProber {
    async fn probe(&self, hostname: &str) -> std::result::Result<CertificateSummary, ProbeError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(hostname.to_string())
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.failures.get(hostname) {
            return Err(error.clone());
        }

        Ok(test_certificate())
    }
}

/// Certificate returned by every successful [`CountingProber`] probe
pub fn test_certificate() -> CertificateSummary {
    CertificateSummary {
        issuer: "Test CA".to_string(),
        expires: NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
    }
}

/// Unconfigured slot
pub fn unconfigured(name: &str) -> SourceSlot {
    SourceSlot::Unconfigured {
        name: name.to_string(),
    }
}
