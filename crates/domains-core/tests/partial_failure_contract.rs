//! Architectural Contract Test: Partial Failure Tolerance
//!
//! This test verifies that one failing collaborator never blocks the report.
//!
//! Constraints verified:
//! - One failing source → run succeeds with the other source's records
//! - Unconfigured sources are skipped with a warning
//! - Zero configured sources → run fails with "no sources configured"
//! - Failing registrar lookups degrade to "unknown"
//! - Failing probes degrade to a per-record error string
//!
//! If this test fails, someone has made a recoverable failure fatal.

mod common;

use common::*;
use domains_core::{
    CertStatus, Error, Pipeline, PipelineOptions, ProbeError, RecordTypeFilter, SourceStatus,
    UNKNOWN_REGISTRAR,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn one_failing_source_keeps_the_other_sources_records() {
    let healthy = MockSource::new(
        "cloudflare",
        vec![("a.com", "www.a.com", "1.2.3.4", "A")],
    );
    let broken = MockSource::failing("route53", "HTTP 403: AccessDenied");

    let pipeline = Pipeline::new(
        vec![healthy.into_slot(), broken.into_slot()],
        Arc::new(CountingOracle::default()),
        Arc::new(CountingProber::default()),
    );

    let report = pipeline.run(&PipelineOptions::default()).await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].source(), "cloudflare");
    assert_eq!(report.warnings().len(), 1);
    assert!(report.warnings()[0].starts_with("route53"));
    assert!(report.warnings()[0].contains("AccessDenied"));
}

#[tokio::test]
async fn slow_source_does_not_delay_the_start_of_another() {
    let slow = MockSource::new("cloudflare", vec![("a.com", "a.com", "1.1.1.1", "A")])
        .with_delay(Duration::from_millis(100));
    let fast = MockSource::new("route53", vec![("b.com", "b.com", "2.2.2.2", "A")]);
    let fast_fetches = fast.fetch_counter();

    let pipeline = Pipeline::new(
        vec![slow.into_slot(), fast.into_slot()],
        Arc::new(CountingOracle::default()),
        Arc::new(CountingProber::default()),
    );

    let run = tokio::spawn(async move { pipeline.run(&PipelineOptions::default()).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fast_fetches.load(std::sync::atomic::Ordering::SeqCst), 1);

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn unconfigured_source_is_skipped_with_warning() {
    let pipeline = Pipeline::new(
        vec![
            MockSource::new("cloudflare", vec![("a.com", "a.com", "1.1.1.1", "A")]).into_slot(),
            unconfigured("route53"),
        ],
        Arc::new(CountingOracle::default()),
        Arc::new(CountingProber::default()),
    );

    let report = pipeline.run(&PipelineOptions::default()).await.unwrap();

    assert_eq!(report.outcomes[1].status, SourceStatus::Skipped);
    assert_eq!(
        report.warnings(),
        vec!["route53 credentials not configured, skipping".to_string()]
    );
}

#[tokio::test]
async fn zero_configured_sources_fails_the_run() {
    let pipeline = Pipeline::new(
        vec![unconfigured("cloudflare"), unconfigured("route53")],
        Arc::new(CountingOracle::default()),
        Arc::new(CountingProber::default()),
    );

    let err = pipeline.run(&PipelineOptions::default()).await.unwrap_err();

    assert!(matches!(err, Error::NoSourcesConfigured));
    assert!(err.to_string().contains("no sources configured"));
}

#[tokio::test]
async fn failing_registrar_lookup_yields_unknown() {
    // The oracle has no answer for x.org: it reports "unknown" as a failed lookup would
    let oracle = CountingOracle::new(&[("y.org", "tucows domains inc.")]);
    let pipeline = Pipeline::new(
        vec![
            MockSource::new(
                "cloudflare",
                vec![
                    ("x.org", "x.org", "1.1.1.1", "A"),
                    ("y.org", "y.org", "1.1.1.2", "A"),
                ],
            )
            .into_slot(),
        ],
        Arc::new(oracle.clone()),
        Arc::new(CountingProber::default()),
    );

    let report = pipeline.run(&PipelineOptions::default()).await.unwrap();

    assert_eq!(report.records[0].domain, "x.org");
    assert_eq!(report.records[0].registrar_or_empty(), UNKNOWN_REGISTRAR);
    assert_eq!(report.records[1].registrar_or_empty(), "tucows domains inc.");
    assert_eq!(oracle.calls_for("x.org"), 1);
}

#[tokio::test]
async fn failing_probe_is_recorded_per_hostname() {
    let prober = CountingProber::new(vec![
        ("down.a.com", ProbeError::Timeout),
        ("gone.a.com", ProbeError::DnsLookup("no such host".to_string())),
        ("bare.a.com", ProbeError::NoCertificate),
    ]);

    let pipeline = Pipeline::new(
        vec![
            MockSource::new(
                "cloudflare",
                vec![
                    ("a.com", "bare.a.com", "1.1.1.3", "A"),
                    ("a.com", "down.a.com", "1.1.1.1", "A"),
                    ("a.com", "gone.a.com", "1.1.1.2", "A"),
                    ("a.com", "up.a.com", "1.1.1.4", "A"),
                ],
            )
            .into_slot(),
        ],
        Arc::new(CountingOracle::default()),
        Arc::new(prober),
    );

    let options = PipelineOptions {
        filter: RecordTypeFilter::all(),
        fetch_certificates: true,
    };
    let report = pipeline.run(&options).await.unwrap();

    let errors: Vec<_> = report.records.iter().map(|r| r.cert.error()).collect();
    assert_eq!(
        errors,
        vec![
            "no certificate",
            "timeout",
            "dns lookup failed: no such host",
            ""
        ]
    );
    assert_eq!(report.records[3].cert, CertStatus::Found(test_certificate()));
}
