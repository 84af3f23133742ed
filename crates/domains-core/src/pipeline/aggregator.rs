//! Concurrent multi-source record fetch
//!
//! Every configured source is fetched on its own task. A failing source only
//! loses its own records; the run fails only when no source is configured.
//! Skipped and failed sources are reported through [`SourceOutcome::warning`]
//! and are left to the caller to log.

use crate::error::{Error, Result};
use crate::record::{Record, RecordTypeFilter};
use crate::registry::SourceSlot;
use crate::traits::RecordSource;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How a single source ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// Fetch succeeded
    Fetched {
        /// Number of records returned
        records: usize,
    },
    /// Not configured; skipped
    Skipped,
    /// Fetch or construction failed
    Failed {
        /// Error message
        reason: String,
    },
}

/// Per-source result of an aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// Source name
    pub source: String,
    /// How the source ended
    pub status: SourceStatus,
}

impl SourceOutcome {
    /// Warning line for skipped or failed sources
    pub fn warning(&self) -> Option<String> {
        match &self.status {
            SourceStatus::Fetched { .. } => None,
            SourceStatus::Skipped => Some(format!(
                "{} credentials not configured, skipping",
                self.source
            )),
            SourceStatus::Failed { reason } => Some(format!("{}: {}", self.source, reason)),
        }
    }
}

/// Output of [`aggregate`]
pub struct Aggregation {
    /// Concatenated records of every successful source
    pub records: Vec<Record>,
    /// One outcome per slot, in slot order
    pub outcomes: Vec<SourceOutcome>,
    /// Every configured source, whether its fetch succeeded or not
    pub sources: Vec<Arc<dyn RecordSource>>,
}

enum Pending {
    Running {
        source: String,
        handle: JoinHandle<Result<Vec<Record>>>,
    },
    Done(SourceOutcome),
}

/// Fetch all configured sources concurrently and merge their records
///
/// # Returns
///
/// - `Ok(Aggregation)`: At least one source was configured (even if all failed)
/// - `Err(Error::NoSourcesConfigured)`: No slot holds a configured source
pub async fn aggregate(slots: Vec<SourceSlot>, filter: &RecordTypeFilter) -> Result<Aggregation> {
    let sources: Vec<Arc<dyn RecordSource>> = slots
        .iter()
        .filter_map(|slot| match slot {
            SourceSlot::Configured(source) => Some(Arc::clone(source)),
            _ => None,
        })
        .collect();

    if sources.is_empty() {
        for slot in &slots {
            if let SourceSlot::Invalid { name, reason } = slot {
                warn!("{}: {}", name, reason);
            }
        }
        return Err(Error::NoSourcesConfigured);
    }

    // Fan out: one task per configured source
    let pending: Vec<Pending> = slots
        .into_iter()
        .map(|slot| match slot {
            SourceSlot::Configured(source) => {
                let name = source.source_name().to_string();
                let filter = filter.clone();
                debug!("Fetching records from {}", name);
                let handle = tokio::spawn(async move { source.fetch_records(&filter).await });
                Pending::Running {
                    source: name,
                    handle,
                }
            }
            SourceSlot::Unconfigured { name } => Pending::Done(SourceOutcome {
                source: name,
                status: SourceStatus::Skipped,
            }),
            SourceSlot::Invalid { name, reason } => Pending::Done(SourceOutcome {
                source: name,
                status: SourceStatus::Failed { reason },
            }),
        })
        .collect();

    // Join barrier
    let mut records = Vec::new();
    let mut outcomes = Vec::with_capacity(pending.len());
    for entry in pending {
        let outcome = match entry {
            Pending::Done(outcome) => outcome,
            Pending::Running { source, handle } => {
                let status = match handle.await {
                    Ok(Ok(fetched)) => {
                        info!("{}: fetched {} record(s)", source, fetched.len());
                        let count = fetched.len();
                        records.extend(fetched);
                        SourceStatus::Fetched { records: count }
                    }
                    Ok(Err(e)) => SourceStatus::Failed {
                        reason: e.to_string(),
                    },
                    Err(e) => SourceStatus::Failed {
                        reason: format!("fetch task aborted: {e}"),
                    },
                };
                SourceOutcome { source, status }
            }
        };

        debug!("{}: {:?}", outcome.source, outcome.status);
        outcomes.push(outcome);
    }

    Ok(Aggregation {
        records,
        outcomes,
        sources,
    })
}
