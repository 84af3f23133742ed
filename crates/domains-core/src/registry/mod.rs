//! Plugin-based source registry
//!
//! The registry allows record sources to be registered dynamically at
//! runtime, avoiding hardcoded if-else chains over provider names.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use domains_core::SourceRegistry;
//!
//! let registry = SourceRegistry::new();
//! domains_provider_cloudflare::register(&registry);
//! domains_provider_route53::register(&registry);
//!
//! let slots = registry.build_sources(&config);
//! ```
//!
//! ## Order
//!
//! Sources are built in registration order. The registrar resolver consults
//! provider hints in that same order, so the first registered provider wins
//! when two providers both claim a domain.

use crate::config::InventoryConfig;
use crate::traits::{RecordSource, SourceFactory};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// A record source as produced from configuration
#[derive(Clone)]
pub enum SourceSlot {
    /// Credentials present, source ready to fetch
    Configured(Arc<dyn RecordSource>),
    /// No credentials; skipped without error
    Unconfigured {
        /// Source name
        name: String,
    },
    /// Credentials present but the source could not be built
    Invalid {
        /// Source name
        name: String,
        /// Construction error
        reason: String,
    },
}

impl SourceSlot {
    /// Name of the source behind this slot
    pub fn name(&self) -> &str {
        match self {
            SourceSlot::Configured(source) => source.source_name(),
            SourceSlot::Unconfigured { name } | SourceSlot::Invalid { name, .. } => name,
        }
    }

    /// Whether the slot holds a usable source
    pub fn is_configured(&self) -> bool {
        matches!(self, SourceSlot::Configured(_))
    }
}

impl std::fmt::Debug for SourceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceSlot::Configured(source) => f
                .debug_tuple("Configured")
                .field(&source.source_name())
                .finish(),
            SourceSlot::Unconfigured { name } => {
                f.debug_struct("Unconfigured").field("name", name).finish()
            }
            SourceSlot::Invalid { name, reason } => f
                .debug_struct("Invalid")
                .field("name", name)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Source registry for plugin-based record source creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct SourceRegistry {
    /// Registered factories, in registration order
    sources: RwLock<Vec<(String, Box<dyn SourceFactory>)>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source factory
    ///
    /// Registering a name twice replaces the earlier factory in place.
    ///
    /// # Parameters
    ///
    /// - `name`: Source name (e.g., "cloudflare", "route53")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn SourceFactory>) {
        let name = name.into();
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        match sources.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = factory,
            None => sources.push((name, factory)),
        }
    }

    /// Build one slot per registered source
    ///
    /// # Returns
    ///
    /// Slots in registration order. Factory errors become
    /// [`SourceSlot::Invalid`] rather than failing the whole build.
    pub fn build_sources(&self, config: &InventoryConfig) -> Vec<SourceSlot> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        sources
            .iter()
            .map(|(name, factory)| match factory.create(config) {
                Ok(Some(source)) => {
                    debug!("Source {} configured", name);
                    SourceSlot::Configured(source)
                }
                Ok(None) => {
                    debug!("Source {} has no credentials", name);
                    SourceSlot::Unconfigured { name: name.clone() }
                }
                Err(e) => SourceSlot::Invalid {
                    name: name.clone(),
                    reason: e.to_string(),
                },
            })
            .collect()
    }

    /// List all registered source names, in registration order
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Check if a source name is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.iter().any(|(existing, _)| existing == name)
    }
}
