//! Lead data sources and the registry that resolves them by kind.
//!
//! This crate provides:
//! - [`SourceSearch`]: the capability every data origin implements
//! - [`SourceRegistry`]: maps a [`SourceKind`] tag to its implementation
//! - [`StaticSource`]: a fixed in-memory candidate list
//! - [`FixtureSource`]: candidates read from `<dir>/<kind>.json`
//!
//! Network-backed sources (scrapers, people-search APIs) plug in by
//! implementing [`SourceSearch`] and registering under their kind.

mod fixture;
mod static_source;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use leadscout_shared::{CandidateRecord, LeadScoutError, Result, SourceKind, TargetingCriteria};

pub use fixture::FixtureSource;
pub use static_source::StaticSource;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A data origin that turns a targeting profile into raw candidates.
///
/// Implementations may fail for any reason; callers treat a failure as zero
/// results from this source. Timeouts are the implementation's concern.
#[async_trait]
pub trait SourceSearch: Send + Sync {
    /// The tag this source is registered under.
    fn kind(&self) -> SourceKind;

    /// Return at most `max_results` candidates matching `criteria`, in the
    /// source's own relevance order.
    async fn search(
        &self,
        criteria: &TargetingCriteria,
        max_results: usize,
    ) -> Result<Vec<CandidateRecord>>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds one registered source per kind.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceKind, Arc<dyn SourceSearch>>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under its kind, replacing any previous entry.
    pub fn register(&mut self, source: impl SourceSearch + 'static) -> &mut Self {
        self.register_arc(Arc::new(source))
    }

    pub fn register_arc(&mut self, source: Arc<dyn SourceSearch>) -> &mut Self {
        let kind = source.kind();
        if self.sources.insert(kind, source).is_some() {
            tracing::debug!(source = %kind, "replaced registered source");
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, source: impl SourceSearch + 'static) -> Self {
        self.register(source);
        self
    }

    pub fn contains(&self, kind: SourceKind) -> bool {
        self.sources.contains_key(&kind)
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|k| self.contains(*k))
            .collect()
    }

    /// Look up the implementation for `kind`.
    pub fn resolve(&self, kind: SourceKind) -> Result<Arc<dyn SourceSearch>> {
        self.sources
            .get(&kind)
            .cloned()
            .ok_or_else(|| LeadScoutError::UnknownSource(kind.to_string()))
    }

    /// Check a requested source list: non-empty, every kind registered.
    pub fn validate(&self, requested: &[SourceKind]) -> Result<()> {
        if requested.is_empty() {
            return Err(LeadScoutError::validation("at least one source is required"));
        }
        match requested.iter().find(|k| !self.contains(**k)) {
            Some(missing) => Err(LeadScoutError::UnknownSource(missing.to_string())),
            None => Ok(()),
        }
    }
}
