//! Cache-first, coalesced enrichment.

use std::sync::Arc;

use crate::cache::EnrichmentCache;
use crate::limiter::RequestCoalescer;

use super::{EnrichmentError, EnrichmentSource};

type EnrichmentResult = Result<serde_json::Value, EnrichmentError>;

/// Resolves enrichment payloads through the cache.
pub struct Enricher {
    cache: Arc<EnrichmentCache>,
    source: Option<Arc<dyn EnrichmentSource>>,
    coalescer: RequestCoalescer<String, EnrichmentResult>,
}

impl Enricher {
    pub fn new(cache: Arc<EnrichmentCache>, source: Option<Arc<dyn EnrichmentSource>>) -> Self {
        Self {
            cache,
            source,
            coalescer: RequestCoalescer::new(),
        }
    }

    pub fn cache(&self) -> &Arc<EnrichmentCache> {
        &self.cache
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    /// Returns the enrichment payload for `identifier`.
    ///
    /// A valid cache entry answers immediately. Otherwise one fetch runs per
    /// identifier no matter how many callers ask concurrently; its result is
    /// cached on success. Failures are not cached.
    pub async fn lookup(&self, identifier: &str) -> EnrichmentResult {
        let key = identifier.trim().to_ascii_uppercase();
        if let Some(payload) = self.cache.get(&key) {
            return Ok(payload);
        }

        let Some(source) = self.source.as_ref() else {
            return Err(EnrichmentError::NotConfigured);
        };

        self.coalescer
            .run(key.clone(), || self.fetch_and_store(source.as_ref(), &key))
            .await
    }

    async fn fetch_and_store(&self, source: &dyn EnrichmentSource, key: &str) -> EnrichmentResult {
        // A previous owner may have filled the entry since the first check.
        if let Some(payload) = self.cache.get(key) {
            return Ok(payload);
        }

        let payload = source.fetch(key).await?;
        if let Err(e) = self.cache.put(key, payload.clone()).await {
            tracing::warn!(key, error = %e, "Enrichment fetched but not persisted");
        }
        tracing::debug!(key, "Enrichment fetched");
        Ok(payload)
    }
}
