//! Builder for [`TrackingEngine`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStore, EnrichmentCache, MemoryStore, DEFAULT_CACHE_TTL};
use crate::enrichment::{Enricher, EnrichmentSource};
use crate::health::{HealthRegistry, DEFAULT_TIE_BREAK_THRESHOLD};
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::orchestrator::FallbackOrchestrator;
use crate::provider::TelemetryProvider;
use crate::session::SessionConfig;

use super::{EngineError, TrackingEngine};

/// Assembles a [`TrackingEngine`] from injected parts.
///
/// Only providers are required. Everything else defaults:
///
/// | Part | Default |
/// |------|---------|
/// | Tie-break threshold | 0.1 |
/// | Caller quota | 30 per 60s, 1s apart |
/// | Provider quota | unlimited |
/// | Cache store | in memory |
/// | Cache TTL | 1 hour |
/// | Enrichment source | none |
pub struct TrackingEngineBuilder {
    providers: Vec<Arc<dyn TelemetryProvider>>,
    tie_break_threshold: f64,
    caller_limit: RateLimitConfig,
    provider_limit: RateLimitConfig,
    cache_store: Option<Arc<dyn CacheStore>>,
    cache_ttl: Duration,
    enrichment_source: Option<Arc<dyn EnrichmentSource>>,
    session_defaults: SessionConfig,
}

impl Default for TrackingEngineBuilder {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            tie_break_threshold: DEFAULT_TIE_BREAK_THRESHOLD,
            caller_limit: RateLimitConfig::default(),
            provider_limit: RateLimitConfig::unlimited(),
            cache_store: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            enrichment_source: None,
            session_defaults: SessionConfig::default(),
        }
    }
}

impl TrackingEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn TelemetryProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_providers(
        mut self,
        providers: impl IntoIterator<Item = Arc<dyn TelemetryProvider>>,
    ) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn with_tie_break_threshold(mut self, threshold: f64) -> Self {
        self.tie_break_threshold = threshold;
        self
    }

    /// Quota charged per caller key (a session's id unless overridden).
    pub fn with_caller_limit(mut self, config: RateLimitConfig) -> Self {
        self.caller_limit = config;
        self
    }

    /// Quota charged per provider name.
    pub fn with_provider_limit(mut self, config: RateLimitConfig) -> Self {
        self.provider_limit = config;
        self
    }

    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_enrichment_source(mut self, source: Arc<dyn EnrichmentSource>) -> Self {
        self.enrichment_source = Some(source);
        self
    }

    /// Session settings used by [`TrackingEngine::track`].
    pub fn with_session_defaults(mut self, config: SessionConfig) -> Self {
        self.session_defaults = config;
        self
    }

    /// Loads the cache store and wires every component.
    pub async fn build(self) -> Result<TrackingEngine, EngineError> {
        if self.providers.is_empty() {
            return Err(EngineError::NoProviders);
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name().to_string()) {
                return Err(EngineError::DuplicateProvider(provider.name().to_string()));
            }
        }

        let descriptors: Vec<_> = self
            .providers
            .iter()
            .map(|p| p.descriptor().clone())
            .collect();
        let health = Arc::new(HealthRegistry::new(&descriptors, self.tie_break_threshold));

        let orchestrator = Arc::new(FallbackOrchestrator::new(
            self.providers,
            health,
            Arc::new(RateLimiter::new(self.caller_limit)),
            Arc::new(RateLimiter::new(self.provider_limit)),
        ));

        let store = self
            .cache_store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn CacheStore>);
        let cache = Arc::new(EnrichmentCache::open(store, self.cache_ttl).await?);
        let enricher = Arc::new(Enricher::new(cache, self.enrichment_source));

        tracing::info!(
            providers = descriptors.len(),
            enrichment = enricher.is_configured(),
            "Tracking engine ready"
        );

        Ok(TrackingEngine::new(
            orchestrator,
            enricher,
            self.session_defaults,
        ))
    }
}
