//! The engine facade used by applications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStore, JsonFileStore, MemoryStore};
use crate::config::ConfigFile;
use crate::enrichment::{Enricher, EnrichmentError, EnrichmentSource, HttpEnrichmentSource};
use crate::health::ProviderHealth;
use crate::orchestrator::{FallbackOrchestrator, ResolveError};
use crate::provider::{AsyncReqwestClient, ProviderFactory};
use crate::session::{spawn_session, SessionConfig, SessionHandle};
use crate::telemetry::TelemetrySample;

use super::{EngineError, TrackingEngineBuilder};

/// Owns the shared registries and starts tracking sessions.
///
/// Construct one per process (or per test); nothing here is global.
pub struct TrackingEngine {
    orchestrator: Arc<FallbackOrchestrator>,
    enricher: Arc<Enricher>,
    session_defaults: SessionConfig,
    next_session: AtomicU64,
}

impl TrackingEngine {
    pub(super) fn new(
        orchestrator: Arc<FallbackOrchestrator>,
        enricher: Arc<Enricher>,
        session_defaults: SessionConfig,
    ) -> Self {
        Self {
            orchestrator,
            enricher,
            session_defaults,
            next_session: AtomicU64::new(1),
        }
    }

    pub fn builder() -> TrackingEngineBuilder {
        TrackingEngineBuilder::new()
    }

    /// Builds an engine backed by real HTTP providers from a config file.
    pub async fn from_config(config: &ConfigFile) -> Result<Self, EngineError> {
        let http_client = AsyncReqwestClient::new()?;
        let providers = ProviderFactory::new(http_client.clone()).create_all(&config.descriptors())?;

        let store: Arc<dyn CacheStore> = match &config.cache.path {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };

        let mut builder = TrackingEngineBuilder::new()
            .with_providers(providers)
            .with_tie_break_threshold(config.engine.tie_break_threshold)
            .with_caller_limit(config.rate_limit.to_config())
            .with_provider_limit(config.provider_limit.to_config())
            .with_cache_store(store)
            .with_cache_ttl(config.cache.ttl())
            .with_session_defaults(config.session_config());

        if let Some(url) = &config.enrichment.url {
            let source = HttpEnrichmentSource::new(
                url.clone(),
                Duration::from_millis(config.enrichment.timeout_ms),
                http_client,
            );
            builder = builder.with_enrichment_source(Arc::new(source));
        }

        builder.build().await
    }

    /// Starts tracking `flight` with the engine's default session settings.
    ///
    /// Must be called from within a tokio runtime.
    pub fn track(&self, flight: &str) -> Result<SessionHandle, EngineError> {
        self.track_with(flight, self.session_defaults.clone())
    }

    /// Starts tracking `flight` with explicit session settings.
    pub fn track_with(
        &self,
        flight: &str,
        config: SessionConfig,
    ) -> Result<SessionHandle, EngineError> {
        let flight = flight.trim();
        if flight.is_empty() {
            return Err(EngineError::EmptyIdentifier);
        }

        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let session_id = format!("session-{}", id);
        Ok(spawn_session(
            session_id,
            flight.to_string(),
            config,
            Arc::clone(&self.orchestrator),
        ))
    }

    /// One-shot resolution, charged against the identifier's own quota.
    pub async fn resolve(&self, flight: &str) -> Result<TelemetrySample, ResolveError> {
        self.orchestrator.resolve(flight).await
    }

    /// One-shot resolution charged against `caller`'s quota.
    pub async fn resolve_as(
        &self,
        caller: &str,
        flight: &str,
    ) -> Result<TelemetrySample, ResolveError> {
        self.orchestrator.resolve_as(caller, flight).await
    }

    /// Aircraft details for `flight`, from the cache when fresh.
    pub async fn enrich(&self, flight: &str) -> Result<serde_json::Value, EnrichmentError> {
        self.enricher.lookup(flight).await
    }

    /// Provider health in the order the next resolution will try them.
    pub fn health(&self) -> Vec<ProviderHealth> {
        self.orchestrator.health().ranked_snapshot()
    }

    pub fn session_defaults(&self) -> &SessionConfig {
        &self.session_defaults
    }

    pub fn orchestrator(&self) -> &Arc<FallbackOrchestrator> {
        &self.orchestrator
    }

    pub fn enricher(&self) -> &Arc<Enricher> {
        &self.enricher
    }

    /// Logs coalescing statistics at info level.
    pub fn log_stats(&self) {
        self.orchestrator.log_stats();
    }
}
