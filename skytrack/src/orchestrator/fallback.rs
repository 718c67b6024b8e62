//! Health-ranked provider fallback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::health::HealthRegistry;
use crate::limiter::{CoalescerStats, RateLimiter, RequestCoalescer};
use crate::provider::{ProviderDescriptor, ProviderError, TelemetryProvider};
use crate::telemetry::TelemetrySample;

/// Outcome of a failed resolution, as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The caller is over quota, or every provider is. Not retried automatically.
    #[error("rate limited, retry after {}ms", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    /// Every provider was tried and none produced a sample.
    #[error("all providers exhausted ({} attempted)", .failures.len())]
    AllProvidersExhausted { failures: Vec<ProviderError> },
}

type ResolveResult = Result<TelemetrySample, ResolveError>;

/// Resolves flight identifiers against a ranked list of providers.
pub struct FallbackOrchestrator {
    providers: HashMap<String, Arc<dyn TelemetryProvider>>,
    health: Arc<HealthRegistry>,
    caller_limiter: Arc<RateLimiter>,
    provider_limiter: Arc<RateLimiter>,
    coalescer: RequestCoalescer<String, ResolveResult>,
}

impl FallbackOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn TelemetryProvider>>,
        health: Arc<HealthRegistry>,
        caller_limiter: Arc<RateLimiter>,
        provider_limiter: Arc<RateLimiter>,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();

        Self {
            providers,
            health,
            caller_limiter,
            provider_limiter,
            coalescer: RequestCoalescer::new(),
        }
    }

    /// Resolves `identifier`, charging the quota keyed by the identifier itself.
    pub async fn resolve(&self, identifier: &str) -> ResolveResult {
        self.resolve_as(identifier, identifier).await
    }

    /// Resolves `identifier` on behalf of `caller`.
    ///
    /// Concurrent resolutions of the same identifier share one in-flight
    /// lookup; only the caller that owns it is charged against its quota.
    pub async fn resolve_as(&self, caller: &str, identifier: &str) -> ResolveResult {
        let key = identifier.trim().to_ascii_uppercase();
        self.coalescer
            .run(key, || self.resolve_owned(caller, identifier))
            .await
    }

    async fn resolve_owned(&self, caller: &str, identifier: &str) -> ResolveResult {
        if let Err(limited) = self.caller_limiter.check(caller) {
            tracing::info!(
                caller,
                identifier,
                retry_after_ms = limited.retry_after.as_millis() as u64,
                "Resolution rate limited"
            );
            return Err(ResolveError::RateLimited {
                retry_after: limited.retry_after,
            });
        }

        let mut failures = Vec::new();
        let mut soonest_retry: Option<Duration> = None;

        for name in self.health.ranked_order() {
            let Some(provider) = self.providers.get(&name) else {
                continue;
            };

            if let Err(limited) = self.provider_limiter.check(&name) {
                tracing::debug!(
                    provider = %name,
                    retry_after_ms = limited.retry_after.as_millis() as u64,
                    "Skipping provider over quota"
                );
                soonest_retry = Some(
                    soonest_retry.map_or(limited.retry_after, |d| d.min(limited.retry_after)),
                );
                continue;
            }

            match fetch_with_timeout(provider.as_ref(), identifier).await {
                Ok(sample) => {
                    self.health.record_outcome(&name, true);
                    tracing::debug!(provider = %name, identifier, "Resolved flight");
                    return Ok(sample);
                }
                Err(e) => {
                    self.health.record_outcome(&name, false);
                    match &e {
                        ProviderError::NotFound { .. } => {
                            tracing::debug!(provider = %name, identifier, "No data from provider")
                        }
                        _ => tracing::warn!(provider = %name, identifier, error = %e, "Provider failed"),
                    }
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            if let Some(retry_after) = soonest_retry {
                return Err(ResolveError::RateLimited { retry_after });
            }
        }

        tracing::warn!(
            identifier,
            attempted = failures.len(),
            "All providers exhausted"
        );
        Err(ResolveError::AllProvidersExhausted { failures })
    }

    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    /// Limiter charged per caller key.
    pub fn caller_limiter(&self) -> &Arc<RateLimiter> {
        &self.caller_limiter
    }

    /// Descriptors of every registered provider.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers
            .values()
            .map(|p| p.descriptor().clone())
            .collect()
    }

    pub fn coalescer_stats(&self) -> CoalescerStats {
        self.coalescer.stats()
    }

    pub fn log_stats(&self) {
        self.coalescer.log_stats();
    }
}

/// Calls the provider under its own timeout. Elapsed means unavailable.
async fn fetch_with_timeout(
    provider: &dyn TelemetryProvider,
    identifier: &str,
) -> Result<TelemetrySample, ProviderError> {
    let timeout = provider.descriptor().timeout;
    match tokio::time::timeout(timeout, provider.fetch(identifier)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::unavailable(
            provider.name(),
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    }
}
