//! Typed settings mirroring the sections of `config.ini`.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::extrapolation::{DEFAULT_MIN_SPEED_KT, DEFAULT_STALENESS_FACTOR};
use crate::health::DEFAULT_TIE_BREAK_THRESHOLD;
use crate::limiter::RateLimitConfig;
use crate::provider::{ProviderDescriptor, ProviderKind, DEFAULT_PROVIDER_TIMEOUT};
use crate::session::{
    BackoffPolicy, SessionConfig, DEFAULT_ANIMATION_TICK, DEFAULT_POLL_INTERVAL,
};
use crate::telemetry::DEFAULT_HISTORY_CAPACITY;

/// Default timeout for enrichment fetches, in milliseconds.
pub const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 5000;

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    /// Quota charged per caller.
    pub rate_limit: RateLimitSettings,
    /// Quota charged per provider.
    pub provider_limit: RateLimitSettings,
    pub cache: CacheSettings,
    pub enrichment: EnrichmentSettings,
    /// Providers in file order. Empty sections fall back to [`default_providers`].
    pub providers: Vec<ProviderSettings>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            rate_limit: RateLimitSettings::caller_default(),
            provider_limit: RateLimitSettings::provider_default(),
            cache: CacheSettings::default(),
            enrichment: EnrichmentSettings::default(),
            providers: default_providers(),
        }
    }
}

impl ConfigFile {
    /// Session defaults derived from `[engine]`.
    pub fn session_config(&self) -> SessionConfig {
        let engine = &self.engine;
        SessionConfig {
            poll_interval: Duration::from_secs(engine.poll_interval_secs),
            animation_tick: Duration::from_millis(engine.animation_tick_ms),
            min_speed_kt: engine.min_speed_kt,
            staleness_factor: engine.staleness_factor,
            history_capacity: engine.history_capacity,
            backoff: BackoffPolicy::new(
                Duration::from_secs(engine.backoff_base_secs),
                Duration::from_secs(engine.backoff_max_secs),
            ),
            caller_key: None,
        }
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers.iter().map(ProviderSettings::descriptor).collect()
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub poll_interval_secs: u64,
    pub animation_tick_ms: u64,
    pub min_speed_kt: f64,
    pub staleness_factor: f64,
    pub tie_break_threshold: f64,
    pub history_capacity: usize,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let backoff = BackoffPolicy::default();
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            animation_tick_ms: DEFAULT_ANIMATION_TICK.as_millis() as u64,
            min_speed_kt: DEFAULT_MIN_SPEED_KT,
            staleness_factor: DEFAULT_STALENESS_FACTOR,
            tie_break_threshold: DEFAULT_TIE_BREAK_THRESHOLD,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            backoff_base_secs: backoff.base.as_secs(),
            backoff_max_secs: backoff.max.as_secs(),
        }
    }
}

/// `[rate_limit]` and `[provider_limit]` sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub max_per_window: u32,
    pub window_secs: u64,
    pub min_interval_ms: u64,
}

impl RateLimitSettings {
    pub fn caller_default() -> Self {
        let config = RateLimitConfig::default();
        Self {
            max_per_window: config.max_per_window,
            window_secs: config.window.as_secs(),
            min_interval_ms: config.min_interval.as_millis() as u64,
        }
    }

    pub fn provider_default() -> Self {
        Self {
            max_per_window: 60,
            window_secs: 60,
            min_interval_ms: 0,
        }
    }

    pub fn to_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(
            self.max_per_window,
            Duration::from_secs(self.window_secs),
            Duration::from_millis(self.min_interval_ms),
        )
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Persistence file. `None` keeps the cache in memory only.
    pub path: Option<PathBuf>,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: Some(super::file::config_directory().join("enrichment.json")),
            ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// `[enrichment]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentSettings {
    /// URL template containing `{ident}`. `None` disables enrichment.
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: DEFAULT_ENRICHMENT_TIMEOUT_MS,
        }
    }
}

/// One `[provider.<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub name: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub timeout_ms: u64,
    pub priority: u32,
    pub api_key: Option<String>,
}

impl ProviderSettings {
    pub fn new(name: &str, kind: ProviderKind, base_url: &str, priority: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            base_url: base_url.to_string(),
            timeout_ms: DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64,
            priority,
            api_key: None,
        }
    }

    pub fn descriptor(&self) -> ProviderDescriptor {
        let descriptor = ProviderDescriptor::new(&self.name, self.kind, &self.base_url)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_priority(self.priority);
        match &self.api_key {
            Some(key) => descriptor.with_api_key(key),
            None => descriptor,
        }
    }
}

/// Free ADS-B feeds used when the file names no providers.
pub fn default_providers() -> Vec<ProviderSettings> {
    vec![
        ProviderSettings::new("adsb_lol", ProviderKind::AdsbExchange, "https://api.adsb.lol", 1),
        ProviderSettings::new(
            "adsb_fi",
            ProviderKind::AdsbExchange,
            "https://opendata.adsb.fi/api",
            2,
        ),
        ProviderSettings::new(
            "opensky",
            ProviderKind::OpenSky,
            "https://opensky-network.org/api",
            3,
        ),
    ]
}
