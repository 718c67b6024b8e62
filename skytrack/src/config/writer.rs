//! INI serialization: the commented file written by `skytrack init`.

use std::fmt::Write;

use super::settings::{ConfigFile, RateLimitSettings};

/// Converts a `ConfigFile` to a commented INI string.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let engine = &config.engine;
    let cache_path = config
        .cache
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let enrichment_url = config.enrichment.url.as_deref().unwrap_or("");

    let mut out = format!(
        r#"[engine]
; Seconds between position lookups for a tracked flight
poll_interval_secs = {}
; Milliseconds between extrapolated position updates
animation_tick_ms = {}
; Aircraft at or below this ground speed (knots) are not extrapolated
min_speed_kt = {}
; Extrapolation stops after staleness_factor * poll_interval without fresh data
staleness_factor = {}
; Success ratios closer than this are treated as equal when ranking providers
tie_break_threshold = {}
; Positions kept per session for trail rendering
history_capacity = {}
; Reconnect backoff: base * 2^(failures - 1), capped at max
backoff_base_secs = {}
backoff_max_secs = {}

{}
{}
[cache]
; Enrichment cache file (leave empty to keep the cache in memory only)
path = {}
; Seconds an enrichment entry stays valid
ttl_secs = {}

[enrichment]
; Aircraft details endpoint; {{ident}} is replaced with the flight identifier.
; Leave empty to disable enrichment.
url = {}
timeout_ms = {}
"#,
        engine.poll_interval_secs,
        engine.animation_tick_ms,
        engine.min_speed_kt,
        engine.staleness_factor,
        engine.tie_break_threshold,
        engine.history_capacity,
        engine.backoff_base_secs,
        engine.backoff_max_secs,
        rate_limit_section(
            "rate_limit",
            "Lookups allowed per caller (one tracking session is one caller)",
            &config.rate_limit,
        ),
        rate_limit_section(
            "provider_limit",
            "Requests allowed per upstream provider",
            &config.provider_limit,
        ),
        cache_path,
        config.cache.ttl_secs,
        enrichment_url,
        config.enrichment.timeout_ms,
    );

    out.push_str(
        r#"
; Telemetry providers, tried in order of health then priority (lower first).
;   kind = adsb          - ADS-B Exchange v2 compatible feeds (adsb.lol, adsb.fi, airplanes.live)
;   kind = opensky       - OpenSky Network state vectors (api_key is sent as a bearer token)
;   kind = aviationstack - AviationStack flights API (api_key required)
"#,
    );
    for provider in &config.providers {
        // Writing to a String cannot fail
        let _ = write!(
            out,
            r#"
[provider.{}]
kind = {}
base_url = {}
timeout_ms = {}
priority = {}
api_key = {}
"#,
            provider.name,
            provider.kind,
            provider.base_url,
            provider.timeout_ms,
            provider.priority,
            provider.api_key.as_deref().unwrap_or(""),
        );
    }

    out
}

fn rate_limit_section(name: &str, comment: &str, settings: &RateLimitSettings) -> String {
    format!(
        r#"[{}]
; {}
max_per_window = {}
window_secs = {}
; Minimum milliseconds between two requests
min_interval_ms = {}
"#,
        name, comment, settings.max_per_window, settings.window_secs, settings.min_interval_ms
    )
}
