//! INI parsing: the single place where key names map to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::{ConfigFile, ProviderSettings, RateLimitSettings};
use crate::provider::ProviderKind;

const PROVIDER_SECTION_PREFIX: &str = "provider.";

/// Parses an `Ini` into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [engine] section
    if let Some(section) = ini.section(Some("engine")) {
        let engine = &mut config.engine;
        if let Some(v) = section.get("poll_interval_secs") {
            engine.poll_interval_secs = parse_positive("engine", "poll_interval_secs", v)?;
        }
        if let Some(v) = section.get("animation_tick_ms") {
            engine.animation_tick_ms = parse_positive("engine", "animation_tick_ms", v)?;
        }
        if let Some(v) = section.get("min_speed_kt") {
            let speed: f64 = parse_value("engine", "min_speed_kt", v, "must be a number (knots)")?;
            if !speed.is_finite() || speed < 0.0 {
                return Err(invalid("engine", "min_speed_kt", v, "must be zero or positive"));
            }
            engine.min_speed_kt = speed;
        }
        if let Some(v) = section.get("staleness_factor") {
            let factor: f64 = parse_value("engine", "staleness_factor", v, "must be a number")?;
            if !factor.is_finite() || factor <= 0.0 {
                return Err(invalid("engine", "staleness_factor", v, "must be greater than zero"));
            }
            engine.staleness_factor = factor;
        }
        if let Some(v) = section.get("tie_break_threshold") {
            let threshold: f64 =
                parse_value("engine", "tie_break_threshold", v, "must be a number")?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(invalid(
                    "engine",
                    "tie_break_threshold",
                    v,
                    "must be between 0.0 and 1.0",
                ));
            }
            engine.tie_break_threshold = threshold;
        }
        if let Some(v) = section.get("history_capacity") {
            engine.history_capacity = parse_positive("engine", "history_capacity", v)?;
        }
        if let Some(v) = section.get("backoff_base_secs") {
            engine.backoff_base_secs = parse_positive("engine", "backoff_base_secs", v)?;
        }
        if let Some(v) = section.get("backoff_max_secs") {
            engine.backoff_max_secs = parse_positive("engine", "backoff_max_secs", v)?;
        }
        if engine.backoff_max_secs < engine.backoff_base_secs {
            return Err(invalid(
                "engine",
                "backoff_max_secs",
                &engine.backoff_max_secs.to_string(),
                "must not be less than backoff_base_secs",
            ));
        }
    }

    // [rate_limit] and [provider_limit] sections
    if let Some(section) = ini.section(Some("rate_limit")) {
        parse_rate_limit("rate_limit", section, &mut config.rate_limit)?;
    }
    if let Some(section) = ini.section(Some("provider_limit")) {
        parse_rate_limit("provider_limit", section, &mut config.provider_limit)?;
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            config.cache.path = if v.is_empty() {
                None
            } else {
                Some(expand_tilde(v))
            };
        }
        if let Some(v) = section.get("ttl_secs") {
            config.cache.ttl_secs = parse_positive("cache", "ttl_secs", v)?;
        }
    }

    // [enrichment] section
    if let Some(section) = ini.section(Some("enrichment")) {
        if let Some(v) = section.get("url") {
            let v = v.trim();
            config.enrichment.url = if v.is_empty() {
                None
            } else if !v.contains(crate::enrichment::IDENT_PLACEHOLDER) {
                return Err(invalid(
                    "enrichment",
                    "url",
                    v,
                    "must contain the {ident} placeholder",
                ));
            } else {
                Some(v.to_string())
            };
        }
        if let Some(v) = section.get("timeout_ms") {
            config.enrichment.timeout_ms = parse_positive("enrichment", "timeout_ms", v)?;
        }
    }

    // [provider.<name>] sections, in file order
    let mut providers = Vec::new();
    for (name, section) in ini.iter() {
        let Some(provider_name) = name.and_then(|n| n.strip_prefix(PROVIDER_SECTION_PREFIX)) else {
            continue;
        };
        providers.push(parse_provider(provider_name.trim(), section)?);
    }
    if !providers.is_empty() {
        config.providers = providers;
    }

    Ok(config)
}

fn parse_rate_limit(
    section_name: &str,
    section: &Properties,
    settings: &mut RateLimitSettings,
) -> Result<(), ConfigFileError> {
    if let Some(v) = section.get("max_per_window") {
        settings.max_per_window = parse_positive(section_name, "max_per_window", v)?;
    }
    if let Some(v) = section.get("window_secs") {
        settings.window_secs = parse_positive(section_name, "window_secs", v)?;
    }
    if let Some(v) = section.get("min_interval_ms") {
        settings.min_interval_ms = parse_value(
            section_name,
            "min_interval_ms",
            v,
            "must be a non-negative integer (milliseconds)",
        )?;
    }
    Ok(())
}

fn parse_provider(name: &str, section: &Properties) -> Result<ProviderSettings, ConfigFileError> {
    let section_name = format!("{}{}", PROVIDER_SECTION_PREFIX, name);
    if name.is_empty() {
        return Err(invalid(&section_name, "name", name, "provider name must not be empty"));
    }

    let kind_value = section.get("kind").unwrap_or_default();
    let kind = ProviderKind::from_str(kind_value).map_err(|_| {
        invalid(
            &section_name,
            "kind",
            kind_value,
            "must be one of: adsb, opensky, aviationstack",
        )
    })?;

    let base_url = section.get("base_url").map(str::trim).unwrap_or_default();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(
            &section_name,
            "base_url",
            base_url,
            "must be an http:// or https:// URL",
        ));
    }

    let mut provider = ProviderSettings::new(name, kind, base_url, 0);
    if let Some(v) = section.get("timeout_ms") {
        provider.timeout_ms = parse_positive(&section_name, "timeout_ms", v)?;
    }
    if let Some(v) = section.get("priority") {
        provider.priority =
            parse_value(&section_name, "priority", v, "must be a non-negative integer")?;
    }
    if let Some(v) = section.get("api_key") {
        let v = v.trim();
        if !v.is_empty() {
            provider.api_key = Some(v.to_string());
        }
    }

    if kind == ProviderKind::AviationStack && provider.api_key.is_none() {
        return Err(invalid(
            &section_name,
            "api_key",
            "",
            "required for aviationstack providers",
        ));
    }

    Ok(provider)
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed: T = parse_value(section, key, value, "must be a positive integer")?;
    if parsed <= T::default() {
        return Err(invalid(section, key, value, "must be a positive integer"));
    }
    Ok(parsed)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expands a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
