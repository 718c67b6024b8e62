//! Health registry implementation.

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::provider::ProviderDescriptor;

/// Ratios closer than this are considered equivalent when ranking.
pub const DEFAULT_TIE_BREAK_THRESHOLD: f64 = 0.1;

/// Success ratio assumed for a provider with no recorded attempts.
const UNTRIED_RATIO: f64 = 0.5;

/// Outcome counters for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderHealth {
    pub name: String,
    pub priority: u32,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_used_at: Option<Instant>,
}

impl ProviderHealth {
    fn new(name: &str, priority: u32) -> Self {
        Self {
            name: name.to_string(),
            priority,
            success_count: 0,
            failure_count: 0,
            last_used_at: None,
        }
    }

    pub fn attempts(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// `success / attempts`, or `0.5` before the first attempt.
    pub fn success_ratio(&self) -> f64 {
        match self.attempts() {
            0 => UNTRIED_RATIO,
            n => self.success_count as f64 / n as f64,
        }
    }
}

/// Tracks per-provider outcomes and decides fetch order.
///
/// Entries are created at construction and never removed.
#[derive(Debug)]
pub struct HealthRegistry {
    entries: Mutex<Vec<ProviderHealth>>,
    tie_break_threshold: f64,
}

impl HealthRegistry {
    /// Creates a registry with one entry per descriptor.
    pub fn new(descriptors: &[ProviderDescriptor], tie_break_threshold: f64) -> Self {
        let mut entries: Vec<ProviderHealth> = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            if entries.iter().any(|e| e.name == d.name) {
                tracing::warn!(provider = %d.name, "Duplicate provider name ignored");
                continue;
            }
            entries.push(ProviderHealth::new(&d.name, d.priority));
        }

        Self {
            entries: Mutex::new(entries),
            tie_break_threshold: tie_break_threshold.max(0.0),
        }
    }

    pub fn tie_break_threshold(&self) -> f64 {
        self.tie_break_threshold
    }

    /// Records the outcome of an attempt now.
    ///
    /// Returns `false` when the provider is unknown.
    pub fn record_outcome(&self, name: &str, success: bool) -> bool {
        self.record_outcome_at(name, success, Instant::now())
    }

    /// Records the outcome of an attempt at an explicit instant.
    pub fn record_outcome_at(&self, name: &str, success: bool, at: Instant) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.iter_mut().find(|e| e.name == name) else {
            tracing::warn!(provider = name, "Outcome recorded for unknown provider");
            return false;
        };

        if success {
            entry.success_count += 1;
        } else {
            entry.failure_count += 1;
        }
        entry.last_used_at = Some(at);

        tracing::trace!(
            provider = name,
            success,
            ratio = entry.success_ratio(),
            "Recorded provider outcome"
        );
        true
    }

    /// Provider names in the order they should be tried.
    pub fn ranked_order(&self) -> Vec<String> {
        self.ranked_snapshot().into_iter().map(|h| h.name).collect()
    }

    /// Health entries in ranked order.
    pub fn ranked_snapshot(&self) -> Vec<ProviderHealth> {
        let entries = self.entries.lock().clone();

        // The tie-break band makes the preference relation non-transitive, so
        // a stable insertion pass is used instead of `sort_by`, which may
        // panic on inconsistent comparators.
        let mut ranked: Vec<ProviderHealth> = Vec::with_capacity(entries.len());
        for candidate in entries {
            let pos = ranked
                .iter()
                .position(|placed| self.prefer(&candidate, placed))
                .unwrap_or(ranked.len());
            ranked.insert(pos, candidate);
        }
        ranked
    }

    /// Health entries in registration order.
    pub fn snapshot(&self) -> Vec<ProviderHealth> {
        self.entries.lock().clone()
    }

    /// Health of one provider.
    pub fn get(&self, name: &str) -> Option<ProviderHealth> {
        self.entries.lock().iter().find(|e| e.name == name).cloned()
    }

    /// True when `a` should be tried before `b`.
    fn prefer(&self, a: &ProviderHealth, b: &ProviderHealth) -> bool {
        let (ra, rb) = (a.success_ratio(), b.success_ratio());
        if (ra - rb).abs() >= self.tie_break_threshold {
            return ra > rb;
        }

        // Never used counts as the oldest possible use.
        match (a.last_used_at, b.last_used_at) {
            (None, Some(_)) => return true,
            (Some(_), None) => return false,
            (Some(ta), Some(tb)) if ta != tb => return ta < tb,
            _ => {}
        }

        (a.priority, &a.name) < (b.priority, &b.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use std::time::Duration;

    fn registry(names: &[&str]) -> HealthRegistry {
        let descriptors: Vec<ProviderDescriptor> = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                ProviderDescriptor::new(*n, ProviderKind::AdsbExchange, "http://x")
                    .with_priority(i as u32)
            })
            .collect();
        HealthRegistry::new(&descriptors, DEFAULT_TIE_BREAK_THRESHOLD)
    }

    fn record_n(reg: &HealthRegistry, name: &str, successes: u32, failures: u32, at: Instant) {
        for _ in 0..successes {
            reg.record_outcome_at(name, true, at);
        }
        for _ in 0..failures {
            reg.record_outcome_at(name, false, at);
        }
    }

    #[test]
    fn test_untried_ratio_is_optimistic() {
        let reg = registry(&["a"]);
        assert_eq!(reg.get("a").unwrap().success_ratio(), 0.5);
    }

    #[test]
    fn test_record_outcome_updates_counters() {
        let reg = registry(&["a"]);
        let now = Instant::now();
        assert!(reg.record_outcome_at("a", true, now));
        assert!(reg.record_outcome_at("a", false, now));
        assert!(reg.record_outcome_at("a", true, now));

        let h = reg.get("a").unwrap();
        assert_eq!(h.success_count, 2);
        assert_eq!(h.failure_count, 1);
        assert_eq!(h.last_used_at, Some(now));
        assert!((h.success_ratio() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_provider_is_ignored() {
        let reg = registry(&["a"]);
        assert!(!reg.record_outcome("missing", true));
        assert_eq!(reg.snapshot().len(), 1);
    }

    #[test]
    fn test_duplicate_names_registered_once() {
        let reg = registry(&["a", "a", "b"]);
        assert_eq!(reg.snapshot().len(), 2);
    }

    #[test]
    fn test_higher_ratio_ranks_first() {
        let reg = registry(&["b", "a"]);
        let long_ago = Instant::now();
        record_n(&reg, "a", 9, 1, long_ago);
        record_n(&reg, "b", 1, 9, long_ago);

        assert_eq!(reg.ranked_order(), vec!["a", "b"]);
    }

    #[test]
    fn test_within_band_least_recently_used_first() {
        let reg = registry(&["a", "b"]);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(10);

        // a: 11/20 = 0.55 used recently, b: 10/20 = 0.50 used earlier
        record_n(&reg, "a", 11, 9, t1);
        record_n(&reg, "b", 10, 10, t0);

        assert_eq!(reg.ranked_order(), vec!["b", "a"]);
    }

    #[test]
    fn test_outside_band_ratio_wins_over_recency() {
        let reg = registry(&["a", "b"]);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(10);

        record_n(&reg, "a", 8, 2, t1);
        record_n(&reg, "b", 5, 5, t0);

        assert_eq!(reg.ranked_order(), vec!["a", "b"]);
    }

    #[test]
    fn test_never_used_is_oldest() {
        let reg = registry(&["a", "b"]);
        // a tried once successfully then once failed -> 0.5, same as untried b
        let now = Instant::now();
        record_n(&reg, "a", 1, 1, now);

        assert_eq!(reg.ranked_order(), vec!["b", "a"]);
    }

    #[test]
    fn test_fresh_registry_uses_priority() {
        let reg = registry(&["first", "second", "third"]);
        assert_eq!(reg.ranked_order(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_configurable_threshold() {
        let descriptors = vec![
            ProviderDescriptor::new("a", ProviderKind::OpenSky, "http://x"),
            ProviderDescriptor::new("b", ProviderKind::OpenSky, "http://x"),
        ];
        let reg = HealthRegistry::new(&descriptors, 0.0);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(10);
        record_n(&reg, "a", 11, 9, t1);
        record_n(&reg, "b", 10, 10, t0);

        // With no band, the small ratio lead decides.
        assert_eq!(reg.ranked_order(), vec!["a", "b"]);
    }

    #[test]
    fn test_failing_provider_recovers() {
        let reg = registry(&["a", "b"]);
        let t0 = Instant::now();
        record_n(&reg, "a", 0, 5, t0);
        record_n(&reg, "b", 5, 0, t0);
        assert_eq!(reg.ranked_order(), vec!["b", "a"]);

        // a: 20/25 = 0.8, b degrades to 5/10 = 0.5
        let t1 = t0 + Duration::from_secs(1);
        record_n(&reg, "a", 20, 0, t1);
        record_n(&reg, "b", 0, 5, t1);
        assert_eq!(reg.ranked_order(), vec!["a", "b"]);
    }
}
