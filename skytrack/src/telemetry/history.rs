//! Bounded position history for trail rendering.
//!
//! # Design
//!
//! - Ring buffer of the most recent samples, oldest first
//! - Overflow silently drops the oldest entry
//! - Holds both live and derived samples in emission order

use std::collections::VecDeque;

use super::TelemetrySample;

/// Default number of samples retained per session.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// The most recent samples of a tracking session.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    samples: VecDeque<TelemetrySample>,
    capacity: usize,
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionHistory {
    /// Creates a history holding [`DEFAULT_HISTORY_CAPACITY`] samples.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Creates a history with a custom capacity (at least one sample).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, dropping the oldest one on overflow.
    pub fn push(&mut self, sample: TelemetrySample) {
        self.samples.push_back(sample);

        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Iterates samples oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TelemetrySample> {
        self.samples.iter()
    }

    /// Copies the samples out, oldest first.
    pub fn to_vec(&self) -> Vec<TelemetrySample> {
        self.samples.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn sample(lat: f64, lon: f64) -> TelemetrySample {
        let ts: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        TelemetrySample::live("test", lat, lon, 0.0, 0.0, 0.0, ts).unwrap()
    }

    #[test]
    fn test_default_capacity() {
        let history = PositionHistory::new();
        assert_eq!(history.capacity(), 100);
        assert!(history.is_empty());
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let mut history = PositionHistory::with_capacity(0);
        history.push(sample(0.0, 0.0));
        history.push(sample(1.0, 0.0));
        assert_eq!(history.len(), 1);
        assert_eq!(history.to_vec()[0].latitude(), 1.0);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut history = PositionHistory::with_capacity(3);
        for i in 0..5 {
            history.push(sample(i as f64, 0.0));
        }

        assert_eq!(history.len(), 3);
        let lats: Vec<f64> = history.iter().map(|s| s.latitude()).collect();
        assert_eq!(lats, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_capped_at_default_after_many_pushes() {
        let mut history = PositionHistory::new();
        for i in 0..250 {
            history.push(sample((i % 90) as f64, 0.0));
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
    }
}
