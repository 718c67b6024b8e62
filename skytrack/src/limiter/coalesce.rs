//! Request coalescing for duplicate lookups.
//!
//! When several callers ask for the same key while a lookup is already in
//! flight, only the first caller (the owner) does the work. Everyone else
//! subscribes to the owner's broadcast and receives a clone of its result.
//!
//! The in-flight entry is cleared exactly once: when the owner completes, or
//! when the owner's guard is dropped without completing (cancellation). In the
//! latter case waiters observe a closed channel and [`RequestCoalescer::run`]
//! promotes one of them to owner.
//!
//! # Implementation
//!
//! Uses `DashMap` for concurrent registration through the entry API, so the
//! check-then-insert is atomic. Statistics use atomic counters.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

type InFlightMap<K, V> = DashMap<K, broadcast::Sender<V>>;

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Total registrations
    pub total_requests: u64,
    /// Registrations that waited on existing work
    pub coalesced_requests: u64,
    /// Registrations that became owners
    pub new_requests: u64,
}

impl CoalescerStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

/// Tracks in-flight lookups keyed by `K`, sharing results of type `V`.
pub struct RequestCoalescer<K, V> {
    in_flight: Arc<InFlightMap<K, V>>,
    total_requests: AtomicU64,
    coalesced_requests: AtomicU64,
    new_requests: AtomicU64,
}

impl<K, V> RequestCoalescer<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            total_requests: AtomicU64::new(0),
            coalesced_requests: AtomicU64::new(0),
            new_requests: AtomicU64::new(0),
        }
    }

    /// Registers interest in `key`.
    ///
    /// Returns [`CoalesceResult::Owner`] for the first caller, who must do
    /// the work and call [`InFlightGuard::complete`]. Later callers get
    /// [`CoalesceResult::Waiter`] with a receiver for the owner's result.
    pub fn register(&self, key: K) -> CoalesceResult<K, V> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let rx = entry.get().subscribe();
                self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
                debug!(key = ?key, "Coalescing request onto in-flight lookup");
                CoalesceResult::Waiter(rx)
            }
            Entry::Vacant(entry) => {
                // Only one message is ever sent per channel.
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                self.new_requests.fetch_add(1, Ordering::Relaxed);
                debug!(key = ?key, "New in-flight lookup");
                CoalesceResult::Owner(InFlightGuard {
                    key,
                    sender: tx,
                    in_flight: Arc::clone(&self.in_flight),
                    finished: false,
                })
            }
        }
    }

    /// Runs `work` for `key` unless a lookup is already in flight, in which
    /// case the in-flight result is returned instead.
    ///
    /// If the owner is cancelled before completing, a waiter retries as the
    /// new owner, so `work` may be invoked by a different caller.
    pub async fn run<F, Fut>(&self, key: K, mut work: F) -> V
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = V>,
    {
        loop {
            match self.register(key.clone()) {
                CoalesceResult::Owner(guard) => {
                    let value = work().await;
                    guard.complete(value.clone());
                    return value;
                }
                CoalesceResult::Waiter(mut rx) => match rx.recv().await {
                    Ok(value) => return value,
                    Err(_) => {
                        debug!(key = ?key, "In-flight owner cancelled, retrying");
                        continue;
                    }
                },
            }
        }
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced_requests.load(Ordering::Relaxed),
            new_requests: self.new_requests.load(Ordering::Relaxed),
        }
    }

    /// Returns the number of keys currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_requests = stats.total_requests,
            coalesced = stats.coalesced_requests,
            new_requests = stats.new_requests,
            in_flight = self.in_flight_count(),
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "Request coalescing statistics"
        );
    }
}

impl<K, V> Default for RequestCoalescer<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Result of registering a key.
pub enum CoalesceResult<K: Eq + Hash, V> {
    /// First caller: do the work and complete the guard.
    Owner(InFlightGuard<K, V>),
    /// Another lookup is in flight: wait on this receiver.
    Waiter(broadcast::Receiver<V>),
}

impl<K: Eq + Hash, V> CoalesceResult<K, V> {
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner(_))
    }
}

/// Ownership of one in-flight lookup.
///
/// Clears the in-flight entry exactly once, on [`complete`](Self::complete)
/// or on drop.
pub struct InFlightGuard<K: Eq + Hash, V> {
    key: K,
    sender: broadcast::Sender<V>,
    in_flight: Arc<InFlightMap<K, V>>,
    finished: bool,
}

impl<K: Eq + Hash, V> InFlightGuard<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Number of callers currently waiting on this lookup.
    pub fn waiters(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Clears the entry and broadcasts `value` to every waiter.
    pub fn complete(mut self, value: V) {
        self.clear();
        let waiters = self.sender.receiver_count();
        // No receivers is fine
        let _ = self.sender.send(value);
        if waiters > 0 {
            debug!(waiters, "Broadcast result to coalesced waiters");
        }
    }

    fn clear(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let sender = &self.sender;
        self.in_flight
            .remove_if(&self.key, |_, current| current.same_channel(sender));
    }
}

impl<K: Eq + Hash, V> Drop for InFlightGuard<K, V> {
    fn drop(&mut self) {
        // Dropping the sender after this closes the channel for waiters.
        self.clear();
    }
}
