//! Persisted TTL cache for enrichment results.
//!
//! Enrichment lookups (aircraft type, route, operator) are expensive and change
//! rarely, so their results are cached with a time-to-live and persisted to a
//! backing [`CacheStore`] after every write. On startup the whole store is
//! loaded into memory once.
//!
//! # Expiry
//!
//! An entry is valid while `now - timestamp < ttl`. Expired entries are not
//! evicted; they read as misses and get overwritten by the next successful
//! fetch.
//!
//! # Persistence Format
//!
//! [`JsonFileStore`] writes a flat JSON object keyed by cache key:
//!
//! ```text
//! {
//!   "BAW123": { "payload": { ... }, "timestamp": 1700000000000, "ttl_ms": 3600000 }
//! }
//! ```
//!
//! Writes go to a temporary file followed by an atomic rename, so a crash
//! mid-write leaves the previous document intact.

mod enrichment;
mod store;

pub use enrichment::{CacheEntry, EnrichmentCache, DEFAULT_CACHE_TTL};
pub use store::{CacheError, CacheStore, JsonFileStore, MemoryStore};
