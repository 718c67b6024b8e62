//! Request admission: rate limiting and in-flight deduplication.
//!
//! # Architecture
//!
//! ```text
//! resolve("BAW123") ─┐
//!                    │
//! resolve("BAW123") ─┼──► RequestCoalescer ──► RateLimiter ──► providers
//!                    │        │ (one owner)     (owner only)
//! resolve("BAW123") ─┘        ▼
//!                       [all callers receive
//!                        the owner's result]
//! ```
//!
//! [`RateLimiter`] enforces both a burst cap per window and a minimum spacing
//! between requests for each key. [`RequestCoalescer`] collapses concurrent
//! lookups of the same key into one in-flight operation.

mod coalesce;
mod rate;

pub use coalesce::{CoalesceResult, CoalescerStats, InFlightGuard, RequestCoalescer};
pub use rate::{RateLimitConfig, RateLimitState, RateLimited, RateLimiter};
