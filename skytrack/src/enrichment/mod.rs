//! Flight enrichment lookups.
//!
//! Enrichment data (aircraft type, registration, route) comes from slow,
//! quota-limited sources and changes rarely. [`Enricher`] answers from the
//! [`EnrichmentCache`](crate::cache::EnrichmentCache) when it can, and
//! otherwise performs a single coalesced fetch per identifier and caches the
//! result.

mod enricher;
mod source;

pub use enricher::Enricher;
pub use source::{EnrichmentError, EnrichmentSource, HttpEnrichmentSource, IDENT_PLACEHOLDER};
