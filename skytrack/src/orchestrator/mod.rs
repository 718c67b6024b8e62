//! Fallback fetch orchestration.
//!
//! [`FallbackOrchestrator::resolve`] turns a flight identifier into one
//! telemetry sample by trying providers one at a time in health-ranked order:
//!
//! ```text
//! resolve(id)
//!   ├─ coalesce on id ─────────── waiters share the owner's result
//!   ├─ caller quota ───────────── over quota → RateLimited { retry_after }
//!   └─ for provider in ranked_order():
//!        ├─ provider quota ────── exhausted → skip
//!        ├─ fetch (with timeout)
//!        ├─ Ok(sample) ────────── record success, return (first success wins)
//!        └─ NotFound/Unavailable ─ record failure, next provider
//!      → AllProvidersExhausted
//! ```
//!
//! Individual provider failures never escape the orchestrator. Only
//! [`ResolveError::RateLimited`] and [`ResolveError::AllProvidersExhausted`]
//! reach callers.

mod fallback;

pub use fallback::{FallbackOrchestrator, ResolveError};

#[cfg(test)]
pub use fallback::tests::ScriptedProvider;
