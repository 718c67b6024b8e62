//! Provider health tracking and fetch ordering.
//!
//! The registry records the outcome of every provider attempt and ranks
//! providers for the next resolution:
//!
//! 1. Higher success ratio first. Providers never tried count as `0.5`.
//! 2. When two ratios are within the tie-break threshold, the provider used
//!    least recently goes first, so load is spread and recovering providers
//!    get re-probed.
//! 3. Remaining ties fall back to descriptor priority, then name.
//!
//! A provider that got lucky once cannot monopolize traffic, and a degraded
//! one can earn its reputation back.

mod registry;

pub use registry::{HealthRegistry, ProviderHealth, DEFAULT_TIE_BREAK_THRESHOLD};
