//! The tracking engine: one explicitly constructed owner for every shared
//! registry.
//!
//! # Architecture
//!
//! The engine owns and wires:
//! - **Providers** - adapters behind `Arc<dyn TelemetryProvider>`
//! - **Health registry** - ranks providers for every resolution
//! - **Rate limiters** - one keyed by caller, one keyed by provider
//! - **Fallback orchestrator** - coalesced, health-ranked resolution
//! - **Enricher** - cache-first aircraft details over a persisted TTL cache
//!
//! Sessions started with [`TrackingEngine::track`] share the registries but
//! own their anchor, extrapolator and reconnect state.
//!
//! # Example
//!
//! ```ignore
//! use skytrack::config::ConfigFile;
//! use skytrack::engine::TrackingEngine;
//!
//! let engine = TrackingEngine::from_config(&ConfigFile::load()?).await?;
//! let session = engine.track("BAW123")?;
//!
//! let mut updates = session.subscribe();
//! while let Some(sample) = updates.recv().await {
//!     println!("{:.4},{:.4}", sample.latitude(), sample.longitude());
//! }
//! session.stop().await;
//! ```

mod builder;
mod error;
mod tracking;

pub use builder::TrackingEngineBuilder;
pub use error::EngineError;
pub use tracking::TrackingEngine;
