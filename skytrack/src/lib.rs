//! SkyTrack - Live flight tracking over unreliable telemetry providers
//!
//! This library aggregates aircraft positions from several third-party feeds,
//! ranks the feeds by observed health, and turns sparse real samples into a
//! continuously updated position through dead reckoning.
//!
//! The entry point is [`engine::TrackingEngine`].

pub mod cache;
pub mod config;
pub mod engine;
pub mod enrichment;
pub mod extrapolation;
pub mod geo;
pub mod health;
pub mod limiter;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod telemetry;

pub use engine::{EngineError, TrackingEngine};
pub use session::{ConnectionStatus, SessionHandle};
pub use telemetry::TelemetrySample;
