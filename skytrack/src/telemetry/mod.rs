//! Normalized aircraft telemetry.
//!
//! Every provider payload is translated into a [`TelemetrySample`], the one
//! schema the rest of the engine understands. Samples produced by dead
//! reckoning carry [`SampleSource::Derived`] so consumers can tell real fixes
//! from interpolated ones.
//!
//! [`PositionHistory`] keeps the most recent samples of a session for trail
//! rendering.

mod history;
mod sample;

pub use history::{PositionHistory, DEFAULT_HISTORY_CAPACITY};
pub use sample::{SampleSource, TelemetrySample};
