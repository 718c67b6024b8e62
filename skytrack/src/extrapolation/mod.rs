//! Dead-reckoning between real telemetry samples.
//!
//! Providers answer every few seconds at best. Between answers the
//! [`Extrapolator`] projects the last real sample (the anchor) forward along
//! its heading at its ground speed, so consumers see continuous motion.
//!
//! # State Machine
//!
//! ```text
//! Idle ──set_anchor──► Anchored ──tick (fast, fresh)──► Extrapolating
//!                        ▲  ▲                              │
//!                        │  └──── tick (slow) ─────────────┤
//!                        │                                 ▼
//!                        └──────── set_anchor ─────── Suspended (stale)
//! ```
//!
//! - Aircraft at or below `min_speed_kt` are not extrapolated.
//! - Past the staleness ceiling (a multiple of the poll interval) output is
//!   suspended until a new anchor arrives.
//! - Derived samples are emitted but never replace the anchor.

mod extrapolator;

pub use extrapolator::{
    ExtrapolationConfig, ExtrapolationState, Extrapolator, DEFAULT_MIN_SPEED_KT,
    DEFAULT_STALENESS_FACTOR,
};
