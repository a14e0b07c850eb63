//! Mob AI Throttler Library
//!
//! Bounds the per-tick cost of entity AI on a tick-driven game server by
//! admitting only a subset of the intercepted per-entity updates each tick.
//!
//! - [`throttle`] - per-entity cooldowns, per-tick quota with a reserved
//!   priority lane, expiry sweep and push limiting
//! - [`host`] - the controller a host plugin owns and its callbacks
//! - [`sim`] - a synthetic host world for driving the controller

pub mod config;
pub mod host;
pub mod metrics;
pub mod sim;
pub mod throttle;
pub mod util;

pub use config::ThrottleConfig;
pub use host::{HostEntity, Optimizer, SharedOptimizer};
pub use metrics::ThrottleStats;

/// Logger channel of every event emitted by this crate
pub const LOG_TARGET: &str = "MobAIOptimizer";
