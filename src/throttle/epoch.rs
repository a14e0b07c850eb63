//! Tick-boundary bookkeeping
//!
//! Detects the first intercepted call of a new tick, resets the per-tick
//! admission counter and decides whether the periodic actions are due.

use crate::config::ThrottleConfig;

/// Periodic actions due at a rollover
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rollover {
    /// Run the expiry sweep
    pub cleanup: bool,
    /// Emit the debug stats line
    pub debug: bool,
}

/// Process-wide tick epoch
#[derive(Debug, Clone, Default)]
pub struct TickEpoch {
    last_tick_id: u64,
    processed_this_tick: u32,
    last_cleanup_tick: u64,
    last_debug_tick: u64,
}

impl TickEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `current_tick`
    ///
    /// Returns `None` when the tick was already observed. Otherwise the epoch
    /// is moved to the new tick and the due actions are returned, with their
    /// timestamps already advanced.
    pub fn observe(&mut self, current_tick: u64, config: &ThrottleConfig) -> Option<Rollover> {
        if current_tick == self.last_tick_id {
            return None;
        }

        self.last_tick_id = current_tick;
        self.processed_this_tick = 0;

        let mut rollover = Rollover::default();

        if current_tick.saturating_sub(self.last_cleanup_tick) >= config.cleanup_interval_ticks() {
            self.last_cleanup_tick = current_tick;
            rollover.cleanup = true;
        }

        if config.debug
            && current_tick.saturating_sub(self.last_debug_tick) >= config.debug_interval_ticks()
        {
            self.last_debug_tick = current_tick;
            rollover.debug = true;
        }

        Some(rollover)
    }

    #[inline]
    pub fn processed_this_tick(&self) -> u32 {
        self.processed_this_tick
    }

    #[inline]
    pub fn record_admission(&mut self) {
        self.processed_this_tick += 1;
    }

    #[inline]
    pub fn last_tick_id(&self) -> u64 {
        self.last_tick_id
    }

    #[inline]
    pub fn last_cleanup_tick(&self) -> u64 {
        self.last_cleanup_tick
    }

    #[inline]
    pub fn last_debug_tick(&self) -> u64 {
        self.last_debug_tick
    }
}
