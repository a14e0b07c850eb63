//! AI admission control
//!
//! Decides, for every intercepted AI update, whether the host's original
//! update runs this tick. Two gates apply in order:
//!
//! 1. Cooldown: an entity admitted less than `cooldown_ticks` ago is skipped.
//! 2. Quota: at most `max_per_tick` admissions per tick. The last
//!    `reserved_slots` of them only go to entities that have been waiting
//!    (throttle-skipped) for at least `priority_after_ticks`.

use tracing::{debug, info};

use crate::config::ThrottleConfig;
use crate::metrics::ThrottleStats;
use crate::throttle::epoch::TickEpoch;
use crate::throttle::state::{EntityId, StateTable};
use crate::LOG_TARGET;

/// Outcome of one intercepted AI update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Throttling does not apply (disabled or player); forwarded, nothing recorded
    Bypass,
    /// Admitted; `prioritized` when the reserved lane was used
    Admitted { prioritized: bool },
    /// Skipped, the entity is cooling down
    SkippedCooldown,
    /// Skipped, the tick's quota is used up
    SkippedThrottle,
}

impl Admission {
    /// Whether the original update should be invoked
    #[inline]
    pub fn runs_origin(&self) -> bool {
        matches!(self, Admission::Bypass | Admission::Admitted { .. })
    }
}

/// Admission controller state: entity table, tick epoch and counters
#[derive(Debug, Default)]
pub struct AiThrottler {
    table: StateTable,
    epoch: TickEpoch,
    stats: ThrottleStats,
}

impl AiThrottler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: StateTable::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Handle a possible tick boundary before deciding
    ///
    /// Only the first call of a tick does any work.
    pub fn on_tick(&mut self, current_tick: u64, config: &ThrottleConfig) {
        let Some(rollover) = self.epoch.observe(current_tick, config) else {
            return;
        };

        if rollover.cleanup {
            let reaped = self.table.sweep_expired(current_tick, config.expiry_ticks());
            if reaped > 0 {
                debug!(
                    target: LOG_TARGET,
                    tick = current_tick,
                    reaped,
                    remaining = self.table.len(),
                    "Expired entity states removed"
                );
            }
        }

        if rollover.debug {
            info!(target: LOG_TARGET, "{}", self.stats.debug_line(self.table.len()));
        }
    }

    /// Decide whether entity `id` runs its AI at `current_tick`
    ///
    /// On admission the entity's state is updated before the caller runs the
    /// original update; call [`AiThrottler::complete`] once it returns.
    pub fn admit(&mut self, id: EntityId, current_tick: u64, config: &ThrottleConfig) -> Admission {
        self.on_tick(current_tick, config);

        let (state, inserted) = self.table.get_or_insert(id);

        // Only the inserting call is exempt; a never-admitted entry counts from tick 0
        let last = state.last_admitted.unwrap_or(0);
        if !inserted && current_tick.saturating_sub(last) < config.cooldown_ticks {
            self.stats.cooldown_skipped += 1;
            return Admission::SkippedCooldown;
        }

        let waiting_since = state.pending_since;
        let prioritized = match waiting_since {
            Some(since) => {
                config.priority_after_ticks > 0
                    && current_tick.saturating_sub(since) >= config.priority_after_ticks
            }
            None => false,
        };

        let limit = if prioritized {
            config.max_per_tick
        } else {
            config.normal_limit()
        };

        if self.epoch.processed_this_tick() >= limit {
            if waiting_since.is_none() {
                state.pending_since = Some(current_tick);
            }
            self.stats.throttle_skipped += 1;
            return Admission::SkippedThrottle;
        }

        self.epoch.record_admission();
        if prioritized {
            self.stats.prioritized += 1;
        }
        state.admit(current_tick);

        Admission::Admitted { prioritized }
    }

    /// Count an admitted update whose original has returned
    #[inline]
    pub fn complete(&mut self) {
        self.stats.processed += 1;
    }

    pub fn stats(&self) -> &ThrottleStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ThrottleStats {
        &mut self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ThrottleStats::default();
    }

    pub fn table(&self) -> &StateTable {
        &self.table
    }

    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    pub fn processed_this_tick(&self) -> u32 {
        self.epoch.processed_this_tick()
    }

    pub fn epoch(&self) -> &TickEpoch {
        &self.epoch
    }

    /// Forget all entities and tick bookkeeping, keeping counters
    pub fn clear(&mut self) {
        self.table.clear();
        self.epoch = TickEpoch::new();
    }
}
