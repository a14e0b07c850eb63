//! Entity push limiting
//!
//! Drops zero-displacement pushes and caps how many actor pushes each entity
//! may perform per server tick. The per-entity counters only live for one
//! server tick.

use rustc_hash::FxHashMap;

use crate::config::ThrottleConfig;
use crate::throttle::state::EntityId;
use crate::util::vec3::Vec3;

/// Outcome of one intercepted push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDecision {
    Forward,
    /// Displacement was exactly zero
    DropZeroVector,
    /// Owner already reached `max_push_times_per_tick`
    DropCapped,
}

impl PushDecision {
    #[inline]
    pub fn forwards(&self) -> bool {
        matches!(self, PushDecision::Forward)
    }
}

/// Per-server-tick push counters
#[derive(Debug, Default)]
pub struct PushLimiter {
    pushed_count: FxHashMap<EntityId, u32>,
}

impl PushLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide a push by displacement vector
    pub fn check_vec(&self, vec: Vec3, config: &ThrottleConfig) -> PushDecision {
        if config.push_opt_enabled && config.disable_vec0_push && vec.is_exact_zero() {
            PushDecision::DropZeroVector
        } else {
            PushDecision::Forward
        }
    }

    /// Decide a push of `owner` against another actor, counting it if forwarded
    pub fn check_actor(
        &mut self,
        owner: EntityId,
        involves_player: bool,
        config: &ThrottleConfig,
    ) -> PushDecision {
        if !config.push_opt_enabled {
            return PushDecision::Forward;
        }
        let Some(cap) = config.push_cap() else {
            return PushDecision::Forward;
        };
        if config.unlimited_player_push && involves_player {
            return PushDecision::Forward;
        }

        let count = self.pushed_count.entry(owner).or_insert(0);
        if *count >= cap {
            return PushDecision::DropCapped;
        }
        *count += 1;
        PushDecision::Forward
    }

    /// Server tick boundary: forget all counts
    pub fn on_server_tick(&mut self) {
        self.pushed_count.clear();
    }

    /// Pushes accepted for `owner` in the current server tick
    pub fn pushed(&self, owner: EntityId) -> u32 {
        self.pushed_count.get(&owner).copied().unwrap_or(0)
    }

    pub fn tracked(&self) -> usize {
        self.pushed_count.len()
    }
}
