//! Host interception glue
//!
//! `Optimizer` is the single controller value a host plugin owns: config,
//! AI throttler and push limiter, with the load/enable/disable lifecycle and
//! one method per intercepted host callback. Each callback receives the
//! host's original implementation as `origin` and decides whether to call it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::ThrottleConfig;
use crate::metrics::ThrottleStats;
use crate::throttle::{Admission, AiThrottler, PushDecision, PushLimiter};
use crate::util::vec3::Vec3;
use crate::LOG_TARGET;

/// Capabilities the throttler needs from a host entity
pub trait HostEntity {
    fn unique_id(&self) -> i64;
    fn is_player(&self) -> bool;
}

impl<T: HostEntity + ?Sized> HostEntity for &T {
    fn unique_id(&self) -> i64 {
        (**self).unique_id()
    }

    fn is_player(&self) -> bool {
        (**self).is_player()
    }
}

/// Throttling controller for one server
#[derive(Debug)]
pub struct Optimizer {
    config: ThrottleConfig,
    config_dir: Option<PathBuf>,
    /// Hooks registered: between `enable` and `disable`
    active: bool,
    throttler: AiThrottler,
    push: PushLimiter,
}

impl Optimizer {
    /// Controller with an in-memory config, not yet enabled
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            config_dir: None,
            active: false,
            throttler: AiThrottler::new(),
            push: PushLimiter::new(),
        }
    }

    /// Controller reading `config.json` from `config_dir`
    pub fn load(config_dir: &Path) -> Self {
        if let Err(e) = fs::create_dir_all(config_dir) {
            warn!(
                target: LOG_TARGET,
                "Failed to create config dir {}: {}",
                config_dir.display(),
                e
            );
        }
        let mut optimizer = Self::new(ThrottleConfig::load_or_default(config_dir));
        optimizer.config_dir = Some(config_dir.to_path_buf());
        optimizer
    }

    /// Sanitize the config and start intercepting
    pub fn enable(&mut self) {
        self.config.sanitize();
        self.throttler.reserve(self.config.initial_map_reserve);
        self.active = true;

        info!(
            target: LOG_TARGET,
            "Enabled. maxPerTick={}, cooldownTicks={}, reservedSlots={}, priorityAfterTicks={}, debug={}",
            self.config.max_per_tick,
            self.config.cooldown_ticks,
            self.config.reserved_slots,
            self.config.priority_after_ticks,
            self.config.debug
        );
    }

    /// Stop intercepting and drop all per-entity state
    pub fn disable(&mut self) {
        self.active = false;
        self.throttler.clear();
        self.push.on_server_tick();

        let s = self.stats();
        info!(
            target: LOG_TARGET,
            "Disabled. processed={}, cooldownSkipped={}, throttleSkipped={}, prioritized={}",
            s.processed,
            s.cooldown_skipped,
            s.throttle_skipped,
            s.prioritized
        );
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn throttling_ai(&self) -> bool {
        self.active && self.config.enabled
    }

    fn limiting_push(&self) -> bool {
        self.active && self.config.push_opt_enabled
    }

    /// Decide an intercepted AI update and record it
    ///
    /// Must be followed by [`Optimizer::finish_ai_update`] after `origin`
    /// returns when the admission runs the origin.
    pub fn begin_ai_update<E: HostEntity + ?Sized>(
        &mut self,
        entity: &E,
        current_tick: u64,
    ) -> Admission {
        if !self.throttling_ai() || entity.is_player() {
            return Admission::Bypass;
        }
        self.throttler.admit(entity.unique_id(), current_tick, &self.config)
    }

    pub fn finish_ai_update(&mut self, admission: Admission) {
        if let Admission::Admitted { .. } = admission {
            self.throttler.complete();
        }
    }

    /// Per-entity tick; a skipped tick reports the update as done
    pub fn on_actor_tick<E, F>(&mut self, entity: &E, current_tick: u64, origin: F) -> bool
    where
        E: HostEntity + ?Sized,
        F: FnOnce() -> bool,
    {
        let admission = self.begin_ai_update(entity, current_tick);
        if !admission.runs_origin() {
            return true;
        }
        let result = origin();
        self.finish_ai_update(admission);
        result
    }

    /// Per-mob AI step
    pub fn on_mob_ai_step<E, F>(&mut self, entity: &E, current_tick: u64, origin: F)
    where
        E: HostEntity + ?Sized,
        F: FnOnce(),
    {
        let admission = self.begin_ai_update(entity, current_tick);
        if admission.runs_origin() {
            origin();
            self.finish_ai_update(admission);
        }
    }

    pub fn decide_push_vec(&mut self, vec: Vec3) -> PushDecision {
        if !self.limiting_push() {
            return PushDecision::Forward;
        }
        let decision = self.push.check_vec(vec, &self.config);
        if decision == PushDecision::DropZeroVector {
            self.throttler.stats_mut().push_zero_dropped += 1;
        }
        decision
    }

    pub fn decide_push_actor<E, O>(&mut self, owner: &E, other: &O) -> PushDecision
    where
        E: HostEntity + ?Sized,
        O: HostEntity + ?Sized,
    {
        if !self.limiting_push() {
            return PushDecision::Forward;
        }
        let involves_player = owner.is_player() || other.is_player();
        let decision = self
            .push
            .check_actor(owner.unique_id(), involves_player, &self.config);
        if decision == PushDecision::DropCapped {
            self.throttler.stats_mut().push_cap_dropped += 1;
        }
        decision
    }

    /// Push by displacement vector
    pub fn on_push_vec<E, F>(&mut self, _owner: &E, vec: Vec3, origin: F)
    where
        E: HostEntity + ?Sized,
        F: FnOnce(Vec3),
    {
        if self.decide_push_vec(vec).forwards() {
            origin(vec);
        }
    }

    /// Push against another actor; `origin` carries the host's remaining arguments
    pub fn on_push_actor<E, O, F>(&mut self, owner: &E, other: &O, origin: F)
    where
        E: HostEntity + ?Sized,
        O: HostEntity + ?Sized,
        F: FnOnce(),
    {
        if self.decide_push_actor(owner, other).forwards() {
            origin();
        }
    }

    /// Once per server tick, after all per-entity work
    pub fn on_server_tick(&mut self) {
        self.push.on_server_tick();
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    pub fn stats(&self) -> ThrottleStats {
        *self.throttler.stats()
    }

    pub fn reset_stats(&mut self) {
        self.throttler.reset_stats();
    }

    pub fn throttler(&self) -> &AiThrottler {
        &self.throttler
    }

    pub fn push_limiter(&self) -> &PushLimiter {
        &self.push
    }

    /// Entities tracked in the state table
    pub fn cache_size(&self) -> usize {
        self.throttler.table().len()
    }
}

/// `Optimizer` for hosts that dispatch callbacks from several threads
///
/// All decisions are serialized through one mutex. The lock is released
/// while `origin` runs, so an origin may call back into the controller.
#[derive(Debug, Clone)]
pub struct SharedOptimizer {
    inner: Arc<Mutex<Optimizer>>,
}

impl SharedOptimizer {
    pub fn new(optimizer: Optimizer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(optimizer)),
        }
    }

    /// Run `f` with exclusive access to the controller
    pub fn with<R>(&self, f: impl FnOnce(&mut Optimizer) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn on_actor_tick<E, F>(&self, entity: &E, current_tick: u64, origin: F) -> bool
    where
        E: HostEntity + ?Sized,
        F: FnOnce() -> bool,
    {
        let admission = self.inner.lock().begin_ai_update(entity, current_tick);
        if !admission.runs_origin() {
            return true;
        }
        let result = origin();
        self.inner.lock().finish_ai_update(admission);
        result
    }

    pub fn on_mob_ai_step<E, F>(&self, entity: &E, current_tick: u64, origin: F)
    where
        E: HostEntity + ?Sized,
        F: FnOnce(),
    {
        let admission = self.inner.lock().begin_ai_update(entity, current_tick);
        if admission.runs_origin() {
            origin();
            self.inner.lock().finish_ai_update(admission);
        }
    }

    pub fn on_push_vec<E, F>(&self, _owner: &E, vec: Vec3, origin: F)
    where
        E: HostEntity + ?Sized,
        F: FnOnce(Vec3),
    {
        let decision = self.inner.lock().decide_push_vec(vec);
        if decision.forwards() {
            origin(vec);
        }
    }

    pub fn on_push_actor<E, O, F>(&self, owner: &E, other: &O, origin: F)
    where
        E: HostEntity + ?Sized,
        O: HostEntity + ?Sized,
        F: FnOnce(),
    {
        let decision = self.inner.lock().decide_push_actor(owner, other);
        if decision.forwards() {
            origin();
        }
    }

    pub fn on_server_tick(&self) {
        self.inner.lock().on_server_tick();
    }

    pub fn stats(&self) -> ThrottleStats {
        self.inner.lock().stats()
    }
}
