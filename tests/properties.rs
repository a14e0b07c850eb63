//! PROPERTY-BASED TESTS: admission invariants
//!
//! Key invariants:
//! 1. Never more than `max_per_tick` admissions in a tick
//! 2. Non-priority admissions never exceed `max_per_tick - reserved_slots`
//! 3. Successive admissions of an entity are at least `cooldown_ticks` apart
//! 4. The per-tick counter only resets at a tick boundary
//! 5. Players and a disabled throttler always forward without recording state
//! 6. Push counters are empty after a server tick
//! 7. Entities that stop calling are reaped within `expiry + cleanup interval`
//! 8. A waiting entity is admitted within `priority_after + ceil(W / reserved)`
//! 9. Repeated tick notifications leave the rollover bookkeeping unchanged

use std::collections::HashMap;

use mob_ai_throttler::config::TICKS_PER_SECOND;
use mob_ai_throttler::throttle::{Admission, AiThrottler};
use mob_ai_throttler::{HostEntity, Optimizer, ThrottleConfig};
use proptest::prelude::*;

struct Entity {
    id: i64,
    player: bool,
}

impl HostEntity for Entity {
    fn unique_id(&self) -> i64 {
        self.id
    }
    fn is_player(&self) -> bool {
        self.player
    }
}

fn config_strategy() -> impl Strategy<Value = ThrottleConfig> {
    (1u32..8, 0u64..6, 0u64..6, 1u64..4, 1u64..3).prop_flat_map(
        |(max_per_tick, cooldown_ticks, priority_after_ticks, expiry_multiplier, cleanup)| {
            (0..max_per_tick).prop_map(move |reserved_slots| ThrottleConfig {
                max_per_tick,
                reserved_slots,
                cooldown_ticks,
                priority_after_ticks,
                expiry_multiplier,
                cleanup_interval_seconds: cleanup,
                ..Default::default()
            })
        },
    )
}

/// Each tick: how many ticks to advance, then the entity ids calling in order
fn schedule_strategy() -> impl Strategy<Value = Vec<(u64, Vec<i64>)>> {
    prop::collection::vec((1u64..30, prop::collection::vec(0i64..24, 0..40)), 1..60)
}

proptest! {
    #[test]
    fn prop_quota_reservation_and_cooldown_hold(
        config in config_strategy(),
        schedule in schedule_strategy(),
    ) {
        let mut throttler = AiThrottler::new();
        let mut last_admitted: HashMap<i64, u64> = HashMap::new();
        let mut tick = 0u64;

        for (advance, callers) in schedule {
            tick += advance;
            let mut admitted = 0u32;
            let mut normal = 0u32;

            for id in callers {
                match throttler.admit(id, tick, &config) {
                    Admission::Admitted { prioritized } => {
                        admitted += 1;
                        if !prioritized {
                            normal += 1;
                        }
                        if let Some(prev) = last_admitted.insert(id, tick) {
                            prop_assert!(tick - prev >= config.cooldown_ticks);
                        }
                        throttler.complete();
                    }
                    Admission::SkippedCooldown | Admission::SkippedThrottle => {}
                    Admission::Bypass => prop_assert!(false, "throttler never bypasses"),
                }
                prop_assert_eq!(throttler.processed_this_tick(), admitted);
            }

            prop_assert!(admitted <= config.max_per_tick);
            prop_assert!(normal <= config.max_per_tick - config.reserved_slots);
        }

        prop_assert!(throttler.stats().processed >= last_admitted.len() as u64);
    }

    #[test]
    fn prop_pending_since_never_in_future(
        config in config_strategy(),
        schedule in schedule_strategy(),
    ) {
        let mut throttler = AiThrottler::new();
        let mut tick = 0u64;

        for (advance, callers) in schedule {
            tick += advance;
            for id in callers {
                throttler.admit(id, tick, &config);
                let state = throttler.table().get(id).unwrap();
                if let Some(since) = state.pending_since {
                    prop_assert!(since <= tick);
                }
                if let Some(last) = state.last_admitted {
                    prop_assert!(last <= tick);
                }
            }
        }
    }

    #[test]
    fn prop_exempt_calls_always_forward(
        config_enabled in any::<bool>(),
        ids in prop::collection::vec((0i64..50, any::<bool>()), 1..100),
    ) {
        let mut optimizer = Optimizer::new(ThrottleConfig {
            enabled: config_enabled,
            max_per_tick: 1,
            reserved_slots: 0,
            cooldown_ticks: 1000,
            ..Default::default()
        });
        optimizer.enable();

        for (tick, (id, player)) in ids.into_iter().enumerate() {
            let id = if player { id + 1000 } else { id };
            let entity = Entity { id, player };
            let mut ran = false;
            optimizer.on_mob_ai_step(&entity, tick as u64, || ran = true);
            if player || !config_enabled {
                prop_assert!(ran);
            }
            if player {
                prop_assert!(optimizer.throttler().table().get(id).is_none());
            }
            if !config_enabled {
                prop_assert_eq!(optimizer.cache_size(), 0);
            }
        }
        if !config_enabled {
            prop_assert_eq!(optimizer.stats().total_skipped(), 0);
        }
    }

    #[test]
    fn prop_push_counters_cleared_by_server_tick(
        cap in 0i32..4,
        pushes in prop::collection::vec(0i64..10, 0..50),
    ) {
        let mut optimizer = Optimizer::new(ThrottleConfig {
            push_opt_enabled: true,
            max_push_times_per_tick: cap,
            ..Default::default()
        });
        optimizer.enable();

        let mut forwarded: HashMap<i64, i32> = HashMap::new();
        for id in pushes {
            let owner = Entity { id, player: false };
            let other = Entity { id: id + 100, player: false };
            optimizer.on_push_actor(&owner, &other, || *forwarded.entry(id).or_insert(0) += 1);
        }
        prop_assert!(forwarded.values().all(|&n| n <= cap));

        optimizer.on_server_tick();
        prop_assert_eq!(optimizer.push_limiter().tracked(), 0);
    }

    #[test]
    fn prop_idle_entries_reaped_after_expiry_and_cleanup(
        config in config_strategy(),
        schedule in schedule_strategy(),
    ) {
        let mut throttler = AiThrottler::new();
        let mut tick = 0u64;

        for (advance, callers) in schedule {
            tick += advance;
            for id in callers {
                throttler.admit(id, tick, &config);
            }
        }

        // Only an unrelated entity keeps the ticks flowing from here on
        let quiet_until = tick + config.expiry_ticks() + config.cleanup_interval_ticks() + 1;
        for t in tick + 1..=quiet_until {
            throttler.admit(1000, t, &config);
        }

        for id in 0..24 {
            prop_assert!(throttler.table().get(id).is_none(), "entity {} still tracked", id);
        }
    }

    #[test]
    fn prop_waiters_admitted_within_priority_bound(
        (max_per_tick, reserved_slots) in (2u32..8).prop_flat_map(|max| (Just(max), 1..max)),
        priority_after_ticks in 1u64..6,
        waiters in 1usize..12,
    ) {
        let config = ThrottleConfig {
            max_per_tick,
            reserved_slots,
            cooldown_ticks: 0,
            priority_after_ticks,
            cleanup_interval_seconds: 1000,
            ..Default::default()
        };
        let hogs = config.normal_limit() as i64;
        let mut throttler = AiThrottler::new();
        let mut first_admitted: Vec<Option<u64>> = vec![None; waiters];

        let start = 1u64;
        let bound = start
            + priority_after_ticks
            + (waiters as u64).div_ceil(u64::from(reserved_slots));

        for tick in start..=bound {
            // The hogs fill the normal lane every tick
            for id in 0..hogs {
                let admission = throttler.admit(id, tick, &config);
                prop_assert_eq!(admission, Admission::Admitted { prioritized: false });
            }
            for (i, first) in first_admitted.iter_mut().enumerate() {
                if first.is_some() {
                    continue;
                }
                let id = 100 + i as i64;
                if let Admission::Admitted { .. } = throttler.admit(id, tick, &config) {
                    *first = Some(tick);
                }
            }
        }

        for (i, first) in first_admitted.iter().enumerate() {
            prop_assert!(first.is_some(), "waiter {} not admitted by tick {}", i, bound);
        }
    }

    #[test]
    fn prop_repeated_tick_notification_is_idempotent(
        config in config_strategy(),
        schedule in schedule_strategy(),
    ) {
        let config = ThrottleConfig {
            debug: true,
            debug_log_interval_seconds: 1,
            ..config
        };
        let mut throttler = AiThrottler::new();
        let mut tick = 0u64;

        for (advance, callers) in schedule {
            tick += advance;
            throttler.on_tick(tick, &config);

            let epoch = throttler.epoch();
            let cleanup = epoch.last_cleanup_tick();
            let debug = epoch.last_debug_tick();
            let mut entries = throttler.table().len();
            prop_assert_eq!(epoch.last_tick_id(), tick);
            prop_assert_eq!(epoch.processed_this_tick(), 0);
            prop_assert!(tick - cleanup < config.cleanup_interval_ticks());
            prop_assert!(tick - debug < TICKS_PER_SECOND);

            for _ in 0..3 {
                throttler.on_tick(tick, &config);
                prop_assert_eq!(throttler.table().len(), entries);
                prop_assert_eq!(throttler.processed_this_tick(), 0);
            }

            for id in callers {
                throttler.admit(id, tick, &config);
                let processed = throttler.processed_this_tick();
                throttler.on_tick(tick, &config);

                let epoch = throttler.epoch();
                prop_assert_eq!(epoch.last_tick_id(), tick);
                prop_assert_eq!(epoch.last_cleanup_tick(), cleanup);
                prop_assert_eq!(epoch.last_debug_tick(), debug);
                prop_assert_eq!(epoch.processed_this_tick(), processed);
                prop_assert!(throttler.table().len() >= entries);
                entries = throttler.table().len();
            }
        }
    }
}
