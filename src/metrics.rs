//! Throttler counters
//!
//! Monotonic counters updated on the hot path, plus the text forms used by
//! the debug log and a Prometheus-compatible exposition.

use std::fmt::Write;

/// Counters since enable (or the last reset)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// AI updates that ran to completion
    pub processed: u64,
    /// AI updates skipped because the entity was cooling down
    pub cooldown_skipped: u64,
    /// AI updates skipped because the per-tick quota was full
    pub throttle_skipped: u64,
    /// Admissions that used the priority lane
    pub prioritized: u64,
    /// Zero-vector pushes dropped
    pub push_zero_dropped: u64,
    /// Actor pushes dropped by the per-entity cap
    pub push_cap_dropped: u64,
}

impl ThrottleStats {
    /// All AI updates that were skipped for any reason
    pub fn total_skipped(&self) -> u64 {
        self.cooldown_skipped + self.throttle_skipped
    }

    /// The periodic debug line
    pub fn debug_line(&self, cache_size: usize) -> String {
        format!(
            "[Debug] processed={}, cooldownSkipped={}, throttleSkipped={}, prioritized={}, cacheSize={}",
            self.processed,
            self.cooldown_skipped,
            self.throttle_skipped,
            self.prioritized,
            cache_size
        )
    }

    /// Generate Prometheus-format output
    pub fn to_prometheus(&self, cache_size: usize) -> String {
        let mut output = String::with_capacity(1024);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                let _ = write!(
                    output,
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                );
            };
        }

        metric!(
            "mob_ai_processed_total",
            "AI updates admitted and completed",
            "counter",
            self.processed
        );
        metric!(
            "mob_ai_cooldown_skipped_total",
            "AI updates skipped by per-entity cooldown",
            "counter",
            self.cooldown_skipped
        );
        metric!(
            "mob_ai_throttle_skipped_total",
            "AI updates skipped by the per-tick quota",
            "counter",
            self.throttle_skipped
        );
        metric!(
            "mob_ai_prioritized_total",
            "Admissions through the reserved priority lane",
            "counter",
            self.prioritized
        );
        metric!(
            "mob_ai_push_zero_dropped_total",
            "Zero-vector pushes dropped",
            "counter",
            self.push_zero_dropped
        );
        metric!(
            "mob_ai_push_cap_dropped_total",
            "Actor pushes dropped by the per-tick cap",
            "counter",
            self.push_cap_dropped
        );
        metric!(
            "mob_ai_state_entries",
            "Entities tracked in the state table",
            "gauge",
            cache_size
        );

        output
    }
}
