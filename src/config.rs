use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::LOG_TARGET;

/// Ticks per wall-clock second on the host
pub const TICKS_PER_SECOND: u64 = 20;

/// File name of the persisted config inside the mod config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Errors from the config file layer
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Throttler configuration
///
/// Persisted as a flat camelCase JSON object. Missing fields take their
/// defaults and unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThrottleConfig {
    /// Schema version of the file
    pub version: u32,
    /// Master switch; when false every AI update is forwarded
    pub enabled: bool,
    /// Emit a stats line every `debug_log_interval_seconds`
    pub debug: bool,
    pub debug_log_interval_seconds: u64,

    /// Total admissions allowed per tick
    pub max_per_tick: u32,
    /// Slots of `max_per_tick` only usable by priority entities
    pub reserved_slots: u32,
    /// Minimum gap between two admissions of the same entity
    pub cooldown_ticks: u64,
    /// Pending age after which an entity enters the priority lane (0 disables)
    pub priority_after_ticks: u64,

    /// Wall-seconds between expiry sweeps
    pub cleanup_interval_seconds: u64,
    /// Entries idle longer than `cooldown_ticks * expiry_multiplier` are reaped
    pub expiry_multiplier: u64,
    /// Capacity reserved in the state table at enable
    pub initial_map_reserve: usize,

    /// Gate for both push behaviors
    pub push_opt_enabled: bool,
    /// Drop pushes whose displacement is exactly zero
    pub disable_vec0_push: bool,
    /// Pushes accepted per entity per server tick (-1 = unlimited)
    pub max_push_times_per_tick: i32,
    /// Pushes involving a player bypass the per-entity cap
    pub unlimited_player_push: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            version: 1,
            enabled: true,
            debug: false,
            debug_log_interval_seconds: 30,
            max_per_tick: 4,
            reserved_slots: 1,
            cooldown_ticks: 300,
            priority_after_ticks: 100,
            cleanup_interval_seconds: 10,
            expiry_multiplier: 8,
            initial_map_reserve: 3000,
            push_opt_enabled: true,
            disable_vec0_push: true,
            max_push_times_per_tick: 5,
            unlimited_player_push: true,
        }
    }
}

impl ThrottleConfig {
    /// Path of the config file inside `config_dir`
    pub fn path_in(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `config.json` from `config_dir`, falling back to defaults
    ///
    /// When the file is missing or corrupt the defaults are written back so
    /// the operator has a file to edit.
    pub fn load_or_default(config_dir: &Path) -> Self {
        let path = Self::path_in(config_dir);
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(target: LOG_TARGET, "Failed to load config, using defaults. ({})", e);
                let config = Self::default();
                if let Err(e) = config.save(&path) {
                    warn!(target: LOG_TARGET, "Failed to write default config: {}", e);
                }
                config
            }
        }
    }

    /// Clamp invalid values to safe ones, warning for each change
    ///
    /// Returns true if anything was changed.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = false;

        if self.max_per_tick == 0 {
            warn!(target: LOG_TARGET, "maxPerTick(0) must be at least 1, resetting to 1.");
            self.max_per_tick = 1;
            changed = true;
        }
        if self.cleanup_interval_seconds == 0 {
            warn!(
                target: LOG_TARGET,
                "cleanupIntervalSeconds(0) must be at least 1, resetting to 1."
            );
            self.cleanup_interval_seconds = 1;
            changed = true;
        }
        if self.expiry_multiplier == 0 {
            warn!(target: LOG_TARGET, "expiryMultiplier(0) must be at least 1, resetting to 1.");
            self.expiry_multiplier = 1;
            changed = true;
        }
        // normalLimit would be zero or negative
        if self.reserved_slots >= self.max_per_tick {
            warn!(
                target: LOG_TARGET,
                "reservedSlots({}) >= maxPerTick({}), resetting to half.",
                self.reserved_slots,
                self.max_per_tick
            );
            self.reserved_slots = self.max_per_tick / 2;
            changed = true;
        }

        changed
    }

    /// Admissions available to entities outside the priority lane
    #[inline]
    pub fn normal_limit(&self) -> u32 {
        self.max_per_tick.saturating_sub(self.reserved_slots)
    }

    /// Idle age beyond which a state entry is reaped
    #[inline]
    pub fn expiry_ticks(&self) -> u64 {
        self.cooldown_ticks.saturating_mul(self.expiry_multiplier)
    }

    #[inline]
    pub fn cleanup_interval_ticks(&self) -> u64 {
        self.cleanup_interval_seconds.saturating_mul(TICKS_PER_SECOND)
    }

    #[inline]
    pub fn debug_interval_ticks(&self) -> u64 {
        self.debug_log_interval_seconds.saturating_mul(TICKS_PER_SECOND)
    }

    /// Per-entity push cap, `None` when unlimited
    #[inline]
    pub fn push_cap(&self) -> Option<u32> {
        u32::try_from(self.max_push_times_per_tick).ok()
    }
}
