//! Per-entity admission state
//!
//! One entry per non-player entity whose AI has been intercepted. Entries
//! are created lazily on first sighting and reaped by the expiry sweep.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

/// Host-wide unique entity id
pub type EntityId = i64;

/// Admission bookkeeping for one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityState {
    /// Tick of the last admission, `None` until the first one
    pub last_admitted: Option<u64>,
    /// Tick of the first throttle-skip since the last admission
    pub pending_since: Option<u64>,
}

impl EntityState {
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Tick the idle age is measured from
    ///
    /// Never-admitted entries age from the tick they started waiting.
    #[inline]
    pub fn idle_since(&self) -> u64 {
        self.last_admitted.or(self.pending_since).unwrap_or(0)
    }

    /// Mark the entity admitted at `tick`
    #[inline]
    pub fn admit(&mut self, tick: u64) {
        self.last_admitted = Some(tick);
        self.pending_since = None;
    }

    #[inline]
    pub fn is_expired(&self, current_tick: u64, expiry_ticks: u64) -> bool {
        current_tick.saturating_sub(self.idle_since()) > expiry_ticks
    }
}

/// Mapping from entity id to its admission state
#[derive(Debug, Default)]
pub struct StateTable {
    entries: FxHashMap<EntityId, EntityState>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Make room for at least `additional` more entities
    pub fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    /// Locate or insert the entry for `id`
    ///
    /// The flag is true when the entry was created by this call.
    #[inline]
    pub fn get_or_insert(&mut self, id: EntityId) -> (&mut EntityState, bool) {
        match self.entries.entry(id) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => (entry.insert(EntityState::default()), true),
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityState> {
        self.entries.get(&id)
    }

    /// Remove every entry idle for more than `expiry_ticks`
    ///
    /// Returns the number of reaped entries.
    pub fn sweep_expired(&mut self, current_tick: u64, expiry_ticks: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, state| !state.is_expired(current_tick, expiry_ticks));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
