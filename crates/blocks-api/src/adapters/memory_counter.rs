//! Process-local Counter Store.
//!
//! Expiry is evaluated lazily against the injected clock; `purge_expired`
//! drops dead keys so the map does not grow with every client ever seen.

use crate::ports::{CounterEntry, CounterStore, CounterStoreError, TimeSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Slot {
    count: u64,
    expires_at: DateTime<Utc>,
}

impl Slot {
    fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }
}

/// DashMap-backed counters with TTL
pub struct MemoryCounterStore {
    slots: DashMap<String, Slot>,
    clock: Arc<dyn TimeSource>,
}

impl MemoryCounterStore {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            slots: DashMap::new(),
            clock,
        }
    }

    /// Remove expired counters, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.slots.len();
        self.slots.retain(|key, slot| {
            let live = slot.remaining(now).is_some();
            if !live {
                debug!(key = %key, "Removing expired counter");
            }
            live
        });
        before.saturating_sub(self.slots.len())
    }

    /// Number of live or not-yet-purged counters
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<CounterEntry, CounterStoreError> {
        let now = self.clock.now();
        let entry = self
            .slots
            .get(key)
            .and_then(|slot| {
                slot.remaining(now).map(|ttl| CounterEntry {
                    count: Some(slot.count),
                    ttl_remaining: Some(ttl),
                })
            })
            .unwrap_or_default();
        Ok(entry)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        count: u64,
        ttl: Duration,
    ) -> Result<(), CounterStoreError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CounterStoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let expires_at = self.clock.now() + ttl;
        self.slots.insert(key.to_string(), Slot { count, expires_at });
        Ok(())
    }
}

/// Background task to purge expired counters
pub async fn cleanup_task(store: Arc<MemoryCounterStore>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let purged = store.purge_expired();
        if purged > 0 {
            debug!(purged, remaining = store.len(), "Purged expired counters");
        }
    }
}
