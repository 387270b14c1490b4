// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process TTL cache.
//!
//! An explicit, injected abstraction rather than module-level state, so a
//! multi-instance deployment can swap it for a shared cache without
//! touching the callers.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Concurrent map whose values lapse after a fixed TTL.
pub struct TtlCache<K, V> {
    entries: DashMap<K, (Instant, V)>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Get a live value; stale entries are evicted on access.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            let (inserted_at, value) = entry.value();
            if inserted_at.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }
        // Drop the read guard before removing
        self.entries.remove(key);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }
}
