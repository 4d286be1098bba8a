//! Bounded in-memory response cache with TTL expiry.
//!
//! Entries are keyed by the exact request URL string, so two URLs that differ
//! only in query string or trailing slash are cached separately. When the
//! cache is full the earliest-inserted entry is evicted; reads do not
//! refresh an entry's position.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use crate::model::Recipe;

#[derive(Debug)]
struct CacheEntry {
    recipe: Recipe,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
}

impl CacheState {
    fn remove(&mut self, url: &str) {
        if self.entries.remove(url).is_some() {
            self.order.retain(|key| key != url);
        }
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the cached recipe for `url` unless it is missing or expired.
    /// Expired entries are evicted on the way out.
    pub fn get(&self, url: &str) -> Option<Recipe> {
        let mut state = self.lock();

        let expired = match state.entries.get(url) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
        };

        if expired {
            debug!("Cache entry expired for {}", url);
            state.remove(url);
            return None;
        }

        state.entries.get(url).map(|entry| entry.recipe.clone())
    }

    /// Stores `recipe` under `url`, evicting the oldest entry first when a
    /// new key would push the cache past capacity.
    ///
    /// Overwriting an existing key refreshes its timestamp but keeps its
    /// place in the eviction order.
    pub fn set(&self, url: &str, recipe: Recipe) {
        if self.max_entries == 0 {
            return;
        }

        let mut state = self.lock();
        let entry = CacheEntry {
            recipe,
            inserted_at: Instant::now(),
        };

        if let Some(existing) = state.entries.get_mut(url) {
            *existing = entry;
            return;
        }

        while state.entries.len() >= self.max_entries {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            debug!("Cache full, evicting {}", oldest);
            state.entries.remove(&oldest);
        }

        state.entries.insert(url.to_string(), entry);
        state.order.push_back(url.to_string());
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
