//! Per-client sliding-window rate limiting.
//!
//! Each client keeps the timestamps of its accepted requests inside the
//! trailing window. Timestamps that fall out of the window are purged before
//! every count check, so the limit applies to any window-sized interval
//! rather than to fixed buckets.
//!
//! One-off clients would otherwise leave an entry behind forever; a
//! background sweep started with [`RateLimiter::spawn_sweeper`] drops
//! clients whose windows have emptied.
//!
//! Timestamps come from `tokio::time::Instant` so tests can drive the clock
//! with `tokio::time::pause` and `advance`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

type Windows = HashMap<String, VecDeque<Instant>>;

/// Sliding-window limiter shared by all requests of one gateway.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` and records the attempt if `client_id` is under its
    /// limit; returns `false` without recording otherwise.
    pub fn check(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.lock();

        let timestamps = windows.entry(client_id.to_string()).or_default();
        purge(timestamps, now, self.window);

        if timestamps.len() >= self.max_requests {
            debug!(
                "Client {} over limit ({} requests in {:?})",
                client_id,
                timestamps.len(),
                self.window
            );
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Purges stale timestamps for every client and forgets clients left
    /// with none. Returns the number of clients removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.lock();
        let before = windows.len();

        windows.retain(|_, timestamps| {
            purge(timestamps, now, self.window);
            !timestamps.is_empty()
        });

        let removed = before - windows.len();
        if removed > 0 {
            debug!(
                "Rate limiter sweep removed {} clients, {} remaining",
                removed,
                windows.len()
            );
        }
        removed
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Runs [`RateLimiter::sweep`] every `interval` on the tokio runtime.
    ///
    /// The task only holds a weak reference and exits on the first tick after
    /// the limiter has been dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::downgrade(self);
        let interval = interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match limiter.upgrade() {
                    Some(limiter) => {
                        limiter.sweep();
                    }
                    None => break,
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Windows> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn purge(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.duration_since(*oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
