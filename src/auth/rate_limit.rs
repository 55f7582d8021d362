//! Per-client login attempt counter.
//!
//! Best-effort and in-memory: the service runs as a single instance. Each
//! login surface owns its own [`RateLimiter`], injected through `AppState`.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Blocked,
}

#[derive(Debug)]
struct Entry {
    failures: u32,
    generation: u64,
}

struct Inner {
    max_attempts: u32,
    window: Duration,
    entries: Mutex<HashMap<String, Entry>>,
    generations: AtomicU64,
}

#[derive(Clone)]
pub struct RateLimiter {
    name: &'static str,
    inner: Arc<Inner>,
}

impl RateLimiter {
    pub fn new(name: &'static str, max_attempts: u32, window: Duration) -> Self {
        Self {
            name,
            inner: Arc::new(Inner {
                max_attempts,
                window,
                entries: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves one attempt for `key`. When allowed, the attempt is counted
    /// as a failure under the same lock, so concurrent requests can never
    /// get past the ceiling together. The caller either keeps the count (the
    /// attempt failed), calls [`reset`](Self::reset) on success, or gives it
    /// back with [`release`](Self::release).
    ///
    /// The first counted attempt of a window schedules the reset; must be
    /// called from within a tokio runtime.
    pub fn try_begin(&self, key: &str) -> RateDecision {
        let started = {
            let mut entries = self.entries();
            match entries.get_mut(key) {
                Some(entry) if entry.failures >= self.inner.max_attempts => {
                    warn!(limiter = self.name, key, failures = entry.failures, "login attempt blocked");
                    return RateDecision::Blocked;
                }
                Some(entry) => {
                    entry.failures += 1;
                    debug!(limiter = self.name, key, failures = entry.failures, "login attempt counted");
                    None
                }
                None => {
                    let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
                    entries.insert(
                        key.to_string(),
                        Entry {
                            failures: 1,
                            generation,
                        },
                    );
                    debug!(limiter = self.name, key, failures = 1, "login attempt counted");
                    Some(generation)
                }
            }
        };

        if let Some(generation) = started {
            let limiter = self.clone();
            let key = key.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(limiter.inner.window).await;
                limiter.expire(&key, generation);
            });
        }
        RateDecision::Allowed
    }

    /// Returns an attempt reserved by [`try_begin`](Self::try_begin) that
    /// should not count, leaving the key as it was before.
    pub fn release(&self, key: &str) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.failures = entry.failures.saturating_sub(1);
            if entry.failures == 0 {
                entries.remove(key);
            }
        }
    }

    /// Clears the key after a successful login.
    pub fn reset(&self, key: &str) {
        self.entries().remove(key);
    }

    // Only the window that scheduled the timer may be cleared by it.
    fn expire(&self, key: &str, generation: u64) {
        let mut entries = self.entries();
        if entries.get(key).is_some_and(|e| e.generation == generation) {
            entries.remove(key);
            debug!(limiter = self.name, key, "login window expired");
        }
    }

    #[cfg(test)]
    fn failures(&self, key: &str) -> u32 {
        self.entries().get(key).map_or(0, |e| e.failures)
    }
}
