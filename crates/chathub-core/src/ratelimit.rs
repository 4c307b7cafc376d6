//! Fixed-window rate limiting over a pluggable counter store.
//!
//! Admission control runs once per inbound request, before any provider
//! work. The window is a hard reset boundary: a client that exhausts its
//! quota early in a window waits until that window's fixed expiry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub admitted: bool,
    /// Requests left in the current window after this decision.
    pub remaining: u32,
}

/// The external counter-store contract: any key-value store offering an
/// atomic increment with expiry can implement it.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically apply one admission attempt for `key`.
    ///
    /// If no live counter exists, a fresh one is created with count 1
    /// and `window` until expiry. If the count has reached `limit`, the
    /// attempt is rejected without incrementing. The increment-and-compare
    /// must be a single atomic step per key.
    async fn try_increment(&self, key: &str, limit: u32, window: Duration) -> Admission;

    /// Current live count for `key`, 0 if absent or expired.
    async fn current(&self, key: &str) -> u32;
}

#[derive(Debug)]
struct WindowCounter {
    count: u32,
    expires_at: Instant,
}

/// In-memory counter store.
///
/// Counters for a key reset only when a new attempt arrives at/after the
/// recorded expiry; expired entries are replaced in place rather than
/// swept by a background task.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: RwLock<HashMap<String, WindowCounter>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn try_increment(&self, key: &str, limit: u32, window: Duration) -> Admission {
        let now = Instant::now();
        let mut counters = self.counters.write().await;

        let counter = counters.entry(key.to_string()).or_insert(WindowCounter {
            count: 0,
            expires_at: now + window,
        });

        if now >= counter.expires_at {
            counter.count = 0;
            counter.expires_at = now + window;
        }

        if counter.count >= limit {
            return Admission {
                admitted: false,
                remaining: limit.saturating_sub(counter.count),
            };
        }

        counter.count += 1;
        Admission {
            admitted: true,
            remaining: limit.saturating_sub(counter.count),
        }
    }

    async fn current(&self, key: &str) -> u32 {
        let counters = self.counters.read().await;
        match counters.get(key) {
            Some(counter) if Instant::now() < counter.expires_at => counter.count,
            _ => 0,
        }
    }
}

/// Admission gate keyed by client identity.
pub struct RateLimiter {
    store: Box<dyn CounterStore>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: impl CounterStore + 'static, limit: u32, window: Duration) -> Self {
        Self {
            store: Box::new(store),
            limit,
            window,
        }
    }

    /// Check and record one request for `key`.
    pub async fn admit(&self, key: &str) -> Admission {
        let decision = self.store.try_increment(key, self.limit, self.window).await;
        if !decision.admitted {
            debug!(key, limit = self.limit, "Rate limit exceeded");
        }
        decision
    }

    /// Requests left for `key` in the current window; `limit` if the key
    /// has no live counter.
    pub async fn remaining(&self, key: &str) -> u32 {
        self.limit.saturating_sub(self.store.current(key).await)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(limit: u32, window: Duration) -> RateLimiter {
        RateLimiter::new(MemoryCounterStore::new(), limit, window)
    }

    #[tokio::test]
    async fn admits_up_to_limit_then_rejects() {
        let limiter = limiter(5, Duration::from_secs(60));

        for expected_remaining in (0..5).rev() {
            let decision = limiter.admit("client-a").await;
            assert!(decision.admitted);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let sixth = limiter.admit("client-a").await;
        assert!(!sixth.admitted);
        assert_eq!(sixth.remaining, 0);
        assert_eq!(limiter.remaining("client-a").await, 0);
    }

    #[tokio::test]
    async fn rejection_does_not_increment() {
        let limiter = limiter(2, Duration::from_secs(60));
        limiter.admit("k").await;
        limiter.admit("k").await;

        for _ in 0..10 {
            assert!(!limiter.admit("k").await.admitted);
        }
        assert_eq!(limiter.remaining("k").await, 0);
    }

    #[tokio::test]
    async fn unknown_key_has_full_quota() {
        let limiter = limiter(7, Duration::from_secs(60));
        assert_eq!(limiter.remaining("never-seen").await, 7);
    }

    #[tokio::test]
    async fn window_expiry_resets_the_count() {
        let limiter = limiter(2, Duration::from_millis(20));
        assert!(limiter.admit("k").await.admitted);
        assert!(limiter.admit("k").await.admitted);
        assert!(!limiter.admit("k").await.admitted);

        tokio::time::sleep(Duration::from_millis(30)).await;

        let fresh = limiter.admit("k").await;
        assert!(fresh.admitted);
        assert_eq!(fresh.remaining, 1);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(limiter.admit("a").await.admitted);
        assert!(limiter.admit("b").await.admitted);
        assert!(!limiter.admit("a").await.admitted);
    }

    #[tokio::test]
    async fn concurrent_admissions_never_exceed_limit() {
        let limit = 5;
        let limiter = Arc::new(limiter(limit, Duration::from_secs(60)));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(
                async move { limiter.admit("shared").await.admitted },
            ));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, limit);
    }
}
