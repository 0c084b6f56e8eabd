// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sliding-window vote rate limiter keyed by actor identity.
//!
//! This limiter is advisory defense-in-depth: it is in-memory, per
//! instance, and resets on restart. The authoritative per-submission and
//! per-contest voting-frequency rules are evaluated separately against
//! persisted vote history and do not depend on it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Vote window: at most `VOTE_WINDOW_CAP` votes per actor per hour.
pub const VOTE_WINDOW: Duration = Duration::from_secs(3600);
pub const VOTE_WINDOW_CAP: usize = 30;

pub struct VoteRateLimiter {
    window: Duration,
    cap: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl VoteRateLimiter {
    pub fn new(window: Duration, cap: usize) -> Self {
        Self {
            window,
            cap,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter with the fixed voting window and cap.
    pub fn for_votes() -> Self {
        Self::new(VOTE_WINDOW, VOTE_WINDOW_CAP)
    }

    /// Record an action for `key` if the window has room. Entries older
    /// than the window are evicted lazily on each check.
    pub async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let queue = hits.entry(key.to_string()).or_default();
        Self::evict_front(queue, now, self.window);
        if queue.len() >= self.cap {
            return false;
        }
        queue.push_back(now);
        true
    }

    /// How many actions remain in the current window. Never negative.
    pub async fn remaining(&self, key: &str) -> usize {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        match hits.get_mut(key) {
            Some(queue) => {
                Self::evict_front(queue, now, self.window);
                self.cap.saturating_sub(queue.len())
            }
            None => self.cap,
        }
    }

    /// When the oldest recorded action for `key` falls out of the window,
    /// i.e. the earliest time a denied caller can try again. None when no
    /// actions are recorded.
    pub async fn reset_time(&self, key: &str) -> Option<Instant> {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let queue = hits.get_mut(key)?;
        Self::evict_front(queue, now, self.window);
        queue.front().map(|&first| first + self.window)
    }

    /// Bulk sweep: drop expired entries for every key and remove empty
    /// keys. Returns the number of keys removed.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let before = hits.len();
        hits.retain(|_, queue| {
            Self::evict_front(queue, now, self.window);
            !queue.is_empty()
        });
        let removed = before - hits.len();
        if removed > 0 {
            debug!("[RateLimiter] Evicted {} idle keys", removed);
        }
        removed
    }

    /// Periodic bulk eviction so idle keys do not accumulate.
    pub fn start_eviction_task(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limiter.evict_expired().await;
            }
        })
    }

    fn evict_front(queue: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&first) = queue.front() {
            if now.duration_since(first) >= window {
                queue.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_cap_denies_then_window_frees() {
        let limiter = VoteRateLimiter::new(Duration::from_secs(60), 3);

        assert!(limiter.allow("u1").await);
        assert!(limiter.allow("u1").await);
        assert!(limiter.allow("u1").await);
        assert!(!limiter.allow("u1").await);
        assert_eq!(limiter.remaining("u1").await, 0);

        // Other keys are unaffected
        assert!(limiter.allow("u2").await);

        advance(Duration::from_secs(61)).await;
        assert!(limiter.allow("u1").await);
        assert_eq!(limiter.remaining("u1").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides_per_entry() {
        let limiter = VoteRateLimiter::new(Duration::from_secs(60), 2);

        assert!(limiter.allow("u1").await);
        advance(Duration::from_secs(30)).await;
        assert!(limiter.allow("u1").await);
        assert!(!limiter.allow("u1").await);

        // First entry expires, second is still inside the window
        advance(Duration::from_secs(31)).await;
        assert!(limiter.allow("u1").await);
        assert!(!limiter.allow("u1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_never_negative() {
        let limiter = VoteRateLimiter::new(Duration::from_secs(60), 2);
        assert_eq!(limiter.remaining("u1").await, 2);
        limiter.allow("u1").await;
        limiter.allow("u1").await;
        limiter.allow("u1").await;
        limiter.allow("u1").await;
        assert_eq!(limiter.remaining("u1").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_time() {
        let limiter = VoteRateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.reset_time("u1").await.is_none());

        let start = Instant::now();
        limiter.allow("u1").await;
        let reset = limiter.reset_time("u1").await.unwrap();
        assert_eq!(reset, start + Duration::from_secs(60));

        advance(Duration::from_secs(61)).await;
        assert!(limiter.reset_time("u1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_eviction() {
        let limiter = VoteRateLimiter::new(Duration::from_secs(60), 5);
        limiter.allow("u1").await;
        limiter.allow("u2").await;
        advance(Duration::from_secs(30)).await;
        limiter.allow("u3").await;

        advance(Duration::from_secs(31)).await;
        // u1/u2 fully expired, u3 still live
        assert_eq!(limiter.evict_expired().await, 2);
        assert_eq!(limiter.remaining("u3").await, 4);
    }
}
