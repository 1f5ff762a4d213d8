use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use chrono::{DateTime, Utc, Duration};
use serde::Serialize;

use crate::config::{LimitConfig, RateLimitSettings};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window_size: Duration,
}

impl From<LimitConfig> for RateLimitConfig {
    fn from(config: LimitConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window_size: Duration::minutes(config.window_minutes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Blocked { retry_after_secs: u64 },
}

#[derive(Debug)]
struct AttemptWindow {
    count: u32,
    reset_at: DateTime<Utc>,
}

impl AttemptWindow {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.reset_at
    }
}

/// Fixed-window attempt counter keyed by an arbitrary string.
///
/// Entries live until a successful `clear`, a reset on the next attempt
/// after expiry, or `evict_expired`. Without eviction the table grows with
/// every distinct key ever seen.
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, AttemptWindow>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub async fn check_and_increment(&self, key: &str) -> RateLimitDecision {
        self.check_and_increment_at(key, Utc::now()).await
    }

    /// Counts one attempt for `key` at `now`, unless the key is already blocked.
    pub async fn check_and_increment_at(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut windows = self.windows.lock().await;

        if let Some(window) = windows.get_mut(key) {
            if !window.is_expired(now) {
                if window.count >= self.config.max_attempts {
                    return RateLimitDecision::Blocked {
                        retry_after_secs: seconds_until(window.reset_at, now),
                    };
                }
                window.count += 1;
                return RateLimitDecision::Allowed;
            }
        }

        windows.insert(
            key.to_string(),
            AttemptWindow {
                count: 1,
                reset_at: now + self.config.window_size,
            },
        );
        RateLimitDecision::Allowed
    }

    /// Forgets every attempt recorded for `key`.
    pub async fn clear(&self, key: &str) {
        self.windows.lock().await.remove(key);
    }

    pub async fn attempts(&self, key: &str) -> u32 {
        self.attempts_at(key, Utc::now()).await
    }

    pub async fn attempts_at(&self, key: &str, now: DateTime<Utc>) -> u32 {
        let windows = self.windows.lock().await;
        windows
            .get(key)
            .filter(|window| !window.is_expired(now))
            .map_or(0, |window| window.count)
    }

    /// Drops windows that ended before `now`. Returns how many were removed.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| !window.is_expired(now));
        before - windows.len()
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> RateLimiterStats {
        let windows = self.windows.lock().await;

        RateLimiterStats {
            tracked_keys: windows.len(),
            blocked_keys: windows
                .values()
                .filter(|w| !w.is_expired(now) && w.count >= self.config.max_attempts)
                .count(),
            max_attempts: self.config.max_attempts,
            window_secs: self.config.window_size.num_seconds(),
        }
    }
}

fn seconds_until(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (reset_at - now).num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterStats {
    pub tracked_keys: usize,
    pub blocked_keys: usize,
    pub max_attempts: u32,
    pub window_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThrottleStats {
    pub address: RateLimiterStats,
    pub account: RateLimiterStats,
}

/// The two login guards: one per source address, one per account.
pub struct LoginThrottle {
    by_address: RateLimiter,
    by_account: RateLimiter,
}

impl LoginThrottle {
    pub fn new(address: RateLimitConfig, account: RateLimitConfig) -> Self {
        Self {
            by_address: RateLimiter::new(address),
            by_account: RateLimiter::new(account),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.address.into(), settings.account.into())
    }

    pub fn by_address(&self) -> &RateLimiter {
        &self.by_address
    }

    pub fn by_account(&self) -> &RateLimiter {
        &self.by_account
    }

    pub async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        self.by_address.evict_expired(now).await + self.by_account.evict_expired(now).await
    }

    pub async fn stats(&self) -> ThrottleStats {
        let now = Utc::now();
        ThrottleStats {
            address: self.by_address.stats(now).await,
            account: self.by_account.stats(now).await,
        }
    }
}
