//! Process-local fixed-window rate limiting.
//!
//! Each key gets a window that opens on its first request and admits up to
//! `max_requests` until it expires. Every check runs under the key's shard lock, so
//! concurrent requests for one key never over-admit.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use dashmap::DashMap;

pub const DEFAULT_MAX_REQUESTS: u32 = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Expired windows are swept after this many checks.
const PRUNE_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    pub reset_at: Instant,
    /// Zero when allowed.
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
    checks: AtomicU64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Count one request for `key`.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Count one request for `key` as if it arrived at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_INTERVAL == PRUNE_INTERVAL - 1 {
            self.prune(now);
        }

        let window = self.config.window;

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let reset_at = entry.started.checked_add(window).unwrap_or(now);

        if entry.count < self.config.max_requests {
            entry.count += 1;

            RateLimitDecision {
                allowed: true,
                remaining: self.config.max_requests - entry.count,
                reset_at,
                retry_after: Duration::ZERO,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
                retry_after: reset_at.saturating_duration_since(now),
            }
        }
    }

    /// Drop windows that have expired by `now`.
    pub fn prune(&self, now: Instant) {
        let window = self.config.window;

        self.windows
            .retain(|_, entry| now.saturating_duration_since(entry.started) < window);
    }

    /// Keys with a live or not yet pruned window.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
