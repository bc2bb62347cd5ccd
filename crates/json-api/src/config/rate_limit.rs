//! Rate Limit Config

use std::time::Duration;

use atelier_app::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, RateLimitConfig};
use clap::Args;

/// Public endpoint rate limiting settings.
#[derive(Debug, Args)]
pub struct RateLimitSettings {
    /// Booking requests allowed per client within one window
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = DEFAULT_MAX_REQUESTS)]
    pub rate_limit_max_requests: u32,

    /// Window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECONDS", default_value_t = DEFAULT_WINDOW.as_secs())]
    pub rate_limit_window_seconds: u64,

    /// Reverse proxies in front of the server that append to `X-Forwarded-For`;
    /// 0 keys clients by socket address and ignores the header
    #[arg(long, env = "TRUSTED_PROXY_HOPS", default_value_t = 0)]
    pub trusted_proxy_hops: usize,
}

impl RateLimitSettings {
    /// Limiter configuration for these settings.
    #[must_use]
    pub fn limiter_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max_requests,
            window: Duration::from_secs(self.rate_limit_window_seconds),
        }
    }
}
