//! State

use std::sync::Arc;

use atelier_app::{context::AppContext, rate_limit::RateLimiter};

/// Shared secrets guarding the non-public routes.
#[derive(Clone)]
pub(crate) struct Secrets {
    /// Key gateway webhook signatures are computed with.
    pub(crate) webhook: String,
    /// Bearer token staff tools present on `/internal` routes.
    pub(crate) internal_token: String,
}

pub(crate) struct State {
    pub(crate) app: AppContext,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) secrets: Secrets,
    /// Proxies whose `X-Forwarded-For` entries identify the client.
    pub(crate) trusted_proxy_hops: usize,
}

impl State {
    #[must_use]
    pub(crate) fn new(
        app: AppContext,
        rate_limiter: RateLimiter,
        secrets: Secrets,
        trusted_proxy_hops: usize,
    ) -> Self {
        Self {
            app,
            rate_limiter,
            secrets,
            trusted_proxy_hops,
        }
    }

    #[must_use]
    pub(crate) fn from_app_context(
        app: AppContext,
        rate_limiter: RateLimiter,
        secrets: Secrets,
        trusted_proxy_hops: usize,
    ) -> Arc<Self> {
        Arc::new(Self::new(app, rate_limiter, secrets, trusted_proxy_hops))
    }
}
