//! Server configuration module

use atelier_app::settings::{DatabaseSettings, GatewaySettings, MailSettings, StudioSettings};
use clap::Parser;

use crate::config::{
    internal::InternalConfig,
    observability::{LoggingConfig, ObservabilityConfig},
    rate_limit::RateLimitSettings,
    server::ServerRuntimeConfig,
};

pub(crate) mod internal;
pub(crate) mod observability;
pub(crate) mod rate_limit;
pub(crate) mod server;

/// Atelier JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "atelier-json", about = "Atelier JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Observability (traces/metrics) settings.
    #[command(flatten)]
    pub observability: ObservabilityConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseSettings,

    /// Studio time zone, currency and slot limits.
    #[command(flatten)]
    pub studio: StudioSettings,

    /// Payment gateway settings.
    #[command(flatten)]
    pub gateway: GatewaySettings,

    /// Notification mail settings.
    #[command(flatten)]
    pub mail: MailSettings,

    /// Booking endpoint rate limiting.
    #[command(flatten)]
    pub rate_limit: RateLimitSettings,

    /// Internal endpoint authentication.
    #[command(flatten)]
    pub internal: InternalConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }
}
