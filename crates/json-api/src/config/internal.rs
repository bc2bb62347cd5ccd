//! Internal API Config

use clap::Args;

/// Settings for the staff-only internal endpoints.
#[derive(Debug, Args)]
pub struct InternalConfig {
    /// Shared bearer token required on `/internal` routes
    #[arg(long, env = "INTERNAL_API_TOKEN", hide_env_values = true)]
    pub internal_api_token: String,
}
