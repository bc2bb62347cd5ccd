//! Settings shared by the CLI and the JSON API.
//!
//! Each group is a `clap::Args` struct so both binaries can flatten the ones they need.

use std::{sync::Arc, time::Duration};

use clap::{Args, ValueEnum};
use jiff::tz::TimeZone;
use thiserror::Error;

use crate::domain::{
    availability::{AvailabilitySettings, DEFAULT_MAX_SLOTS},
    notifications::{LogMailer, Mailer, MailerError, SmtpConfig, SmtpMailer},
    payments::{
        DEFAULT_CURRENCY, DEFAULT_PLATFORM_FEE_BPS, PaymentSettings,
        gateway::{DEFAULT_API_BASE, GatewayConfig},
    },
};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown studio time zone {name:?}")]
    TimeZone {
        name: String,
        #[source]
        source: jiff::Error,
    },

    #[error("SMTP transport selected but no SMTP host configured")]
    MissingSmtpHost,

    #[error("invalid mail settings")]
    Mailer(#[from] MailerError),
}

/// Database settings.
#[derive(Debug, Clone, Args)]
pub struct DatabaseSettings {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

/// Studio-wide scheduling settings.
#[derive(Debug, Clone, Args)]
pub struct StudioSettings {
    /// IANA time zone all working hours and absences are interpreted in
    #[arg(long, env = "STUDIO_TIME_ZONE", default_value = "UTC")]
    pub time_zone: String,

    /// Currency payments are taken in (ISO 4217, lower case)
    #[arg(long, env = "CURRENCY", default_value = DEFAULT_CURRENCY)]
    pub currency: String,

    /// Maximum slots returned by one availability query
    #[arg(long, env = "MAX_SLOTS", default_value_t = DEFAULT_MAX_SLOTS)]
    pub max_slots: usize,
}

impl StudioSettings {
    /// Resolve the configured time zone.
    ///
    /// # Errors
    ///
    /// Returns an error when the name is not in the time zone database.
    pub fn time_zone(&self) -> Result<TimeZone, SettingsError> {
        TimeZone::get(&self.time_zone).map_err(|source| SettingsError::TimeZone {
            name: self.time_zone.clone(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns an error when the time zone cannot be resolved.
    pub fn availability(&self) -> Result<AvailabilitySettings, SettingsError> {
        Ok(AvailabilitySettings {
            time_zone: self.time_zone()?,
            max_slots: self.max_slots,
        })
    }
}

/// Outgoing mail transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MailTransport {
    /// Log messages instead of sending them.
    Log,

    /// Send through an SMTP relay.
    Smtp,
}

/// Notification delivery settings.
#[derive(Debug, Clone, Args)]
pub struct MailSettings {
    /// Mail transport (log, smtp)
    #[arg(long, env = "MAIL_TRANSPORT", value_enum, default_value_t = MailTransport::Log)]
    pub mail_transport: MailTransport,

    /// SMTP relay host
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    /// SMTP relay port
    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    /// SMTP username
    #[arg(long, env = "SMTP_USERNAME", default_value = "")]
    pub smtp_username: String,

    /// SMTP password
    #[arg(long, env = "SMTP_PASSWORD", default_value = "", hide_env_values = true)]
    pub smtp_password: String,

    /// Sender mailbox for every notification
    #[arg(long, env = "MAIL_FROM", default_value = "Atelier <bookings@localhost>")]
    pub mail_from: String,

    /// Seconds to wait before the single retry of a failed message
    #[arg(long, env = "NOTIFICATION_RETRY_DELAY_SECONDS", default_value_t = 30)]
    pub notification_retry_delay_seconds: u64,
}

impl MailSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.notification_retry_delay_seconds)
    }

    /// Build the configured transport.
    ///
    /// # Errors
    ///
    /// Returns an error when SMTP is selected without a host or with an invalid sender.
    pub fn mailer(&self) -> Result<Arc<dyn Mailer>, SettingsError> {
        match self.mail_transport {
            MailTransport::Log => Ok(Arc::new(LogMailer)),
            MailTransport::Smtp => {
                let host = self
                    .smtp_host
                    .clone()
                    .filter(|host| !host.trim().is_empty())
                    .ok_or(SettingsError::MissingSmtpHost)?;

                let mailer = SmtpMailer::new(SmtpConfig {
                    host,
                    port: self.smtp_port,
                    username: self.smtp_username.clone(),
                    password: self.smtp_password.clone(),
                    from: self.mail_from.clone(),
                })?;

                Ok(Arc::new(mailer))
            }
        }
    }
}

/// Payment gateway settings.
#[derive(Debug, Clone, Args)]
pub struct GatewaySettings {
    /// Gateway API base URL
    #[arg(long, env = "GATEWAY_API_BASE", default_value = DEFAULT_API_BASE)]
    pub gateway_api_base: String,

    /// Gateway secret API key
    #[arg(long, env = "GATEWAY_SECRET_KEY", hide_env_values = true)]
    pub gateway_secret_key: String,

    /// Shared secret webhook signatures are computed with
    #[arg(long, env = "GATEWAY_WEBHOOK_SECRET", hide_env_values = true)]
    pub gateway_webhook_secret: String,

    /// Where clients land after paying
    #[arg(long, env = "CHECKOUT_SUCCESS_URL")]
    pub checkout_success_url: String,

    /// Where clients land after abandoning checkout
    #[arg(long, env = "CHECKOUT_CANCEL_URL")]
    pub checkout_cancel_url: String,

    /// Platform fee taken from every gateway payment, in basis points
    #[arg(long, env = "PLATFORM_FEE_BPS", default_value_t = DEFAULT_PLATFORM_FEE_BPS)]
    pub platform_fee_bps: u32,
}

impl GatewaySettings {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            api_base: self.gateway_api_base.clone(),
            secret_key: self.gateway_secret_key.clone(),
            success_url: self.checkout_success_url.clone(),
            cancel_url: self.checkout_cancel_url.clone(),
        }
    }

    pub fn payments(&self, currency: &str) -> PaymentSettings {
        PaymentSettings {
            currency: currency.to_lowercase(),
            platform_fee_bps: self.platform_fee_bps,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        studio: StudioSettings,

        #[command(flatten)]
        mail: MailSettings,
    }

    #[test]
    fn defaults_apply_without_arguments() -> TestResult {
        let harness = Harness::try_parse_from(["atelier"])?;

        assert_eq!(harness.studio.currency, DEFAULT_CURRENCY);
        assert_eq!(harness.studio.max_slots, DEFAULT_MAX_SLOTS);
        assert_eq!(harness.mail.mail_transport, MailTransport::Log);
        assert_eq!(harness.mail.retry_delay(), Duration::from_secs(30));

        Ok(())
    }

    #[test]
    fn payment_currency_is_lower_cased() {
        let gateway = GatewaySettings {
            gateway_api_base: DEFAULT_API_BASE.to_string(),
            gateway_secret_key: "sk_test".to_string(),
            gateway_webhook_secret: "whsec_test".to_string(),
            checkout_success_url: "https://studio.example/paid".to_string(),
            checkout_cancel_url: "https://studio.example/cancelled".to_string(),
            platform_fee_bps: 250,
        };

        let payments = gateway.payments("EUR");

        assert_eq!(payments.currency, "eur");
        assert_eq!(payments.platform_fee_bps, 250);
        assert_eq!(gateway.gateway_config().secret_key, "sk_test");
    }

    #[test]
    fn unknown_time_zone_is_reported() -> TestResult {
        let harness = Harness::try_parse_from(["atelier", "--time-zone", "Mars/Olympus"])?;

        assert!(matches!(
            harness.studio.time_zone(),
            Err(SettingsError::TimeZone { .. })
        ));

        Ok(())
    }

    #[test]
    fn smtp_without_host_is_rejected() -> TestResult {
        let harness = Harness::try_parse_from(["atelier", "--mail-transport", "smtp"])?;

        assert!(matches!(
            harness.mail.mailer(),
            Err(SettingsError::MissingSmtpHost)
        ));

        Ok(())
    }
}
