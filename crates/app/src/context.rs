//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    database::{self, DatabaseHealth, Db},
    domain::{
        availability::{AvailabilityService, PgAvailabilityService},
        bookings::{BookingsService, PgBookingsService},
        notifications::NotificationDispatcher,
        payments::{PaymentsService, PgPaymentsService, gateway::StripeGateway},
    },
    settings::{GatewaySettings, MailSettings, SettingsError, StudioSettings},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to run database migrations")]
    Migrate(#[source] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Clone)]
pub struct AppContext {
    pub database: Arc<dyn DatabaseHealth>,
    pub availability: Arc<dyn AvailabilityService>,
    pub bookings: Arc<dyn BookingsService>,
    pub payments: Arc<dyn PaymentsService>,
}

impl AppContext {
    /// Connect to the database, apply pending migrations and wire every service.
    ///
    /// # Errors
    ///
    /// Returns an error when the database is unreachable, a migration fails, or the
    /// studio or mail settings are invalid.
    pub async fn from_settings(
        database_url: &str,
        studio: &StudioSettings,
        mail: &MailSettings,
        gateway: &GatewaySettings,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(database_url)
            .await
            .map_err(AppInitError::Database)?;

        database::migrate(&pool)
            .await
            .map_err(AppInitError::Migrate)?;

        let db = Db::new(pool);
        let availability = studio.availability()?;

        let notifier = NotificationDispatcher::new(
            db.clone(),
            mail.mailer()?,
            availability.time_zone.clone(),
            studio.currency.clone(),
            mail.retry_delay(),
        );

        let payments = PgPaymentsService::new(
            db.clone(),
            Arc::new(StripeGateway::new(gateway.gateway_config())),
            Arc::new(notifier),
            gateway.payments(&studio.currency),
        );

        Ok(Self {
            bookings: Arc::new(PgBookingsService::new(
                db.clone(),
                availability.time_zone.clone(),
            )),
            availability: Arc::new(PgAvailabilityService::new(db.clone(), availability)),
            database: Arc::new(db),
            payments: Arc::new(payments),
        })
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}
