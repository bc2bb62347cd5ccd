//! Bookings service.

use async_trait::async_trait;
use jiff::{Timestamp, tz::TimeZone};
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        Entity,
        availability::schedule::{Schedule, local_date},
        bookings::{
            data::{BookingDraft, NewBooking},
            errors::BookingsServiceError,
            records::{BookingRecord, BookingUuid, CreatedBooking},
            repository::PgBookingsRepository,
            status::BookingTransition,
            validation::{ClientReference, ValidatedBooking, validate},
        },
        clients::repository::PgClientsRepository,
        providers::repository::PgProvidersRepository,
    },
};

/// Attempts made when a serializable booking transaction loses a race.
const MAX_CREATE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct PgBookingsService {
    db: Db,
    time_zone: TimeZone,
    bookings: PgBookingsRepository,
    providers: PgProvidersRepository,
    clients: PgClientsRepository,
}

impl PgBookingsService {
    #[must_use]
    pub fn new(db: Db, time_zone: TimeZone) -> Self {
        Self {
            db,
            time_zone,
            bookings: PgBookingsRepository::new(),
            providers: PgProvidersRepository::new(),
            clients: PgClientsRepository::new(),
        }
    }

    async fn try_create(
        &self,
        booking: &ValidatedBooking,
    ) -> Result<BookingRecord, BookingsServiceError> {
        let mut tx = self.db.begin_serializable_transaction().await?;

        let provider = self
            .providers
            .lock_provider(&mut tx, booking.provider_uuid)
            .await
            .map_err(not_found_as(Entity::Provider))?;

        let client = match &booking.client {
            ClientReference::Existing(uuid) => self
                .clients
                .get_client(&mut tx, *uuid)
                .await
                .map_err(not_found_as(Entity::Client))?,
            ClientReference::Contact(contact) => {
                self.clients.find_or_create(&mut tx, contact).await?
            }
        };

        let date = local_date(booking.range.start, &self.time_zone);
        let schedule = Schedule::load(&mut tx, &provider, date, date, &self.time_zone).await?;
        let padding = provider.padding();

        schedule.check(booking.range, padding)?;

        let created = self
            .bookings
            .create_booking(
                &mut tx,
                &NewBooking {
                    uuid: BookingUuid::new(),
                    provider_uuid: provider.uuid,
                    client_uuid: client.uuid,
                    range: booking.range,
                    occupied: padding.expand(booking.range)?,
                    duration_minutes: booking.duration_minutes,
                    kind: booking.kind,
                    price: booking.price,
                    deposit_amount: booking.deposit_amount,
                    project: booking.project.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn transition(
        &self,
        booking: BookingUuid,
        transition: BookingTransition,
    ) -> Result<BookingRecord, BookingsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let updated = apply_transition(&self.bookings, &mut tx, booking, transition).await?;

        tx.commit().await?;

        info!(
            booking = %updated.uuid,
            status = %updated.status,
            "booking status changed"
        );

        Ok(updated)
    }
}

/// Lock `booking` and move it through `transition` inside the caller's transaction.
pub(crate) async fn apply_transition(
    repository: &PgBookingsRepository,
    tx: &mut Transaction<'_, Postgres>,
    booking: BookingUuid,
    transition: BookingTransition,
) -> Result<BookingRecord, BookingsServiceError> {
    let current = repository.lock_booking(tx, booking).await?;

    let next = current.status.apply(transition)?;

    let deposit_paid = matches!(transition, BookingTransition::Confirm);

    Ok(repository
        .update_status(tx, booking, next, deposit_paid)
        .await?)
}

fn not_found_as(entity: Entity) -> impl FnOnce(sqlx::Error) -> BookingsServiceError {
    move |error| match error {
        sqlx::Error::RowNotFound => BookingsServiceError::NotFound(entity),
        error => error.into(),
    }
}

#[async_trait]
impl BookingsService for PgBookingsService {
    async fn create_booking(
        &self,
        draft: BookingDraft,
    ) -> Result<CreatedBooking, BookingsServiceError> {
        let booking = validate(draft, Timestamp::now())?;

        let mut attempt = 1;

        let created = loop {
            match self.try_create(&booking).await {
                Err(error) if error.is_retryable() && attempt < MAX_CREATE_ATTEMPTS => {
                    warn!(
                        provider = %booking.provider_uuid,
                        attempt,
                        "booking transaction conflicted, retrying"
                    );

                    attempt += 1;
                }
                result => break result?,
            }
        };

        info!(
            booking = %created.uuid,
            provider = %created.provider_uuid,
            starts_at = %created.starts_at,
            "booking created"
        );

        Ok(CreatedBooking {
            uuid: created.uuid,
            status: created.status,
        })
    }

    async fn get_booking(&self, booking: BookingUuid) -> Result<BookingRecord, BookingsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.bookings.get_booking(&mut tx, booking).await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn confirm_booking(
        &self,
        booking: BookingUuid,
    ) -> Result<BookingRecord, BookingsServiceError> {
        self.transition(booking, BookingTransition::Confirm).await
    }

    async fn cancel_booking(
        &self,
        booking: BookingUuid,
    ) -> Result<BookingRecord, BookingsServiceError> {
        self.transition(booking, BookingTransition::Cancel).await
    }

    async fn complete_booking(
        &self,
        booking: BookingUuid,
    ) -> Result<BookingRecord, BookingsServiceError> {
        self.transition(booking, BookingTransition::Complete).await
    }
}

#[automock]
#[async_trait]
pub trait BookingsService: Send + Sync {
    /// Validate a request and reserve its range as `PendingPayment`.
    async fn create_booking(
        &self,
        draft: BookingDraft,
    ) -> Result<CreatedBooking, BookingsServiceError>;

    /// Retrieve a single booking.
    async fn get_booking(&self, booking: BookingUuid) -> Result<BookingRecord, BookingsServiceError>;

    /// Mark the deposit paid and confirm. Replays report `AlreadyConfirmed`.
    async fn confirm_booking(
        &self,
        booking: BookingUuid,
    ) -> Result<BookingRecord, BookingsServiceError>;

    /// Release the booking's range. Replays report `AlreadyCancelled`.
    async fn cancel_booking(
        &self,
        booking: BookingUuid,
    ) -> Result<BookingRecord, BookingsServiceError>;

    /// Close a confirmed booking after the session.
    async fn complete_booking(
        &self,
        booking: BookingUuid,
    ) -> Result<BookingRecord, BookingsServiceError>;
}
