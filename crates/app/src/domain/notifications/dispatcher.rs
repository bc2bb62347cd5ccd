//! Notification dispatch.
//!
//! Delivery never fails the caller: a message gets one retry after a fixed delay and,
//! if that also fails, the booking is flagged with `notification_failed` for follow-up.

use std::{fmt, sync::Arc, time::Duration};

use jiff::{Timestamp, tz::TimeZone};
use mockall::automock;
use tracing::{error, info, warn};

use crate::{
    database::Db,
    domain::{
        availability::schedule::local_date,
        bookings::{
            records::{BookingRecord, BookingUuid},
            repository::PgBookingsRepository,
        },
        clients::repository::PgClientsRepository,
        notifications::{
            errors::{MailerError, NotificationError},
            mailer::{Email, Mailer},
            templates::{BookingNotice, Templates},
        },
        providers::repository::PgProvidersRepository,
    },
};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Hook the payment flow calls once a booking is confirmed.
#[automock]
pub trait Notifier: Send + Sync {
    /// Send the provider alert and client confirmation in the background.
    fn booking_confirmed(&self, booking: BookingUuid);
}

/// Outcome of a scheduled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

/// Send `email`, retrying exactly once after `retry_delay`.
///
/// # Errors
///
/// Returns the second failure when both attempts fail.
pub async fn send_with_retry(
    mailer: &dyn Mailer,
    email: &Email,
    retry_delay: Duration,
) -> Result<(), MailerError> {
    match mailer.send(email).await {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(to = %email.to, subject = %email.subject, error = %err, "email failed, retrying");

            tokio::time::sleep(retry_delay).await;

            mailer.send(email).await
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    db: Db,
    mailer: Arc<dyn Mailer>,
    templates: Templates,
    time_zone: TimeZone,
    retry_delay: Duration,
    bookings: PgBookingsRepository,
    providers: PgProvidersRepository,
    clients: PgClientsRepository,
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("templates", &self.templates)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(
        db: Db,
        mailer: Arc<dyn Mailer>,
        time_zone: TimeZone,
        currency: impl Into<String>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            db,
            mailer,
            templates: Templates::new(time_zone.clone(), currency),
            time_zone,
            retry_delay,
            bookings: PgBookingsRepository::new(),
            providers: PgProvidersRepository::new(),
            clients: PgClientsRepository::new(),
        }
    }

    /// Send the provider alert and client confirmation for `booking`, waiting for both.
    ///
    /// Returns `true` when both messages went out.
    pub async fn send_confirmation(&self, booking: BookingUuid) -> bool {
        let notice = match self.load_notice(booking).await {
            Ok(notice) => notice,
            Err(err) => {
                error!(booking = %booking, error = %err, "could not load booking for notification");

                return false;
            }
        };

        let (alert, confirmation) = tokio::join!(
            self.deliver(booking, self.templates.provider_alert(&notice)),
            self.deliver(booking, self.templates.client_confirmation(&notice)),
        );

        alert && confirmation
    }

    /// Remind clients of confirmed bookings starting tomorrow, studio time.
    ///
    /// # Errors
    ///
    /// Returns an error when the due bookings cannot be listed or stamped. A booking whose
    /// provider or client cannot be loaded is logged and counted as failed.
    pub async fn send_due_reminders(
        &self,
        now: Timestamp,
    ) -> Result<DispatchSummary, NotificationError> {
        let tomorrow = local_date(now, &self.time_zone).tomorrow()?;
        let from = tomorrow.to_zoned(self.time_zone.clone())?.timestamp();
        let until = tomorrow
            .tomorrow()?
            .to_zoned(self.time_zone.clone())?
            .timestamp();

        let mut tx = self.db.begin_transaction().await?;
        let due = self.bookings.list_due_reminders(&mut tx, from, until).await?;
        tx.commit().await?;

        let mut summary = DispatchSummary::default();

        for booking in due {
            let uuid = booking.uuid;
            let Some(notice) = self.batch_notice(booking, "reminder").await else {
                summary.failed += 1;
                continue;
            };

            if self.deliver(uuid, self.templates.reminder(&notice)).await {
                let mut tx = self.db.begin_transaction().await?;
                self.bookings.mark_reminder_sent(&mut tx, uuid, now).await?;
                tx.commit().await?;

                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(sent = summary.sent, failed = summary.failed, "reminders dispatched");

        Ok(summary)
    }

    /// Ask clients of completed bookings for a review, once per booking.
    ///
    /// # Errors
    ///
    /// Returns an error when the due bookings cannot be listed or stamped. A booking whose
    /// provider or client cannot be loaded is logged and counted as failed.
    pub async fn send_due_review_requests(
        &self,
        now: Timestamp,
    ) -> Result<DispatchSummary, NotificationError> {
        let mut tx = self.db.begin_transaction().await?;
        let due = self.bookings.list_due_review_requests(&mut tx, now).await?;
        tx.commit().await?;

        let mut summary = DispatchSummary::default();

        for booking in due {
            let uuid = booking.uuid;
            let Some(notice) = self.batch_notice(booking, "review request").await else {
                summary.failed += 1;
                continue;
            };

            if self.deliver(uuid, self.templates.review_request(&notice)).await {
                let mut tx = self.db.begin_transaction().await?;
                self.bookings.mark_review_requested(&mut tx, uuid, now).await?;
                tx.commit().await?;

                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(sent = summary.sent, failed = summary.failed, "review requests dispatched");

        Ok(summary)
    }

    /// Send with one retry; on final failure flag the booking. Returns whether it was sent.
    async fn deliver(&self, booking: BookingUuid, email: Email) -> bool {
        let Err(err) = send_with_retry(self.mailer.as_ref(), &email, self.retry_delay).await
        else {
            return true;
        };

        error!(
            booking = %booking,
            to = %email.to,
            subject = %email.subject,
            error = %err,
            "email failed after retry"
        );

        if let Err(err) = self.mark_failed(booking).await {
            error!(booking = %booking, error = %err, "could not flag failed notification");
        }

        false
    }

    async fn mark_failed(&self, booking: BookingUuid) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin_transaction().await?;

        self.bookings.mark_notification_failed(&mut tx, booking).await?;

        tx.commit().await
    }

    async fn load_notice(&self, booking: BookingUuid) -> Result<BookingNotice, NotificationError> {
        let mut tx = self.db.begin_transaction().await?;
        let booking = self.bookings.get_booking(&mut tx, booking).await?;
        tx.commit().await?;

        self.notice_for(booking).await
    }

    /// Load one batch entry; a failure is logged and leaves the rest of the batch running.
    async fn batch_notice(&self, booking: BookingRecord, purpose: &str) -> Option<BookingNotice> {
        let uuid = booking.uuid;

        self.notice_for(booking)
            .await
            .inspect_err(|err| {
                error!(
                    booking = %uuid,
                    purpose,
                    error = %err,
                    "could not load booking for notification"
                );
            })
            .ok()
    }

    async fn notice_for(&self, booking: BookingRecord) -> Result<BookingNotice, NotificationError> {
        let mut tx = self.db.begin_transaction().await?;

        let provider = self
            .providers
            .get_provider(&mut tx, booking.provider_uuid)
            .await?;
        let client = self.clients.get_client(&mut tx, booking.client_uuid).await?;

        tx.commit().await?;

        Ok(BookingNotice {
            booking,
            provider,
            client,
        })
    }
}

impl Notifier for NotificationDispatcher {
    fn booking_confirmed(&self, booking: BookingUuid) {
        let dispatcher = self.clone();

        tokio::spawn(async move {
            if dispatcher.send_confirmation(booking).await {
                info!(booking = %booking, "confirmation notifications sent");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use jiff::{ToSpan, civil::time};
    use mockall::Sequence;
    use testresult::TestResult;

    use crate::{
        domain::{
            bookings::BookingsService,
            notifications::mailer::MockMailer,
            providers::ProvidersService,
        },
        test::{
            TestContext,
            helpers::{at, booking_draft, new_provider, open_every_day},
        },
    };

    use super::*;

    fn email() -> Email {
        Email {
            to: "robin@example.com".to_string(),
            subject: "Booking confirmed".to_string(),
            html: String::new(),
            text: String::new(),
            reply_to: None,
        }
    }

    fn transport_error() -> MailerError {
        MailerError::InvalidAddress("unreachable".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn retries_once_after_the_delay() -> TestResult {
        let mut mailer = MockMailer::new();
        let mut sequence = Sequence::new();

        mailer
            .expect_send()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Err(transport_error()));
        mailer
            .expect_send()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));

        let started = tokio::time::Instant::now();

        send_with_retry(&mailer, &email(), Duration::from_secs(30)).await?;

        assert!(started.elapsed() >= Duration::from_secs(30));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_second_failure() {
        let mut mailer = MockMailer::new();

        mailer
            .expect_send()
            .times(2)
            .returning(|_| Err(transport_error()));

        let result = send_with_retry(&mailer, &email(), Duration::from_secs(30)).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn first_success_is_not_retried() -> TestResult {
        let mut mailer = MockMailer::new();

        mailer.expect_send().times(1).returning(|_| Ok(()));

        send_with_retry(&mailer, &email(), Duration::from_secs(30)).await?;

        Ok(())
    }

    async fn confirmed_booking(ctx: &TestContext, days_ahead: i64) -> TestResult<BookingUuid> {
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;

        open_every_day(ctx, provider.uuid, time(10, 0, 0, 0), time(18, 0, 0, 0)).await?;

        let day = jiff::Zoned::now()
            .with_time_zone(TimeZone::UTC)
            .date()
            .checked_add(days_ahead.days())?;

        let created = ctx
            .bookings
            .create_booking(booking_draft(provider.uuid, at(day, 11, 0), 60))
            .await?;

        ctx.bookings.confirm_booking(created.uuid).await?;

        Ok(created.uuid)
    }

    fn dispatcher(ctx: &TestContext, mailer: MockMailer) -> NotificationDispatcher {
        NotificationDispatcher::new(
            ctx.db(),
            Arc::new(mailer),
            TimeZone::UTC,
            "eur",
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn confirmation_goes_to_provider_and_client() -> TestResult {
        let ctx = TestContext::new().await;
        let booking = confirmed_booking(&ctx, 3).await?;

        let recipients = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&recipients);

        let mut mailer = MockMailer::new();
        mailer.expect_send().times(2).returning(move |email| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(email.to.clone());
            }

            Ok(())
        });

        assert!(dispatcher(&ctx, mailer).send_confirmation(booking).await);

        let mut recipients = recipients.lock().map(|r| r.clone()).unwrap_or_default();
        recipients.sort();

        assert_eq!(recipients, vec!["artist@example.com", "robin@example.com"]);
        assert!(!ctx.bookings.get_booking(booking).await?.notification_failed);

        Ok(())
    }

    #[tokio::test]
    async fn failed_retry_flags_the_booking() -> TestResult {
        let ctx = TestContext::new().await;
        let booking = confirmed_booking(&ctx, 3).await?;

        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .returning(|email| {
                if email.to == "artist@example.com" {
                    Err(transport_error())
                } else {
                    Ok(())
                }
            });

        assert!(!dispatcher(&ctx, mailer).send_confirmation(booking).await);
        assert!(ctx.bookings.get_booking(booking).await?.notification_failed);

        Ok(())
    }

    #[tokio::test]
    async fn reminders_are_sent_once() -> TestResult {
        let ctx = TestContext::new().await;
        let tomorrow = confirmed_booking(&ctx, 1).await?;
        let later = confirmed_booking(&ctx, 4).await?;

        let sent = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&sent);

        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let dispatcher = dispatcher(&ctx, mailer);
        let now = Timestamp::now();

        let first = dispatcher.send_due_reminders(now).await?;
        let second = dispatcher.send_due_reminders(now).await?;

        assert_eq!(first, DispatchSummary { sent: 1, failed: 0 });
        assert_eq!(second, DispatchSummary::default());
        assert_eq!(sent.load(Ordering::SeqCst), 1);
        assert!(ctx.bookings.get_booking(tomorrow).await?.reminder_sent_at.is_some());
        assert!(ctx.bookings.get_booking(later).await?.reminder_sent_at.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn unreadable_booking_does_not_stop_the_reminder_batch() -> TestResult {
        let ctx = TestContext::new().await;
        let broken = confirmed_booking(&ctx, 1).await?;
        let healthy = confirmed_booking(&ctx, 1).await?;

        let provider = ctx.bookings.get_booking(broken).await?.provider_uuid;

        sqlx::query("UPDATE providers SET subscription_status = 'unreadable' WHERE uuid = $1")
            .bind(provider.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_| Ok(()));

        let summary = dispatcher(&ctx, mailer)
            .send_due_reminders(Timestamp::now())
            .await?;

        assert_eq!(summary, DispatchSummary { sent: 1, failed: 1 });
        assert!(ctx.bookings.get_booking(healthy).await?.reminder_sent_at.is_some());
        assert!(ctx.bookings.get_booking(broken).await?.reminder_sent_at.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn review_requests_follow_completion() -> TestResult {
        let ctx = TestContext::new().await;
        let booking = confirmed_booking(&ctx, 2).await?;

        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_| Ok(()));

        let dispatcher = dispatcher(&ctx, mailer);

        assert_eq!(
            dispatcher.send_due_review_requests(Timestamp::now()).await?,
            DispatchSummary::default()
        );

        ctx.bookings.complete_booking(booking).await?;

        let summary = dispatcher
            .send_due_review_requests(Timestamp::now() + 1.minute())
            .await?;

        assert_eq!(summary.sent, 1);
        assert!(ctx.bookings.get_booking(booking).await?.review_requested_at.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn unknown_booking_is_reported_not_raised() {
        let ctx = TestContext::new().await;
        let mailer = MockMailer::new();

        assert!(!dispatcher(&ctx, mailer).send_confirmation(BookingUuid::new()).await);
    }
}
