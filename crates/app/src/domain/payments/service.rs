//! Payments service.
//!
//! Gateway calls happen outside database transactions: a checkout is prepared in a
//! read transaction, opened at the gateway, then recorded in a second transaction.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::{error, info, warn};

use crate::{
    database::Db,
    domain::{
        bookings::{
            BookingsServiceError,
            records::{BookingRecord, BookingUuid},
            repository::PgBookingsRepository,
            service::apply_transition,
            status::{BookingStatus, BookingTransition, TransitionError},
        },
        clients::repository::PgClientsRepository,
        notifications::Notifier,
        payments::{
            data::{
                ManualPayment, NewPayment, PaymentRequest, ReconcileOutcome, SettledPayment,
                SettlementEvent,
            },
            errors::PaymentsServiceError,
            gateway::{CheckoutRequest, PaymentGateway, application_fee},
            records::{
                BalanceSummary, PaymentKind, PaymentMethod, PaymentRecord, PaymentStatus,
                PaymentUuid,
            },
            repository::PgPaymentsRepository,
            webhook::{GatewayEvent, GatewayEventPayload},
        },
        providers::{
            data::SubscriptionUpdate,
            records::{ProviderUuid, SubscriptionStatus},
            repository::PgProvidersRepository,
        },
    },
};

pub const DEFAULT_CURRENCY: &str = "eur";
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 500;

const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// ISO 4217 code in lower case, as the gateway expects it.
    pub currency: String,
    /// Platform share of every gateway payment, in basis points.
    pub platform_fee_bps: u32,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
        }
    }
}

/// A checkout that is either already open or still has to be created.
enum Checkout {
    Open(PaymentRequest),
    New(CheckoutRequest),
}

#[derive(Clone)]
pub struct PgPaymentsService {
    db: Db,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    settings: PaymentSettings,
    payments: PgPaymentsRepository,
    bookings: PgBookingsRepository,
    providers: PgProvidersRepository,
    clients: PgClientsRepository,
}

impl fmt::Debug for PgPaymentsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgPaymentsService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PgPaymentsService {
    #[must_use]
    pub fn new(
        db: Db,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            db,
            gateway,
            notifier,
            settings,
            payments: PgPaymentsRepository::new(),
            bookings: PgBookingsRepository::new(),
            providers: PgProvidersRepository::new(),
            clients: PgClientsRepository::new(),
        }
    }

    /// Reuse an unpaid checkout for the same kind and amount, or describe a new one.
    async fn prepare_checkout(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: &BookingRecord,
        kind: PaymentKind,
        amount: u64,
    ) -> Result<Checkout, PaymentsServiceError> {
        let provider = self
            .providers
            .get_provider(tx, booking.provider_uuid)
            .await?;

        let account = provider
            .onboarded_account()
            .ok_or(PaymentsServiceError::GatewayConfig)?;

        if let Some(existing) = self
            .payments
            .find_pending_request(tx, booking.uuid, kind, amount)
            .await?
            && let Some(url) = existing.checkout_url
        {
            return Ok(Checkout::Open(PaymentRequest {
                payment_uuid: existing.uuid,
                url,
                amount,
            }));
        }

        let client = self.clients.get_client(tx, booking.client_uuid).await?;

        let label = match kind {
            PaymentKind::Deposit => "Deposit",
            PaymentKind::Balance => "Balance",
            PaymentKind::Total => "Payment",
        };

        Ok(Checkout::New(CheckoutRequest {
            payment_uuid: PaymentUuid::new(),
            booking_uuid: booking.uuid,
            kind,
            amount,
            currency: self.settings.currency.clone(),
            description: format!("{label} for your {} with {}", booking.kind, provider.name),
            customer_email: client.email,
            destination_account: account.to_string(),
            application_fee: application_fee(amount, self.settings.platform_fee_bps),
        }))
    }

    async fn open_checkout(
        &self,
        booking: &BookingRecord,
        checkout: Checkout,
    ) -> Result<PaymentRequest, PaymentsServiceError> {
        let request = match checkout {
            Checkout::Open(request) => {
                info!(
                    booking = %booking.uuid,
                    payment = %request.payment_uuid,
                    "reusing open checkout"
                );

                return Ok(request);
            }
            Checkout::New(request) => request,
        };

        let session = self
            .gateway
            .create_checkout_session(&request)
            .await
            .map_err(PaymentsServiceError::GatewayCall)?;

        let mut tx = self.db.begin_transaction().await?;

        self.payments
            .create_payment(
                &mut tx,
                &NewPayment {
                    uuid: request.payment_uuid,
                    booking_uuid: booking.uuid,
                    provider_uuid: booking.provider_uuid,
                    amount: request.amount,
                    kind: request.kind,
                    method: PaymentMethod::Gateway,
                    status: PaymentStatus::Pending,
                    gateway_session_id: Some(session.id.clone()),
                    checkout_url: Some(session.url.clone()),
                    settled_at: None,
                },
            )
            .await?;

        if request.kind == PaymentKind::Deposit {
            self.bookings
                .set_gateway_reference(&mut tx, booking.uuid, &session.id)
                .await?;
        }

        tx.commit().await?;

        info!(
            booking = %booking.uuid,
            payment = %request.payment_uuid,
            kind = %request.kind,
            amount = request.amount,
            "checkout opened"
        );

        Ok(PaymentRequest {
            payment_uuid: request.payment_uuid,
            url: session.url,
            amount: request.amount,
        })
    }

    /// Confirm the booking a deposit was paid for. Bookings that already left
    /// `PendingPayment` are left alone.
    async fn confirm_for_deposit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
    ) -> Result<Option<BookingRecord>, PaymentsServiceError> {
        match apply_transition(&self.bookings, tx, booking, BookingTransition::Confirm).await {
            Ok(confirmed) => Ok(Some(confirmed)),
            Err(BookingsServiceError::InvalidTransition(
                reason @ (TransitionError::AlreadyConfirmed
                | TransitionError::AlreadyCancelled
                | TransitionError::AlreadyCompleted),
            )) => {
                warn!(%booking, %reason, "deposit settled without confirming booking");

                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Refuse a settlement that would push the booking past its price.
    async fn ensure_within_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: &BookingRecord,
        amount: u64,
    ) -> Result<(), PaymentsServiceError> {
        let settled = self.payments.settled_total(tx, booking.uuid).await?;
        let remaining = BalanceSummary::new(booking.price, settled).remaining;

        if amount > remaining {
            return Err(PaymentsServiceError::AmountExceedsBalance { remaining });
        }

        Ok(())
    }

    async fn lock_settlement_target(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: &SettlementEvent,
    ) -> Result<Option<PaymentRecord>, PaymentsServiceError> {
        if let Some(uuid) = event.payment_uuid
            && let Some(payment) = self.payments.lock_payment(tx, uuid).await?
        {
            return Ok(Some(payment));
        }

        Ok(self
            .payments
            .lock_payment_by_intent(tx, &event.intent_id)
            .await?)
    }

    async fn update_subscription(
        &self,
        event: &GatewayEvent,
        target: SubscriptionTarget<'_>,
        update: SubscriptionUpdate,
    ) -> Result<ReconcileOutcome, PaymentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        if !self
            .payments
            .record_event(&mut tx, &event.id, &event.kind)
            .await?
        {
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        let updated = match target {
            SubscriptionTarget::Provider(provider) => {
                self.providers
                    .update_subscription_for_provider(&mut tx, provider, &update)
                    .await?
            }
            SubscriptionTarget::Subscription(subscription_id) => {
                self.providers
                    .update_subscription_by_id(&mut tx, subscription_id, &update)
                    .await?
            }
        };

        tx.commit().await?;

        if updated == 0 {
            warn!(event = %event.id, kind = %event.kind, "subscription event matched no provider");

            return Ok(ReconcileOutcome::Ignored);
        }

        info!(
            event = %event.id,
            status = %update.status,
            "provider subscription updated"
        );

        Ok(ReconcileOutcome::SubscriptionUpdated)
    }
}

enum SubscriptionTarget<'a> {
    Provider(ProviderUuid),
    Subscription(&'a str),
}

#[async_trait]
impl PaymentsService for PgPaymentsService {
    async fn create_deposit_request(
        &self,
        booking: BookingUuid,
        amount: Option<u64>,
    ) -> Result<PaymentRequest, PaymentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.bookings.get_booking(&mut tx, booking).await?;

        record.status.apply(BookingTransition::Confirm)?;

        let amount = amount.unwrap_or(record.deposit_amount);

        if amount == 0 {
            return Err(PaymentsServiceError::InvalidAmount(
                "a deposit must be greater than zero".to_string(),
            ));
        }

        if amount > record.price {
            return Err(PaymentsServiceError::InvalidAmount(format!(
                "a deposit cannot exceed the price of {}",
                record.price
            )));
        }

        let checkout = self
            .prepare_checkout(&mut tx, &record, PaymentKind::Deposit, amount)
            .await?;

        tx.commit().await?;

        self.open_checkout(&record, checkout).await
    }

    async fn create_balance_request(
        &self,
        booking: BookingUuid,
    ) -> Result<PaymentRequest, PaymentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.bookings.get_booking(&mut tx, booking).await?;

        if record.status == BookingStatus::Cancelled {
            return Err(TransitionError::AlreadyCancelled.into());
        }

        // Paying both checkouts would overshoot the price. Once confirmed, a leftover
        // deposit checkout is stale and a late payment on it is refused at settlement.
        if record.status == BookingStatus::PendingPayment
            && self
                .payments
                .has_open_checkout(&mut tx, booking, PaymentKind::Deposit)
                .await?
        {
            return Err(PaymentsServiceError::DepositCheckoutOpen);
        }

        let settled = self.payments.settled_total(&mut tx, booking).await?;
        let remaining = BalanceSummary::new(record.price, settled).remaining;

        if remaining == 0 {
            return Err(PaymentsServiceError::NoBalanceDue);
        }

        let checkout = self
            .prepare_checkout(&mut tx, &record, PaymentKind::Balance, remaining)
            .await?;

        tx.commit().await?;

        self.open_checkout(&record, checkout).await
    }

    async fn reconcile_settled(
        &self,
        event: SettlementEvent,
    ) -> Result<ReconcileOutcome, PaymentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        if !self
            .payments
            .record_event(&mut tx, &event.event_id, PAYMENT_SUCCEEDED)
            .await?
        {
            info!(event = %event.event_id, "gateway event already processed");

            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        let Some(payment) = self.lock_settlement_target(&mut tx, &event).await? else {
            warn!(
                event = %event.event_id,
                intent = %event.intent_id,
                "settlement matched no payment"
            );

            tx.commit().await?;

            return Ok(ReconcileOutcome::Ignored);
        };

        if payment.status == PaymentStatus::Settled {
            tx.commit().await?;

            info!(payment = %payment.uuid, "payment already settled");

            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        let booking = self
            .bookings
            .lock_booking(&mut tx, payment.booking_uuid)
            .await?;

        if let Err(err) = self
            .ensure_within_balance(&mut tx, &booking, payment.amount)
            .await
        {
            error!(
                payment = %payment.uuid,
                booking = %booking.uuid,
                amount = payment.amount,
                error = %err,
                "settlement rejected"
            );

            return Err(err);
        }

        let payment = self
            .payments
            .settle_payment(&mut tx, payment.uuid, Timestamp::now(), Some(&event.intent_id))
            .await?;

        let confirmed = if payment.kind == PaymentKind::Deposit {
            self.confirm_for_deposit(&mut tx, booking.uuid).await?
        } else {
            None
        };

        tx.commit().await?;

        info!(
            payment = %payment.uuid,
            booking = %payment.booking_uuid,
            kind = %payment.kind,
            amount = payment.amount,
            "payment settled"
        );

        if let Some(confirmed) = &confirmed {
            self.notifier.booking_confirmed(confirmed.uuid);
        }

        Ok(ReconcileOutcome::Settled(SettledPayment { payment, confirmed }))
    }

    async fn record_manual_payment(
        &self,
        booking: BookingUuid,
        manual: ManualPayment,
    ) -> Result<SettledPayment, PaymentsServiceError> {
        if manual.amount == 0 {
            return Err(PaymentsServiceError::InvalidAmount(
                "an amount greater than zero is required".to_string(),
            ));
        }

        let mut tx = self.db.begin_transaction().await?;

        let record = self.bookings.lock_booking(&mut tx, booking).await?;

        if record.status == BookingStatus::Cancelled {
            return Err(TransitionError::AlreadyCancelled.into());
        }

        self.ensure_within_balance(&mut tx, &record, manual.amount)
            .await?;

        let payment = self
            .payments
            .create_payment(
                &mut tx,
                &NewPayment {
                    uuid: PaymentUuid::new(),
                    booking_uuid: record.uuid,
                    provider_uuid: record.provider_uuid,
                    amount: manual.amount,
                    kind: manual.kind,
                    method: manual.method.into(),
                    status: PaymentStatus::Settled,
                    gateway_session_id: None,
                    checkout_url: None,
                    settled_at: Some(Timestamp::now()),
                },
            )
            .await?;

        let confirmed = if manual.kind == PaymentKind::Deposit {
            self.confirm_for_deposit(&mut tx, record.uuid).await?
        } else {
            None
        };

        tx.commit().await?;

        info!(
            payment = %payment.uuid,
            %booking,
            method = %payment.method,
            amount = payment.amount,
            "manual payment recorded"
        );

        if let Some(confirmed) = &confirmed {
            self.notifier.booking_confirmed(confirmed.uuid);
        }

        Ok(SettledPayment { payment, confirmed })
    }

    async fn balance(&self, booking: BookingUuid) -> Result<BalanceSummary, PaymentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.bookings.get_booking(&mut tx, booking).await?;
        let settled = self.payments.settled_total(&mut tx, booking).await?;

        tx.commit().await?;

        Ok(BalanceSummary::new(record.price, settled))
    }

    async fn apply_gateway_event(
        &self,
        event: GatewayEvent,
    ) -> Result<ReconcileOutcome, PaymentsServiceError> {
        match &event.payload {
            GatewayEventPayload::PaymentSucceeded {
                intent_id,
                payment_uuid,
            } => {
                self.reconcile_settled(SettlementEvent {
                    event_id: event.id.clone(),
                    intent_id: intent_id.clone(),
                    payment_uuid: *payment_uuid,
                })
                .await
            }
            GatewayEventPayload::SubscriptionStarted {
                provider_uuid: Some(provider),
                customer_id,
                subscription_id,
            } => {
                let update = SubscriptionUpdate {
                    customer_id: customer_id.clone(),
                    subscription_id: subscription_id.clone(),
                    status: SubscriptionStatus::Active,
                };

                self.update_subscription(&event, SubscriptionTarget::Provider(*provider), update)
                    .await
            }
            GatewayEventPayload::SubscriptionChanged {
                subscription_id,
                customer_id,
                status,
            } => {
                let update = SubscriptionUpdate {
                    customer_id: customer_id.clone(),
                    subscription_id: None,
                    status: *status,
                };

                self.update_subscription(
                    &event,
                    SubscriptionTarget::Subscription(subscription_id),
                    update,
                )
                .await
            }
            GatewayEventPayload::SubscriptionStarted {
                provider_uuid: None,
                ..
            } => {
                warn!(event = %event.id, "subscription checkout without a provider reference");

                Ok(ReconcileOutcome::Ignored)
            }
            GatewayEventPayload::Unhandled => Ok(ReconcileOutcome::Ignored),
        }
    }
}

#[automock]
#[async_trait]
pub trait PaymentsService: Send + Sync {
    /// Open a gateway checkout for the booking's deposit, or `amount` when given.
    async fn create_deposit_request(
        &self,
        booking: BookingUuid,
        amount: Option<u64>,
    ) -> Result<PaymentRequest, PaymentsServiceError>;

    /// Open a gateway checkout for whatever is still owed.
    async fn create_balance_request(
        &self,
        booking: BookingUuid,
    ) -> Result<PaymentRequest, PaymentsServiceError>;

    /// Settle the payment a `payment_intent.succeeded` event refers to, exactly once.
    async fn reconcile_settled(
        &self,
        event: SettlementEvent,
    ) -> Result<ReconcileOutcome, PaymentsServiceError>;

    /// Record cash or a bank transfer as already settled.
    async fn record_manual_payment(
        &self,
        booking: BookingUuid,
        manual: ManualPayment,
    ) -> Result<SettledPayment, PaymentsServiceError>;

    async fn balance(&self, booking: BookingUuid) -> Result<BalanceSummary, PaymentsServiceError>;

    /// Act on a verified gateway webhook.
    async fn apply_gateway_event(
        &self,
        event: GatewayEvent,
    ) -> Result<ReconcileOutcome, PaymentsServiceError>;
}
