//! Providers service.

use async_trait::async_trait;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::providers::{
        data::{GatewayAccount, NewAbsence, NewProvider, NewWorkingHour},
        errors::ProvidersServiceError,
        records::{AbsenceRecord, ProviderRecord, ProviderUuid, WorkingHourRecord},
        repository::PgProvidersRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgProvidersService {
    db: Db,
    repository: PgProvidersRepository,
}

impl PgProvidersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProvidersRepository::new(),
        }
    }
}

#[async_trait]
impl ProvidersService for PgProvidersService {
    async fn create_provider(
        &self,
        provider: NewProvider,
    ) -> Result<ProviderRecord, ProvidersServiceError> {
        if provider.slot_interval_minutes == 0 {
            return Err(ProvidersServiceError::InvalidSettings(
                "slot interval must be positive".to_string(),
            ));
        }

        if provider.name.trim().is_empty() || provider.email.trim().is_empty() {
            return Err(ProvidersServiceError::MissingRequiredData);
        }

        let mut tx = self.db.begin_transaction().await?;

        let created = self.repository.create_provider(&mut tx, &provider).await?;

        tx.commit().await?;

        info!(provider = %created.uuid, "provider created");

        Ok(created)
    }

    async fn get_provider(
        &self,
        provider: ProviderUuid,
    ) -> Result<ProviderRecord, ProvidersServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.repository.get_provider(&mut tx, provider).await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn set_working_hours(
        &self,
        provider: ProviderUuid,
        hours: Vec<NewWorkingHour>,
    ) -> Result<Vec<WorkingHourRecord>, ProvidersServiceError> {
        for hour in &hours {
            if !(0..=6).contains(&hour.day_of_week) {
                return Err(ProvidersServiceError::InvalidWorkingHours(format!(
                    "day of week {} is outside 0-6",
                    hour.day_of_week
                )));
            }

            if hour.starts_at >= hour.ends_at {
                return Err(ProvidersServiceError::InvalidWorkingHours(format!(
                    "window {}-{} must start before it ends",
                    hour.starts_at, hour.ends_at
                )));
            }
        }

        let mut tx = self.db.begin_transaction().await?;

        self.repository.lock_provider(&mut tx, provider).await?;

        let records = self
            .repository
            .replace_working_hours(&mut tx, provider, &hours)
            .await?;

        tx.commit().await?;

        info!(%provider, windows = records.len(), "working hours replaced");

        Ok(records)
    }

    async fn list_working_hours(
        &self,
        provider: ProviderUuid,
    ) -> Result<Vec<WorkingHourRecord>, ProvidersServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        self.repository.get_provider(&mut tx, provider).await?;

        let records = self.repository.list_working_hours(&mut tx, provider).await?;

        tx.commit().await?;

        Ok(records)
    }

    async fn add_absence(
        &self,
        provider: ProviderUuid,
        absence: NewAbsence,
    ) -> Result<AbsenceRecord, ProvidersServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self
            .repository
            .create_absence(&mut tx, provider, &absence)
            .await?;

        tx.commit().await?;

        info!(%provider, date = %record.date, "absence added");

        Ok(record)
    }

    async fn set_gateway_account(
        &self,
        provider: ProviderUuid,
        account: GatewayAccount,
    ) -> Result<ProviderRecord, ProvidersServiceError> {
        if account.account_id.trim().is_empty() {
            return Err(ProvidersServiceError::MissingRequiredData);
        }

        let mut tx = self.db.begin_transaction().await?;

        let record = self
            .repository
            .set_gateway_account(&mut tx, provider, &account)
            .await?;

        tx.commit().await?;

        info!(
            %provider,
            account = %account.account_id,
            onboarded = account.onboarded,
            "gateway account assigned"
        );

        Ok(record)
    }
}

#[automock]
#[async_trait]
pub trait ProvidersService: Send + Sync {
    /// Register a new provider.
    async fn create_provider(
        &self,
        provider: NewProvider,
    ) -> Result<ProviderRecord, ProvidersServiceError>;

    /// Retrieve a single provider.
    async fn get_provider(
        &self,
        provider: ProviderUuid,
    ) -> Result<ProviderRecord, ProvidersServiceError>;

    /// Replace every working-hour window of a provider.
    async fn set_working_hours(
        &self,
        provider: ProviderUuid,
        hours: Vec<NewWorkingHour>,
    ) -> Result<Vec<WorkingHourRecord>, ProvidersServiceError>;

    async fn list_working_hours(
        &self,
        provider: ProviderUuid,
    ) -> Result<Vec<WorkingHourRecord>, ProvidersServiceError>;

    /// Block a whole day.
    async fn add_absence(
        &self,
        provider: ProviderUuid,
        absence: NewAbsence,
    ) -> Result<AbsenceRecord, ProvidersServiceError>;

    /// Store the connected gateway account payouts are transferred to.
    async fn set_gateway_account(
        &self,
        provider: ProviderUuid,
        account: GatewayAccount,
    ) -> Result<ProviderRecord, ProvidersServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, time};
    use testresult::TestResult;

    use crate::test::{TestContext, helpers::new_provider};

    use super::*;

    #[tokio::test]
    async fn create_provider_applies_defaults() -> TestResult {
        let ctx = TestContext::new().await;

        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;

        assert_eq!(provider.slot_interval_minutes, 30);
        assert!(!provider.gateway_onboarded);
        assert!(provider.onboarded_account().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn create_provider_rejects_zero_interval() -> TestResult {
        let ctx = TestContext::new().await;
        let mut provider = new_provider(0, 0, 0);
        provider.slot_interval_minutes = 0;

        let result = ctx.providers.create_provider(provider).await;

        assert!(matches!(
            result,
            Err(ProvidersServiceError::InvalidSettings(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn set_working_hours_replaces_previous_windows() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;

        ctx.providers
            .set_working_hours(
                provider.uuid,
                vec![NewWorkingHour {
                    day_of_week: 1,
                    starts_at: time(9, 0, 0, 0),
                    ends_at: time(17, 0, 0, 0),
                }],
            )
            .await?;

        let replaced = ctx
            .providers
            .set_working_hours(
                provider.uuid,
                vec![
                    NewWorkingHour {
                        day_of_week: 2,
                        starts_at: time(10, 0, 0, 0),
                        ends_at: time(13, 0, 0, 0),
                    },
                    NewWorkingHour {
                        day_of_week: 2,
                        starts_at: time(14, 0, 0, 0),
                        ends_at: time(18, 0, 0, 0),
                    },
                ],
            )
            .await?;

        let listed = ctx.providers.list_working_hours(provider.uuid).await?;

        assert_eq!(replaced.len(), 2);
        assert_eq!(listed, replaced);
        assert!(listed.iter().all(|hour| hour.day_of_week == 2));

        Ok(())
    }

    #[tokio::test]
    async fn set_working_hours_rejects_inverted_window() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;

        let result = ctx
            .providers
            .set_working_hours(
                provider.uuid,
                vec![NewWorkingHour {
                    day_of_week: 3,
                    starts_at: time(18, 0, 0, 0),
                    ends_at: time(9, 0, 0, 0),
                }],
            )
            .await;

        assert!(matches!(
            result,
            Err(ProvidersServiceError::InvalidWorkingHours(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn set_working_hours_for_unknown_provider_is_not_found() -> TestResult {
        let ctx = TestContext::new().await;

        let result = ctx
            .providers
            .set_working_hours(ProviderUuid::new(), Vec::new())
            .await;

        assert!(matches!(result, Err(ProvidersServiceError::NotFound)));

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_absence_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;
        let absence = NewAbsence {
            date: date(2030, 5, 1),
            reason: Some("convention".to_string()),
        };

        ctx.providers
            .add_absence(provider.uuid, absence.clone())
            .await?;

        let result = ctx.providers.add_absence(provider.uuid, absence).await;

        assert!(matches!(result, Err(ProvidersServiceError::AlreadyExists)));

        Ok(())
    }

    #[tokio::test]
    async fn set_gateway_account_marks_provider_onboarded() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;

        let updated = ctx
            .providers
            .set_gateway_account(
                provider.uuid,
                GatewayAccount {
                    account_id: "acct_1Nabc".to_string(),
                    onboarded: true,
                },
            )
            .await?;

        assert_eq!(updated.onboarded_account(), Some("acct_1Nabc"));

        Ok(())
    }
}
