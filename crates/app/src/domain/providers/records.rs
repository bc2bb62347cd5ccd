//! Provider Records

use std::{fmt, str::FromStr};

use jiff::{
    Timestamp,
    civil::{Date, Time},
};

use crate::{domain::availability::slots::Padding, uuids::TypedUuid};

/// Provider UUID
pub type ProviderUuid = TypedUuid<ProviderRecord>;

/// Working Hour UUID
pub type WorkingHourUuid = TypedUuid<WorkingHourRecord>;

/// Absence UUID
pub type AbsenceUuid = TypedUuid<AbsenceRecord>;

/// Provider Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    pub uuid: ProviderUuid,
    pub name: String,
    pub email: String,
    pub prep_minutes: u32,
    pub cleanup_minutes: u32,
    pub buffer_minutes: u32,
    pub slot_interval_minutes: u32,
    pub gateway_account_id: Option<String>,
    pub gateway_onboarded: bool,
    pub subscription: SubscriptionState,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProviderRecord {
    /// Time reserved around every booking of this provider.
    pub fn padding(&self) -> Padding {
        Padding::from_minutes(
            self.prep_minutes,
            self.cleanup_minutes,
            self.buffer_minutes,
        )
    }

    /// The connected gateway account, once onboarding has finished.
    pub fn onboarded_account(&self) -> Option<&str> {
        if !self.gateway_onboarded {
            return None;
        }

        self.gateway_account_id
            .as_deref()
            .filter(|account| !account.is_empty())
    }
}

/// Platform subscription as last reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionState {
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub status: SubscriptionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionStatus {
    #[default]
    None,
    Trialing,
    Active,
    PastDue,
    Unpaid,
    Incomplete,
    Canceled,
}

impl SubscriptionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Unpaid => "unpaid",
            Self::Incomplete => "incomplete",
            Self::Canceled => "canceled",
        }
    }

    /// Map a gateway status string, treating anything unrecognised as incomplete.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "incomplete_expired" => Self::Canceled,
            "paused" => Self::Unpaid,
            other => other.parse().unwrap_or(Self::Incomplete),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSubscriptionStatus(pub String);

impl fmt::Display for UnknownSubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown subscription status: {}", self.0)
    }
}

impl std::error::Error for UnknownSubscriptionStatus {}

impl FromStr for SubscriptionStatus {
    type Err = UnknownSubscriptionStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "trialing" => Ok(Self::Trialing),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "unpaid" => Ok(Self::Unpaid),
            "incomplete" => Ok(Self::Incomplete),
            "canceled" => Ok(Self::Canceled),
            other => Err(UnknownSubscriptionStatus(other.to_string())),
        }
    }
}

/// Working Hour Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingHourRecord {
    pub uuid: WorkingHourUuid,
    pub provider_uuid: ProviderUuid,
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: i8,
    pub starts_at: Time,
    pub ends_at: Time,
    pub active: bool,
}

/// Absence Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsenceRecord {
    pub uuid: AbsenceUuid,
    pub provider_uuid: ProviderUuid,
    pub date: Date,
    pub reason: Option<String>,
}
