//! Providers Data

use jiff::civil::{Date, Time};

use crate::domain::providers::records::{ProviderUuid, SubscriptionStatus};

/// New Provider Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProvider {
    pub uuid: ProviderUuid,
    pub name: String,
    pub email: String,
    pub prep_minutes: u32,
    pub cleanup_minutes: u32,
    pub buffer_minutes: u32,
    pub slot_interval_minutes: u32,
}

/// Working hours for one weekday window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewWorkingHour {
    pub day_of_week: i8,
    pub starts_at: Time,
    pub ends_at: Time,
}

/// New Absence Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAbsence {
    pub date: Date,
    pub reason: Option<String>,
}

/// Connected gateway account assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayAccount {
    pub account_id: String,
    pub onboarded: bool,
}

/// Subscription fields to overwrite. `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub status: SubscriptionStatus,
}
