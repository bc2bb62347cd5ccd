//! Booking Lifecycle

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a booking is in its lifecycle. The single source of truth for status values;
/// the string forms exist only for storage and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    Completed,
}

/// Requested lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTransition {
    Confirm,
    Cancel,
    Complete,
}

/// A transition the current status does not allow. The `Already*` variants mark
/// replays of a transition that has already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("booking is already confirmed")]
    AlreadyConfirmed,

    #[error("booking is already cancelled")]
    AlreadyCancelled,

    #[error("booking is already completed")]
    AlreadyCompleted,

    #[error("only confirmed bookings can be completed")]
    NotConfirmedForCompletion,
}

impl BookingStatus {
    /// Status after applying `transition`, or why it is refused.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] when the transition is not allowed from this status.
    pub const fn apply(self, transition: BookingTransition) -> Result<Self, TransitionError> {
        match (self, transition) {
            (Self::PendingPayment, BookingTransition::Confirm) => Ok(Self::Confirmed),
            (Self::PendingPayment | Self::Confirmed, BookingTransition::Cancel) => {
                Ok(Self::Cancelled)
            }
            (Self::Confirmed, BookingTransition::Complete) => Ok(Self::Completed),
            (Self::Confirmed, BookingTransition::Confirm) => {
                Err(TransitionError::AlreadyConfirmed)
            }
            (Self::Cancelled, BookingTransition::Confirm | BookingTransition::Cancel) => {
                Err(TransitionError::AlreadyCancelled)
            }
            (Self::Completed, BookingTransition::Confirm | BookingTransition::Cancel) => {
                Err(TransitionError::AlreadyCompleted)
            }
            (
                Self::PendingPayment | Self::Cancelled | Self::Completed,
                BookingTransition::Complete,
            ) => Err(TransitionError::NotConfirmedForCompletion),
        }
    }

    /// Whether the booking still holds its time range.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::PendingPayment | Self::Confirmed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value: {0}")]
pub struct UnknownVariant(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending_payment" => Ok(Self::PendingPayment),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// What the appointment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Consultation,
    Session,
    Retouch,
}

impl BookingKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consultation => "consultation",
            Self::Session => "session",
            Self::Retouch => "retouch",
        }
    }
}

impl fmt::Display for BookingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingKind {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "consultation" => Ok(Self::Consultation),
            "session" => Ok(Self::Session),
            "retouch" => Ok(Self::Retouch),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}
