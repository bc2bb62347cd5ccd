//! Reservation Domain Concerns

use std::fmt;

pub mod availability;
pub mod bookings;
pub mod clients;
pub mod notifications;
pub mod payments;
pub mod providers;

/// Records that a lookup can fail to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Client,
    Provider,
    Booking,
    Payment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "client",
            Self::Provider => "provider",
            Self::Booking => "booking",
            Self::Payment => "payment",
        })
    }
}
