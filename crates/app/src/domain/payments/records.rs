//! Payment Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        bookings::{records::BookingUuid, status::UnknownVariant},
        providers::records::ProviderUuid,
    },
    uuids::TypedUuid,
};

/// Payment UUID
pub type PaymentUuid = TypedUuid<PaymentRecord>;

/// What part of the price a payment covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Deposit,
    Balance,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Gateway,
    Cash,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Settled,
    Refunded,
}

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }
    };
}

text_enum!(PaymentKind {
    Deposit => "deposit",
    Balance => "balance",
    Total => "total",
});

text_enum!(PaymentMethod {
    Gateway => "gateway",
    Cash => "cash",
    Transfer => "transfer",
});

text_enum!(PaymentStatus {
    Pending => "pending",
    Settled => "settled",
    Refunded => "refunded",
});

/// Payment Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub uuid: PaymentUuid,
    pub booking_uuid: BookingUuid,
    pub provider_uuid: ProviderUuid,
    pub amount: u64,
    pub kind: PaymentKind,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub gateway_session_id: Option<String>,
    pub gateway_intent_id: Option<String>,
    pub checkout_url: Option<String>,
    pub settled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Money owed on a booking, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSummary {
    pub price: u64,
    pub settled: u64,
    pub remaining: u64,
}

impl BalanceSummary {
    pub const fn new(price: u64, settled: u64) -> Self {
        Self {
            price,
            settled,
            remaining: price.saturating_sub(settled),
        }
    }
}
