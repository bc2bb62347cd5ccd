//! Notification errors.

use thiserror::Error;

/// A single message could not be handed to the transport.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message")]
    Build(#[from] lettre::error::Error),

    #[error("smtp transport failed")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("mail task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors from the dispatcher itself. Never surfaced to booking or payment flows.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Delivery(#[from] MailerError),

    #[error("time calculation failed")]
    Time(#[from] jiff::Error),

    #[error("storage error")]
    Sql(#[from] sqlx::Error),
}
