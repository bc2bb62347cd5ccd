//! Notifications

pub mod dispatcher;
pub mod errors;
pub mod mailer;
pub mod templates;

pub use dispatcher::*;
pub use errors::{MailerError, NotificationError};
pub use mailer::{Email, LogMailer, Mailer, SmtpConfig, SmtpMailer};
