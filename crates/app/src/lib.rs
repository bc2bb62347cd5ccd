//! Reservation engine: availability, booking lifecycle, payments and notifications.

pub mod context;
pub mod database;
pub mod domain;
pub mod rate_limit;
pub mod settings;

#[cfg(test)]
mod test;

mod uuids;

pub use uuids::TypedUuid;
