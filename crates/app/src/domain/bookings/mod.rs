//! Bookings

pub mod data;
pub mod errors;
pub mod records;
pub(crate) mod repository;
pub mod service;
pub mod status;
pub mod validation;

pub use errors::BookingsServiceError;
pub use service::*;
