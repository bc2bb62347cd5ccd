//! Availability

pub mod errors;
pub(crate) mod schedule;
pub mod service;
pub mod slots;

pub use errors::AvailabilityServiceError;
pub use service::*;
