//! Payments

pub mod data;
pub mod errors;
pub mod gateway;
pub mod records;
mod repository;
pub mod service;
pub mod webhook;

pub use errors::PaymentsServiceError;
pub use service::*;
