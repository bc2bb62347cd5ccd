//! Internal Handlers

pub(crate) mod cancel;
pub(crate) mod complete;
pub(crate) mod confirm;
pub(crate) mod record_payment;
