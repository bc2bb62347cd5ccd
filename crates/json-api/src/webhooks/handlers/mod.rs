//! Webhook Handlers

pub(crate) mod gateway;
