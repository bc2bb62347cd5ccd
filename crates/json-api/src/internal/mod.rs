//! Staff-only booking operations.

pub(crate) mod middleware;
mod handlers;

pub(crate) use handlers::*;
