//! Get Balance Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::payments::records::BalanceSummary;

use crate::{extensions::*, payments::errors::into_status_error, state::State};

/// Money owed on a booking, in minor units.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct BalanceResponse {
    pub price: u64,
    pub settled: u64,
    pub remaining: u64,
}

impl From<BalanceSummary> for BalanceResponse {
    fn from(summary: BalanceSummary) -> Self {
        BalanceResponse {
            price: summary.price,
            settled: summary.settled,
            remaining: summary.remaining,
        }
    }
}

/// Get Balance Handler
#[endpoint(tags("payments"), summary = "Get booking balance")]
pub(crate) async fn handler(
    booking: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<BalanceResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let summary = state
        .app
        .payments
        .balance(booking.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(summary.into()))
}
