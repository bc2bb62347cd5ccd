//! Atelier JSON API Healthcheck Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{extensions::*, state::State};

/// Healthcheck response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
}

/// Healthcheck handler
///
/// Healthy while the database answers a ping, 503 otherwise.
#[endpoint(tags("health"), summary = "Health check endpoint")]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<HealthResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    if let Err(source) = state.app.database.ping().await {
        warn!("healthcheck database ping failed: {source}");

        return Err(StatusError::service_unavailable().brief("Database unavailable"));
    }

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
