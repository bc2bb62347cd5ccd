//! List Slots Handler

use std::sync::Arc;

use jiff::civil::Date;
use salvo::{
    oapi::{
        ToSchema,
        extract::{PathParam, QueryParam},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::availability::{
    SlotQuery,
    slots::{Slot, SlotList},
};

use crate::{extensions::*, slots::errors::into_status_error, state::State};

/// A bookable start time.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SlotResponse {
    /// Slot start (RFC 3339)
    pub start: String,

    /// Slot end (RFC 3339)
    pub end: String,

    /// Length of the slot in minutes
    pub duration_min: u32,
}

impl From<Slot> for SlotResponse {
    fn from(slot: Slot) -> Self {
        SlotResponse {
            start: slot.start.to_string(),
            end: slot.end.to_string(),
            duration_min: slot.duration_minutes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SlotsResponse {
    /// Free slots in chronological order
    pub slots: Vec<SlotResponse>,

    /// Whether more slots exist beyond the per-query cap
    pub truncated: bool,
}

impl From<SlotList> for SlotsResponse {
    fn from(list: SlotList) -> Self {
        SlotsResponse {
            slots: list.slots.into_iter().map(Into::into).collect(),
            truncated: list.truncated,
        }
    }
}

fn parse_date(name: &str, value: &str) -> Result<Date, StatusError> {
    value
        .parse::<Date>()
        .map_err(|error| StatusError::bad_request().brief(format!("invalid {name}: {error}")))
}

/// List Slots Handler
///
/// Returns the free start times of a provider for one day or an inclusive date range.
#[endpoint(
    tags("availability"),
    summary = "List available slots",
    responses(
        (status_code = StatusCode::OK, description = "Free slots"),
        (status_code = StatusCode::NOT_FOUND, description = "Provider not found"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid duration or range"),
    ),
)]
pub(crate) async fn handler(
    provider: PathParam<Uuid>,
    date: QueryParam<String, true>,
    until: QueryParam<String, false>,
    duration: QueryParam<u32, true>,
    depot: &mut Depot,
) -> Result<Json<SlotsResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let from = parse_date("date", &date.into_inner())?;
    let until = until
        .into_inner()
        .map(|value| parse_date("until", &value))
        .transpose()?;

    let list = state
        .app
        .availability
        .available_slots(SlotQuery {
            provider: provider.into_inner().into(),
            from,
            until,
            duration_minutes: duration.into_inner(),
        })
        .await
        .map_err(into_status_error)?;

    Ok(Json(list.into()))
}
