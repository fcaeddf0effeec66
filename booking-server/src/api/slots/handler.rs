//! Slot API Handlers
//!
//! Slot rows are created and deleted here; their `is_available` flag is
//! owned by the booking lifecycle manager and never written directly.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::bookings::GenerateSlotsParams;
use crate::core::ServerState;
use crate::db::models::{Slot, SlotCreate};
use crate::db::repository::SlotRepository;
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

const COLLECTION: &str = "slots";

/// Slot listing filters
#[derive(Debug, Deserialize)]
pub struct SlotListQuery {
    /// Resource id, "resources:id" form
    pub resource: String,
    /// YYYY-MM-DD
    pub date: Option<String>,
    #[serde(default)]
    pub available_only: bool,
}

/// Generation summary returned by POST /api/slots/generate
#[derive(Debug, Serialize)]
pub struct GenerateSummary {
    pub count: usize,
    pub slots: Vec<Slot>,
}

/// List slots of a resource, optionally narrowed to one date
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<SlotListQuery>,
) -> AppResult<Json<AppResponse<Vec<Slot>>>> {
    let repo = SlotRepository::new(state.get_db());

    let slots = match &query.date {
        Some(date) if query.available_only => {
            repo.find_available_by_resource_and_date(&query.resource, date)
                .await?
        }
        Some(date) => repo.find_by_resource_and_date(&query.resource, date).await?,
        None => {
            let mut all = repo.find_by_resource(&query.resource).await?;
            if query.available_only {
                all.retain(|s| s.is_available);
            }
            all
        }
    };

    Ok(ok(slots))
}

/// Get slot by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Slot>>> {
    let repo = SlotRepository::new(state.get_db());
    let slot = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Slot {} not found", id)))?;
    Ok(ok(slot))
}

/// Create a single slot (admin)
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<SlotCreate>,
) -> AppResult<Json<AppResponse<Slot>>> {
    if payload.start_time >= payload.end_time {
        return Err(AppError::validation("start_time must be before end_time"));
    }
    if payload.date.len() != 10 {
        return Err(AppError::validation("date must be YYYY-MM-DD"));
    }
    if let Some(price) = payload.price
        && (!price.is_finite() || price < 0.0)
    {
        return Err(AppError::validation("price must be non-negative"));
    }

    let repo = SlotRepository::new(state.get_db());
    let slot = repo.create(payload).await?;

    let id = slot.id.as_ref().map(|t| t.to_string()).unwrap_or_default();
    state
        .broadcast_sync(COLLECTION, "created", &id, Some(&slot))
        .await;

    Ok(ok(slot))
}

/// Generate a grid of slots for a resource (admin)
///
/// Validation and persistence live in the manager; this handler only
/// shapes the response and bumps the sync version.
pub async fn generate(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Json(params): Json<GenerateSlotsParams>,
) -> AppResult<Json<AppResponse<GenerateSummary>>> {
    let resource_id = params.resource_id.clone();
    let slots = state.manager.generate_slots(&identity, params).await?;

    // Bulk slot syncs carry the resource id, not a slot id
    state
        .broadcast_sync::<()>(COLLECTION, "generated", &resource_id, None)
        .await;

    let count = slots.len();
    Ok(ok_with_message(
        GenerateSummary { count, slots },
        format!("Generated {} slots", count),
    ))
}

/// Delete a slot (admin)
///
/// Bookings keep their own copies of the times, so deleting a claimed
/// slot does not damage booking history.
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<bool>>> {
    let repo = SlotRepository::new(state.get_db());
    let deleted = repo.delete(&id).await?;

    if deleted {
        state
            .broadcast_sync::<()>(COLLECTION, "deleted", &id, None)
            .await;
    }

    Ok(ok(deleted))
}

/// Delete every slot of a resource (admin)
pub async fn delete_by_resource(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<usize>>> {
    let repo = SlotRepository::new(state.get_db());
    let removed = repo.delete_by_resource(&id).await?;

    if removed > 0 {
        tracing::info!(resource_id = %id, removed, "Slots deleted by resource");
        state
            .broadcast_sync::<()>(COLLECTION, "deleted", &id, None)
            .await;
    }

    Ok(ok_with_message(removed, format!("Deleted {} slots", removed)))
}
