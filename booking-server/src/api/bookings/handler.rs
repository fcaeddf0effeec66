//! Booking API Handlers
//!
//! Thin layer over the booking lifecycle manager: handlers shape
//! requests and responses, the manager owns every state transition.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::Identity;
use crate::core::ServerState;
use crate::db::models::{Booking, BookingCreate, BookingStatus};
use crate::db::repository::BookingRepository;
use crate::utils::time::now_iso;
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

const COLLECTION: &str = "bookings";

/// Admin listing filter
#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
}

/// Status transition payload for PUT {id}/status
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: BookingStatus,
}

fn booking_id_string(booking: &Booking) -> String {
    booking.id.as_ref().map(|t| t.to_string()).unwrap_or_default()
}

/// List all bookings, optionally by status (admin)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<AppResponse<Vec<Booking>>>> {
    let repo = BookingRepository::new(state.get_db());
    let bookings = match query.status {
        Some(status) => repo.find_by_status(status).await?,
        None => repo.find_all().await?,
    };
    Ok(ok(bookings))
}

/// List the caller's bookings, newest first
pub async fn list_mine(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<AppResponse<Vec<Booking>>>> {
    let repo = BookingRepository::new(state.get_db());
    let bookings = repo.find_by_user(&identity.user_id).await?;
    Ok(ok(bookings))
}

/// List the caller's upcoming confirmed bookings
pub async fn list_mine_upcoming(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<AppResponse<Vec<Booking>>>> {
    let repo = BookingRepository::new(state.get_db());
    let bookings = repo
        .find_upcoming_by_user(&identity.user_id, &now_iso())
        .await?;
    Ok(ok(bookings))
}

/// List bookings of a resource (admin)
pub async fn list_by_resource(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<Booking>>>> {
    let repo = BookingRepository::new(state.get_db());
    let bookings = repo.find_by_resource(&id).await?;
    Ok(ok(bookings))
}

/// Get booking by id (owner or admin)
pub async fn get_by_id(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Booking>>> {
    let repo = BookingRepository::new(state.get_db());
    let booking = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Booking {} not found", id)))?;

    if booking.user_id.to_string() != identity.user_id && !identity.is_admin() {
        return Err(AppError::forbidden("Not your booking"));
    }

    Ok(ok(booking))
}

/// Create a booking by claiming a slot
///
/// A replayed request token returns the original booking without
/// writing or broadcasting anything.
pub async fn create(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<BookingCreate>,
) -> AppResult<Json<AppResponse<Booking>>> {
    let outcome = state.manager.create_booking(&identity, payload).await?;
    let id = booking_id_string(&outcome.booking);

    if outcome.replayed {
        return Ok(ok_with_message(outcome.booking, "Existing booking returned"));
    }

    state
        .broadcast_sync(COLLECTION, "created", &id, Some(&outcome.booking))
        .await;
    // The claim flipped the slot's availability
    state
        .broadcast_sync::<()>("slots", "updated", &outcome.booking.slot_id.to_string(), None)
        .await;

    Ok(ok(outcome.booking))
}

/// Cancel a booking (owner or admin), releasing its slot
pub async fn cancel(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Booking>>> {
    let outcome = state.manager.cancel_booking(&identity, &id).await?;

    if outcome.released {
        state
            .broadcast_sync(COLLECTION, "updated", &id, Some(&outcome.booking))
            .await;
        state
            .broadcast_sync::<()>("slots", "updated", &outcome.booking.slot_id.to_string(), None)
            .await;
    }

    let message = if outcome.released {
        "Booking cancelled"
    } else {
        "Booking was already finished"
    };
    Ok(ok_with_message(outcome.booking, message))
}

/// Transition a booking's status (admin)
pub async fn update_status(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> AppResult<Json<AppResponse<Booking>>> {
    let outcome = state
        .manager
        .update_status(&identity, &id, payload.status)
        .await?;

    // Same-status requests are a no-op; nothing to announce
    if outcome.old_status != outcome.booking.status {
        state
            .broadcast_sync(COLLECTION, "updated", &id, Some(&outcome.booking))
            .await;
    }
    if outcome.released || outcome.reclaimed {
        state
            .broadcast_sync::<()>("slots", "updated", &outcome.booking.slot_id.to_string(), None)
            .await;
    }

    Ok(ok(outcome.booking))
}

/// Delete a booking outright (admin), releasing a still-held slot
pub async fn delete(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<bool>>> {
    let outcome = state.manager.delete_booking(&identity, &id).await?;

    state
        .broadcast_sync::<()>(COLLECTION, "deleted", &id, None)
        .await;
    if outcome.released {
        state
            .broadcast_sync::<()>("slots", "updated", &outcome.booking.slot_id.to_string(), None)
            .await;
    }

    Ok(ok(true))
}
