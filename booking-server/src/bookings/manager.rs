//! BookingManager - Booking lifecycle authority
//!
//! This module handles:
//! - Booking creation with atomic slot claim
//! - Guarded cancel / status transitions with slot reconciliation
//! - Slot grid generation
//! - Event broadcasting after committed transitions
//!
//! # Create Flow
//!
//! ```text
//! create_booking(identity, req)
//!     ├─ 1. Idempotency check (request_token)
//!     ├─ 2. Load slot + resource, fast-fail availability checks
//!     ├─ 3. Derive the denormalized row server-side
//!     ├─ 4. Claim transaction (conditional write on is_available)
//!     ├─ 5. Broadcast event
//!     └─ 6. Return booking
//! ```
//!
//! Every transition that touches a slot flag runs inside one storage
//! transaction; the manager itself keeps no state between calls.

use super::error::{BookingError, BookingResult, classify_repo_error};
use super::generator::{self, SlotGrid};
use crate::auth::Identity;
use crate::db::models::{Booking, BookingCreate, BookingStatus, Slot};
use crate::db::repository::booking::BookingRow;
use crate::db::repository::{BookingRepository, ResourceRepository, SlotRepository};
use crate::utils::time::now_iso;
use crate::utils::validation::{MAX_NOTE_LEN, MAX_TOKEN_LEN};
use chrono::NaiveDate;
use shared::booking::{BookingEvent, BookingEventPayload, BookingEventType};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Longest slot generation range we accept, inclusive days
const MAX_GENERATION_DAYS: i64 = 92;

/// What create_booking did
#[derive(Debug)]
pub struct CreateOutcome {
    pub booking: Booking,
    /// True when the request_token matched an earlier booking and
    /// nothing was written
    pub replayed: bool,
}

/// What cancel_booking did
#[derive(Debug)]
pub struct CancelOutcome {
    pub booking: Booking,
    /// False when the booking was already terminal (no-op)
    pub released: bool,
}

/// What update_status did
#[derive(Debug)]
pub struct StatusOutcome {
    pub booking: Booking,
    pub old_status: BookingStatus,
    pub released: bool,
    pub reclaimed: bool,
}

/// What delete_booking did
#[derive(Debug)]
pub struct DeleteOutcome {
    /// The booking as it was before deletion
    pub booking: Booking,
    pub released: bool,
}

/// Slot generation request, dates inclusive
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GenerateSlotsParams {
    pub resource_id: String,
    /// YYYY-MM-DD
    pub start_date: String,
    /// YYYY-MM-DD
    pub end_date: String,
    pub start_hour: u32,
    pub end_hour: u32,
    pub interval_minutes: u32,
    pub price: f64,
}

/// How a status transition maps onto the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionKind {
    /// Status write plus slot release in one transaction
    Release,
    /// Must re-claim the slot before the status write
    Reclaim,
    /// Guarded status write, slot untouched
    StatusOnly,
}

/// 状态机：哪些转换合法、各自怎么影响时段
fn classify_transition(from: BookingStatus, to: BookingStatus) -> BookingResult<TransitionKind> {
    use BookingStatus::*;
    match (from, to) {
        (Pending | Confirmed, Cancelled) => Ok(TransitionKind::Release),
        (Cancelled, Pending | Confirmed) => Ok(TransitionKind::Reclaim),
        (Pending, Confirmed) | (Confirmed, Pending) => Ok(TransitionKind::StatusOnly),
        (Pending | Confirmed, Completed) => Ok(TransitionKind::StatusOnly),
        (from, to) => Err(BookingError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

pub struct BookingManager {
    bookings: BookingRepository,
    slots: SlotRepository,
    resources: ResourceRepository,
    event_tx: broadcast::Sender<BookingEvent>,
}

impl std::fmt::Debug for BookingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingManager")
            .field("event_tx", &"<broadcast::Sender>")
            .finish()
    }
}

impl BookingManager {
    pub fn new(db: Surreal<Db>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            bookings: BookingRepository::new(db.clone()),
            slots: SlotRepository::new(db.clone()),
            resources: ResourceRepository::new(db),
            event_tx,
        }
    }

    /// Subscribe to lifecycle events (lossy for laggards)
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.event_tx.subscribe()
    }

    /// Create a booking by claiming its slot.
    ///
    /// All denormalized fields (user, resource name, times, price) are
    /// derived here from the identity and the stored records; nothing
    /// is taken from the request beyond slot, notes and token.
    pub async fn create_booking(
        &self,
        identity: &Identity,
        req: BookingCreate,
    ) -> BookingResult<CreateOutcome> {
        tracing::info!(user = %identity.user_id, slot = %req.slot_id, "Processing booking request");

        if let Some(notes) = &req.notes
            && notes.len() > MAX_NOTE_LEN
        {
            return Err(BookingError::Validation(format!(
                "Notes too long (max {} chars)",
                MAX_NOTE_LEN
            )));
        }
        if let Some(token) = &req.request_token
            && (token.is_empty() || token.len() > MAX_TOKEN_LEN)
        {
            return Err(BookingError::Validation(
                "Invalid request token".to_string(),
            ));
        }

        // Idempotency: a known token means the work already happened
        if let Some(token) = &req.request_token
            && let Some(existing) = self
                .bookings
                .find_by_request_token(token)
                .await
                .map_err(classify_repo_error)?
        {
            tracing::warn!(token = %token, "Duplicate booking request, replaying original");
            return Ok(CreateOutcome {
                booking: existing,
                replayed: true,
            });
        }

        let slot = self
            .slots
            .find_by_id(&req.slot_id)
            .await
            .map_err(classify_repo_error)?
            .ok_or_else(|| BookingError::SlotNotFound(req.slot_id.clone()))?;

        // Fast fail; the claim transaction is still the authority
        if !slot.is_available {
            return Err(BookingError::SlotUnavailable(req.slot_id.clone()));
        }

        let resource_key = slot.resource_id.to_string();
        let resource = self
            .resources
            .find_by_id(&resource_key)
            .await
            .map_err(classify_repo_error)?
            .ok_or_else(|| BookingError::ResourceNotFound(resource_key.clone()))?;

        // Same: the claim transaction re-reads is_active before flipping
        if !resource.is_active {
            return Err(BookingError::ResourceInactive(resource_key));
        }

        let slot_id: RecordId = slot
            .id
            .clone()
            .ok_or_else(|| BookingError::Internal("Stored slot without id".to_string()))?;
        let user_id: RecordId = identity
            .user_id
            .parse()
            .map_err(|_| BookingError::Validation(format!("Invalid user id: {}", identity.user_id)))?;

        let row = BookingRow {
            user_id,
            user_name: identity.name.clone(),
            user_email: identity.email.clone(),
            resource_id: slot.resource_id.clone(),
            resource_name: resource.name.clone(),
            slot_id: slot_id.clone(),
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            status: BookingStatus::Confirmed,
            notes: req.notes.clone(),
            total_price: slot.price,
            request_token: req.request_token.clone(),
            created_at: now_iso(),
        };

        let created = self
            .bookings
            .create_claiming_slot(slot_id.clone(), row)
            .await
            .map_err(classify_repo_error)?;

        let booking = match created {
            Some(booking) => booking,
            None => {
                // Claim missed. A racing replay of the same token may have
                // won; hand back its booking instead of a conflict.
                if let Some(token) = &req.request_token
                    && let Some(existing) = self
                        .bookings
                        .find_by_request_token(token)
                        .await
                        .map_err(classify_repo_error)?
                {
                    tracing::warn!(token = %token, "Claim lost to a replay of the same token");
                    return Ok(CreateOutcome {
                        booking: existing,
                        replayed: true,
                    });
                }
                return Err(BookingError::SlotUnavailable(req.slot_id.clone()));
            }
        };

        let booking_id = id_string(&booking.id);
        tracing::info!(booking = %booking_id, slot = %slot_id, "Booking created");

        self.emit(
            identity,
            BookingEventType::BookingCreated,
            BookingEventPayload::BookingCreated {
                booking_id,
                slot_id: slot_id.to_string(),
                resource_id: slot.resource_id.to_string(),
                resource_name: resource.name,
                start_time: slot.start_time,
                end_time: slot.end_time,
                status: booking.status.to_string(),
                total_price: slot.price,
            },
        );

        Ok(CreateOutcome {
            booking,
            replayed: false,
        })
    }

    /// Cancel a booking, releasing its slot.
    ///
    /// Owners may cancel their own bookings, admins anyone's. A booking
    /// already terminal comes back unchanged with `released` false.
    pub async fn cancel_booking(
        &self,
        identity: &Identity,
        booking_id: &str,
    ) -> BookingResult<CancelOutcome> {
        let existing = self
            .bookings
            .find_by_id(booking_id)
            .await
            .map_err(classify_repo_error)?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

        if existing.user_id.to_string() != identity.user_id && !identity.is_admin() {
            return Err(BookingError::Forbidden(
                "You can only cancel your own bookings".to_string(),
            ));
        }

        let rid: RecordId = booking_id
            .parse()
            .map_err(|_| BookingError::Validation(format!("Invalid booking id: {}", booking_id)))?;

        let outcome = self
            .bookings
            .cancel_releasing_slot(rid)
            .await
            .map_err(classify_repo_error)?;

        if outcome.before.is_none() {
            return Err(BookingError::BookingNotFound(booking_id.to_string()));
        }
        let booking = outcome
            .booking
            .ok_or_else(|| BookingError::Internal("Cancel returned no booking".to_string()))?;

        if outcome.released {
            tracing::info!(booking = %booking_id, "Booking cancelled, slot released");
            self.emit(
                identity,
                BookingEventType::BookingCancelled,
                BookingEventPayload::BookingCancelled {
                    booking_id: booking_id.to_string(),
                    slot_id: booking.slot_id.to_string(),
                    slot_released: true,
                },
            );
        } else {
            tracing::info!(booking = %booking_id, status = %booking.status, "Cancel was a no-op");
        }

        Ok(CancelOutcome {
            booking,
            released: outcome.released,
        })
    }

    /// Admin status transition with slot reconciliation.
    ///
    /// Setting the current status again is a no-op. Reinstating a
    /// cancelled booking re-claims the slot and fails with a conflict
    /// when it was rebooked in the meantime.
    pub async fn update_status(
        &self,
        identity: &Identity,
        booking_id: &str,
        new_status: BookingStatus,
    ) -> BookingResult<StatusOutcome> {
        let existing = self
            .bookings
            .find_by_id(booking_id)
            .await
            .map_err(classify_repo_error)?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;
        let old_status = existing.status;

        if old_status == new_status {
            return Ok(StatusOutcome {
                booking: existing,
                old_status,
                released: false,
                reclaimed: false,
            });
        }

        let kind = classify_transition(old_status, new_status)?;

        let rid: RecordId = booking_id
            .parse()
            .map_err(|_| BookingError::Validation(format!("Invalid booking id: {}", booking_id)))?;

        let outcome = match kind {
            TransitionKind::Release => self
                .bookings
                .cancel_releasing_slot(rid)
                .await
                .map_err(classify_repo_error)?,
            TransitionKind::Reclaim => {
                let outcome = self
                    .bookings
                    .reinstate_claiming_slot(rid, new_status)
                    .await
                    .map_err(classify_repo_error)?;
                if !outcome.reclaimed {
                    return Err(BookingError::SlotUnavailable(
                        "Slot was rebooked, cannot reinstate".to_string(),
                    ));
                }
                outcome
            }
            TransitionKind::StatusOnly => self
                .bookings
                .set_status_guarded(rid, new_status, old_status)
                .await
                .map_err(classify_repo_error)?,
        };

        if outcome.before.is_none() {
            return Err(BookingError::BookingNotFound(booking_id.to_string()));
        }
        let booking = outcome
            .booking
            .ok_or_else(|| BookingError::Internal("Transition returned no booking".to_string()))?;

        // Guard missed: someone changed the booking between read and write
        if booking.status != new_status {
            return Err(BookingError::Conflict(
                "Booking changed concurrently, try again".to_string(),
            ));
        }

        tracing::info!(
            booking = %booking_id,
            from = %old_status,
            to = %new_status,
            released = outcome.released,
            reclaimed = outcome.reclaimed,
            "Booking status updated"
        );

        self.emit(
            identity,
            BookingEventType::BookingStatusChanged,
            BookingEventPayload::BookingStatusChanged {
                booking_id: booking_id.to_string(),
                slot_id: booking.slot_id.to_string(),
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
                slot_released: outcome.released,
                slot_reclaimed: outcome.reclaimed,
            },
        );

        Ok(StatusOutcome {
            booking,
            old_status,
            released: outcome.released,
            reclaimed: outcome.reclaimed,
        })
    }

    /// Admin hard delete; releases the slot when the booking was active
    pub async fn delete_booking(
        &self,
        identity: &Identity,
        booking_id: &str,
    ) -> BookingResult<DeleteOutcome> {
        let rid: RecordId = booking_id
            .parse()
            .map_err(|_| BookingError::Validation(format!("Invalid booking id: {}", booking_id)))?;

        let outcome = self
            .bookings
            .delete_releasing_slot(rid)
            .await
            .map_err(classify_repo_error)?;

        let booking = outcome
            .before
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

        tracing::info!(booking = %booking_id, released = outcome.released, "Booking deleted");

        self.emit(
            identity,
            BookingEventType::BookingDeleted,
            BookingEventPayload::BookingDeleted {
                booking_id: booking_id.to_string(),
                slot_id: booking.slot_id.to_string(),
                slot_released: outcome.released,
            },
        );

        Ok(DeleteOutcome {
            booking,
            released: outcome.released,
        })
    }

    /// Expand and persist a slot grid for a resource
    pub async fn generate_slots(
        &self,
        identity: &Identity,
        params: GenerateSlotsParams,
    ) -> BookingResult<Vec<Slot>> {
        let start = parse_date(&params.start_date)?;
        let end = parse_date(&params.end_date)?;

        if end < start {
            return Err(BookingError::Validation(
                "End date is before start date".to_string(),
            ));
        }
        if (end - start).num_days() >= MAX_GENERATION_DAYS {
            return Err(BookingError::Validation(format!(
                "Date range too long (max {} days)",
                MAX_GENERATION_DAYS
            )));
        }
        if params.start_hour >= params.end_hour || params.end_hour > 24 {
            return Err(BookingError::Validation(
                "Invalid hour window".to_string(),
            ));
        }
        if params.interval_minutes == 0 || params.interval_minutes > 24 * 60 {
            return Err(BookingError::Validation("Invalid interval".to_string()));
        }
        if !params.price.is_finite() || params.price < 0.0 {
            return Err(BookingError::Validation("Invalid price".to_string()));
        }

        if self
            .resources
            .find_by_id(&params.resource_id)
            .await
            .map_err(classify_repo_error)?
            .is_none()
        {
            return Err(BookingError::ResourceNotFound(params.resource_id.clone()));
        }

        let grid = SlotGrid {
            resource_id: params.resource_id.clone(),
            start_date: start,
            end_date: end,
            start_hour: params.start_hour,
            end_hour: params.end_hour,
            interval_minutes: params.interval_minutes,
            price: params.price,
        };
        let batch = generator::expand(&grid);

        let created = self
            .slots
            .create_bulk(batch)
            .await
            .map_err(classify_repo_error)?;

        tracing::info!(
            resource = %params.resource_id,
            count = created.len(),
            start = %params.start_date,
            end = %params.end_date,
            "Slot grid generated"
        );

        self.emit(
            identity,
            BookingEventType::SlotsGenerated,
            BookingEventPayload::SlotsGenerated {
                resource_id: params.resource_id.clone(),
                count: created.len() as u32,
                start_date: params.start_date.clone(),
                end_date: params.end_date.clone(),
            },
        );

        Ok(created)
    }

    fn emit(&self, identity: &Identity, event_type: BookingEventType, payload: BookingEventPayload) {
        let event = BookingEvent::new(
            identity.user_id.clone(),
            identity.name.clone(),
            event_type,
            payload,
        );
        // No receivers is fine; the feed is best-effort
        let _ = self.event_tx.send(event);
    }
}

fn parse_date(s: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| BookingError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", s)))
}

fn id_string(id: &Option<RecordId>) -> String {
    id.as_ref().map(|i| i.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_matrix() {
        use BookingStatus::*;

        assert_eq!(
            classify_transition(Pending, Cancelled).unwrap(),
            TransitionKind::Release
        );
        assert_eq!(
            classify_transition(Confirmed, Cancelled).unwrap(),
            TransitionKind::Release
        );
        assert_eq!(
            classify_transition(Cancelled, Confirmed).unwrap(),
            TransitionKind::Reclaim
        );
        assert_eq!(
            classify_transition(Cancelled, Pending).unwrap(),
            TransitionKind::Reclaim
        );
        assert_eq!(
            classify_transition(Pending, Confirmed).unwrap(),
            TransitionKind::StatusOnly
        );
        assert_eq!(
            classify_transition(Confirmed, Completed).unwrap(),
            TransitionKind::StatusOnly
        );

        assert!(classify_transition(Completed, Pending).is_err());
        assert!(classify_transition(Completed, Cancelled).is_err());
        assert!(classify_transition(Cancelled, Completed).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2024-01-31").is_ok());
        assert!(parse_date("2024-1-31").is_err());
        assert!(parse_date("31/01/2024").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }
}
