//! Booking events - immutable facts emitted after lifecycle transitions

use serde::{Deserialize, Serialize};

/// Booking event - emitted by the lifecycle manager after a committed
/// state transition, never before
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    /// Event unique ID
    pub event_id: String,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// User who triggered this event
    pub actor_id: String,
    /// Actor name (snapshot for audit)
    pub actor_name: String,
    /// Event type
    pub event_type: BookingEventType,
    /// Event payload
    pub payload: BookingEventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventType {
    BookingCreated,
    BookingCancelled,
    BookingStatusChanged,
    BookingDeleted,
    SlotsGenerated,
}

impl std::fmt::Display for BookingEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingEventType::BookingCreated => write!(f, "BOOKING_CREATED"),
            BookingEventType::BookingCancelled => write!(f, "BOOKING_CANCELLED"),
            BookingEventType::BookingStatusChanged => write!(f, "BOOKING_STATUS_CHANGED"),
            BookingEventType::BookingDeleted => write!(f, "BOOKING_DELETED"),
            BookingEventType::SlotsGenerated => write!(f, "SLOTS_GENERATED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventPayload {
    BookingCreated {
        booking_id: String,
        slot_id: String,
        resource_id: String,
        resource_name: String,
        /// RFC3339
        start_time: String,
        /// RFC3339
        end_time: String,
        status: String,
        total_price: f64,
    },

    BookingCancelled {
        booking_id: String,
        slot_id: String,
        /// False when the booking was already in a terminal state
        slot_released: bool,
    },

    BookingStatusChanged {
        booking_id: String,
        slot_id: String,
        old_status: String,
        new_status: String,
        slot_released: bool,
        slot_reclaimed: bool,
    },

    BookingDeleted {
        booking_id: String,
        slot_id: String,
        slot_released: bool,
    },

    SlotsGenerated {
        resource_id: String,
        count: u32,
        /// YYYY-MM-DD
        start_date: String,
        /// YYYY-MM-DD
        end_date: String,
    },
}

impl BookingEvent {
    /// Create a new event
    ///
    /// `event_id` and `timestamp` are ALWAYS set by the server; actors
    /// never supply them.
    pub fn new(
        actor_id: String,
        actor_name: String,
        event_type: BookingEventType,
        payload: BookingEventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            actor_id,
            actor_name,
            event_type,
            payload,
        }
    }

    /// Booking ID the event refers to, when it refers to one
    pub fn booking_id(&self) -> Option<&str> {
        match &self.payload {
            BookingEventPayload::BookingCreated { booking_id, .. }
            | BookingEventPayload::BookingCancelled { booking_id, .. }
            | BookingEventPayload::BookingStatusChanged { booking_id, .. }
            | BookingEventPayload::BookingDeleted { booking_id, .. } => Some(booking_id),
            BookingEventPayload::SlotsGenerated { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_tag_format() {
        let event = BookingEvent {
            event_id: "evt-1".to_string(),
            timestamp: 1_700_000_000_000,
            actor_id: "users:u1".to_string(),
            actor_name: "Alice".to_string(),
            event_type: BookingEventType::BookingCancelled,
            payload: BookingEventPayload::BookingCancelled {
                booking_id: "bookings:b1".to_string(),
                slot_id: "slots:s1".to_string(),
                slot_released: true,
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "BOOKING_CANCELLED");
        assert_eq!(json["payload"]["type"], "BOOKING_CANCELLED");
        assert_eq!(event.booking_id(), Some("bookings:b1"));
    }
}
